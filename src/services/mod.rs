// src/services/mod.rs

pub mod settings;
pub mod statistics;
pub mod submission;
