// src/handlers/mod.rs

pub mod admin;
pub mod scoring;
pub mod statistics;
