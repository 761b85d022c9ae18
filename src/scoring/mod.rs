// src/scoring/mod.rs

//! Pure scoring pipeline: answer parsing, key comparison, tiers, ranking,
//! week windows and the release gate. Nothing in here performs I/O.

pub mod answer;
pub mod engine;
pub mod ranking;
pub mod release;
pub mod tier;
pub mod week;

/// Integer percentage of `part / whole`, rounded half-up.
///
/// `round_half_up_percent(28, 35) == 80`, `round_half_up_percent(1, 8) == 13`.
/// Returns 0 for an empty whole.
pub fn round_half_up_percent(part: i64, whole: i64) -> i32 {
    if whole <= 0 {
        return 0;
    }
    ((part * 200 + whole) / (whole * 2)) as i32
}
