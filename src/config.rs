// src/config.rs

use std::{env, fmt::Display, str::FromStr};

use chrono::{FixedOffset, Offset, Utc};
use dotenvy::dotenv;

use crate::scoring::tier::TierCutoffs;

/// Number of questions per answer group on the OMR form.
pub const ANSWER_GROUP_SIZE: usize = 5;

/// Maximum number of rows on the public leaderboard.
pub const LEADERBOARD_LIMIT: usize = 15;

/// Highest selectable option. `0` marks an unanswered question.
pub const MAX_OPTION: u8 = 5;

/// `DATABASE_URL` value that selects the in-process store.
pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    /// Cutoffs used for any (subject, round) an administrator has not configured.
    pub default_cutoffs: TierCutoffs,
    /// Reporting timezone for week windows, in whole hours east of UTC.
    pub report_utc_offset_hours: i32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let defaults = TierCutoffs::default();
        let default_cutoffs = checked_cutoffs(TierCutoffs {
            safe: parse_or("DEFAULT_SAFE_CUTOFF", defaults.safe),
            competitive: parse_or("DEFAULT_COMPETITIVE_CUTOFF", defaults.competitive),
        });

        Self {
            database_url,
            jwt_secret,
            rust_log,
            port: parse_or("PORT", 3000),
            default_cutoffs,
            report_utc_offset_hours: parse_or("REPORT_UTC_OFFSET_HOURS", 9),
        }
    }

    /// Reporting timezone. Out-of-range offsets fall back to UTC.
    pub fn report_offset(&self) -> FixedOffset {
        self.report_utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

/// Configured default cutoffs, or the built-in pair when they break `safe > competitive >= 0`.
fn checked_cutoffs(cutoffs: TierCutoffs) -> TierCutoffs {
    if cutoffs.is_valid() {
        return cutoffs;
    }
    let fallback = TierCutoffs::default();
    tracing::warn!(
        "Invalid DEFAULT_SAFE_CUTOFF/DEFAULT_COMPETITIVE_CUTOFF ({}/{}), using defaults {}/{}",
        cutoffs.safe,
        cutoffs.competitive,
        fallback.safe,
        fallback.competitive
    );
    fallback
}

fn parse_or<T: FromStr + Display + Copy>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!("Invalid {key} value '{raw}': {e}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(report_utc_offset_hours: i32) -> Config {
        Config {
            database_url: MEMORY_DATABASE_URL.to_string(),
            jwt_secret: "secret".to_string(),
            rust_log: "info".to_string(),
            port: 0,
            default_cutoffs: TierCutoffs::default(),
            report_utc_offset_hours,
        }
    }

    #[test]
    fn test_inverted_default_cutoffs_fall_back() {
        let inverted = checked_cutoffs(TierCutoffs {
            safe: 10,
            competitive: 20,
        });
        assert_eq!(inverted, TierCutoffs::default());
        let negative = TierCutoffs {
            safe: 20,
            competitive: -1,
        };
        assert_eq!(checked_cutoffs(negative), TierCutoffs::default());

        let custom = TierCutoffs {
            safe: 30,
            competitive: 25,
        };
        assert_eq!(checked_cutoffs(custom), custom);
    }

    #[test]
    fn test_report_offset_rejects_out_of_range_hours() {
        assert_eq!(config(9).report_offset().local_minus_utc(), 9 * 3600);
        assert_eq!(config(-5).report_offset().local_minus_utc(), -5 * 3600);
        assert_eq!(config(30).report_offset(), Utc.fix());
        assert_eq!(config(i32::MAX).report_offset(), Utc.fix());
    }
}
