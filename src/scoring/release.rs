// src/scoring/release.rs

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::models::settings::SubjectSettings;

/// Outcome of passing cohort output through the release gate.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Gated<T> {
    Released(T),
    NotReleased(ReleasePending),
}

/// What users see while statistics are withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasePending {
    pub message: String,
    pub expected_release_at: Option<DateTime<Utc>>,
}

/// Visibility switch for one (subject, round), built from a settings snapshot.
pub struct ReleaseGate<'a> {
    settings: &'a SubjectSettings,
    offset: FixedOffset,
}

impl<'a> ReleaseGate<'a> {
    /// `offset` is the reporting timezone used to render the expected release time.
    pub fn new(settings: &'a SubjectSettings, offset: FixedOffset) -> Self {
        Self { settings, offset }
    }

    pub fn is_released(&self) -> bool {
        self.settings.is_released
    }

    /// `Err` with the pending notice while hidden, whatever data exists underneath.
    pub fn check(&self) -> Result<(), ReleasePending> {
        if self.is_released() {
            Ok(())
        } else {
            Err(self.pending())
        }
    }

    pub fn pending(&self) -> ReleasePending {
        let mut message = format!(
            "Statistics for {} round {} have not been released yet.",
            self.settings.subject, self.settings.exam_round
        );
        if let Some(expected) = self.settings.expected_release_at {
            let local = expected.with_timezone(&self.offset);
            message.push_str(&format!(
                " Expected release: {}",
                local.format("%Y-%m-%d %H:%M (UTC%:z)")
            ));
        }
        ReleasePending {
            message,
            expected_release_at: self.settings.expected_release_at,
        }
    }
}
