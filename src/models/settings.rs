// src/models/settings.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::scoring::tier::TierCutoffs;

/// Represents the 'subject_settings' table: release flag and tier cutoffs
/// for one (subject, exam_round).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SubjectSettings {
    pub subject: String,
    pub exam_round: i32,
    pub is_released: bool,
    pub released_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Shown to users while statistics are withheld.
    pub expected_release_at: Option<chrono::DateTime<chrono::Utc>>,
    pub safe_cutoff: i32,
    pub competitive_cutoff: i32,
}

impl SubjectSettings {
    /// Settings for a (subject, round) nobody has configured: hidden, default cutoffs.
    pub fn with_defaults(subject: &str, exam_round: i32, defaults: TierCutoffs) -> Self {
        Self {
            subject: subject.to_string(),
            exam_round,
            is_released: false,
            released_at: None,
            expected_release_at: None,
            safe_cutoff: defaults.safe,
            competitive_cutoff: defaults.competitive,
        }
    }

    pub fn cutoffs(&self) -> TierCutoffs {
        TierCutoffs {
            safe: self.safe_cutoff,
            competitive: self.competitive_cutoff,
        }
    }
}

/// DTO for updating cutoffs or the expected release time. Admin only.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(range(min = 0, max = 200))]
    pub safe_cutoff: Option<i32>,
    #[validate(range(min = 0, max = 200))]
    pub competitive_cutoff: Option<i32>,
    pub expected_release_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for flipping the release gate. Cutoffs may be saved in the same action.
#[derive(Debug, Deserialize, Validate)]
pub struct ReleaseRequest {
    pub released: bool,
    #[validate(range(min = 0, max = 200))]
    pub safe_cutoff: Option<i32>,
    #[validate(range(min = 0, max = 200))]
    pub competitive_cutoff: Option<i32>,
}
