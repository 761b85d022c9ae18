// src/store/mod.rs

//! Data-store seam for the scoring pipeline.
//!
//! Handlers and services only see `ScoringStore`; `PgStore` backs production,
//! `MemoryStore` backs tests and database-less runs.

pub mod memory;
pub mod postgres;

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::models::{
    answer_key::AnswerKeyEntry,
    scoring_result::{AnswerDetail, ExamKey, NewScoringResult, ScoringResult},
    settings::SubjectSettings,
};
use crate::scoring::week::TimeWindow;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type SharedStore = Arc<dyn ScoringStore>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. Holds what was duplicated.
    UniqueViolation(String),
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UniqueViolation(what) => write!(f, "duplicate {what}"),
            StoreError::Database(msg) => write!(f, "database error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation(
                db.constraint().unwrap_or("record").to_string(),
            ),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Which results make up a cohort. Always one (subject, round); the window and
/// exam-number prefix narrow it further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortQuery {
    pub subject: String,
    pub exam_round: i32,
    pub window: Option<TimeWindow>,
    pub participant_prefix: Option<String>,
}

impl CohortQuery {
    pub fn new(subject: &str, exam_round: i32) -> Self {
        Self {
            subject: subject.to_string(),
            exam_round,
            window: None,
            participant_prefix: None,
        }
    }

    pub fn within(mut self, window: Option<TimeWindow>) -> Self {
        self.window = window;
        self
    }

    /// Blank prefixes are ignored.
    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.participant_prefix = prefix
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        self
    }

    pub fn matches(&self, result: &ScoringResult) -> bool {
        result.subject == self.subject
            && result.exam_round == self.exam_round
            && self.window.is_none_or(|w| w.contains(result.created_at))
            && self.participant_prefix.as_deref().is_none_or(|prefix| {
                result
                    .participant_code
                    .as_deref()
                    .is_some_and(|code| code.starts_with(prefix))
            })
    }
}

/// A freshly stored result. `details_error` is set when the parent row was
/// written but its per-question rows were not.
#[derive(Debug, Clone)]
pub struct InsertedResult {
    pub result: ScoringResult,
    pub details_error: Option<String>,
}

#[async_trait]
pub trait ScoringStore: Send + Sync {
    /// Key rows ordered by question number. Empty means not published.
    async fn answer_key(&self, exam: &ExamKey) -> Result<Vec<AnswerKeyEntry>, StoreError>;

    /// Publishes a key once. A second publication is a `UniqueViolation`.
    async fn publish_answer_key(
        &self,
        exam: &ExamKey,
        entries: &[AnswerKeyEntry],
    ) -> Result<(), StoreError>;

    async fn find_result(
        &self,
        participant_id: &str,
        exam: &ExamKey,
    ) -> Result<Option<ScoringResult>, StoreError>;

    /// Inserts a result and its details. Fails with `UniqueViolation` when a
    /// result already exists for the same participant and exam.
    async fn insert_result(
        &self,
        new: &NewScoringResult,
        details: &[AnswerDetail],
    ) -> Result<InsertedResult, StoreError>;

    async fn result_by_id(&self, id: i64) -> Result<Option<ScoringResult>, StoreError>;

    /// Newest first.
    async fn results_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ScoringResult>, StoreError>;

    async fn answer_details(&self, result_id: i64) -> Result<Vec<AnswerDetail>, StoreError>;

    /// Removes a result together with its details. Returns whether it existed.
    async fn delete_result(&self, id: i64) -> Result<bool, StoreError>;

    /// Ordered by creation time, then id.
    async fn query_cohort(&self, query: &CohortQuery) -> Result<Vec<ScoringResult>, StoreError>;

    async fn settings(
        &self,
        subject: &str,
        exam_round: i32,
    ) -> Result<Option<SubjectSettings>, StoreError>;

    async fn upsert_settings(&self, settings: &SubjectSettings)
    -> Result<SubjectSettings, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn result(code: Option<&str>) -> ScoringResult {
        ScoringResult {
            id: 1,
            participant_id: "p".to_string(),
            participant_code: code.map(str::to_string),
            exam_name: "SUMMIT".to_string(),
            exam_round: 2,
            subject: "tax_law".to_string(),
            correct_count: 20,
            total_questions: 40,
            score_percentage: 50,
            created_at: Utc.with_ymd_and_hms(2025, 3, 5, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_cohort_query_matches() {
        let query = CohortQuery::new("tax_law", 2);
        assert!(query.matches(&result(None)));
        assert!(!CohortQuery::new("tax_law", 1).matches(&result(None)));
        assert!(!CohortQuery::new("civil_law", 2).matches(&result(None)));
    }

    #[test]
    fn test_cohort_query_prefix() {
        let query = CohortQuery::new("tax_law", 2).with_prefix(Some("S2"));
        assert!(query.matches(&result(Some("S20001"))));
        assert!(!query.matches(&result(Some("S10001"))));
        assert!(!query.matches(&result(None)));

        let blank = CohortQuery::new("tax_law", 2).with_prefix(Some("  "));
        assert!(blank.participant_prefix.is_none());
    }

    #[test]
    fn test_cohort_query_window() {
        let at = result(None).created_at;
        let inside = TimeWindow {
            start: at - TimeDelta::days(1),
            end: at,
        };
        let outside = TimeWindow {
            start: at + TimeDelta::seconds(1),
            end: at + TimeDelta::days(1),
        };
        assert!(CohortQuery::new("tax_law", 2).within(Some(inside)).matches(&result(None)));
        assert!(!CohortQuery::new("tax_law", 2).within(Some(outside)).matches(&result(None)));

        // A result stored in the final second of a window, after its whole-second end
        let mut late = result(None);
        late.created_at = at + TimeDelta::milliseconds(999);
        assert!(CohortQuery::new("tax_law", 2).within(Some(inside)).matches(&late));
    }
}
