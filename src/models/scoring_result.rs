// src/models/scoring_result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::validate_subject;
use crate::scoring::{answer::FormState, tier::Tier};

/// Identifies one answer key and one scoring form: (exam, round, subject).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct ExamKey {
    #[validate(length(min = 1, max = 50, message = "Exam name length must be between 1 and 50 chars"))]
    pub exam_name: String,
    #[validate(range(min = 1, max = 1000))]
    pub exam_round: i32,
    #[validate(custom(function = validate_subject))]
    pub subject: String,
}

impl std::fmt::Display for ExamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} round {} / {}", self.exam_name, self.exam_round, self.subject)
    }
}

/// The authenticated participant submitting answers.
/// Lengths match the `scoring_results` columns they are stored in.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct Participant {
    /// Stable identity from the identity provider.
    #[validate(length(min = 1, max = 255, message = "Participant id must be 1 to 255 chars"))]
    pub id: String,
    /// Assigned exam number, if any. Drives sub-population filters and display codes.
    #[validate(length(max = 64, message = "Exam number must be at most 64 chars"))]
    pub exam_number: Option<String>,
}

/// Represents the 'scoring_results' table.
/// At most one row exists per (participant_id, exam_name, exam_round, subject).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ScoringResult {
    pub id: i64,
    #[serde(skip_serializing)]
    pub participant_id: String,
    #[serde(skip_serializing)]
    pub participant_code: Option<String>,
    pub exam_name: String,
    pub exam_round: i32,
    pub subject: String,
    pub correct_count: i32,
    pub total_questions: i32,
    pub score_percentage: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A result that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScoringResult {
    pub participant_id: String,
    pub participant_code: Option<String>,
    pub exam: ExamKey,
    pub correct_count: i32,
    pub total_questions: i32,
    pub score_percentage: i32,
}

/// Represents the 'scoring_answers' table: one row per question of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AnswerDetail {
    pub question_number: i32,
    pub user_answer: i16,
    pub correct_answer: i16,
    pub is_correct: bool,
}

/// DTO for scoring a filled OMR form.
#[derive(Debug, Deserialize, Validate)]
pub struct ScoreRequest {
    #[validate(nested)]
    #[serde(flatten)]
    pub exam: ExamKey,

    /// Answer groups of five questions each, digits '0'-'5'.
    #[validate(length(min = 1, max = 40, message = "Between 1 and 40 answer groups are required"))]
    pub groups: Vec<String>,
}

/// DTO for checking a form while it is being filled in. Groups may be partial.
#[derive(Debug, Deserialize, Validate)]
pub struct FormCheckRequest {
    #[validate(nested)]
    #[serde(flatten)]
    pub exam: ExamKey,

    #[serde(default)]
    #[validate(length(max = 40, message = "At most 40 answer groups are accepted"))]
    pub groups: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FormCheckResponse {
    pub total_questions: usize,
    pub groups: Vec<String>,
    #[serde(flatten)]
    pub state: FormState,
}

/// Freshly computed score for the submitted form.
#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub exam: ExamKey,
    pub correct_count: i32,
    pub total_questions: i32,
    pub score_percentage: i32,
    pub tier: Tier,
    pub details: Vec<AnswerDetail>,
}

/// Response for a submission. `canonical` is the stored first attempt,
/// `current` the attempt just scored.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub persisted: bool,
    /// `recorded` on first submission, `already_recorded` afterwards.
    pub status: &'static str,
    pub canonical: ScoringResult,
    pub canonical_tier: Tier,
    pub current: ScoreResponse,
}

/// A wrongly answered question of a stored result.
#[derive(Debug, Serialize)]
pub struct WrongQuestion {
    pub question_number: i32,
    pub user_answer: i16,
    pub correct_answer: i16,
}

impl From<AnswerDetail> for WrongQuestion {
    fn from(detail: AnswerDetail) -> Self {
        Self {
            question_number: detail.question_number,
            user_answer: detail.user_answer,
            correct_answer: detail.correct_answer,
        }
    }
}
