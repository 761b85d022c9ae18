// src/models/answer_key.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::MAX_OPTION;
use crate::models::scoring_result::ExamKey;

/// One row of the 'exam_answer_keys' table, projected to what scoring needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AnswerKeyEntry {
    pub question_number: i32,
    /// Correct option, 1 to 5.
    pub correct_answer: i16,
}

/// DTO for publishing an answer key. Admin only.
#[derive(Debug, Deserialize, Validate)]
pub struct PublishAnswerKeyRequest {
    #[validate(nested)]
    #[serde(flatten)]
    pub exam: ExamKey,

    /// Correct options in question order: `answers[0]` is question 1.
    #[validate(custom(function = validate_key_answers))]
    pub answers: Vec<i16>,
}

impl PublishAnswerKeyRequest {
    pub fn entries(&self) -> Vec<AnswerKeyEntry> {
        self.answers
            .iter()
            .enumerate()
            .map(|(idx, &correct_answer)| AnswerKeyEntry {
                question_number: idx as i32 + 1,
                correct_answer,
            })
            .collect()
    }
}

fn validate_key_answers(answers: &[i16]) -> Result<(), validator::ValidationError> {
    if answers.is_empty() || answers.len() > 200 {
        return Err(validator::ValidationError::new("answer_key_length"));
    }
    if answers
        .iter()
        .any(|a| !(1..=MAX_OPTION as i16).contains(a))
    {
        return Err(validator::ValidationError::new("answer_key_option_out_of_range"));
    }
    Ok(())
}
