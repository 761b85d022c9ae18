// src/scoring/engine.rs

use std::fmt;

use crate::models::{answer_key::AnswerKeyEntry, scoring_result::AnswerDetail};
use crate::scoring::{answer::AnswerError, answer::AnswerVector, round_half_up_percent};

/// Result of comparing one answer vector against one answer key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringOutput {
    pub correct_count: i32,
    pub total_questions: i32,
    pub score_percentage: i32,
    /// One entry per key row, ordered by question number.
    pub details: Vec<AnswerDetail>,
}

impl ScoringOutput {
    pub fn wrong_questions(&self) -> impl Iterator<Item = &AnswerDetail> {
        self.details.iter().filter(|d| !d.is_correct)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    /// No answer key has been published for the exam yet.
    NotConfigured,
    Answer(AnswerError),
}

impl fmt::Display for ScoringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringError::NotConfigured => write!(f, "answer key not yet published"),
            ScoringError::Answer(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ScoringError {}

impl From<AnswerError> for ScoringError {
    fn from(err: AnswerError) -> Self {
        ScoringError::Answer(err)
    }
}

/// Scores `answers` against `key`. Pure; persisting the outcome is a separate step.
///
/// * Key rows are compared in question order.
/// * Questions beyond the end of the vector count as unanswered (0), which never
///   matches a real key value.
/// * `score_percentage` is `correct / total * 100` rounded half-up.
pub fn score(answers: &AnswerVector, key: &[AnswerKeyEntry]) -> Result<ScoringOutput, ScoringError> {
    if key.is_empty() {
        return Err(ScoringError::NotConfigured);
    }

    let mut ordered = key.to_vec();
    ordered.sort_by_key(|entry| entry.question_number);

    let details: Vec<AnswerDetail> = ordered
        .iter()
        .map(|entry| {
            let user_answer = usize::try_from(entry.question_number)
                .map(|q| answers.get(q))
                .unwrap_or(0) as i16;
            AnswerDetail {
                question_number: entry.question_number,
                user_answer,
                correct_answer: entry.correct_answer,
                is_correct: user_answer != 0 && user_answer == entry.correct_answer,
            }
        })
        .collect();

    let correct_count = details.iter().filter(|d| d.is_correct).count() as i32;
    let total_questions = details.len() as i32;

    Ok(ScoringOutput {
        correct_count,
        total_questions,
        score_percentage: round_half_up_percent(correct_count as i64, total_questions as i64),
        details,
    })
}

/// Highest question number in a key; the size of the form to parse against.
pub fn question_count(key: &[AnswerKeyEntry]) -> usize {
    key.iter()
        .map(|entry| entry.question_number.max(0) as usize)
        .max()
        .unwrap_or(0)
}
