// src/scoring/answer.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ANSWER_GROUP_SIZE, MAX_OPTION};

/// Dense per-question answers, question 1 first. `0` means unanswered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerVector(Vec<u8>);

impl AnswerVector {
    /// Builds a vector from raw values, rejecting anything above `MAX_OPTION`.
    pub fn new(answers: Vec<u8>) -> Result<Self, AnswerError> {
        if let Some((idx, &value)) = answers.iter().enumerate().find(|(_, v)| **v > MAX_OPTION) {
            return Err(AnswerError::OptionOutOfRange {
                question: idx + 1,
                value,
            });
        }
        Ok(Self(answers))
    }

    /// Answer for a 1-based question number. Out-of-range questions read as unanswered.
    pub fn get(&self, question_number: usize) -> u8 {
        question_number
            .checked_sub(1)
            .and_then(|idx| self.0.get(idx))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Inclusive question-number range covered by one answer group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupRange {
    pub start: usize,
    pub end: usize,
}

impl GroupRange {
    /// Number of characters the group must hold to be complete.
    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Splits `1..=total_questions` into groups of `ANSWER_GROUP_SIZE`.
/// The last group is shorter when the total is not a multiple of the group size.
pub fn group_ranges(total_questions: usize) -> Vec<GroupRange> {
    (1..=total_questions)
        .step_by(ANSWER_GROUP_SIZE)
        .map(|start| GroupRange {
            start,
            end: (start + ANSWER_GROUP_SIZE - 1).min(total_questions),
        })
        .collect()
}

/// Input-time filter for one group: drops every character outside `'0'..='5'`
/// and truncates to the group's length.
pub fn sanitize_group(raw: &str, range: GroupRange) -> String {
    raw.chars()
        .filter(|c| is_answer_char(*c))
        .take(range.len())
        .collect()
}

fn is_answer_char(c: char) -> bool {
    c.to_digit(10).is_some_and(|d| d <= MAX_OPTION as u32)
}

/// Whether an answer form may be scored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FormState {
    /// Some groups are missing or short. Holds their 1-based group indexes.
    Incomplete { unfilled_groups: Vec<usize> },
    Ready,
}

/// Reports which groups still need input. Invalid characters are not counted,
/// so a group only becomes complete once it holds exactly its expected digits.
pub fn form_state(groups: &[String], total_questions: usize) -> FormState {
    let unfilled_groups: Vec<usize> = group_ranges(total_questions)
        .iter()
        .enumerate()
        .filter(|(idx, range)| {
            groups
                .get(*idx)
                .map(|g| g.chars().filter(|c| is_answer_char(*c)).count() != range.len())
                .unwrap_or(true)
        })
        .map(|(idx, _)| idx + 1)
        .collect();

    if unfilled_groups.is_empty() && groups.len() == group_ranges(total_questions).len() {
        FormState::Ready
    } else {
        FormState::Incomplete { unfilled_groups }
    }
}

/// Parses grouped answer strings into a dense vector of `total_questions` answers.
///
/// Every group must be present and exactly as long as its question range.
/// Characters outside `'0'..='5'` are rejected rather than reinterpreted.
pub fn parse_answer_vector(
    groups: &[String],
    total_questions: usize,
) -> Result<AnswerVector, AnswerError> {
    let ranges = group_ranges(total_questions);
    if groups.len() != ranges.len() {
        return Err(AnswerError::GroupCount {
            expected: ranges.len(),
            actual: groups.len(),
        });
    }

    let mut answers = Vec::with_capacity(total_questions);
    for (idx, (group, range)) in groups.iter().zip(&ranges).enumerate() {
        let before = answers.len();
        for c in group.chars() {
            if !is_answer_char(c) {
                return Err(AnswerError::InvalidCharacter {
                    group: idx + 1,
                    character: c,
                });
            }
            answers.push(c as u8 - b'0');
        }

        let actual = answers.len() - before;
        if actual != range.len() {
            return Err(AnswerError::GroupLength {
                group: idx + 1,
                expected: range.len(),
                actual,
            });
        }
    }

    Ok(AnswerVector(answers))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerError {
    GroupCount { expected: usize, actual: usize },
    GroupLength { group: usize, expected: usize, actual: usize },
    InvalidCharacter { group: usize, character: char },
    OptionOutOfRange { question: usize, value: u8 },
}

impl fmt::Display for AnswerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerError::GroupCount { expected, actual } => {
                write!(f, "expected {expected} answer groups, got {actual}")
            }
            AnswerError::GroupLength {
                group,
                expected,
                actual,
            } => write!(
                f,
                "answer group {group} must hold {expected} answers, got {actual}"
            ),
            AnswerError::InvalidCharacter { group, character } => write!(
                f,
                "answer group {group} contains '{character}', only digits 0-{MAX_OPTION} are allowed"
            ),
            AnswerError::OptionOutOfRange { question, value } => write!(
                f,
                "question {question} has answer {value}, only 0-{MAX_OPTION} are allowed"
            ),
        }
    }
}

impl std::error::Error for AnswerError {}
