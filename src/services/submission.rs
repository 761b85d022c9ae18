// src/services/submission.rs

use crate::{
    error::AppError,
    models::scoring_result::{ExamKey, NewScoringResult, Participant, ScoringResult},
    models::answer_key::AnswerKeyEntry,
    scoring::{
        answer::{FormState, form_state, group_ranges, parse_answer_vector, sanitize_group},
        engine::{ScoringError, ScoringOutput, question_count, score},
    },
    store::{ScoringStore, StoreError},
};

/// Outcome of `submit_result`.
#[derive(Debug, Clone)]
pub struct Submission {
    /// False when an earlier result already held the slot.
    pub persisted: bool,
    /// The first stored result for this participant and exam.
    pub canonical: ScoringResult,
}

/// Cleaned-up input and completeness of a form that is still being filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormCheck {
    pub total_questions: usize,
    /// One entry per expected group, stripped of invalid characters.
    pub groups: Vec<String>,
    pub state: FormState,
}

async fn published_key(
    store: &dyn ScoringStore,
    exam: &ExamKey,
) -> Result<Vec<AnswerKeyEntry>, AppError> {
    let key = store.answer_key(exam).await?;
    if key.is_empty() {
        tracing::info!("Scoring requested for unpublished answer key: {}", exam);
        return Err(ScoringError::NotConfigured.into());
    }
    Ok(key)
}

/// Sanitizes the groups typed so far and reports whether the form is ready.
/// Missing groups come back empty.
pub async fn check_form(
    store: &dyn ScoringStore,
    exam: &ExamKey,
    groups: &[String],
) -> Result<FormCheck, AppError> {
    let key = published_key(store, exam).await?;
    let total_questions = question_count(&key);

    let groups: Vec<String> = group_ranges(total_questions)
        .into_iter()
        .enumerate()
        .map(|(idx, range)| sanitize_group(groups.get(idx).map_or("", String::as_str), range))
        .collect();
    let state = form_state(&groups, total_questions);

    Ok(FormCheck {
        total_questions,
        groups,
        state,
    })
}

/// Loads the answer key, parses the grouped answers against it and scores them.
/// Nothing is written.
pub async fn score_form(
    store: &dyn ScoringStore,
    exam: &ExamKey,
    groups: &[String],
) -> Result<ScoringOutput, AppError> {
    let key = published_key(store, exam).await?;
    let answers = parse_answer_vector(groups, question_count(&key))?;
    Ok(score(&answers, &key)?)
}

/// Stores `output` as the participant's canonical result unless one exists.
///
/// The lookup is a fast path only; the store's uniqueness guard decides races,
/// and a rejected duplicate is reported like an existing result. A failure to
/// write the per-question rows after the parent succeeded is logged and the
/// parent is still returned as canonical.
pub async fn submit_result(
    store: &dyn ScoringStore,
    participant: &Participant,
    exam: &ExamKey,
    output: &ScoringOutput,
) -> Result<Submission, AppError> {
    if let Some(existing) = store.find_result(&participant.id, exam).await? {
        tracing::info!(
            "Result {} already recorded for participant {} on {}",
            existing.id,
            participant.id,
            exam
        );
        return Ok(Submission {
            persisted: false,
            canonical: existing,
        });
    }

    let new = NewScoringResult {
        participant_id: participant.id.clone(),
        participant_code: participant.exam_number.clone(),
        exam: exam.clone(),
        correct_count: output.correct_count,
        total_questions: output.total_questions,
        score_percentage: output.score_percentage,
    };

    match store.insert_result(&new, &output.details).await {
        Ok(inserted) => {
            if let Some(err) = &inserted.details_error {
                tracing::warn!(
                    "Result {} for participant {} on {} stored without answer details: {}",
                    inserted.result.id,
                    participant.id,
                    exam,
                    err
                );
            }
            Ok(Submission {
                persisted: true,
                canonical: inserted.result,
            })
        }
        Err(StoreError::UniqueViolation(_)) => {
            let existing = store
                .find_result(&participant.id, exam)
                .await?
                .ok_or_else(|| {
                    AppError::InternalServerError(format!(
                        "Duplicate result reported for participant {} on {} but none found",
                        participant.id, exam
                    ))
                })?;
            tracing::info!(
                "Concurrent submission for participant {} on {} resolved to result {}",
                participant.id,
                exam,
                existing.id
            );
            Ok(Submission {
                persisted: false,
                canonical: existing,
            })
        }
        Err(err) => {
            tracing::error!(
                "Failed to store result for participant {} on {}: {}",
                participant.id,
                exam,
                err
            );
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CohortQuery, MemoryStore};

    fn exam() -> ExamKey {
        ExamKey {
            exam_name: "SUMMIT".to_string(),
            exam_round: 1,
            subject: "financial_accounting".to_string(),
        }
    }

    fn participant(id: &str) -> Participant {
        Participant {
            id: id.to_string(),
            exam_number: Some("S1001".to_string()),
        }
    }

    async fn keyed_store() -> MemoryStore {
        let store = MemoryStore::new();
        let entries: Vec<AnswerKeyEntry> = (1..=7)
            .map(|q| AnswerKeyEntry {
                question_number: q,
                correct_answer: 3,
            })
            .collect();
        store.publish_answer_key(&exam(), &entries).await.unwrap();
        store
    }

    fn groups(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_score_form_parses_against_key_length() {
        let store = keyed_store().await;
        let output = score_form(&store, &exam(), &groups(&["33330", "31"])).await.unwrap();
        assert_eq!(output.correct_count, 5);
        assert_eq!(output.total_questions, 7);
        assert_eq!(output.score_percentage, 71);

        let err = score_form(&store, &exam(), &groups(&["33333", "3"])).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_check_form_sanitizes_and_reports_unfilled() {
        let store = keyed_store().await;
        let check = check_form(&store, &exam(), &groups(&["3a3 6330"])).await.unwrap();
        assert_eq!(check.total_questions, 7);
        assert_eq!(check.groups, groups(&["33330", ""]));
        assert_eq!(
            check.state,
            FormState::Incomplete {
                unfilled_groups: vec![2]
            }
        );

        let check = check_form(&store, &exam(), &groups(&["33330", "3129"])).await.unwrap();
        assert_eq!(check.groups, groups(&["33330", "31"]));
        assert_eq!(check.state, FormState::Ready);
    }

    #[tokio::test]
    async fn test_score_form_without_key_is_not_configured() {
        let store = MemoryStore::new();
        let err = score_form(&store, &exam(), &groups(&["33333"])).await.unwrap_err();
        assert!(matches!(err, AppError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_first_submission_wins() {
        let store = keyed_store().await;
        let first = score_form(&store, &exam(), &groups(&["33000", "00"])).await.unwrap();
        let second = score_form(&store, &exam(), &groups(&["33333", "33"])).await.unwrap();

        let stored = submit_result(&store, &participant("a"), &exam(), &first).await.unwrap();
        assert!(stored.persisted);
        assert_eq!(stored.canonical.correct_count, 2);
        assert_eq!(stored.canonical.participant_code.as_deref(), Some("S1001"));

        let again = submit_result(&store, &participant("a"), &exam(), &second).await.unwrap();
        assert!(!again.persisted);
        assert_eq!(again.canonical.id, stored.canonical.id);
        assert_eq!(again.canonical.correct_count, 2);

        let cohort = store
            .query_cohort(&CohortQuery::new("financial_accounting", 1))
            .await
            .unwrap();
        assert_eq!(cohort.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_store_one_result() {
        let store = std::sync::Arc::new(keyed_store().await);
        let output = score_form(store.as_ref(), &exam(), &groups(&["33333", "33"]))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let output = output.clone();
            handles.push(tokio::spawn(async move {
                submit_result(store.as_ref(), &participant("a"), &exam(), &output)
                    .await
                    .unwrap()
            }));
        }

        let mut persisted = 0;
        for handle in handles {
            if handle.await.unwrap().persisted {
                persisted += 1;
            }
        }
        assert_eq!(persisted, 1);
        assert_eq!(store.results_for_participant("a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_detail_failure_keeps_canonical_parent() {
        let store = keyed_store().await;
        store.set_fail_details(true);
        let output = score_form(&store, &exam(), &groups(&["33333", "33"])).await.unwrap();

        let submission = submit_result(&store, &participant("a"), &exam(), &output).await.unwrap();
        assert!(submission.persisted);
        assert_eq!(submission.canonical.correct_count, 7);
        assert!(store.answer_details(submission.canonical.id).await.unwrap().is_empty());
    }
}
