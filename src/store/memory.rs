// src/store/memory.rs

use std::collections::HashMap;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{
    answer_key::AnswerKeyEntry,
    scoring_result::{AnswerDetail, ExamKey, NewScoringResult, ScoringResult},
    settings::SubjectSettings,
};
use crate::store::{CohortQuery, InsertedResult, ScoringStore, StoreError};

type ResultKey = (String, ExamKey);

#[derive(Default)]
struct Inner {
    answer_keys: HashMap<ExamKey, Vec<AnswerKeyEntry>>,
    /// Insertion order doubles as creation order.
    results: Vec<ScoringResult>,
    /// Unique index over (participant, exam).
    result_index: HashMap<ResultKey, i64>,
    details: HashMap<i64, Vec<AnswerDetail>>,
    settings: HashMap<(String, i32), SubjectSettings>,
    next_id: i64,
}

/// In-process store with the same uniqueness rules as `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    #[cfg(test)]
    fail_details: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: makes every following detail-row write fail, leaving parents intact.
    #[cfg(test)]
    pub fn set_fail_details(&self, fail: bool) {
        self.fail_details.store(fail, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn details_rejected(&self) -> bool {
        self.fail_details.load(Ordering::SeqCst)
    }

    #[cfg(not(test))]
    fn details_rejected(&self) -> bool {
        false
    }
}

#[async_trait]
impl ScoringStore for MemoryStore {
    async fn answer_key(&self, exam: &ExamKey) -> Result<Vec<AnswerKeyEntry>, StoreError> {
        let inner = self.inner.read().await;
        let mut entries = inner.answer_keys.get(exam).cloned().unwrap_or_default();
        entries.sort_by_key(|e| e.question_number);
        Ok(entries)
    }

    async fn publish_answer_key(
        &self,
        exam: &ExamKey,
        entries: &[AnswerKeyEntry],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.answer_keys.contains_key(exam) {
            return Err(StoreError::UniqueViolation(format!("answer key for {exam}")));
        }
        inner.answer_keys.insert(exam.clone(), entries.to_vec());
        Ok(())
    }

    async fn find_result(
        &self,
        participant_id: &str,
        exam: &ExamKey,
    ) -> Result<Option<ScoringResult>, StoreError> {
        let inner = self.inner.read().await;
        let key = (participant_id.to_string(), exam.clone());
        Ok(inner
            .result_index
            .get(&key)
            .and_then(|id| inner.results.iter().find(|r| r.id == *id))
            .cloned())
    }

    async fn insert_result(
        &self,
        new: &NewScoringResult,
        details: &[AnswerDetail],
    ) -> Result<InsertedResult, StoreError> {
        let mut inner = self.inner.write().await;
        let key = (new.participant_id.clone(), new.exam.clone());
        if inner.result_index.contains_key(&key) {
            return Err(StoreError::UniqueViolation(
                "scoring_results_participant_exam_key".to_string(),
            ));
        }

        inner.next_id += 1;
        let result = ScoringResult {
            id: inner.next_id,
            participant_id: new.participant_id.clone(),
            participant_code: new.participant_code.clone(),
            exam_name: new.exam.exam_name.clone(),
            exam_round: new.exam.exam_round,
            subject: new.exam.subject.clone(),
            correct_count: new.correct_count,
            total_questions: new.total_questions,
            score_percentage: new.score_percentage,
            created_at: Utc::now(),
        };
        inner.result_index.insert(key, result.id);
        inner.results.push(result.clone());

        let details_error = if self.details_rejected() {
            Some("detail rows rejected".to_string())
        } else {
            inner.details.insert(result.id, details.to_vec());
            None
        };

        Ok(InsertedResult {
            result,
            details_error,
        })
    }

    async fn result_by_id(&self, id: i64) -> Result<Option<ScoringResult>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.results.iter().find(|r| r.id == id).cloned())
    }

    async fn results_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ScoringResult>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .results
            .iter()
            .rev()
            .filter(|r| r.participant_id == participant_id)
            .cloned()
            .collect())
    }

    async fn answer_details(&self, result_id: i64) -> Result<Vec<AnswerDetail>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.details.get(&result_id).cloned().unwrap_or_default())
    }

    async fn delete_result(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(pos) = inner.results.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let removed = inner.results.remove(pos);
        inner.result_index.remove(&(
            removed.participant_id,
            ExamKey {
                exam_name: removed.exam_name,
                exam_round: removed.exam_round,
                subject: removed.subject,
            },
        ));
        inner.details.remove(&id);
        Ok(true)
    }

    async fn query_cohort(&self, query: &CohortQuery) -> Result<Vec<ScoringResult>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .results
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    async fn settings(
        &self,
        subject: &str,
        exam_round: i32,
    ) -> Result<Option<SubjectSettings>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .settings
            .get(&(subject.to_string(), exam_round))
            .cloned())
    }

    async fn upsert_settings(
        &self,
        settings: &SubjectSettings,
    ) -> Result<SubjectSettings, StoreError> {
        let mut inner = self.inner.write().await;
        inner.settings.insert(
            (settings.subject.clone(), settings.exam_round),
            settings.clone(),
        );
        Ok(settings.clone())
    }
}
