// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::{
    answer_key::AnswerKeyEntry,
    scoring_result::{AnswerDetail, ExamKey, NewScoringResult, ScoringResult},
    settings::SubjectSettings,
};
use crate::store::{CohortQuery, InsertedResult, ScoringStore, StoreError};

const RESULT_COLUMNS: &str = "id, participant_id, participant_code, exam_name, exam_round, \
     subject, correct_count, total_questions, score_percentage, created_at";

const SETTINGS_COLUMNS: &str = "subject, exam_round, is_released, released_at, \
     expected_release_at, safe_cutoff, competitive_cutoff";

/// PostgreSQL-backed store. The compound unique constraint on
/// `scoring_results` is the authoritative first-write-wins guard.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn insert_details(&self, result_id: i64, details: &[AnswerDetail]) -> Result<(), sqlx::Error> {
        if details.is_empty() {
            return Ok(());
        }

        let mut query_builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO scoring_answers (result_id, question_number, user_answer, correct_answer, is_correct) ",
        );
        query_builder.push_values(details, |mut row, detail| {
            row.push_bind(result_id)
                .push_bind(detail.question_number)
                .push_bind(detail.user_answer)
                .push_bind(detail.correct_answer)
                .push_bind(detail.is_correct);
        });

        query_builder.build().execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ScoringStore for PgStore {
    async fn answer_key(&self, exam: &ExamKey) -> Result<Vec<AnswerKeyEntry>, StoreError> {
        let rows = sqlx::query_as::<_, AnswerKeyEntry>(
            r#"
            SELECT question_number, correct_answer
            FROM exam_answer_keys
            WHERE exam_name = $1 AND exam_round = $2 AND subject = $3
            ORDER BY question_number
            "#,
        )
        .bind(&exam.exam_name)
        .bind(exam.exam_round)
        .bind(&exam.subject)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch answer key for {}: {:?}", exam, e);
            StoreError::from(e)
        })?;

        Ok(rows)
    }

    async fn publish_answer_key(
        &self,
        exam: &ExamKey,
        entries: &[AnswerKeyEntry],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM exam_answer_keys WHERE exam_name = $1 AND exam_round = $2 AND subject = $3",
        )
        .bind(&exam.exam_name)
        .bind(exam.exam_round)
        .bind(&exam.subject)
        .fetch_one(&mut *tx)
        .await?;

        if existing > 0 {
            return Err(StoreError::UniqueViolation(format!("answer key for {exam}")));
        }

        let mut query_builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO exam_answer_keys (exam_name, exam_round, subject, question_number, correct_answer) ",
        );
        query_builder.push_values(entries, |mut row, entry| {
            row.push_bind(&exam.exam_name)
                .push_bind(exam.exam_round)
                .push_bind(&exam.subject)
                .push_bind(entry.question_number)
                .push_bind(entry.correct_answer);
        });

        query_builder.build().execute(&mut *tx).await.map_err(|e| match StoreError::from(e) {
            StoreError::UniqueViolation(_) => {
                StoreError::UniqueViolation(format!("answer key for {exam}"))
            }
            other => other,
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_result(
        &self,
        participant_id: &str,
        exam: &ExamKey,
    ) -> Result<Option<ScoringResult>, StoreError> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM scoring_results \
             WHERE participant_id = $1 AND exam_name = $2 AND exam_round = $3 AND subject = $4"
        );
        let row = sqlx::query_as::<_, ScoringResult>(&sql)
            .bind(participant_id)
            .bind(&exam.exam_name)
            .bind(exam.exam_round)
            .bind(&exam.subject)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn insert_result(
        &self,
        new: &NewScoringResult,
        details: &[AnswerDetail],
    ) -> Result<InsertedResult, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO scoring_results
                (participant_id, participant_code, exam_name, exam_round, subject,
                 correct_count, total_questions, score_percentage)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RESULT_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ScoringResult>(&sql)
            .bind(&new.participant_id)
            .bind(&new.participant_code)
            .bind(&new.exam.exam_name)
            .bind(new.exam.exam_round)
            .bind(&new.exam.subject)
            .bind(new.correct_count)
            .bind(new.total_questions)
            .bind(new.score_percentage)
            .fetch_one(&self.pool)
            .await?;

        // The parent row stays canonical even if the detail rows fail.
        let details_error = self
            .insert_details(result.id, details)
            .await
            .err()
            .map(|e| e.to_string());

        Ok(InsertedResult {
            result,
            details_error,
        })
    }

    async fn result_by_id(&self, id: i64) -> Result<Option<ScoringResult>, StoreError> {
        let sql = format!("SELECT {RESULT_COLUMNS} FROM scoring_results WHERE id = $1");
        let row = sqlx::query_as::<_, ScoringResult>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn results_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ScoringResult>, StoreError> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM scoring_results \
             WHERE participant_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ScoringResult>(&sql)
            .bind(participant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn answer_details(&self, result_id: i64) -> Result<Vec<AnswerDetail>, StoreError> {
        let rows = sqlx::query_as::<_, AnswerDetail>(
            r#"
            SELECT question_number, user_answer, correct_answer, is_correct
            FROM scoring_answers
            WHERE result_id = $1
            ORDER BY question_number
            "#,
        )
        .bind(result_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_result(&self, id: i64) -> Result<bool, StoreError> {
        // scoring_answers rows go with it through ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM scoring_results WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn query_cohort(&self, query: &CohortQuery) -> Result<Vec<ScoringResult>, StoreError> {
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RESULT_COLUMNS} FROM scoring_results WHERE subject = "
        ));
        query_builder.push_bind(&query.subject);
        query_builder.push(" AND exam_round = ");
        query_builder.push_bind(query.exam_round);

        if let Some(window) = &query.window {
            query_builder.push(" AND created_at >= ");
            query_builder.push_bind(window.start);
            query_builder.push(" AND created_at < ");
            query_builder.push_bind(window.until());
        }

        if let Some(prefix) = &query.participant_prefix {
            query_builder.push(" AND starts_with(participant_code, ");
            query_builder.push_bind(prefix);
            query_builder.push(")");
        }

        query_builder.push(" ORDER BY created_at ASC, id ASC");

        let rows = query_builder
            .build_query_as::<ScoringResult>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to load cohort {} round {}: {:?}",
                    query.subject,
                    query.exam_round,
                    e
                );
                StoreError::from(e)
            })?;
        Ok(rows)
    }

    async fn settings(
        &self,
        subject: &str,
        exam_round: i32,
    ) -> Result<Option<SubjectSettings>, StoreError> {
        let sql = format!(
            "SELECT {SETTINGS_COLUMNS} FROM subject_settings WHERE subject = $1 AND exam_round = $2"
        );
        let row = sqlx::query_as::<_, SubjectSettings>(&sql)
            .bind(subject)
            .bind(exam_round)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn upsert_settings(
        &self,
        settings: &SubjectSettings,
    ) -> Result<SubjectSettings, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO subject_settings
                (subject, exam_round, is_released, released_at, expected_release_at,
                 safe_cutoff, competitive_cutoff)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (subject, exam_round) DO UPDATE SET
                is_released = EXCLUDED.is_released,
                released_at = EXCLUDED.released_at,
                expected_release_at = EXCLUDED.expected_release_at,
                safe_cutoff = EXCLUDED.safe_cutoff,
                competitive_cutoff = EXCLUDED.competitive_cutoff,
                updated_at = CURRENT_TIMESTAMP
            RETURNING {SETTINGS_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SubjectSettings>(&sql)
            .bind(&settings.subject)
            .bind(settings.exam_round)
            .bind(settings.is_released)
            .bind(settings.released_at)
            .bind(settings.expected_release_at)
            .bind(settings.safe_cutoff)
            .bind(settings.competitive_cutoff)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to save settings for {} round {}: {:?}",
                    settings.subject,
                    settings.exam_round,
                    e
                );
                StoreError::from(e)
            })?;
        Ok(row)
    }
}
