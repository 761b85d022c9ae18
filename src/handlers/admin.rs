// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::statistics::check_subject,
    models::{
        answer_key::PublishAnswerKeyRequest,
        scoring_result::ExamKey,
        settings::{ReleaseRequest, UpdateSettingsRequest},
        statistics::StatisticsQuery,
    },
    scoring::tier::TierCutoffs,
    services::{settings, statistics::compute_statistics},
    store::{SharedStore, StoreError},
};

/// Publishes the answer key for an exam. Keys are write-once.
/// Admin only.
pub async fn publish_answer_key(
    State(store): State<SharedStore>,
    Json(payload): Json<PublishAnswerKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let entries = payload.entries();
    store
        .publish_answer_key(&payload.exam, &entries)
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => AppError::Conflict(format!(
                "Answer key for {} is already published",
                payload.exam
            )),
            other => {
                tracing::error!("Failed to publish answer key for {}: {}", payload.exam, other);
                other.into()
            }
        })?;

    tracing::info!(
        "Published answer key for {} ({} questions)",
        payload.exam,
        entries.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "exam": payload.exam,
            "total_questions": entries.len(),
        })),
    ))
}

/// Reads a published answer key.
/// Admin only.
pub async fn get_answer_key(
    State(store): State<SharedStore>,
    Query(exam): Query<ExamKey>,
) -> Result<impl IntoResponse, AppError> {
    exam.validate()?;

    let entries = store.answer_key(&exam).await?;
    if entries.is_empty() {
        return Err(AppError::NotFound(format!("No answer key published for {exam}")));
    }

    Ok(Json(entries))
}

/// Current release flag and cutoffs, defaults included.
/// Admin only.
pub async fn get_settings(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    Path((subject, exam_round)): Path<(String, i32)>,
) -> Result<impl IntoResponse, AppError> {
    check_subject(&subject)?;

    let settings =
        settings::load_settings(store.as_ref(), &subject, exam_round, config.default_cutoffs)
            .await?;
    Ok(Json(settings))
}

/// Updates cutoffs and the expected release time.
/// Admin only.
pub async fn update_settings(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    Path((subject, exam_round)): Path<(String, i32)>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_subject(&subject)?;
    payload.validate()?;

    let saved = settings::update_settings(
        store.as_ref(),
        &subject,
        exam_round,
        &payload,
        config.default_cutoffs,
    )
    .await?;
    Ok(Json(saved))
}

/// Opens or closes the release gate.
/// Admin only.
pub async fn set_release(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    Path((subject, exam_round)): Path<(String, i32)>,
    Json(payload): Json<ReleaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_subject(&subject)?;
    payload.validate()?;

    let cutoffs = match (payload.safe_cutoff, payload.competitive_cutoff) {
        (Some(safe), Some(competitive)) => Some(TierCutoffs { safe, competitive }),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "safe_cutoff and competitive_cutoff must be given together".to_string(),
            ));
        }
    };

    let saved = settings::set_released(
        store.as_ref(),
        &subject,
        exam_round,
        payload.released,
        cutoffs,
        config.default_cutoffs,
        Utc::now(),
    )
    .await?;
    Ok(Json(saved))
}

/// Full statistics regardless of the release gate, including every ranked entry.
/// Admin only.
pub async fn preview_statistics(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    Path((subject, exam_round)): Path<(String, i32)>,
    Query(params): Query<StatisticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    check_subject(&subject)?;

    let view = compute_statistics(
        store.as_ref(),
        &subject,
        exam_round,
        &params,
        config.default_cutoffs,
        config.report_offset(),
    )
    .await?;

    let released = view.settings.is_released;
    let cutoffs = view.statistics.cutoffs;
    let ranked: Vec<serde_json::Value> = view
        .statistics
        .ranked
        .iter()
        .map(|entry| {
            serde_json::json!({
                "rank": entry.rank,
                "percentile": entry.percentile,
                "tier": cutoffs.classify(entry.result.correct_count),
                "result_id": entry.result.id,
                "participant_id": entry.result.participant_id,
                "participant_code": entry.result.participant_code,
                "correct_count": entry.result.correct_count,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "is_released": released,
        "statistics": view.into_response(None),
        "ranked": ranked,
    })))
}

/// Deletes a result and its answer details so the participant may submit again.
/// Admin only.
pub async fn delete_result(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.delete_result(id).await? {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    tracing::info!("Deleted scoring result {}", id);
    Ok(StatusCode::NO_CONTENT)
}
