// src/handlers/statistics.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    config::Config,
    error::AppError,
    models::{
        statistics::{StatisticsQuery, WeeksResponse},
        validate_subject,
    },
    scoring::release::{Gated, ReleaseGate},
    services::{
        settings::load_settings,
        statistics::{list_weeks, public_statistics},
    },
    store::SharedStore,
    utils::jwt::Claims,
};

pub(crate) fn check_subject(subject: &str) -> Result<(), AppError> {
    validate_subject(subject)
        .map_err(|_| AppError::BadRequest(format!("Invalid subject '{subject}'")))
}

/// Summary, leaderboard and the caller's standing for one (subject, round).
///
/// Returns `status: "not_released"` with the expected release time until an
/// administrator opens the release gate.
pub async fn get_statistics(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path((subject, exam_round)): Path<(String, i32)>,
    Query(params): Query<StatisticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    check_subject(&subject)?;

    let gated = public_statistics(
        store.as_ref(),
        &subject,
        exam_round,
        &params,
        &claims.sub,
        config.default_cutoffs,
        config.report_offset(),
    )
    .await?;

    Ok(Json(gated))
}

/// Week windows available for the weekly statistics filter. Gated like the statistics.
pub async fn get_weeks(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    Path((subject, exam_round)): Path<(String, i32)>,
    Query(params): Query<StatisticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    check_subject(&subject)?;

    let settings =
        load_settings(store.as_ref(), &subject, exam_round, config.default_cutoffs).await?;
    if let Err(pending) = ReleaseGate::new(&settings, config.report_offset()).check() {
        return Ok(Json(Gated::NotReleased(pending)));
    }

    let weeks = list_weeks(
        store.as_ref(),
        &subject,
        exam_round,
        params.prefix.as_deref(),
        config.report_offset(),
    )
    .await?;

    Ok(Json(Gated::Released(WeeksResponse {
        subject,
        exam_round,
        weeks,
    })))
}
