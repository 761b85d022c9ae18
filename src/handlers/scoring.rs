// src/handlers/scoring.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::scoring_result::{
        FormCheckRequest, FormCheckResponse, ScoreRequest, ScoreResponse, SubmissionResponse,
        WrongQuestion,
    },
    scoring::{engine::ScoringOutput, tier::TierCutoffs},
    services::{
        settings::load_settings,
        submission::{check_form, score_form, submit_result},
    },
    store::SharedStore,
    utils::jwt::Claims,
};

fn score_response(req: ScoreRequest, output: ScoringOutput, cutoffs: &TierCutoffs) -> ScoreResponse {
    ScoreResponse {
        exam: req.exam,
        correct_count: output.correct_count,
        total_questions: output.total_questions,
        score_percentage: output.score_percentage,
        tier: cutoffs.classify(output.correct_count),
        details: output.details,
    }
}

/// Strips invalid characters from a partially filled form and lists the
/// groups still missing answers. Scoring is only offered once `state` is `ready`.
pub async fn check_form_state(
    State(store): State<SharedStore>,
    Json(req): Json<FormCheckRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let check = check_form(store.as_ref(), &req.exam, &req.groups).await?;
    Ok(Json(FormCheckResponse {
        total_questions: check.total_questions,
        groups: check.groups,
        state: check.state,
    }))
}

/// Scores a filled OMR form without recording anything.
///
/// Can be called any number of times; used to re-check right and wrong
/// answers after the canonical result has been recorded.
pub async fn preview_score(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    Json(req): Json<ScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let output = score_form(store.as_ref(), &req.exam, &req.groups).await?;
    let settings = load_settings(
        store.as_ref(),
        &req.exam.subject,
        req.exam.exam_round,
        config.default_cutoffs,
    )
    .await?;

    Ok(Json(score_response(req, output, &settings.cutoffs())))
}

/// Scores a form and records it as the caller's result if none exists yet.
///
/// * 201 Created when this submission became the canonical result.
/// * 200 OK with `persisted: false` when an earlier result is kept. The
///   freshly computed score is still returned under `current`.
pub async fn submit_score(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ScoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let participant = claims.participant();
    participant.validate()?;
    let output = score_form(store.as_ref(), &req.exam, &req.groups).await?;
    let submission = submit_result(store.as_ref(), &participant, &req.exam, &output).await?;

    let cutoffs = load_settings(
        store.as_ref(),
        &req.exam.subject,
        req.exam.exam_round,
        config.default_cutoffs,
    )
    .await?
    .cutoffs();

    let status = if submission.persisted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(SubmissionResponse {
            persisted: submission.persisted,
            status: if submission.persisted {
                "recorded"
            } else {
                "already_recorded"
            },
            canonical_tier: cutoffs.classify(submission.canonical.correct_count),
            canonical: submission.canonical,
            current: score_response(req, output, &cutoffs),
        }),
    ))
}

/// Lists the caller's canonical results, newest first.
pub async fn list_my_results(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results = store.results_for_participant(&claims.sub).await?;
    Ok(Json(results))
}

/// Wrongly answered questions of one of the caller's results.
/// Admins may read any result.
pub async fn wrong_questions(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = store
        .result_by_id(id)
        .await?
        .filter(|r| r.participant_id == claims.sub || claims.is_admin())
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    let wrong: Vec<WrongQuestion> = store
        .answer_details(result.id)
        .await?
        .into_iter()
        .filter(|d| !d.is_correct)
        .map(WrongQuestion::from)
        .collect();

    Ok(Json(wrong))
}
