// src/services/settings.rs

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::settings::{SubjectSettings, UpdateSettingsRequest},
    scoring::tier::TierCutoffs,
    store::ScoringStore,
};

/// Settings snapshot for one (subject, round). Unconfigured pairs are hidden
/// and use `defaults` as cutoffs.
pub async fn load_settings(
    store: &dyn ScoringStore,
    subject: &str,
    exam_round: i32,
    defaults: TierCutoffs,
) -> Result<SubjectSettings, AppError> {
    Ok(store
        .settings(subject, exam_round)
        .await?
        .unwrap_or_else(|| SubjectSettings::with_defaults(subject, exam_round, defaults)))
}

pub async fn is_released(
    store: &dyn ScoringStore,
    subject: &str,
    exam_round: i32,
    defaults: TierCutoffs,
) -> Result<bool, AppError> {
    Ok(load_settings(store, subject, exam_round, defaults)
        .await?
        .is_released)
}

/// Opens or closes the release gate, optionally saving new cutoffs in the same write.
/// Opening stamps `released_at`; closing clears it.
pub async fn set_released(
    store: &dyn ScoringStore,
    subject: &str,
    exam_round: i32,
    released: bool,
    cutoffs: Option<TierCutoffs>,
    defaults: TierCutoffs,
    now: DateTime<Utc>,
) -> Result<SubjectSettings, AppError> {
    let mut settings = load_settings(store, subject, exam_round, defaults).await?;
    if let Some(cutoffs) = cutoffs {
        apply_cutoffs(&mut settings, cutoffs)?;
    }

    if released && !settings.is_released {
        settings.released_at = Some(now);
    } else if !released {
        settings.released_at = None;
    }
    settings.is_released = released;

    let saved = store.upsert_settings(&settings).await?;
    tracing::info!(
        "Release gate for {} round {} set to {}",
        subject,
        exam_round,
        if released { "released" } else { "hidden" }
    );
    Ok(saved)
}

/// Merges an admin update into the stored settings.
pub async fn update_settings(
    store: &dyn ScoringStore,
    subject: &str,
    exam_round: i32,
    update: &UpdateSettingsRequest,
    defaults: TierCutoffs,
) -> Result<SubjectSettings, AppError> {
    let mut settings = load_settings(store, subject, exam_round, defaults).await?;

    let cutoffs = TierCutoffs {
        safe: update.safe_cutoff.unwrap_or(settings.safe_cutoff),
        competitive: update.competitive_cutoff.unwrap_or(settings.competitive_cutoff),
    };
    apply_cutoffs(&mut settings, cutoffs)?;

    if update.expected_release_at.is_some() {
        settings.expected_release_at = update.expected_release_at;
    }

    Ok(store.upsert_settings(&settings).await?)
}

fn apply_cutoffs(settings: &mut SubjectSettings, cutoffs: TierCutoffs) -> Result<(), AppError> {
    if !cutoffs.is_valid() {
        return Err(AppError::BadRequest(format!(
            "Safe cutoff ({}) must be greater than competitive cutoff ({}), and both non-negative",
            cutoffs.safe, cutoffs.competitive
        )));
    }
    settings.safe_cutoff = cutoffs.safe;
    settings.competitive_cutoff = cutoffs.competitive;
    Ok(())
}
