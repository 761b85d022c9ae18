// src/services/statistics.rs

use chrono::FixedOffset;

use crate::{
    error::AppError,
    models::{
        settings::SubjectSettings,
        statistics::{LeaderboardRow, StatisticsQuery, StatisticsResponse, ViewerStanding},
    },
    scoring::{
        ranking::CohortStatistics,
        release::{Gated, ReleaseGate},
        tier::TierCutoffs,
        week::{WeekWindow, select_week, week_windows},
    },
    services::settings::load_settings,
    store::{CohortQuery, ScoringStore},
};

/// Cohort statistics together with the settings and window they were computed under.
#[derive(Debug)]
pub struct CohortView {
    pub settings: SubjectSettings,
    pub window: Option<WeekWindow>,
    pub statistics: CohortStatistics,
}

impl CohortView {
    /// Public shape. Leaderboard rows only reveal masked codes; `viewer_id`
    /// is compared server-side to mark the viewer's own row.
    pub fn into_response(self, viewer_id: Option<&str>) -> StatisticsResponse {
        let viewer = viewer_id
            .and_then(|id| self.statistics.standing_of(id))
            .map(|entry| ViewerStanding {
                rank: entry.rank,
                percentile: entry.percentile,
                correct_count: entry.result.correct_count,
                tier: self.statistics.cutoffs.classify(entry.result.correct_count),
            });

        let leaderboard = self
            .statistics
            .leaderboard
            .into_iter()
            .map(|entry| LeaderboardRow {
                is_viewer: viewer_id == Some(entry.participant_id.as_str()),
                rank: entry.rank,
                display_code: entry.display_code,
                correct_count: entry.correct_count,
            })
            .collect();

        StatisticsResponse {
            subject: self.settings.subject,
            exam_round: self.settings.exam_round,
            cutoffs: self.statistics.cutoffs,
            window: self.window,
            summary: self.statistics.summary,
            leaderboard,
            viewer,
        }
    }
}

/// Week windows over the (optionally prefix-filtered) cohort.
pub async fn list_weeks(
    store: &dyn ScoringStore,
    subject: &str,
    exam_round: i32,
    prefix: Option<&str>,
    offset: FixedOffset,
) -> Result<Vec<WeekWindow>, AppError> {
    let query = CohortQuery::new(subject, exam_round).with_prefix(prefix);
    let timestamps: Vec<_> = store
        .query_cohort(&query)
        .await?
        .iter()
        .map(|r| r.created_at)
        .collect();
    Ok(week_windows(&timestamps, offset))
}

/// Computes statistics regardless of the release gate. Admin preview path.
pub async fn compute_statistics(
    store: &dyn ScoringStore,
    subject: &str,
    exam_round: i32,
    params: &StatisticsQuery,
    defaults: TierCutoffs,
    offset: FixedOffset,
) -> Result<CohortView, AppError> {
    let settings = load_settings(store, subject, exam_round, defaults).await?;
    compute_with_settings(store, settings, params, offset).await
}

/// Statistics for end users: the not-released notice while the gate is closed,
/// without touching cohort data.
pub async fn public_statistics(
    store: &dyn ScoringStore,
    subject: &str,
    exam_round: i32,
    params: &StatisticsQuery,
    viewer_id: &str,
    defaults: TierCutoffs,
    offset: FixedOffset,
) -> Result<Gated<StatisticsResponse>, AppError> {
    let settings = load_settings(store, subject, exam_round, defaults).await?;
    if let Err(pending) = ReleaseGate::new(&settings, offset).check() {
        return Ok(Gated::NotReleased(pending));
    }

    let view = compute_with_settings(store, settings, params, offset).await?;
    Ok(Gated::Released(view.into_response(Some(viewer_id))))
}

async fn compute_with_settings(
    store: &dyn ScoringStore,
    settings: SubjectSettings,
    params: &StatisticsQuery,
    offset: FixedOffset,
) -> Result<CohortView, AppError> {
    let subject = settings.subject.clone();
    let exam_round = settings.exam_round;

    let window = match params.week {
        Some(week) => {
            let weeks =
                list_weeks(store, &subject, exam_round, params.prefix.as_deref(), offset).await?;
            let found = select_week(&weeks, week).ok_or_else(|| {
                AppError::NotFound(format!(
                    "Week {week} has no results for {subject} round {exam_round}"
                ))
            })?;
            Some(found)
        }
        None => None,
    };

    let query = CohortQuery::new(&subject, exam_round)
        .with_prefix(params.prefix.as_deref())
        .within(window.map(|w| w.window));
    let cohort = store.query_cohort(&query).await?;
    tracing::debug!(
        "Computing statistics for {} round {} over {} results",
        subject,
        exam_round,
        cohort.len()
    );

    let statistics = CohortStatistics::compute(cohort, settings.cutoffs());
    Ok(CohortView {
        settings,
        window,
        statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scoring_result::{ExamKey, NewScoringResult};
    use crate::services::settings::set_released;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    async fn seed(store: &MemoryStore, subject: &str, scores: &[i32]) {
        for (idx, &correct_count) in scores.iter().enumerate() {
            let new = NewScoringResult {
                participant_id: format!("p{idx}"),
                participant_code: Some(format!("{}{idx:03}", if idx % 2 == 0 { "A" } else { "B" })),
                exam: ExamKey {
                    exam_name: "SUMMIT".to_string(),
                    exam_round: 2,
                    subject: subject.to_string(),
                },
                correct_count,
                total_questions: 40,
                score_percentage: 0,
            };
            store.insert_result(&new, &[]).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_hidden_gate_hides_existing_data() {
        let store = MemoryStore::new();
        let scores: Vec<i32> = (0..50).map(|i| i % 40).collect();
        seed(&store, "tax_law", &scores).await;

        let gated = public_statistics(
            &store,
            "tax_law",
            2,
            &StatisticsQuery::default(),
            "p0",
            TierCutoffs::default(),
            kst(),
        )
        .await
        .unwrap();
        assert!(matches!(gated, Gated::NotReleased(_)));

        // Admin preview still computes
        let view = compute_statistics(
            &store,
            "tax_law",
            2,
            &StatisticsQuery::default(),
            TierCutoffs::default(),
            kst(),
        )
        .await
        .unwrap();
        assert_eq!(view.statistics.ranked.len(), 50);
    }

    #[tokio::test]
    async fn test_release_exposes_same_statistics() {
        let store = MemoryStore::new();
        seed(&store, "tax_law", &[30, 28, 28, 10]).await;
        set_released(&store, "tax_law", 2, true, None, TierCutoffs::default(), Utc::now())
            .await
            .unwrap();

        let gated = public_statistics(
            &store,
            "tax_law",
            2,
            &StatisticsQuery::default(),
            "p2",
            TierCutoffs::default(),
            kst(),
        )
        .await
        .unwrap();
        let Gated::Released(response) = gated else {
            panic!("expected released statistics");
        };

        let summary = response.summary.unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 24.0);
        assert_eq!(response.leaderboard.len(), 3);
        assert!(response.leaderboard[2].is_viewer);
        assert!(!response.leaderboard[0].is_viewer);

        let viewer = response.viewer.unwrap();
        assert_eq!(viewer.rank, 3);
        assert_eq!(viewer.percentile, 75);
    }

    #[tokio::test]
    async fn test_prefix_filter_and_missing_week() {
        let store = MemoryStore::new();
        seed(&store, "tax_law", &[30, 20, 29, 21]).await;

        let params = StatisticsQuery {
            week: None,
            prefix: Some("A".to_string()),
        };
        let view = compute_statistics(&store, "tax_law", 2, &params, TierCutoffs::default(), kst())
            .await
            .unwrap();
        let counts: Vec<i32> = view
            .statistics
            .ranked
            .iter()
            .map(|e| e.result.correct_count)
            .collect();
        assert_eq!(counts, vec![30, 29]);

        let params = StatisticsQuery {
            week: Some(1),
            prefix: None,
        };
        let view = compute_statistics(&store, "tax_law", 2, &params, TierCutoffs::default(), kst())
            .await
            .unwrap();
        assert_eq!(view.window.unwrap().week, 1);
        assert_eq!(view.statistics.ranked.len(), 4);

        let params = StatisticsQuery {
            week: Some(5),
            prefix: None,
        };
        let err = compute_statistics(&store, "tax_law", 2, &params, TierCutoffs::default(), kst())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
