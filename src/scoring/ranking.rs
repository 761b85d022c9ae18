// src/scoring/ranking.rs

use serde::Serialize;

use crate::config::LEADERBOARD_LIMIT;
use crate::models::scoring_result::ScoringResult;
use crate::scoring::{
    round_half_up_percent,
    tier::{Tier, TierCutoffs},
};
use crate::utils::mask::display_code;

/// A cohort member with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    /// 1-based position in the sorted cohort. Equal scores get consecutive ranks.
    pub rank: usize,
    /// `round(rank / cohort_size * 100)`, half-up.
    pub percentile: i32,
    pub result: ScoringResult,
}

/// Count, mean, max and min of `correct_count` across a cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    /// Rounded to one decimal place.
    pub mean: f64,
    pub max: i32,
    pub min: i32,
}

/// A public leaderboard row. The participant id stays server-side and is
/// only used to mark the viewer's own row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub display_code: String,
    pub correct_count: i32,
    pub participant_id: String,
}

/// Sorts a cohort by `correct_count`, highest first, and assigns positional ranks.
///
/// The sort is stable: ties keep the order the cohort was loaded in
/// (creation time, then id) and receive distinct consecutive ranks.
pub fn rank(cohort: Vec<ScoringResult>) -> Vec<RankedEntry> {
    let mut sorted = cohort;
    sorted.sort_by(|a, b| b.correct_count.cmp(&a.correct_count));

    let size = sorted.len() as i64;
    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, result)| {
            let rank = idx + 1;
            RankedEntry {
                rank,
                percentile: round_half_up_percent(rank as i64, size),
                result,
            }
        })
        .collect()
}

/// `None` for an empty cohort.
pub fn summarize(cohort: &[ScoringResult]) -> Option<ScoreSummary> {
    let max = cohort.iter().map(|r| r.correct_count).max()?;
    let min = cohort.iter().map(|r| r.correct_count).min()?;
    let sum: i64 = cohort.iter().map(|r| r.correct_count as i64).sum();
    let mean = sum as f64 / cohort.len() as f64;

    Some(ScoreSummary {
        count: cohort.len(),
        mean: (mean * 10.0).round() / 10.0,
        max,
        min,
    })
}

/// Safe-tier entries only, in rank order, capped at `LEADERBOARD_LIMIT`.
pub fn leaderboard(ranked: &[RankedEntry], cutoffs: &TierCutoffs) -> Vec<LeaderboardEntry> {
    ranked
        .iter()
        .filter(|entry| cutoffs.classify(entry.result.correct_count) == Tier::Safe)
        .take(LEADERBOARD_LIMIT)
        .map(|entry| LeaderboardEntry {
            rank: entry.rank,
            display_code: display_code(
                entry.result.participant_code.as_deref(),
                &entry.result.participant_id,
            ),
            correct_count: entry.result.correct_count,
            participant_id: entry.result.participant_id.clone(),
        })
        .collect()
}

/// Everything derived from one cohort.
#[derive(Debug, Clone)]
pub struct CohortStatistics {
    pub cutoffs: TierCutoffs,
    pub summary: Option<ScoreSummary>,
    pub ranked: Vec<RankedEntry>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl CohortStatistics {
    pub fn compute(cohort: Vec<ScoringResult>, cutoffs: TierCutoffs) -> Self {
        let summary = summarize(&cohort);
        let ranked = rank(cohort);
        let leaderboard = leaderboard(&ranked, &cutoffs);
        Self {
            cutoffs,
            summary,
            ranked,
            leaderboard,
        }
    }

    /// The ranked entry belonging to `participant_id`, if they are in the cohort.
    pub fn standing_of(&self, participant_id: &str) -> Option<&RankedEntry> {
        self.ranked
            .iter()
            .find(|entry| entry.result.participant_id == participant_id)
    }
}
