// src/models/statistics.rs

use serde::{Deserialize, Serialize};

use crate::scoring::{
    ranking::ScoreSummary,
    tier::{Tier, TierCutoffs},
    week::WeekWindow,
};

/// Query parameters for cohort statistics.
#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    /// 1-based week index, counted from the week of the earliest result.
    pub week: Option<u32>,
    /// Restrict the cohort to exam numbers starting with this prefix.
    pub prefix: Option<String>,
}

/// One public leaderboard row. Never carries the participant's identity.
#[derive(Debug, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub display_code: String,
    pub correct_count: i32,
    /// Whether this row belongs to the viewer.
    pub is_viewer: bool,
}

/// The viewer's own position in the cohort.
#[derive(Debug, Serialize)]
pub struct ViewerStanding {
    pub rank: usize,
    pub percentile: i32,
    pub correct_count: i32,
    pub tier: Tier,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub subject: String,
    pub exam_round: i32,
    pub cutoffs: TierCutoffs,
    pub window: Option<WeekWindow>,
    pub summary: Option<ScoreSummary>,
    pub leaderboard: Vec<LeaderboardRow>,
    pub viewer: Option<ViewerStanding>,
}

#[derive(Debug, Serialize)]
pub struct WeeksResponse {
    pub subject: String,
    pub exam_round: i32,
    pub weeks: Vec<WeekWindow>,
}
