// src/scoring/tier.rs

use serde::{Deserialize, Serialize};

/// Standing of a score relative to the cutoffs of its (subject, round).
/// Ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    RedLine,
    Competitive,
    Safe,
}

/// Correct-count thresholds. `safe` must stay above `competitive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCutoffs {
    pub safe: i32,
    pub competitive: i32,
}

impl Default for TierCutoffs {
    /// 28 and 24 correct answers: 80% and roughly 69% of a 35-question subject.
    fn default() -> Self {
        Self {
            safe: 28,
            competitive: 24,
        }
    }
}

impl TierCutoffs {
    pub fn is_valid(&self) -> bool {
        self.competitive >= 0 && self.safe > self.competitive
    }

    /// Each band includes its lower edge: a score equal to a cutoff lands in the higher band.
    pub fn classify(&self, score: i32) -> Tier {
        if score >= self.safe {
            Tier::Safe
        } else if score >= self.competitive {
            Tier::Competitive
        } else {
            Tier::RedLine
        }
    }
}
