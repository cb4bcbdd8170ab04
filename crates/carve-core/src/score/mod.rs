//! Pairwise assignment quality scoring.
//!
//! Three independent dimensions in `[0, 1]` (continuity, geography,
//! team alignment) plus a small deterministic tie-breaker. The weighted
//! blend of the three becomes the objective coefficient of the pair's
//! decision variable.

pub mod continuity;
pub mod geography;
pub mod team;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::model::{Account, AssignmentScores, Rep};

/// Scale of the tie-breaker term. Small enough never to outweigh a real
/// score difference, large enough to clear solver tolerances.
pub const TIE_BREAKER_EPSILON: f64 = 1e-4;

/// Objective weights normalized to sum 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWeights {
    pub continuity: f64,
    pub geography: f64,
    pub team: f64,
}

impl NormalizedWeights {
    /// Blend scores into one objective coefficient.
    ///
    /// When the team score is `None` its weight is redistributed to the
    /// other two dimensions proportionally, for this pair only: an N/A
    /// score must not dilute the objective the way a literal zero would.
    #[must_use]
    pub fn coefficient(&self, scores: &AssignmentScores) -> f64 {
        let blended = match scores.team {
            Some(team) => {
                self.continuity * scores.continuity
                    + self.geography * scores.geography
                    + self.team * team
            }
            None => {
                let remaining = self.continuity + self.geography;
                if remaining <= 0.0 {
                    0.0
                } else {
                    let scale = (remaining + self.team) / remaining;
                    self.continuity * scale * scores.continuity
                        + self.geography * scale * scores.geography
                }
            }
        };
        blended + scores.tie_breaker
    }
}

/// Tie-breaker for an account ranked `rank` (0 = highest ARR): strictly
/// decreasing in rank so equal-scoring solutions order reproducibly.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn tie_breaker(rank: usize) -> f64 {
    TIE_BREAKER_EPSILON / (rank as f64 + 1.0)
}

/// Score one (account, rep) pair.
///
/// `rank` is the account's position when all free accounts are sorted by
/// ARR descending; `as_of` anchors tenure math so runs are reproducible.
#[must_use]
pub fn score_pair(
    account: &Account,
    rep: &Rep,
    rank: usize,
    as_of: NaiveDate,
    config: &EngineConfig,
) -> AssignmentScores {
    AssignmentScores {
        continuity: continuity::score(account, rep, as_of, &config.continuity),
        geography: geography::score(account, rep, &config.geography),
        team: team::score(account, rep, &config.team),
        tie_breaker: tie_breaker(rank),
    }
}

/// Rank free accounts by ARR descending, id ascending on equal ARR.
/// Returns indices into `accounts` in rank order.
#[must_use]
pub fn rank_by_value(accounts: &[Account]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..accounts.len()).collect();
    order.sort_by(|&a, &b| {
        accounts[b]
            .arr
            .partial_cmp(&accounts[a].arr)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| accounts[a].id.cmp(&accounts[b].id))
    });
    order
}
