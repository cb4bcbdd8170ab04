//! Post-run success metrics.
//!
//! Everything here is derived strictly from the final proposal list and
//! the input snapshot; nothing feeds back into the run that produced it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::model::{Account, BalanceMetric, Proposal, Rep};
use crate::score::geography::{classify, GeoMatch};
use crate::score::team::{account_tier, rep_tier};

/// One rep's resulting book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepLoad {
    pub rep_id: String,
    pub account_count: usize,
    pub arr: f64,
    pub atr: f64,
    pub pipeline: f64,
    /// Signed deviation from target per enabled balance metric.
    pub deviation: Vec<(BalanceMetric, f64)>,
}

/// Aggregate quality metrics for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub rep_loads: Vec<RepLoad>,
    /// Population variance of rep ARR loads.
    pub balance_variance: f64,
    /// Share of proposals keeping the current owner.
    pub continuity_rate: f64,
    pub geo_exact_rate: f64,
    /// Same macro-region without an exact sub-region match. Parent
    /// matches (one side macro-only) are folded in here rather than
    /// given a fourth bucket.
    pub geo_sibling_rate: f64,
    pub geo_cross_rate: f64,
    pub tier_exact_rate: f64,
    pub tier_partial_rate: f64,
    /// Total slack the solver left unresolved; 0 means perfect balance.
    pub unresolved_slack: f64,
}

/// Compute metrics from the final proposals.
///
/// `unresolved_slack` is passed in by the pipeline (summed from the
/// solver's slack primals) because proposals alone cannot recover it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_metrics(
    proposals: &[Proposal],
    accounts: &[Account],
    reps: &[Rep],
    targets: &[(BalanceMetric, f64)],
    config: &EngineConfig,
    unresolved_slack: f64,
) -> RunMetrics {
    let accounts_by_id: HashMap<&str, &Account> =
        accounts.iter().map(|a| (a.id.as_str(), a)).collect();
    let reps_by_id: HashMap<&str, &Rep> = reps.iter().map(|r| (r.id.as_str(), r)).collect();

    // Per-rep loads over parent proposals only; cascaded children carry
    // revenue already aggregated into their parents.
    let mut loads: HashMap<&str, RepLoad> = HashMap::new();
    let mut continuity_hits = 0usize;
    let mut geo = (0usize, 0usize, 0usize, 0usize); // exact, sibling, cross, counted
    let mut tier = (0usize, 0usize, 0usize); // exact, partial, counted
    let mut parent_count = 0usize;

    for proposal in proposals {
        let Some(account) = accounts_by_id.get(proposal.account_id.as_str()) else {
            continue; // cascaded child; not a top-level account
        };
        parent_count += 1;

        let entry = loads
            .entry(proposal.rep_id.as_str())
            .or_insert_with(|| RepLoad {
                rep_id: proposal.rep_id.clone(),
                account_count: 0,
                arr: 0.0,
                atr: 0.0,
                pipeline: 0.0,
                deviation: Vec::new(),
            });
        entry.account_count += 1;
        entry.arr += account.arr;
        entry.atr += account.atr;
        entry.pipeline += account.pipeline;

        if account
            .owner_id
            .as_deref()
            .is_some_and(|owner| owner == proposal.rep_id)
        {
            continuity_hits += 1;
        }

        if let Some(rep) = reps_by_id.get(proposal.rep_id.as_str()) {
            match classify(account, rep) {
                GeoMatch::Exact => {
                    geo.0 += 1;
                    geo.3 += 1;
                }
                GeoMatch::Sibling | GeoMatch::Parent => {
                    geo.1 += 1;
                    geo.3 += 1;
                }
                GeoMatch::Global => {
                    geo.2 += 1;
                    geo.3 += 1;
                }
                GeoMatch::Unknown => {}
            }

            if let (Some(at), Some(rt)) = (account_tier(account, &config.team), rep_tier(rep)) {
                tier.2 += 1;
                if at == rt {
                    tier.0 += 1;
                } else {
                    tier.1 += 1;
                }
            }
        }
    }

    // Deviations against the run's targets.
    let mut rep_loads: Vec<RepLoad> = loads.into_values().collect();
    for load in &mut rep_loads {
        for (metric, target) in targets {
            let actual = match metric {
                BalanceMetric::Arr => load.arr,
                BalanceMetric::Atr => load.atr,
                BalanceMetric::Pipeline => load.pipeline,
            };
            load.deviation.push((*metric, actual - target));
        }
    }
    rep_loads.sort_by(|a, b| a.rep_id.cmp(&b.rep_id));

    let balance_variance = variance(&rep_loads.iter().map(|l| l.arr).collect::<Vec<_>>());
    let rate = |hits: usize, total: usize| {
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    };

    RunMetrics {
        rep_loads,
        balance_variance,
        continuity_rate: rate(continuity_hits, parent_count),
        geo_exact_rate: rate(geo.0, geo.3),
        geo_sibling_rate: rate(geo.1, geo.3),
        geo_cross_rate: rate(geo.2, geo.3),
        tier_exact_rate: rate(tier.0, tier.2),
        tier_partial_rate: rate(tier.1, tier.2),
        unresolved_slack,
    }
}

/// Population variance.
#[allow(clippy::cast_precision_loss)]
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
