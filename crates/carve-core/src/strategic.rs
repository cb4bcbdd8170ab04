//! Strategic pool handler.
//!
//! Strategic accounts never enter the optimizer: they are pre-matched to
//! strategic reps here, deterministically, and removed from the pool.
//! When no strategic rep is eligible the configured fallback decides
//! whether the accounts rejoin the normal pool or stay unassigned —
//! either way it is a warning, not an error.

use tracing::{debug, warn};

use crate::config::{StrategicConfig, StrategicFallback, StrategicPolicy};
use crate::error::Warning;
use crate::model::{Account, AssignmentSource, Proposal, Rep};
use crate::rationale;

/// Outcome of the strategic stage.
#[derive(Debug)]
pub struct StrategicOutcome {
    /// Fixed assignments for strategic accounts.
    pub proposals: Vec<Proposal>,
    /// Accounts still in play for locks and optimization.
    pub remaining: Vec<Account>,
    /// Strategic accounts left unassigned under `LeaveUnassigned`.
    pub unassigned: Vec<Account>,
    pub warnings: Vec<Warning>,
    pub strategic_account_count: usize,
    pub strategic_rep_count: usize,
}

/// Split off strategic accounts and pre-assign them to strategic reps.
#[must_use]
pub fn assign_strategic_pool(
    accounts: Vec<Account>,
    reps: &[Rep],
    config: &StrategicConfig,
) -> StrategicOutcome {
    let (strategic, mut remaining): (Vec<Account>, Vec<Account>) =
        accounts.into_iter().partition(|a| a.strategic);

    // Departing reps never receive new books.
    let mut strategic_reps: Vec<&Rep> = reps
        .iter()
        .filter(|r| r.strategic && r.participates() && !r.departing)
        .collect();
    strategic_reps.sort_by(|a, b| a.id.cmp(&b.id));

    let strategic_account_count = strategic.len();
    let strategic_rep_count = strategic_reps.len();
    let mut warnings = Vec::new();
    let mut unassigned = Vec::new();

    if strategic.is_empty() {
        return StrategicOutcome {
            proposals: Vec::new(),
            remaining,
            unassigned,
            warnings,
            strategic_account_count,
            strategic_rep_count,
        };
    }

    if strategic_reps.is_empty() {
        warn!(
            accounts = strategic_account_count,
            "strategic accounts present but no eligible strategic reps"
        );
        warnings.push(Warning::NoStrategicReps {
            strategic_accounts: strategic_account_count,
        });
        match config.fallback {
            StrategicFallback::FallThrough => remaining.extend(strategic),
            StrategicFallback::LeaveUnassigned => {
                warnings.push(Warning::StrategicUnassigned {
                    account_ids: strategic.iter().map(|a| a.id.clone()).collect(),
                });
                unassigned = strategic;
            }
        }
        return StrategicOutcome {
            proposals: Vec::new(),
            remaining,
            unassigned,
            warnings,
            strategic_account_count,
            strategic_rep_count,
        };
    }

    // Deterministic selection: accounts in ARR-descending order so the
    // least-loaded policy spreads the big books first.
    let mut ordered = strategic;
    ordered.sort_by(|a, b| {
        b.arr
            .partial_cmp(&a.arr)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut running_arr: Vec<f64> = strategic_reps.iter().map(|r| r.current_arr).collect();
    let mut cursor = 0usize;
    let mut proposals = Vec::with_capacity(ordered.len());

    for account in ordered {
        let pick = match config.policy {
            StrategicPolicy::RoundRobin => {
                let pick = cursor % strategic_reps.len();
                cursor += 1;
                pick
            }
            StrategicPolicy::LeastLoaded => {
                // Lowest running ARR; ties go to the lexicographically
                // first rep id via the pre-sorted order.
                let mut best = 0usize;
                for (i, load) in running_arr.iter().enumerate() {
                    if *load < running_arr[best] {
                        best = i;
                    }
                }
                best
            }
        };
        let rep = strategic_reps[pick];
        running_arr[pick] += account.arr;
        debug!(account = %account.id, rep = %rep.id, "strategic pre-assignment");
        proposals.push(Proposal {
            account_id: account.id.clone(),
            rep_id: rep.id.clone(),
            source: AssignmentSource::Strategic,
            scores: None,
            rationale: rationale::strategic(&account, rep),
        });
    }

    StrategicOutcome {
        proposals,
        remaining,
        unassigned,
        warnings,
        strategic_account_count,
        strategic_rep_count,
    }
}
