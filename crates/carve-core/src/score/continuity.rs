//! Continuity score: the value of keeping an account where it is.
//!
//! Evaluated only for the account's current owner; every other rep
//! scores 0.0. For the owner:
//!
//! ```text
//! continuity = base + tenure_weight·T + stability_weight·B + value_weight·V
//! ```
//!
//! where `T` is tenure normalized against the max-tenure cap, `B` is
//! inverse owner churn, and `V` is ARR normalized against the value
//! threshold. The result is clamped to `[0, 1]`.

use chrono::NaiveDate;

use crate::config::ContinuityConfig;
use crate::model::{Account, Rep};

/// Score the pair; 0.0 unless `rep` currently owns `account`.
#[must_use]
pub fn score(account: &Account, rep: &Rep, as_of: NaiveDate, config: &ContinuityConfig) -> f64 {
    let owns = account
        .owner_id
        .as_deref()
        .is_some_and(|owner| owner == rep.id);
    if !owns {
        return 0.0;
    }

    let raw = config.base
        + config.tenure_weight * tenure_component(account, as_of, config)
        + config.stability_weight * stability_component(account, config)
        + config.value_weight * value_component(account, config);
    raw.clamp(0.0, 1.0)
}

/// T: days since the owner change, saturating at `max_tenure_days`.
/// Unknown tenure scores 0.
#[allow(clippy::cast_precision_loss)]
fn tenure_component(account: &Account, as_of: NaiveDate, config: &ContinuityConfig) -> f64 {
    let Some(owner_since) = account.owner_since else {
        return 0.0;
    };
    if config.max_tenure_days == 0 {
        return 1.0;
    }
    let days = (as_of - owner_since).num_days().max(0) as f64;
    (days / f64::from(config.max_tenure_days)).min(1.0)
}

/// B: inverse owner churn, `1 − owner_count / max_owner_count`, floored
/// at 0. An unreported count is treated as the current owner only.
fn stability_component(account: &Account, config: &ContinuityConfig) -> f64 {
    if config.max_owner_count == 0 {
        return 0.0;
    }
    let count = account.owner_count.max(1);
    (1.0 - f64::from(count) / f64::from(config.max_owner_count)).max(0.0)
}

/// V: ARR against the value threshold, capped at 1.
fn value_component(account: &Account, config: &ContinuityConfig) -> f64 {
    if config.value_threshold <= 0.0 {
        return 0.0;
    }
    (account.arr / config.value_threshold).min(1.0)
}
