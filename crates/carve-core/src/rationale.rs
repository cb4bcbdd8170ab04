//! Human-readable rationale strings for proposals.
//!
//! One short sentence naming the factors that actually drove the
//! assignment, so a reviewer can sanity-check a proposal without
//! reading slider values.

use crate::model::{Account, AssignmentScores, Rep, StabilityLock};

/// Score level above which a dimension counts as a driver.
const DRIVER_THRESHOLD: f64 = 0.7;

/// Rationale for an optimizer-chosen assignment.
#[must_use]
pub fn optimized(scores: &AssignmentScores) -> String {
    let mut drivers = Vec::new();
    if scores.continuity >= DRIVER_THRESHOLD {
        drivers.push("continuity maintained");
    }
    if scores.geography >= DRIVER_THRESHOLD {
        drivers.push("geographic match");
    }
    if scores.team.is_some_and(|t| t >= DRIVER_THRESHOLD) {
        drivers.push("tier alignment");
    }
    if drivers.is_empty() {
        "best available fit under balance constraints".to_string()
    } else {
        drivers.join(", ")
    }
}

/// Rationale for a stability-locked assignment.
#[must_use]
pub fn locked(lock: &StabilityLock) -> String {
    format!("locked: {}", lock.reason)
}

/// Rationale for a strategic pre-assignment.
#[must_use]
pub fn strategic(account: &Account, rep: &Rep) -> String {
    format!(
        "strategic account {} pre-matched to strategic rep {}",
        account.name, rep.name
    )
}

/// Rationale for a cascaded child assignment.
#[must_use]
pub fn cascaded(parent_id: &str) -> String {
    format!("follows parent account {parent_id}")
}
