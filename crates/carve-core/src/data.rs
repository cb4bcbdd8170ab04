//! Input snapshot loading and validation.
//!
//! A run consumes one JSON snapshot of accounts and reps. Loading is
//! separate from validation so callers can assemble snapshots in memory
//! (tests, upstream services) and still get the same integrity checks.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EngineError;
use crate::model::{Account, BalanceMetric, Rep};

/// One optimization run's worth of input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildData {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub reps: Vec<Rep>,
    /// Loader-supplied per-metric target loads; `None` (the usual case)
    /// lets the problem builder derive targets from the snapshot.
    #[serde(default)]
    pub targets: Option<BalanceTargets>,
}

/// Per-metric target loads the loader may hand over alongside the
/// snapshot. A metric left unset falls back to total ÷ rep count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceTargets {
    #[serde(default)]
    pub arr: Option<f64>,
    #[serde(default)]
    pub atr: Option<f64>,
    #[serde(default)]
    pub pipeline: Option<f64>,
}

impl BalanceTargets {
    #[must_use]
    pub const fn for_metric(&self, metric: BalanceMetric) -> Option<f64> {
        match metric {
            BalanceMetric::Arr => self.arr,
            BalanceMetric::Atr => self.atr,
            BalanceMetric::Pipeline => self.pipeline,
        }
    }
}

impl BuildData {
    /// Load a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Unreadable file or malformed JSON.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let data: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing snapshot {}", path.display()))?;
        info!(
            accounts = data.accounts.len(),
            reps = data.reps.len(),
            path = %path.display(),
            "snapshot loaded"
        );
        Ok(data)
    }

    /// Referential integrity checks.
    ///
    /// Duplicate ids, child ids that are also top-level accounts, and
    /// children referenced by more than one parent are all rejected.
    /// Dangling rep references (owner, backfill target) are not; those
    /// are handled per-rule at lock time.
    ///
    /// # Errors
    ///
    /// `EngineError::Data` naming the first violation found.
    pub fn validate(&self) -> Result<(), EngineError> {
        let mut account_ids = HashSet::new();
        for account in &self.accounts {
            if !account_ids.insert(account.id.as_str()) {
                return Err(EngineError::Data(format!(
                    "duplicate account id {}",
                    account.id
                )));
            }
        }
        let mut rep_ids = HashSet::new();
        for rep in &self.reps {
            if !rep_ids.insert(rep.id.as_str()) {
                return Err(EngineError::Data(format!("duplicate rep id {}", rep.id)));
            }
        }

        let mut seen_children = HashSet::new();
        for account in &self.accounts {
            for child_id in &account.child_ids {
                if account_ids.contains(child_id.as_str()) {
                    return Err(EngineError::Data(format!(
                        "child {} of {} is also a top-level account",
                        child_id, account.id
                    )));
                }
                if !seen_children.insert(child_id.as_str()) {
                    return Err(EngineError::Data(format!(
                        "child {} referenced by more than one parent",
                        child_id
                    )));
                }
            }
        }
        Ok(())
    }
}
