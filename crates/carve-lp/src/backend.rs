//! Solver backend contract.
//!
//! Every backend — embedded or remote — answers with the same
//! [`SolverResponse`] shape, mirroring the wire contract of the native
//! solver service: a status, an objective value, and a sparse map of
//! column name to primal value.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::problem::LpProblem;

/// Terminal status reported by a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// Proven optimal solution.
    Optimal,
    /// No assignment satisfies the hard constraints.
    Infeasible,
    /// Time limit hit; `columns` may still hold a feasible incumbent.
    TimeLimit,
    /// Solver-side failure with no usable solution.
    Error,
}

/// One solved column (variable) value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Column {
    #[serde(rename = "Primal")]
    pub primal: f64,
}

/// Parsed solver answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverResponse {
    pub status: SolverStatus,
    pub objective_value: f64,
    pub columns: HashMap<String, Column>,
}

impl SolverResponse {
    /// Column names whose primal value is at least `threshold`.
    ///
    /// Call sites use `0.5` to read binary variables with relaxation
    /// tolerance.
    #[must_use]
    pub fn binding(&self, threshold: f64) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .columns
            .iter()
            .filter(|(_, col)| col.primal >= threshold)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Primal value of one column, `0.0` when absent (sparse responses
    /// omit zero columns).
    #[must_use]
    pub fn primal(&self, name: &str) -> f64 {
        self.columns.get(name).map_or(0.0, |c| c.primal)
    }
}

/// Failures on the way to (or inside) a solver backend.
///
/// Infeasibility is *not* an error: it is a [`SolverStatus::Infeasible`]
/// answer. These variants cover transport and process failures where no
/// answer exists.
#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("solver timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
    #[error("solver backend failed: {message}")]
    Backend { message: String },
    #[error("solver transport failed: {message}")]
    Transport { message: String },
    #[error("malformed solver response: {message}")]
    Malformed { message: String },
}

/// A solving strategy. Object-safe so the router can hold trait objects.
pub trait SolverBackend: Send + Sync {
    /// Solve the problem, blocking until done or failed.
    fn solve(&self, problem: &LpProblem) -> Result<SolverResponse, SolveError>;

    /// Short backend name for logs and telemetry.
    fn name(&self) -> &'static str;
}
