//! In-process MILP backend using `good_lp` with the pure-Rust `microlp`
//! solver.
//!
//! Suited to small problems (the router caps it by variable count).
//! Infeasibility is reported as a [`SolverStatus::Infeasible`] response;
//! only process-level failures surface as [`SolveError`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel,
};
use tracing::debug;

use crate::backend::{Column, SolveError, SolverBackend, SolverResponse, SolverStatus};
use crate::problem::{ConstraintOp, LpProblem, VarKind};

/// Default wall-clock budget for an embedded solve.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Embedded solver with a wall-clock deadline.
#[derive(Debug, Clone)]
pub struct EmbeddedSolver {
    timeout: Duration,
}

impl Default for EmbeddedSolver {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl EmbeddedSolver {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SolverBackend for EmbeddedSolver {
    fn solve(&self, problem: &LpProblem) -> Result<SolverResponse, SolveError> {
        let started = Instant::now();

        let mut vars = ProblemVariables::new();
        let mut handles = HashMap::with_capacity(problem.variable_count());
        for var in problem.variables() {
            let handle = match var.kind {
                VarKind::Binary => vars.add(variable().binary()),
                VarKind::Continuous { lower, upper } => {
                    if upper.is_infinite() {
                        vars.add(variable().min(lower))
                    } else {
                        vars.add(variable().min(lower).max(upper))
                    }
                }
            };
            handles.insert(var.name.clone(), handle);
        }

        let objective: Expression = problem
            .objective()
            .iter()
            .map(|(name, coeff)| *coeff * handles[name])
            .sum();

        let mut model = vars.maximise(objective.clone()).using(default_solver);
        for c in problem.constraints() {
            let lhs: Expression = c
                .terms
                .iter()
                .map(|(name, coeff)| *coeff * handles[name])
                .sum();
            let constraint = match c.op {
                ConstraintOp::Eq => constraint::eq(lhs, c.rhs),
                ConstraintOp::Le => constraint::leq(lhs, c.rhs),
                ConstraintOp::Ge => constraint::geq(lhs, c.rhs),
            };
            model.add_constraint(constraint);
        }

        debug!(
            variables = problem.variable_count(),
            constraints = problem.constraint_count(),
            "starting embedded solve"
        );

        let solution = match model.solve() {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => {
                return Ok(SolverResponse {
                    status: SolverStatus::Infeasible,
                    objective_value: 0.0,
                    columns: HashMap::new(),
                });
            }
            Err(err) => {
                return Err(SolveError::Backend {
                    message: err.to_string(),
                });
            }
        };

        // microlp has no in-flight interruption; a blown deadline is
        // detected after the fact, so the completed solution still comes
        // back, flagged `TimeLimit` for the caller's outcome policy.
        let status = if started.elapsed() > self.timeout {
            SolverStatus::TimeLimit
        } else {
            SolverStatus::Optimal
        };

        let objective_value = solution.eval(objective);
        let columns = handles
            .into_iter()
            .map(|(name, handle)| {
                let primal = solution.value(handle);
                (name, Column { primal })
            })
            .filter(|(_, col)| col.primal.abs() > 1e-9)
            .collect();

        Ok(SolverResponse {
            status,
            objective_value,
            columns,
        })
    }

    fn name(&self) -> &'static str {
        "embedded-microlp"
    }
}
