#![forbid(unsafe_code)]
//! carve-lp: generic MILP layer.
//!
//! Owns the problem model ([`LpProblem`]), the LP text serializer used as
//! the wire format for remote solving, and the solver backends behind the
//! [`SolverBackend`] trait. Knows nothing about accounts or reps; the
//! domain crate builds problems and hands them to a [`SolverRouter`].
//!
//! # Conventions
//!
//! - **Errors**: typed [`SolveError`] at the backend seam.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod backend;
pub mod embedded;
pub mod format;
pub mod problem;
pub mod remote;
pub mod router;

pub use backend::{Column, SolveError, SolverBackend, SolverResponse, SolverStatus};
pub use embedded::EmbeddedSolver;
pub use format::write_lp;
pub use problem::{ConstraintOp, LpProblem, ProblemError};
pub use remote::RemoteSolver;
pub use router::{RoutedSolve, SolverRouter};
