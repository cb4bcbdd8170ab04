#![forbid(unsafe_code)]
//! carve-core: the book-balancing engine.
//!
//! Takes a snapshot of accounts and reps and produces one ownership
//! proposal per account: strategic accounts are pre-matched, stability
//! locks pin accounts that must not move, and everything else is scored
//! pairwise and assigned by a MILP that balances rep books softly
//! (three penalty tiers, never a hard cap). Child accounts follow their
//! parents after the fact.
//!
//! The solver itself lives in `carve-lp`; this crate builds problems,
//! routes them, and turns solutions back into [`model::Proposal`]s via
//! [`pipeline::Engine`].
//!
//! # Conventions
//!
//! - **Errors**: [`error::EngineError`] for fatal conditions,
//!   [`error::Warning`] accumulated on successful outcomes. No panics
//!   across the public boundary.
//! - **Logging**: `tracing` macros; subscriber setup belongs to the
//!   binary.
//! - **Determinism**: every stage iterates in a defined order; reruns
//!   over the same snapshot and `as_of` date produce identical output.

pub mod cascade;
pub mod config;
pub mod data;
pub mod error;
pub mod locks;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod problem;
pub mod rationale;
pub mod score;
pub mod strategic;
pub mod telemetry;

pub use config::EngineConfig;
pub use data::{BalanceTargets, BuildData};
pub use error::{ConfigError, EngineError, Warning};
pub use metrics::{RepLoad, RunMetrics};
pub use model::{
    Account, AccountKind, AssignmentScores, AssignmentSource, BalanceMetric, LockKind, Proposal,
    Rep, StabilityLock,
};
pub use pipeline::{Engine, Progress, RunOptions, RunOutcome, SolverSummary};
pub use telemetry::{JsonlSink, TelemetryRecorder};
