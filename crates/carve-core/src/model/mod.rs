//! Domain value objects for a single optimization run.
//!
//! Everything here is created fresh per run from the loaded snapshot and
//! treated as immutable afterward. During one run every account satisfies
//! exactly one of: assigned by the strategic pool, pinned by a stability
//! lock, or free for the optimizer.

pub mod account;
pub mod proposal;
pub mod rep;

pub use account::{Account, AccountKind};
pub use proposal::{
    AssignmentScores, AssignmentSource, BalanceMetric, LockKind, Proposal, StabilityLock,
};
pub use rep::Rep;
