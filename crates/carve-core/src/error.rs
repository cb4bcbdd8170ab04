//! Error and warning taxonomy.
//!
//! Fatal conditions return [`EngineError`] with no proposals; everything
//! non-fatal accumulates as a [`Warning`] on a successful outcome. The
//! engine never panics across its public boundary.

use serde::{Deserialize, Serialize};

use crate::model::LockKind;

/// Config invariant violations caught at load time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("objective weights must be non-negative")]
    NegativeWeight,
    #[error("objective weights sum to zero; at least one must be positive")]
    ZeroWeights,
    #[error("buffer zone ({buffer}) must be wider than the variance band ({variance})")]
    BandsNotNested { variance: f64, buffer: f64 },
    #[error("balance penalties must satisfy alpha < beta < big_m")]
    PenaltiesNotIncreasing,
    #[error("balance penalties must be non-negative")]
    NegativePenalty,
    #[error("team tier thresholds must be strictly ascending")]
    TierThresholdsNotAscending,
}

/// Fatal pipeline failures. Each message tells the operator what to do
/// next, in the style of the solver's distinction between "your data"
/// and "our infrastructure".
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid build data: {0}")]
    Data(String),

    #[error("no active, eligible reps in the snapshot; nothing can be assigned")]
    NoEligibleReps,

    #[error(
        "problem is infeasible: hard filters contradict each other \
         (check strategic accounts vs strategic reps and region filters)"
    )]
    Infeasible,

    #[error("solver hit its time limit with no feasible solution; try a smaller batch")]
    TimeoutNoSolution,

    #[error("solver backend failed: {message}; try a smaller batch or retry later")]
    SolverFailed { message: String },

    #[error("solver infrastructure unavailable: {message}")]
    SolverUnavailable { message: String },
}

/// Non-fatal conditions, accumulated and returned with a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "warning")]
pub enum Warning {
    /// The batch held no accounts; the run is a successful no-op.
    EmptyAccountSet,
    /// Strategic accounts exist but no strategic rep is eligible.
    NoStrategicReps { strategic_accounts: usize },
    /// A lock matched but its target rep is not in the eligible set;
    /// the account stayed in the free pool.
    LockTargetIneligible {
        account_id: String,
        kind: LockKind,
        target_rep_id: String,
    },
    /// Strategic accounts left unassigned per the configured fallback.
    StrategicUnassigned { account_ids: Vec<String> },
    /// Solver returned a feasible but not proven-optimal solution.
    SolverTimeLimit,
    /// The embedded path failed and the remote backend answered.
    SolverFellBack,
    /// Problem exceeded the embedded limit with no remote configured.
    EmbeddedOverCapacity { variables: usize, limit: usize },
    /// Telemetry record was dropped (queue full or worker gone).
    TelemetryDropped,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAccountSet => write!(f, "account set is empty; nothing to optimize"),
            Self::NoStrategicReps { strategic_accounts } => write!(
                f,
                "{strategic_accounts} strategic account(s) but no eligible strategic reps"
            ),
            Self::LockTargetIneligible {
                account_id,
                kind,
                target_rep_id,
            } => write!(
                f,
                "lock {} on account {account_id} targets ineligible rep {target_rep_id}; \
                 account left free",
                kind.as_str()
            ),
            Self::StrategicUnassigned { account_ids } => write!(
                f,
                "{} strategic account(s) left unassigned per fallback policy",
                account_ids.len()
            ),
            Self::SolverTimeLimit => {
                write!(f, "solver hit its time limit; returning best feasible solution")
            }
            Self::SolverFellBack => {
                write!(f, "embedded solver failed; remote backend produced the solution")
            }
            Self::EmbeddedOverCapacity { variables, limit } => write!(
                f,
                "problem has {variables} variables (embedded limit {limit}) and no remote \
                 solver is configured"
            ),
            Self::TelemetryDropped => write!(f, "telemetry record dropped"),
        }
    }
}
