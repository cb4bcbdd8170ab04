use serde::{Deserialize, Serialize};

/// The balance metrics a run can load-balance on, each independently
/// toggleable in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceMetric {
    Arr,
    Atr,
    Pipeline,
}

impl BalanceMetric {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arr => "arr",
            Self::Atr => "atr",
            Self::Pipeline => "pipeline",
        }
    }
}

/// Why a stability lock pinned an account.
///
/// Rule priority is the declaration order here: when several rules match
/// the same account, the earliest variant wins. The order is fixed by the
/// engine, not configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    /// Operations flagged the account "do not move".
    ManualExclusion,
    /// Current owner is departing; a migration target is pre-defined.
    BackfillMigration,
    /// Churn-risk accounts stay with whoever knows them.
    AtRisk,
    /// Renewal lands inside the configured window.
    RenewalWindow,
    /// The owning PE firm routes to a dedicated rep.
    PeFirmRouting,
    /// Ownership changed too recently to churn it again.
    RecentOwnerChange,
}

impl LockKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManualExclusion => "manual_exclusion",
            Self::BackfillMigration => "backfill_migration",
            Self::AtRisk => "at_risk",
            Self::RenewalWindow => "renewal_window",
            Self::PeFirmRouting => "pe_firm_routing",
            Self::RecentOwnerChange => "recent_owner_change",
        }
    }

    /// All kinds in priority order.
    pub const ALL: [Self; 6] = [
        Self::ManualExclusion,
        Self::BackfillMigration,
        Self::AtRisk,
        Self::RenewalWindow,
        Self::PeFirmRouting,
        Self::RecentOwnerChange,
    ];
}

/// A stability lock pinning one account to one rep, created once during
/// preprocessing and immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilityLock {
    pub kind: LockKind,
    pub target_rep_id: String,
    /// Human-readable reason surfaced in the proposal rationale.
    pub reason: String,
}

/// The three quality dimensions plus the deterministic tie-breaker,
/// computed once per eligible (account, rep) pair.
///
/// `team` is `None` when tier data is missing for the account — the
/// weight is redistributed, never silently zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssignmentScores {
    pub continuity: f64,
    pub geography: f64,
    pub team: Option<f64>,
    pub tie_breaker: f64,
}

/// Which pipeline stage produced an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stage", content = "lock")]
pub enum AssignmentSource {
    /// Pre-matched in the strategic pool.
    Strategic,
    /// Pinned by a stability lock.
    Locked(LockKind),
    /// Chosen by the optimizer.
    Optimized,
    /// Inherited from the parent account by the cascade.
    Cascaded,
}

/// One final assignment in the run's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub account_id: String,
    pub rep_id: String,
    pub source: AssignmentSource,
    /// Present for optimized assignments; locked/strategic/cascaded ones
    /// carry no pairwise scores.
    #[serde(default)]
    pub scores: Option<AssignmentScores>,
    /// What drove this assignment, in words.
    pub rationale: String,
}
