use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Customer vs prospect. Runs are batched by kind; the two never mix in
/// one decision space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Customer,
    Prospect,
}

impl AccountKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Prospect => "prospect",
        }
    }
}

/// One aggregated account as handed over by the data loader.
///
/// Parent accounts arrive with their children's revenue already rolled
/// up; `child_ids` only exists so the cascade stage can copy the parent's
/// final rep onto each child. Children never become decision variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub kind: AccountKind,

    /// Annual recurring revenue.
    #[serde(default)]
    pub arr: f64,
    /// Revenue available to renew.
    #[serde(default)]
    pub atr: f64,
    /// Open pipeline value.
    #[serde(default)]
    pub pipeline: f64,

    /// Current owner; empty accounts (new logos) may have none.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Date the current owner took over.
    #[serde(default)]
    pub owner_since: Option<NaiveDate>,
    /// Lifetime count of distinct owners, current one included.
    #[serde(default)]
    pub owner_count: u32,

    /// Strategic accounts bind only to strategic reps.
    #[serde(default)]
    pub strategic: bool,

    /// Sales territory (sub-region granularity), e.g. `"na-east"`.
    #[serde(default)]
    pub territory: Option<String>,
    /// Region the territory rolls up to; used when territory is absent.
    #[serde(default)]
    pub region: Option<String>,

    /// Headcount used for tier classification; `None` means tier data is
    /// missing and the team-alignment score is N/A, not zero.
    #[serde(default)]
    pub employee_count: Option<u64>,
    /// Explicit commercial tier override from the data layer, if any.
    #[serde(default)]
    pub commercial_tier: Option<String>,

    /// Churn-risk flag from the health model.
    #[serde(default)]
    pub at_risk: bool,
    /// Next renewal date, when known.
    #[serde(default)]
    pub renewal_date: Option<NaiveDate>,
    /// Owning private-equity firm, when the account is PE-held.
    #[serde(default)]
    pub pe_firm: Option<String>,
    /// Manual "do not move" override set by operations.
    #[serde(default)]
    pub manual_exclusion: bool,
    /// Pre-defined migration target when the current owner is leaving.
    #[serde(default)]
    pub backfill_target: Option<String>,

    /// Child account ids aggregated into this parent.
    #[serde(default)]
    pub child_ids: Vec<String>,
}

impl Account {
    /// Revenue value for one balance metric by name.
    #[must_use]
    pub fn metric_value(&self, metric: super::proposal::BalanceMetric) -> f64 {
        use super::proposal::BalanceMetric;
        match metric {
            BalanceMetric::Arr => self.arr,
            BalanceMetric::Atr => self.atr,
            BalanceMetric::Pipeline => self.pipeline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_parses_with_sparse_fields() {
        let json = r#"{ "id": "a1", "name": "Acme", "kind": "customer", "arr": 120000.0 }"#;
        let account: Account = serde_json::from_str(json).expect("sparse account");
        assert_eq!(account.id, "a1");
        assert_eq!(account.kind, AccountKind::Customer);
        assert!((account.arr - 120_000.0).abs() < f64::EPSILON);
        assert!(account.owner_id.is_none());
        assert!(account.employee_count.is_none());
        assert!(account.child_ids.is_empty());
        assert!(!account.strategic);
    }
}
