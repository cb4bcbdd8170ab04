use serde::{Deserialize, Serialize};

/// An assignee with capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rep {
    pub id: String,
    pub name: String,

    /// Region the rep covers, at territory granularity where possible.
    #[serde(default)]
    pub region: Option<String>,
    /// Commercial tier the rep serves, e.g. `"enterprise"`.
    #[serde(default)]
    pub tier: Option<String>,

    /// Strategic reps take only strategic accounts and vice versa.
    #[serde(default)]
    pub strategic: bool,
    /// True when this rep is leaving and their book is being migrated.
    #[serde(default)]
    pub departing: bool,

    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub eligible: bool,

    /// ARR already on the rep's book before this run.
    #[serde(default)]
    pub current_arr: f64,
}

const fn default_true() -> bool {
    true
}

impl Rep {
    /// Whether the rep participates in the decision space at all.
    #[must_use]
    pub const fn participates(&self) -> bool {
        self.active && self.eligible
    }
}
