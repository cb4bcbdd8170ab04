//! Engine configuration.
//!
//! Loaded from TOML (or built from defaults) with per-field serde
//! defaults so partial config files stay valid as knobs are added.
//! `validate()` runs once at load time; the pipeline assumes a valid
//! config afterward.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::score::NormalizedWeights;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub continuity: ContinuityConfig,
    #[serde(default)]
    pub geography: GeographyConfig,
    #[serde(default)]
    pub team: TeamConfig,
    #[serde(default)]
    pub locks: LockConfig,
    #[serde(default)]
    pub balance: BalanceConfig,
    #[serde(default)]
    pub strategic: StrategicConfig,
    #[serde(default)]
    pub solver: SolverConfig,
}

/// Raw objective weights for the three score dimensions. Normalized to
/// sum 1.0 before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_weight_continuity")]
    pub continuity: f64,
    #[serde(default = "default_weight_geography")]
    pub geography: f64,
    #[serde(default = "default_weight_team")]
    pub team: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            continuity: default_weight_continuity(),
            geography: default_weight_geography(),
            team: default_weight_team(),
        }
    }
}

impl WeightsConfig {
    /// Normalize to a unit simplex.
    ///
    /// # Errors
    ///
    /// Rejects negative weights and an all-zero weight vector.
    pub fn normalized(&self) -> Result<NormalizedWeights, ConfigError> {
        if self.continuity < 0.0 || self.geography < 0.0 || self.team < 0.0 {
            return Err(ConfigError::NegativeWeight);
        }
        let sum = self.continuity + self.geography + self.team;
        if sum <= 0.0 {
            return Err(ConfigError::ZeroWeights);
        }
        Ok(NormalizedWeights {
            continuity: self.continuity / sum,
            geography: self.geography / sum,
            team: self.team / sum,
        })
    }
}

/// Continuity score: `base + tenure_weight·T + stability_weight·B +
/// value_weight·V`, current owner only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContinuityConfig {
    #[serde(default = "default_continuity_base")]
    pub base: f64,
    #[serde(default = "default_tenure_weight")]
    pub tenure_weight: f64,
    #[serde(default = "default_stability_weight")]
    pub stability_weight: f64,
    #[serde(default = "default_value_weight")]
    pub value_weight: f64,
    /// Tenure cap: T reaches 1.0 at this many days with the same owner.
    #[serde(default = "default_max_tenure_days")]
    pub max_tenure_days: u32,
    /// Owner-churn cap: B hits 0.0 once the lifetime owner count
    /// reaches this.
    #[serde(default = "default_max_owner_count")]
    pub max_owner_count: u32,
    /// ARR at which V saturates at 1.0.
    #[serde(default = "default_value_threshold")]
    pub value_threshold: f64,
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            base: default_continuity_base(),
            tenure_weight: default_tenure_weight(),
            stability_weight: default_stability_weight(),
            value_weight: default_value_weight(),
            max_tenure_days: default_max_tenure_days(),
            max_owner_count: default_max_owner_count(),
            value_threshold: default_value_threshold(),
        }
    }
}

/// Geography score per match level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographyConfig {
    #[serde(default = "default_geo_exact")]
    pub exact: f64,
    #[serde(default = "default_geo_sibling")]
    pub sibling: f64,
    #[serde(default = "default_geo_parent")]
    pub parent: f64,
    #[serde(default = "default_geo_global")]
    pub global: f64,
    #[serde(default = "default_geo_unknown")]
    pub unknown: f64,
}

impl Default for GeographyConfig {
    fn default() -> Self {
        Self {
            exact: default_geo_exact(),
            sibling: default_geo_sibling(),
            parent: default_geo_parent(),
            global: default_geo_global(),
            unknown: default_geo_unknown(),
        }
    }
}

/// Team-alignment score per tier distance, plus the reach-down penalty
/// subtracted when the rep's tier sits above the account's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamConfig {
    #[serde(default = "default_team_exact")]
    pub exact: f64,
    #[serde(default = "default_team_one_level")]
    pub one_level: f64,
    #[serde(default = "default_team_two_level")]
    pub two_level: f64,
    #[serde(default = "default_team_three_level")]
    pub three_level: f64,
    #[serde(default = "default_reach_down_penalty")]
    pub reach_down_penalty: f64,
    /// Employee-count boundaries between the four tiers, ascending.
    #[serde(default = "default_tier_thresholds")]
    pub tier_thresholds: [u64; 3],
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            exact: default_team_exact(),
            one_level: default_team_one_level(),
            two_level: default_team_two_level(),
            three_level: default_team_three_level(),
            reach_down_penalty: default_reach_down_penalty(),
            tier_thresholds: default_tier_thresholds(),
        }
    }
}

/// Stability-lock thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Lock accounts renewing within this many days.
    #[serde(default = "default_renewal_window_days")]
    pub renewal_window_days: u32,
    /// Lock accounts whose owner changed within this many days.
    #[serde(default = "default_owner_change_window_days")]
    pub owner_change_window_days: u32,
    /// PE firm name → dedicated rep id.
    #[serde(default)]
    pub pe_firm_routes: BTreeMap<String, String>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            renewal_window_days: default_renewal_window_days(),
            owner_change_window_days: default_owner_change_window_days(),
            pe_firm_routes: BTreeMap::new(),
        }
    }
}

/// Three-tier soft balance penalties.
///
/// Bands are symmetric around the per-rep target T: the variance band is
/// `±variance_band_pct·T`, the buffer zone `±buffer_zone_pct·T`, and
/// everything past the buffer is big-M territory. Penalties must be
/// strictly increasing across the tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    #[serde(default = "default_true")]
    pub balance_arr: bool,
    #[serde(default)]
    pub balance_atr: bool,
    #[serde(default)]
    pub balance_pipeline: bool,
    #[serde(default = "default_variance_band_pct")]
    pub variance_band_pct: f64,
    #[serde(default = "default_buffer_zone_pct")]
    pub buffer_zone_pct: f64,
    #[serde(default = "default_penalty_alpha")]
    pub penalty_alpha: f64,
    #[serde(default = "default_penalty_beta")]
    pub penalty_beta: f64,
    #[serde(default = "default_penalty_big_m")]
    pub penalty_big_m: f64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            balance_arr: true,
            balance_atr: false,
            balance_pipeline: false,
            variance_band_pct: default_variance_band_pct(),
            buffer_zone_pct: default_buffer_zone_pct(),
            penalty_alpha: default_penalty_alpha(),
            penalty_beta: default_penalty_beta(),
            penalty_big_m: default_penalty_big_m(),
        }
    }
}

/// How the strategic pool picks a rep for each strategic account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategicPolicy {
    /// Cycle through strategic reps sorted by id.
    #[default]
    RoundRobin,
    /// Pick the strategic rep with the least running ARR.
    LeastLoaded,
}

/// What happens to strategic accounts when no strategic rep is eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategicFallback {
    /// Strategic accounts rejoin the normal pool (with a warning).
    #[default]
    FallThrough,
    /// Strategic accounts are reported unassigned (with a warning).
    LeaveUnassigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StrategicConfig {
    #[serde(default)]
    pub policy: StrategicPolicy,
    #[serde(default)]
    pub fallback: StrategicFallback,
}

/// Solver routing knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Problems at or under this many variables solve in-process.
    #[serde(default = "default_embedded_var_limit")]
    pub embedded_var_limit: usize,
    #[serde(default = "default_embedded_timeout_secs")]
    pub embedded_timeout_secs: u64,
    /// Remote native solver service URL; `None` disables the remote path.
    #[serde(default)]
    pub remote_endpoint: Option<String>,
    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            embedded_var_limit: default_embedded_var_limit(),
            embedded_timeout_secs: default_embedded_timeout_secs(),
            remote_endpoint: None,
            remote_timeout_secs: default_remote_timeout_secs(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants the type system cannot.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] naming the violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.normalized()?;

        if self.balance.buffer_zone_pct <= self.balance.variance_band_pct {
            return Err(ConfigError::BandsNotNested {
                variance: self.balance.variance_band_pct,
                buffer: self.balance.buffer_zone_pct,
            });
        }
        if !(self.balance.penalty_alpha < self.balance.penalty_beta
            && self.balance.penalty_beta < self.balance.penalty_big_m)
        {
            return Err(ConfigError::PenaltiesNotIncreasing);
        }
        if self.balance.penalty_alpha < 0.0 {
            return Err(ConfigError::NegativePenalty);
        }

        let t = &self.team.tier_thresholds;
        if !(t[0] < t[1] && t[1] < t[2]) {
            return Err(ConfigError::TierThresholdsNotAscending);
        }

        Ok(())
    }

    /// Which balance metrics are enabled, in fixed order.
    #[must_use]
    pub fn enabled_metrics(&self) -> Vec<crate::model::BalanceMetric> {
        use crate::model::BalanceMetric;
        let mut metrics = Vec::new();
        if self.balance.balance_arr {
            metrics.push(BalanceMetric::Arr);
        }
        if self.balance.balance_atr {
            metrics.push(BalanceMetric::Atr);
        }
        if self.balance.balance_pipeline {
            metrics.push(BalanceMetric::Pipeline);
        }
        metrics
    }
}

const fn default_true() -> bool {
    true
}
const fn default_weight_continuity() -> f64 {
    0.45
}
const fn default_weight_geography() -> f64 {
    0.35
}
const fn default_weight_team() -> f64 {
    0.20
}
const fn default_continuity_base() -> f64 {
    0.40
}
const fn default_tenure_weight() -> f64 {
    0.25
}
const fn default_stability_weight() -> f64 {
    0.20
}
const fn default_value_weight() -> f64 {
    0.15
}
const fn default_max_tenure_days() -> u32 {
    730
}
const fn default_max_owner_count() -> u32 {
    5
}
const fn default_value_threshold() -> f64 {
    250_000.0
}
const fn default_geo_exact() -> f64 {
    1.0
}
const fn default_geo_sibling() -> f64 {
    0.75
}
const fn default_geo_parent() -> f64 {
    0.50
}
const fn default_geo_global() -> f64 {
    0.20
}
const fn default_geo_unknown() -> f64 {
    0.40
}
const fn default_team_exact() -> f64 {
    1.0
}
const fn default_team_one_level() -> f64 {
    0.60
}
const fn default_team_two_level() -> f64 {
    0.30
}
const fn default_team_three_level() -> f64 {
    0.10
}
const fn default_reach_down_penalty() -> f64 {
    0.10
}
const fn default_tier_thresholds() -> [u64; 3] {
    [100, 1_000, 10_000]
}
const fn default_renewal_window_days() -> u32 {
    90
}
const fn default_owner_change_window_days() -> u32 {
    180
}
const fn default_variance_band_pct() -> f64 {
    0.10
}
const fn default_buffer_zone_pct() -> f64 {
    0.40
}
const fn default_penalty_alpha() -> f64 {
    0.001
}
const fn default_penalty_beta() -> f64 {
    0.01
}
const fn default_penalty_big_m() -> f64 {
    10.0
}
const fn default_embedded_var_limit() -> usize {
    5_000
}
const fn default_embedded_timeout_secs() -> u64 {
    60
}
const fn default_remote_timeout_secs() -> u64 {
    300
}
