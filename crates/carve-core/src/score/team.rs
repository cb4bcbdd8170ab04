//! Team-alignment score from commercial tier distance.
//!
//! Accounts and reps classify into the same four-tier ladder. Exact
//! matches score best; each tier of distance steps the score down, and a
//! rep sitting *above* the account ("reaching down") pays an extra
//! penalty relative to the reverse direction — an enterprise rep on an
//! SMB account wastes more capacity than an SMB rep stretching up.
//!
//! Missing tier data yields `None`, never a numeric placeholder, so the
//! objective weight can be redistributed instead of silently diluted.

use crate::config::TeamConfig;
use crate::model::{Account, Rep};

/// The commercial tier ladder, low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Smb,
    MidMarket,
    Enterprise,
    Strategic,
}

impl Tier {
    /// Parse the data layer's tier spelling.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "smb" => Some(Self::Smb),
            "mid-market" | "midmarket" | "mid_market" => Some(Self::MidMarket),
            "enterprise" => Some(Self::Enterprise),
            "strategic" => Some(Self::Strategic),
            _ => None,
        }
    }

    const fn ordinal(self) -> i8 {
        match self {
            Self::Smb => 0,
            Self::MidMarket => 1,
            Self::Enterprise => 2,
            Self::Strategic => 3,
        }
    }
}

/// Classify an employee count against the configured thresholds.
#[must_use]
pub const fn tier_from_employees(employees: u64, thresholds: &[u64; 3]) -> Tier {
    if employees < thresholds[0] {
        Tier::Smb
    } else if employees < thresholds[1] {
        Tier::MidMarket
    } else if employees < thresholds[2] {
        Tier::Enterprise
    } else {
        Tier::Strategic
    }
}

/// The account's tier: explicit commercial tier wins, employee count is
/// the fallback, and neither means no tier.
#[must_use]
pub fn account_tier(account: &Account, config: &TeamConfig) -> Option<Tier> {
    if let Some(raw) = account.commercial_tier.as_deref() {
        if let Some(tier) = Tier::parse(raw) {
            return Some(tier);
        }
    }
    account
        .employee_count
        .map(|count| tier_from_employees(count, &config.tier_thresholds))
}

/// The rep's tier from its team designation.
#[must_use]
pub fn rep_tier(rep: &Rep) -> Option<Tier> {
    rep.tier.as_deref().and_then(Tier::parse)
}

/// Score the pair, or `None` when either side's tier is unknown.
#[must_use]
pub fn score(account: &Account, rep: &Rep, config: &TeamConfig) -> Option<f64> {
    let account_tier = account_tier(account, config)?;
    let rep_tier = rep_tier(rep)?;

    let distance = (rep_tier.ordinal() - account_tier.ordinal()).abs();
    let base = match distance {
        0 => config.exact,
        1 => config.one_level,
        2 => config.two_level,
        _ => config.three_level,
    };

    let reaching_down = rep_tier > account_tier;
    let raw = if reaching_down {
        base - config.reach_down_penalty
    } else {
        base
    };
    Some(raw.clamp(0.0, 1.0))
}
