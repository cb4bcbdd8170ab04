//! Geography score from a static region hierarchy.
//!
//! The hierarchy is a fixed three-level tree (world, macro-region,
//! sub-region) consulted by table lookup, never computed. Match levels,
//! best to worst:
//!
//! - **Exact**: same sub-region (or same macro when neither side has a
//!   sub-region).
//! - **Sibling**: different sub-regions under the same macro-region.
//! - **Parent**: same macro-region, only one side specific to a
//!   sub-region.
//! - **Global**: different macro-regions.
//! - **Unknown**: either side's region is missing or unmappable.

use crate::config::GeographyConfig;
use crate::model::{Account, Rep};

/// Macro-regions of the static hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroRegion {
    Amer,
    Emea,
    Apac,
}

/// Sub-region table: `(name, macro-region)`. Names are the territory
/// spellings the data layer emits, lowercased.
const SUB_REGIONS: &[(&str, MacroRegion)] = &[
    ("na-east", MacroRegion::Amer),
    ("na-central", MacroRegion::Amer),
    ("na-west", MacroRegion::Amer),
    ("latam", MacroRegion::Amer),
    ("uki", MacroRegion::Emea),
    ("dach", MacroRegion::Emea),
    ("nordics", MacroRegion::Emea),
    ("southern-europe", MacroRegion::Emea),
    ("mea", MacroRegion::Emea),
    ("anz", MacroRegion::Apac),
    ("japan", MacroRegion::Apac),
    ("india", MacroRegion::Apac),
    ("sea", MacroRegion::Apac),
];

/// Macro-region spellings accepted directly.
const MACRO_REGIONS: &[(&str, MacroRegion)] = &[
    ("amer", MacroRegion::Amer),
    ("emea", MacroRegion::Emea),
    ("apac", MacroRegion::Apac),
];

/// A region string resolved against the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRegion {
    pub macro_region: MacroRegion,
    /// `None` when the string named a macro-region directly.
    pub sub_region: Option<&'static str>,
}

/// How a pair matched, exposed for the metrics stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoMatch {
    Exact,
    Sibling,
    Parent,
    Global,
    Unknown,
}

/// Resolve a raw region/territory string. Case-insensitive;
/// unmappable strings resolve to `None`.
#[must_use]
pub fn resolve(raw: &str) -> Option<ResolvedRegion> {
    let needle = raw.trim().to_ascii_lowercase();
    for (name, macro_region) in SUB_REGIONS {
        if *name == needle {
            return Some(ResolvedRegion {
                macro_region: *macro_region,
                sub_region: Some(name),
            });
        }
    }
    for (name, macro_region) in MACRO_REGIONS {
        if *name == needle {
            return Some(ResolvedRegion {
                macro_region: *macro_region,
                sub_region: None,
            });
        }
    }
    None
}

/// Classify the match between an account and a rep.
///
/// The account's territory takes precedence over its coarser region
/// field; the rep side uses its region.
#[must_use]
pub fn classify(account: &Account, rep: &Rep) -> GeoMatch {
    let account_region = account
        .territory
        .as_deref()
        .or(account.region.as_deref())
        .and_then(resolve);
    let rep_region = rep.region.as_deref().and_then(resolve);

    let (Some(a), Some(r)) = (account_region, rep_region) else {
        return GeoMatch::Unknown;
    };

    if a.macro_region != r.macro_region {
        return GeoMatch::Global;
    }
    match (a.sub_region, r.sub_region) {
        (Some(a_sub), Some(r_sub)) if a_sub == r_sub => GeoMatch::Exact,
        (Some(_), Some(_)) => GeoMatch::Sibling,
        (None, None) => GeoMatch::Exact,
        _ => GeoMatch::Parent,
    }
}

/// Geography score for the pair per the configured level scores.
#[must_use]
pub fn score(account: &Account, rep: &Rep, config: &GeographyConfig) -> f64 {
    match classify(account, rep) {
        GeoMatch::Exact => config.exact,
        GeoMatch::Sibling => config.sibling,
        GeoMatch::Parent => config.parent,
        GeoMatch::Global => config.global,
        GeoMatch::Unknown => config.unknown,
    }
}
