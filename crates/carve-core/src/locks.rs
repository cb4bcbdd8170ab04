//! Stability lock identification.
//!
//! Each free account is checked against the lock rules in fixed priority
//! order; the first match wins and pins the account to a target rep,
//! removing it from the decision space. Rule order lives in
//! [`LockKind::ALL`] and is not configurable.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::LockConfig;
use crate::error::Warning;
use crate::model::{Account, LockKind, Rep, StabilityLock};

/// Outcome of the lock stage: two disjoint sets plus diagnostics.
#[derive(Debug)]
pub struct LockOutcome {
    /// Locked accounts with their locks, in input order.
    pub locked: Vec<(Account, StabilityLock)>,
    /// Accounts free for optimization.
    pub free: Vec<Account>,
    /// How many locks each rule produced.
    pub counts: BTreeMap<LockKind, usize>,
    pub warnings: Vec<Warning>,
}

/// Evaluate lock rules for every account.
///
/// A lock whose target rep is not in the eligible set is downgraded to a
/// warning and the account stays free — locked proposals must always
/// reference a real rep.
#[must_use]
pub fn identify_locks(
    accounts: Vec<Account>,
    reps: &[Rep],
    as_of: NaiveDate,
    config: &LockConfig,
) -> LockOutcome {
    let eligible: HashSet<&str> = reps
        .iter()
        .filter(|r| r.participates())
        .map(|r| r.id.as_str())
        .collect();

    let mut locked = Vec::new();
    let mut free = Vec::new();
    let mut counts: BTreeMap<LockKind, usize> = BTreeMap::new();
    let mut warnings = Vec::new();

    for account in accounts {
        match evaluate(&account, as_of, config) {
            Some(lock) if eligible.contains(lock.target_rep_id.as_str()) => {
                debug!(
                    account = %account.id,
                    rep = %lock.target_rep_id,
                    kind = lock.kind.as_str(),
                    "stability lock"
                );
                *counts.entry(lock.kind).or_insert(0) += 1;
                locked.push((account, lock));
            }
            Some(lock) => {
                warnings.push(Warning::LockTargetIneligible {
                    account_id: account.id.clone(),
                    kind: lock.kind,
                    target_rep_id: lock.target_rep_id,
                });
                free.push(account);
            }
            None => free.push(account),
        }
    }

    info!(
        locked = locked.len(),
        free = free.len(),
        "stability lock pass complete"
    );
    LockOutcome {
        locked,
        free,
        counts,
        warnings,
    }
}

/// First matching rule in [`LockKind::ALL`] order, if any.
#[must_use]
pub fn evaluate(account: &Account, as_of: NaiveDate, config: &LockConfig) -> Option<StabilityLock> {
    for kind in LockKind::ALL {
        if let Some(lock) = match kind {
            LockKind::ManualExclusion => manual_exclusion(account),
            LockKind::BackfillMigration => backfill_migration(account),
            LockKind::AtRisk => at_risk(account),
            LockKind::RenewalWindow => renewal_window(account, as_of, config),
            LockKind::PeFirmRouting => pe_firm_routing(account, config),
            LockKind::RecentOwnerChange => recent_owner_change(account, as_of, config),
        } {
            return Some(lock);
        }
    }
    None
}

/// Most rules pin to the current owner; no owner means no lock.
fn lock_to_owner(account: &Account, kind: LockKind, reason: String) -> Option<StabilityLock> {
    account.owner_id.as_ref().map(|owner| StabilityLock {
        kind,
        target_rep_id: owner.clone(),
        reason,
    })
}

fn manual_exclusion(account: &Account) -> Option<StabilityLock> {
    if !account.manual_exclusion {
        return None;
    }
    lock_to_owner(
        account,
        LockKind::ManualExclusion,
        "manually excluded from rebalancing".to_string(),
    )
}

fn backfill_migration(account: &Account) -> Option<StabilityLock> {
    let target = account.backfill_target.as_ref()?;
    Some(StabilityLock {
        kind: LockKind::BackfillMigration,
        target_rep_id: target.clone(),
        reason: "owner departing; pre-defined backfill migration".to_string(),
    })
}

fn at_risk(account: &Account) -> Option<StabilityLock> {
    if !account.at_risk {
        return None;
    }
    lock_to_owner(
        account,
        LockKind::AtRisk,
        "at-risk account stays with current owner".to_string(),
    )
}

fn renewal_window(
    account: &Account,
    as_of: NaiveDate,
    config: &LockConfig,
) -> Option<StabilityLock> {
    let renewal = account.renewal_date?;
    let days_out = (renewal - as_of).num_days();
    if days_out < 0 || days_out > i64::from(config.renewal_window_days) {
        return None;
    }
    lock_to_owner(
        account,
        LockKind::RenewalWindow,
        format!("renewal in {days_out} days (window {})", config.renewal_window_days),
    )
}

fn pe_firm_routing(account: &Account, config: &LockConfig) -> Option<StabilityLock> {
    let firm = account.pe_firm.as_ref()?;
    let rep_id = config.pe_firm_routes.get(firm)?;
    Some(StabilityLock {
        kind: LockKind::PeFirmRouting,
        target_rep_id: rep_id.clone(),
        reason: format!("PE firm {firm} routes to a dedicated rep"),
    })
}

fn recent_owner_change(
    account: &Account,
    as_of: NaiveDate,
    config: &LockConfig,
) -> Option<StabilityLock> {
    let owner_since = account.owner_since?;
    let days = (as_of - owner_since).num_days();
    if days < 0 || days > i64::from(config.owner_change_window_days) {
        return None;
    }
    lock_to_owner(
        account,
        LockKind::RecentOwnerChange,
        format!(
            "owner changed {days} days ago (window {})",
            config.owner_change_window_days
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccountKind;

    fn account(id: &str, owner: Option<&str>) -> Account {
        Account {
            id: id.to_string(),
            name: id.to_string(),
            kind: AccountKind::Customer,
            arr: 0.0,
            atr: 0.0,
            pipeline: 0.0,
            owner_id: owner.map(str::to_string),
            owner_since: None,
            owner_count: 1,
            strategic: false,
            territory: None,
            region: None,
            employee_count: None,
            commercial_tier: None,
            at_risk: false,
            renewal_date: None,
            pe_firm: None,
            manual_exclusion: false,
            backfill_target: None,
            child_ids: Vec::new(),
        }
    }

    fn rep(id: &str) -> Rep {
        Rep {
            id: id.to_string(),
            name: id.to_string(),
            region: None,
            tier: None,
            strategic: false,
            departing: false,
            active: true,
            eligible: true,
            current_arr: 0.0,
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date")
    }

    #[test]
    fn renewal_inside_window_locks_to_owner() {
        let mut acct = account("a1", Some("r7"));
        acct.renewal_date = NaiveDate::from_ymd_opt(2026, 6, 11); // 10 days out
        let config = LockConfig {
            renewal_window_days: 30,
            ..LockConfig::default()
        };

        let lock = evaluate(&acct, as_of(), &config).expect("locks");
        assert_eq!(lock.kind, LockKind::RenewalWindow);
        assert_eq!(lock.target_rep_id, "r7");
        assert!(lock.reason.contains("10 days"));
    }

    #[test]
    fn renewal_outside_window_does_not_lock() {
        let mut acct = account("a1", Some("r7"));
        acct.renewal_date = NaiveDate::from_ymd_opt(2026, 12, 1);
        assert!(evaluate(&acct, as_of(), &LockConfig::default()).is_none());
    }

    #[test]
    fn past_renewal_does_not_lock() {
        let mut acct = account("a1", Some("r7"));
        acct.renewal_date = NaiveDate::from_ymd_opt(2026, 5, 1);
        assert!(evaluate(&acct, as_of(), &LockConfig::default()).is_none());
    }

    #[test]
    fn manual_exclusion_wins_over_everything() {
        let mut acct = account("a1", Some("r1"));
        acct.manual_exclusion = true;
        acct.at_risk = true;
        acct.backfill_target = Some("r9".to_string());

        let lock = evaluate(&acct, as_of(), &LockConfig::default()).expect("locks");
        assert_eq!(lock.kind, LockKind::ManualExclusion);
        assert_eq!(lock.target_rep_id, "r1");
    }

    #[test]
    fn backfill_migration_targets_the_migration_rep_not_the_owner() {
        let mut acct = account("a1", Some("r1"));
        acct.backfill_target = Some("r9".to_string());
        acct.at_risk = true; // lower priority than backfill

        let lock = evaluate(&acct, as_of(), &LockConfig::default()).expect("locks");
        assert_eq!(lock.kind, LockKind::BackfillMigration);
        assert_eq!(lock.target_rep_id, "r9");
    }

    #[test]
    fn pe_firm_routes_to_mapped_rep() {
        let mut acct = account("a1", Some("r1"));
        acct.pe_firm = Some("Summit Partners".to_string());
        let mut config = LockConfig::default();
        config
            .pe_firm_routes
            .insert("Summit Partners".to_string(), "r-pe".to_string());

        let lock = evaluate(&acct, as_of(), &config).expect("locks");
        assert_eq!(lock.kind, LockKind::PeFirmRouting);
        assert_eq!(lock.target_rep_id, "r-pe");
    }

    #[test]
    fn unmapped_pe_firm_does_not_lock() {
        let mut acct = account("a1", Some("r1"));
        acct.pe_firm = Some("Unknown Capital".to_string());
        assert!(evaluate(&acct, as_of(), &LockConfig::default()).is_none());
    }

    #[test]
    fn recent_owner_change_locks_inside_window() {
        let mut acct = account("a1", Some("r1"));
        acct.owner_since = NaiveDate::from_ymd_opt(2026, 5, 1); // 31 days ago
        let lock = evaluate(&acct, as_of(), &LockConfig::default()).expect("locks");
        assert_eq!(lock.kind, LockKind::RecentOwnerChange);
    }

    #[test]
    fn risk_lock_requires_an_owner() {
        let mut acct = account("a1", None);
        acct.at_risk = true;
        assert!(evaluate(&acct, as_of(), &LockConfig::default()).is_none());
    }

    #[test]
    fn ineligible_target_downgrades_to_warning() {
        let mut acct = account("a1", Some("r-gone"));
        acct.at_risk = true;
        let outcome = identify_locks(vec![acct], &[rep("r1")], as_of(), &LockConfig::default());

        assert!(outcome.locked.is_empty());
        assert_eq!(outcome.free.len(), 1);
        assert!(matches!(
            &outcome.warnings[0],
            Warning::LockTargetIneligible { target_rep_id, .. } if target_rep_id == "r-gone"
        ));
    }

    #[test]
    fn counts_aggregate_per_kind() {
        let mut a1 = account("a1", Some("r1"));
        a1.at_risk = true;
        let mut a2 = account("a2", Some("r1"));
        a2.at_risk = true;
        let mut a3 = account("a3", Some("r1"));
        a3.manual_exclusion = true;
        let free = account("a4", Some("r1"));

        let outcome = identify_locks(
            vec![a1, a2, a3, free],
            &[rep("r1")],
            as_of(),
            &LockConfig::default(),
        );

        assert_eq!(outcome.counts.get(&LockKind::AtRisk), Some(&2));
        assert_eq!(outcome.counts.get(&LockKind::ManualExclusion), Some(&1));
        assert_eq!(outcome.locked.len(), 3);
        assert_eq!(outcome.free.len(), 1);
    }
}
