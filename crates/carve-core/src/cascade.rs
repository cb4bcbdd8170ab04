//! Cascade: children follow their parent's final rep.
//!
//! Child accounts were aggregated into parents before optimization and
//! never became decision variables. After the proposal list is final,
//! every child gets a proposal pointing at its parent's rep.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{Account, AssignmentSource, Proposal};
use crate::rationale;

/// Append one proposal per child of every proposed parent.
///
/// `accounts` must contain every parent referenced by `proposals`;
/// parents without children contribute nothing.
#[must_use]
pub fn cascade_children(proposals: &[Proposal], accounts: &[Account]) -> Vec<Proposal> {
    let by_id: HashMap<&str, &Account> =
        accounts.iter().map(|a| (a.id.as_str(), a)).collect();

    let mut children = Vec::new();
    for proposal in proposals {
        let Some(parent) = by_id.get(proposal.account_id.as_str()) else {
            continue;
        };
        for child_id in &parent.child_ids {
            debug!(child = %child_id, parent = %parent.id, rep = %proposal.rep_id, "cascade");
            children.push(Proposal {
                account_id: child_id.clone(),
                rep_id: proposal.rep_id.clone(),
                source: AssignmentSource::Cascaded,
                scores: None,
                rationale: rationale::cascaded(&parent.id),
            });
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccountKind;

    fn parent(id: &str, children: &[&str]) -> Account {
        Account {
            id: id.to_string(),
            name: id.to_string(),
            kind: AccountKind::Customer,
            arr: 0.0,
            atr: 0.0,
            pipeline: 0.0,
            owner_id: None,
            owner_since: None,
            owner_count: 0,
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
            child_ids: children.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    fn proposal(account_id: &str, rep_id: &str) -> Proposal {
        Proposal {
            account_id: account_id.to_string(),
            rep_id: rep_id.to_string(),
            source: AssignmentSource::Optimized,
            scores: None,
            rationale: String::new(),
        }
    }

    #[test]
    fn children_inherit_the_parent_rep() {
        let accounts = vec![parent("p1", &["c1", "c2"]), parent("p2", &[])];
        let proposals = vec![proposal("p1", "r1"), proposal("p2", "r2")];

        let children = cascade_children(&proposals, &accounts);
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.rep_id == "r1"));
        assert!(children.iter().all(|c| c.source == AssignmentSource::Cascaded));
        assert!(children[0].rationale.contains("p1"));
    }

    #[test]
    fn childless_parents_cascade_nothing() {
        let accounts = vec![parent("p1", &[])];
        let proposals = vec![proposal("p1", "r1")];
        assert!(cascade_children(&proposals, &accounts).is_empty());
    }
}
