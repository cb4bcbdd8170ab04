//! MILP construction: decision variables, assignment constraints, and
//! the three-tier soft balance scheme.
//!
//! One binary `x_<account>_<rep>` per eligible pair. One equality per
//! account forcing exactly one rep. Balance is never a hard cap:
//! per rep and per enabled metric, six non-negative slack variables
//! absorb the deviation from the target load T in three nested tiers,
//!
//! ```text
//! load(rep) = T + oa − ua + ob − ub + om − um
//!   oa, ua ≤ v·T          (variance band, cheap)
//!   ob, ub ≤ (w−v)·T      (buffer zone, pricier)
//!   om, um unbounded      (big-M, prohibitive)
//! ```
//!
//! with penalties alpha ≪ beta ≪ big-M subtracted from the objective.
//! The result is a convex piecewise-linear cost: free to sit near
//! target, expensive to drift, ruinous to blow past the buffer — but
//! never infeasible.

use std::collections::HashMap;

use carve_lp::{ConstraintOp, LpProblem};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::data::BalanceTargets;
use crate::error::EngineError;
use crate::model::{Account, AssignmentScores, BalanceMetric, Rep};
use crate::score::NormalizedWeights;

/// A built problem plus the index to decode solved variables.
#[derive(Debug)]
pub struct BuiltProblem {
    pub problem: LpProblem,
    /// Variable name → (account index, rep index) into the build inputs.
    pub pair_index: HashMap<String, (usize, usize)>,
    /// Per-metric target load used for the balance constraints.
    pub targets: Vec<(BalanceMetric, f64)>,
    /// Names of all slack variables, for the unresolved-slack metric.
    pub slack_names: Vec<String>,
}

/// Scores for every eligible pair, indexed `[account][rep]`; `None`
/// marks a pair excluded by hard filters.
pub type PairScores = Vec<Vec<Option<AssignmentScores>>>;

/// Assemble the MILP from free accounts, eligible reps, and pair scores.
///
/// Per-metric targets come from the loader when supplied, otherwise
/// total metric value over rep count.
///
/// # Errors
///
/// `EngineError::Data` if an account has no eligible pair at all (a
/// hard-filter contradiction that would make the problem trivially
/// infeasible).
pub fn build_problem(
    accounts: &[Account],
    reps: &[Rep],
    scores: &PairScores,
    weights: &NormalizedWeights,
    supplied_targets: Option<&BalanceTargets>,
    config: &EngineConfig,
) -> Result<BuiltProblem, EngineError> {
    let mut problem = LpProblem::new();
    let mut pair_index = HashMap::new();

    // Decision variables and objective coefficients.
    for (ai, account) in accounts.iter().enumerate() {
        let mut any = false;
        for (ri, rep) in reps.iter().enumerate() {
            let Some(pair_scores) = scores[ai][ri] else {
                continue;
            };
            any = true;
            let name = var_name(&account.id, &rep.id);
            problem
                .add_binary(name.clone())
                .map_err(|e| EngineError::Data(e.to_string()))?;
            problem
                .set_objective(&name, weights.coefficient(&pair_scores))
                .map_err(|e| EngineError::Data(e.to_string()))?;
            pair_index.insert(name, (ai, ri));
        }
        if !any {
            return Err(EngineError::Data(format!(
                "account {} has no eligible rep after hard filters",
                account.id
            )));
        }
    }

    // Exactly one rep per account.
    for (ai, account) in accounts.iter().enumerate() {
        let terms: Vec<(String, f64)> = reps
            .iter()
            .enumerate()
            .filter(|(ri, _)| scores[ai][*ri].is_some())
            .map(|(_, rep)| (var_name(&account.id, &rep.id), 1.0))
            .collect();
        problem
            .add_constraint(format!("assign_{}", account.id), terms, ConstraintOp::Eq, 1.0)
            .map_err(|e| EngineError::Data(e.to_string()))?;
    }

    // Three-tier balance slacks per rep per enabled metric.
    let mut targets = Vec::new();
    let mut slack_names = Vec::new();
    #[allow(clippy::cast_precision_loss)]
    let rep_count = reps.len() as f64;
    for metric in config.enabled_metrics() {
        let total: f64 = accounts.iter().map(|a| a.metric_value(metric)).sum();
        let computed = if reps.is_empty() { 0.0 } else { total / rep_count };
        let target = supplied_targets
            .and_then(|t| t.for_metric(metric))
            .unwrap_or(computed);
        targets.push((metric, target));

        let alpha_bound = config.balance.variance_band_pct * target;
        let beta_bound =
            (config.balance.buffer_zone_pct - config.balance.variance_band_pct) * target;

        for (ri, rep) in reps.iter().enumerate() {
            let tiers = [
                ("oa", alpha_bound, -config.balance.penalty_alpha),
                ("ua", alpha_bound, -config.balance.penalty_alpha),
                ("ob", beta_bound, -config.balance.penalty_beta),
                ("ub", beta_bound, -config.balance.penalty_beta),
                ("om", f64::INFINITY, -config.balance.penalty_big_m),
                ("um", f64::INFINITY, -config.balance.penalty_big_m),
            ];
            for (tag, bound, penalty) in tiers {
                let name = slack_name(tag, &rep.id, metric);
                problem
                    .add_continuous(name.clone(), 0.0, bound)
                    .map_err(|e| EngineError::Data(e.to_string()))?;
                problem
                    .set_objective(&name, penalty)
                    .map_err(|e| EngineError::Data(e.to_string()))?;
                slack_names.push(name);
            }

            // load − (oa − ua + ob − ub + om − um) = T
            let mut terms: Vec<(String, f64)> = accounts
                .iter()
                .enumerate()
                .filter(|(ai, _)| scores[*ai][ri].is_some())
                .map(|(_, account)| {
                    (var_name(&account.id, &rep.id), account.metric_value(metric))
                })
                .collect();
            terms.push((slack_name("oa", &rep.id, metric), -1.0));
            terms.push((slack_name("ua", &rep.id, metric), 1.0));
            terms.push((slack_name("ob", &rep.id, metric), -1.0));
            terms.push((slack_name("ub", &rep.id, metric), 1.0));
            terms.push((slack_name("om", &rep.id, metric), -1.0));
            terms.push((slack_name("um", &rep.id, metric), 1.0));
            problem
                .add_constraint(
                    format!("bal_{}_{}", rep.id, metric.as_str()),
                    terms,
                    ConstraintOp::Eq,
                    target,
                )
                .map_err(|e| EngineError::Data(e.to_string()))?;
        }
        debug!(metric = metric.as_str(), target, "balance tier added");
    }

    info!(
        variables = problem.variable_count(),
        binaries = problem.binary_count(),
        constraints = problem.constraint_count(),
        "problem built"
    );
    Ok(BuiltProblem {
        problem,
        pair_index,
        targets,
        slack_names,
    })
}

/// Decision-variable name for a pair. Account and rep ids are used
/// verbatim; the data layer guarantees LP-safe identifiers.
#[must_use]
pub fn var_name(account_id: &str, rep_id: &str) -> String {
    format!("x_{account_id}_{rep_id}")
}

/// Slack-variable name: tier tag, rep, metric.
#[must_use]
pub fn slack_name(tag: &str, rep_id: &str, metric: BalanceMetric) -> String {
    format!("{tag}_{rep_id}_{}", metric.as_str())
}

/// Whether a pair survives the hard filters: strategic accounts bind
/// only to strategic reps and vice versa.
#[must_use]
pub const fn pair_allowed(account: &Account, rep: &Rep) -> bool {
    account.strategic == rep.strategic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccountKind;
    use crate::score::NormalizedWeights;

    fn account(id: &str, arr: f64) -> Account {
        Account {
            id: id.to_string(),
            name: id.to_string(),
            kind: AccountKind::Customer,
            arr,
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

    fn uniform_scores(accounts: usize, reps: usize) -> PairScores {
        vec![
            vec![
                Some(AssignmentScores {
                    continuity: 0.5,
                    geography: 0.5,
                    team: None,
                    tie_breaker: 0.0,
                });
                reps
            ];
            accounts
        ]
    }

    fn weights() -> NormalizedWeights {
        NormalizedWeights {
            continuity: 0.5,
            geography: 0.3,
            team: 0.2,
        }
    }

    #[test]
    fn builds_one_binary_per_pair_and_one_assignment_per_account() {
        let accounts = vec![account("a1", 100.0), account("a2", 200.0)];
        let reps = vec![rep("r1"), rep("r2"), rep("r3")];
        let scores = uniform_scores(2, 3);
        let config = EngineConfig::default();

        let built =
            build_problem(&accounts, &reps, &scores, &weights(), None, &config).expect("builds");
        assert_eq!(built.problem.binary_count(), 6);
        assert_eq!(built.pair_index.len(), 6);
        // 2 assignment constraints + 3 reps × 1 metric balance rows.
        assert_eq!(built.problem.constraint_count(), 2 + 3);
        // 6 slacks per rep per metric.
        assert_eq!(built.slack_names.len(), 18);
    }

    #[test]
    fn excluded_pairs_get_no_variable() {
        let accounts = vec![account("a1", 100.0)];
        let reps = vec![rep("r1"), rep("r2")];
        let mut scores = uniform_scores(1, 2);
        scores[0][1] = None;
        let config = EngineConfig::default();

        let built =
            build_problem(&accounts, &reps, &scores, &weights(), None, &config).expect("builds");
        assert!(built.problem.contains_variable("x_a1_r1"));
        assert!(!built.problem.contains_variable("x_a1_r2"));
    }

    #[test]
    fn account_with_no_eligible_pair_is_a_data_error() {
        let accounts = vec![account("a1", 100.0)];
        let reps = vec![rep("r1")];
        let scores: PairScores = vec![vec![None]];
        let config = EngineConfig::default();

        let err = build_problem(&accounts, &reps, &scores, &weights(), None, &config)
            .expect_err("contradiction");
        assert!(matches!(err, EngineError::Data(_)));
    }

    #[test]
    fn balance_target_is_total_over_rep_count() {
        let accounts = vec![account("a1", 100.0), account("a2", 200.0), account("a3", 300.0)];
        let reps = vec![rep("r1"), rep("r2")];
        let scores = uniform_scores(3, 2);
        let config = EngineConfig::default();

        let built =
            build_problem(&accounts, &reps, &scores, &weights(), None, &config).expect("builds");
        let (metric, target) = built.targets[0];
        assert_eq!(metric, BalanceMetric::Arr);
        assert!((target - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn loader_supplied_target_overrides_the_computed_one() {
        let accounts = vec![account("a1", 100.0), account("a2", 200.0)];
        let reps = vec![rep("r1"), rep("r2")];
        let scores = uniform_scores(2, 2);
        let config = EngineConfig::default();
        let supplied = BalanceTargets {
            arr: Some(500.0),
            ..BalanceTargets::default()
        };

        let built = build_problem(&accounts, &reps, &scores, &weights(), Some(&supplied), &config)
            .expect("builds");
        let (metric, target) = built.targets[0];
        assert_eq!(metric, BalanceMetric::Arr);
        assert!((target - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn strategic_mismatch_is_filtered() {
        let mut strategic_account = account("a1", 100.0);
        strategic_account.strategic = true;
        let normal_rep = rep("r1");
        let mut strategic_rep = rep("r2");
        strategic_rep.strategic = true;

        assert!(!pair_allowed(&strategic_account, &normal_rep));
        assert!(pair_allowed(&strategic_account, &strategic_rep));
        assert!(pair_allowed(&account("a2", 0.0), &normal_rep));
        assert!(!pair_allowed(&account("a2", 0.0), &strategic_rep));
    }

    #[test]
    fn disabling_all_metrics_skips_balance_rows() {
        let accounts = vec![account("a1", 100.0)];
        let reps = vec![rep("r1")];
        let scores = uniform_scores(1, 1);
        let mut config = EngineConfig::default();
        config.balance.balance_arr = false;

        let built =
            build_problem(&accounts, &reps, &scores, &weights(), None, &config).expect("builds");
        assert_eq!(built.problem.constraint_count(), 1);
        assert!(built.slack_names.is_empty());
        assert!(built.targets.is_empty());
    }
}
