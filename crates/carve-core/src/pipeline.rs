//! Run orchestration.
//!
//! One `run` walks the full stage list: validate, strategic pool,
//! stability locks, score, build, solve, decode, cascade, metrics,
//! telemetry. Stages communicate through plain values; the only shared
//! state is the solver router and the telemetry recorder, both held by
//! reference.

use std::sync::mpsc::SyncSender;
use std::time::Instant;

use carve_lp::{RoutedSolve, SolveError, SolverRouter, SolverStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::cascade::cascade_children;
use crate::config::EngineConfig;
use crate::data::BuildData;
use crate::error::{EngineError, Warning};
use crate::locks::identify_locks;
use crate::metrics::{compute_metrics, RunMetrics};
use crate::model::{Account, AssignmentSource, BalanceMetric, Proposal, Rep};
use crate::problem::{build_problem, pair_allowed, BuiltProblem, PairScores};
use crate::rationale;
use crate::score::{rank_by_value, score_pair};
use crate::strategic::assign_strategic_pool;
use crate::telemetry::{RunRecord, TelemetryRecorder};

/// Primal value at or above which a relaxed binary counts as chosen.
const BINDING_THRESHOLD: f64 = 0.5;

/// Stage notifications for long runs. Delivery is best-effort; a full
/// or dropped receiver never affects the result.
#[derive(Debug, Clone)]
pub enum Progress {
    Validated { accounts: usize, reps: usize },
    StrategicAssigned { assigned: usize },
    LocksApplied { locked: usize, free: usize },
    ProblemBuilt { variables: usize, constraints: usize },
    Solved { backend: &'static str },
}

/// Per-run inputs that are not part of the snapshot.
#[derive(Debug)]
pub struct RunOptions {
    /// Anchor date for tenure and window math; injected so reruns over
    /// the same snapshot reproduce exactly.
    pub as_of: NaiveDate,
    pub run_id: String,
    /// Free-form batch label carried into telemetry.
    pub batch: String,
    pub progress: Option<SyncSender<Progress>>,
}

impl RunOptions {
    #[must_use]
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            run_id: format!("run-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S%3f")),
            batch: "all".to_string(),
            progress: None,
        }
    }
}

/// How the solve went, for output and telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSummary {
    pub backend: String,
    pub status: SolverStatus,
    pub objective_value: f64,
    pub variables: usize,
    pub constraints: usize,
    pub solve_millis: u128,
    pub fell_back: bool,
}

/// Everything a successful run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub proposals: Vec<Proposal>,
    /// Strategic accounts left out under the `leave_unassigned` fallback.
    pub unassigned: Vec<String>,
    pub metrics: RunMetrics,
    pub warnings: Vec<Warning>,
    /// `None` when no solve happened (empty or fully locked pool).
    pub solver: Option<SolverSummary>,
}

/// The engine: config plus a solver router, reusable across runs.
#[derive(Debug)]
pub struct Engine<'a> {
    config: &'a EngineConfig,
    router: &'a SolverRouter,
    telemetry: Option<&'a TelemetryRecorder>,
}

impl<'a> Engine<'a> {
    #[must_use]
    pub const fn new(config: &'a EngineConfig, router: &'a SolverRouter) -> Self {
        Self {
            config,
            router,
            telemetry: None,
        }
    }

    /// Attach a telemetry recorder. Without one, runs record nothing.
    #[must_use]
    pub const fn with_telemetry(mut self, recorder: &'a TelemetryRecorder) -> Self {
        self.telemetry = Some(recorder);
        self
    }

    /// Execute one full balancing run over a snapshot.
    ///
    /// # Errors
    ///
    /// [`EngineError`] on invalid data, an empty eligible rep set, or a
    /// solve that produced no usable solution. An empty account set is
    /// not an error; it yields a no-op outcome with a warning.
    pub fn run(&self, data: &BuildData, opts: &RunOptions) -> Result<RunOutcome, EngineError> {
        let span = info_span!("run", id = %opts.run_id, batch = %opts.batch);
        let _guard = span.enter();

        data.validate()?;
        let mut warnings = Vec::new();

        if data.accounts.is_empty() {
            warn!("account set is empty; nothing to optimize");
            warnings.push(Warning::EmptyAccountSet);
            let metrics = compute_metrics(&[], &[], &[], &[], self.config, 0.0);
            let outcome = RunOutcome {
                proposals: Vec::new(),
                unassigned: Vec::new(),
                metrics,
                warnings,
                solver: None,
            };
            self.submit_telemetry(data, opts, &outcome);
            return Ok(outcome);
        }
        if !data.reps.iter().any(Rep::participates) {
            return Err(EngineError::NoEligibleReps);
        }
        emit(
            opts,
            Progress::Validated {
                accounts: data.accounts.len(),
                reps: data.reps.len(),
            },
        );

        // Strategic pool first; those accounts never reach the solver.
        let strategic =
            assign_strategic_pool(data.accounts.clone(), &data.reps, &self.config.strategic);
        warnings.extend(strategic.warnings);
        let unassigned: Vec<String> = strategic.unassigned.iter().map(|a| a.id.clone()).collect();
        emit(
            opts,
            Progress::StrategicAssigned {
                assigned: strategic.proposals.len(),
            },
        );

        // Then stability locks over what remains.
        let locks = identify_locks(strategic.remaining, &data.reps, opts.as_of, &self.config.locks);
        warnings.extend(locks.warnings);
        emit(
            opts,
            Progress::LocksApplied {
                locked: locks.locked.len(),
                free: locks.free.len(),
            },
        );

        let mut proposals = strategic.proposals;
        for (account, lock) in locks.locked {
            proposals.push(Proposal {
                account_id: account.id,
                rep_id: lock.target_rep_id.clone(),
                source: AssignmentSource::Locked(lock.kind),
                scores: None,
                rationale: rationale::locked(&lock),
            });
        }

        let free = locks.free;
        let mut solver = None;
        let mut targets: Vec<(BalanceMetric, f64)> = Vec::new();
        let mut unresolved_slack = 0.0;

        if free.is_empty() {
            info!("no free accounts after strategic and lock stages; skipping solve");
        } else {
            let (optimized, solve_targets, slack, summary) =
                self.optimize(&free, data, opts, &mut warnings)?;
            proposals.extend(optimized);
            targets = solve_targets;
            unresolved_slack = slack;
            solver = Some(summary);
        }

        let children = cascade_children(&proposals, &data.accounts);
        proposals.extend(children);

        let metrics = compute_metrics(
            &proposals,
            &data.accounts,
            &data.reps,
            &targets,
            self.config,
            unresolved_slack,
        );
        info!(
            proposals = proposals.len(),
            warnings = warnings.len(),
            "run complete"
        );

        let outcome = RunOutcome {
            proposals,
            unassigned,
            metrics,
            warnings,
            solver,
        };
        self.submit_telemetry(data, opts, &outcome);
        Ok(outcome)
    }

    /// Build the LP text for a snapshot without solving it. Runs the
    /// strategic and lock stages first so the problem matches what a
    /// real run would hand the solver.
    ///
    /// # Errors
    ///
    /// Same validation as [`Engine::run`], plus a data error when no
    /// free accounts remain to optimize.
    pub fn build_lp(&self, data: &BuildData, opts: &RunOptions) -> Result<String, EngineError> {
        data.validate()?;
        if data.accounts.is_empty() {
            return Err(EngineError::Data("account set is empty".to_string()));
        }
        if !data.reps.iter().any(Rep::participates) {
            return Err(EngineError::NoEligibleReps);
        }
        let strategic =
            assign_strategic_pool(data.accounts.clone(), &data.reps, &self.config.strategic);
        let locks = identify_locks(strategic.remaining, &data.reps, opts.as_of, &self.config.locks);
        if locks.free.is_empty() {
            return Err(EngineError::Data(
                "no free accounts remain after strategic and lock stages".to_string(),
            ));
        }
        let assembled = self.assemble(&locks.free, data, opts.as_of)?;
        Ok(carve_lp::write_lp(&assembled.built.problem))
    }

    /// Pick optimization reps, score pairs, and build the MILP.
    fn assemble(
        &self,
        free: &[Account],
        data: &BuildData,
        as_of: NaiveDate,
    ) -> Result<Assembled, EngineError> {
        // Strategic accounts only reach here via the fall-through
        // fallback, which fires exactly when no strategic rep exists;
        // in that case they compete in the general pool. Departing reps
        // keep lock targets but never receive new assignments.
        let participating: Vec<Rep> = data
            .reps
            .iter()
            .filter(|r| r.participates() && !r.departing)
            .cloned()
            .collect();
        let has_strategic_reps = participating.iter().any(|r| r.strategic);
        let allowed = |account: &Account, rep: &Rep| {
            pair_allowed(account, rep) || (account.strategic && !has_strategic_reps)
        };

        // Reps with no eligible pair get no balance row; a row with an
        // empty load would just burn slack against the target.
        let reps: Vec<Rep> = participating
            .into_iter()
            .filter(|rep| free.iter().any(|account| allowed(account, rep)))
            .collect();
        if reps.is_empty() {
            return Err(EngineError::NoEligibleReps);
        }

        let order = rank_by_value(free);
        let mut rank_of = vec![0usize; free.len()];
        for (rank, &index) in order.iter().enumerate() {
            rank_of[index] = rank;
        }

        let weights = self.config.weights.normalized()?;
        let scores: PairScores = free
            .iter()
            .enumerate()
            .map(|(ai, account)| {
                reps.iter()
                    .map(|rep| {
                        allowed(account, rep)
                            .then(|| score_pair(account, rep, rank_of[ai], as_of, self.config))
                    })
                    .collect()
            })
            .collect();

        let built =
            build_problem(free, &reps, &scores, &weights, data.targets.as_ref(), self.config)?;
        Ok(Assembled { reps, scores, built })
    }

    /// Score the free pool, build the MILP, solve, and decode.
    fn optimize(
        &self,
        free: &[Account],
        data: &BuildData,
        opts: &RunOptions,
        warnings: &mut Vec<Warning>,
    ) -> Result<(Vec<Proposal>, Vec<(BalanceMetric, f64)>, f64, SolverSummary), EngineError> {
        let Assembled { reps, scores, built } = self.assemble(free, data, opts.as_of)?;
        let variables = built.problem.variable_count();
        let constraints = built.problem.constraint_count();
        if variables > self.router.embedded_var_limit() && !self.router.has_remote() {
            warnings.push(Warning::EmbeddedOverCapacity {
                variables,
                limit: self.router.embedded_var_limit(),
            });
        }
        emit(
            opts,
            Progress::ProblemBuilt {
                variables,
                constraints,
            },
        );

        let started = Instant::now();
        let routed = self.router.solve(&built.problem).map_err(engine_error)?;
        let solve_millis = started.elapsed().as_millis();
        emit(opts, Progress::Solved { backend: routed.backend });

        if routed.fell_back {
            warnings.push(Warning::SolverFellBack);
        }
        check_status(&routed, warnings)?;

        let mut proposals = Vec::new();
        for name in routed.response.binding(BINDING_THRESHOLD) {
            let Some(&(ai, ri)) = built.pair_index.get(name) else {
                continue; // slack variable
            };
            let Some(pair_scores) = scores[ai][ri] else {
                continue;
            };
            proposals.push(Proposal {
                account_id: free[ai].id.clone(),
                rep_id: reps[ri].id.clone(),
                source: AssignmentSource::Optimized,
                scores: Some(pair_scores),
                rationale: rationale::optimized(&pair_scores),
            });
        }

        let unresolved_slack: f64 = built
            .slack_names
            .iter()
            .map(|name| routed.response.primal(name))
            .sum();

        let summary = SolverSummary {
            backend: routed.backend.to_string(),
            status: routed.response.status,
            objective_value: routed.response.objective_value,
            variables,
            constraints,
            solve_millis,
            fell_back: routed.fell_back,
        };
        Ok((proposals, built.targets, unresolved_slack, summary))
    }

    fn submit_telemetry(&self, data: &BuildData, opts: &RunOptions, outcome: &RunOutcome) {
        let Some(recorder) = self.telemetry else {
            return;
        };
        let record = RunRecord {
            run_id: opts.run_id.clone(),
            batch: opts.batch.clone(),
            account_count: data.accounts.len(),
            rep_count: data.reps.len(),
            variable_count: outcome.solver.as_ref().map_or(0, |s| s.variables),
            constraint_count: outcome.solver.as_ref().map_or(0, |s| s.constraints),
            config: serde_json::to_value(self.config).unwrap_or(serde_json::Value::Null),
            solver_status: outcome.solver.as_ref().map(|s| format!("{:?}", s.status)),
            solver_backend: outcome.solver.as_ref().map(|s| s.backend.clone()),
            solve_millis: outcome.solver.as_ref().map(|s| s.solve_millis),
            warnings: outcome.warnings.iter().map(ToString::to_string).collect(),
            metrics: Some(outcome.metrics.clone()),
        };
        if recorder.record(record).is_some() {
            // Too late to attach the warning to the outcome; log only.
            warn!(run_id = %opts.run_id, "telemetry record dropped");
        }
    }
}

/// Output of the assembly step, shared by `optimize` and `build_lp`.
struct Assembled {
    reps: Vec<Rep>,
    scores: PairScores,
    built: BuiltProblem,
}

/// Map a routed status to the outcome policy: a time-limited solve with
/// columns is usable (warning), everything else fatal.
fn check_status(routed: &RoutedSolve, warnings: &mut Vec<Warning>) -> Result<(), EngineError> {
    match routed.response.status {
        SolverStatus::Optimal => Ok(()),
        SolverStatus::TimeLimit if !routed.response.columns.is_empty() => {
            warnings.push(Warning::SolverTimeLimit);
            Ok(())
        }
        SolverStatus::TimeLimit => Err(EngineError::TimeoutNoSolution),
        SolverStatus::Infeasible => Err(EngineError::Infeasible),
        SolverStatus::Error => Err(EngineError::SolverFailed {
            message: "backend reported an internal error".to_string(),
        }),
    }
}

fn engine_error(err: SolveError) -> EngineError {
    match err {
        SolveError::Timeout { .. } => EngineError::TimeoutNoSolution,
        SolveError::Backend { message } | SolveError::Malformed { message } => {
            EngineError::SolverFailed { message }
        }
        SolveError::Transport { message } => EngineError::SolverUnavailable { message },
    }
}

fn emit(opts: &RunOptions, progress: Progress) {
    if let Some(sender) = &opts.progress {
        // Best-effort only.
        let _ = sender.try_send(progress);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use carve_lp::EmbeddedSolver;

    use super::*;
    use crate::model::AccountKind;

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

    fn router() -> SolverRouter {
        SolverRouter::new(
            Box::new(EmbeddedSolver::new(Duration::from_secs(60))),
            None,
            5_000,
        )
    }

    fn opts() -> RunOptions {
        RunOptions::new(NaiveDate::from_ymd_opt(2026, 6, 1).expect("valid date"))
    }

    #[test]
    fn every_account_gets_exactly_one_proposal() {
        let data = BuildData {
            accounts: vec![
                account("a1", 100.0),
                account("a2", 200.0),
                account("a3", 300.0),
            ],
            reps: vec![rep("r1"), rep("r2")],
            targets: None,
        };
        let config = EngineConfig::default();
        let router = router();
        let outcome = Engine::new(&config, &router)
            .run(&data, &opts())
            .expect("runs");

        assert_eq!(outcome.proposals.len(), 3);
        let mut ids: Vec<&str> = outcome.proposals.iter().map(|p| p.account_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        let summary = outcome.solver.expect("solved");
        assert_eq!(summary.status, SolverStatus::Optimal);
        assert_eq!(summary.backend, "embedded-microlp");
    }

    #[test]
    fn empty_account_set_is_a_warned_no_op() {
        let data = BuildData {
            accounts: Vec::new(),
            reps: vec![rep("r1")],
            targets: None,
        };
        let config = EngineConfig::default();
        let router = router();
        let outcome = Engine::new(&config, &router)
            .run(&data, &opts())
            .expect("no-op");

        assert!(outcome.proposals.is_empty());
        assert!(outcome.solver.is_none());
        assert!(outcome.warnings.contains(&Warning::EmptyAccountSet));
    }

    #[test]
    fn no_eligible_reps_is_fatal() {
        let mut inactive = rep("r1");
        inactive.active = false;
        let data = BuildData {
            accounts: vec![account("a1", 100.0)],
            reps: vec![inactive],
            targets: None,
        };
        let config = EngineConfig::default();
        let router = router();
        let err = Engine::new(&config, &router)
            .run(&data, &opts())
            .expect_err("fatal");
        assert!(matches!(err, EngineError::NoEligibleReps));
    }

    #[test]
    fn locked_accounts_keep_their_target_rep() {
        let mut locked = account("a1", 500.0);
        locked.owner_id = Some("r2".to_string());
        locked.at_risk = true;
        let data = BuildData {
            accounts: vec![locked, account("a2", 100.0)],
            reps: vec![rep("r1"), rep("r2")],
            targets: None,
        };
        let config = EngineConfig::default();
        let router = router();
        let outcome = Engine::new(&config, &router)
            .run(&data, &opts())
            .expect("runs");

        let lock_proposal = outcome
            .proposals
            .iter()
            .find(|p| p.account_id == "a1")
            .expect("locked account proposed");
        assert_eq!(lock_proposal.rep_id, "r2");
        assert!(matches!(lock_proposal.source, AssignmentSource::Locked(_)));
    }

    #[test]
    fn strategic_accounts_stay_with_strategic_reps() {
        let mut whale = account("a1", 900.0);
        whale.strategic = true;
        let mut s1 = rep("s1");
        s1.strategic = true;
        let data = BuildData {
            accounts: vec![whale, account("a2", 100.0)],
            reps: vec![rep("r1"), s1],
            targets: None,
        };
        let config = EngineConfig::default();
        let router = router();
        let outcome = Engine::new(&config, &router)
            .run(&data, &opts())
            .expect("runs");

        let whale_proposal = outcome
            .proposals
            .iter()
            .find(|p| p.account_id == "a1")
            .expect("strategic account proposed");
        assert_eq!(whale_proposal.rep_id, "s1");
        assert_eq!(whale_proposal.source, AssignmentSource::Strategic);

        let other = outcome
            .proposals
            .iter()
            .find(|p| p.account_id == "a2")
            .expect("free account proposed");
        assert_eq!(other.rep_id, "r1");
    }

    #[test]
    fn cascaded_children_follow_the_parent() {
        let mut parent = account("p1", 400.0);
        parent.child_ids = vec!["c1".to_string()];
        let data = BuildData {
            accounts: vec![parent],
            reps: vec![rep("r1")],
            targets: None,
        };
        let config = EngineConfig::default();
        let router = router();
        let outcome = Engine::new(&config, &router)
            .run(&data, &opts())
            .expect("runs");

        assert_eq!(outcome.proposals.len(), 2);
        let child = outcome
            .proposals
            .iter()
            .find(|p| p.account_id == "c1")
            .expect("child proposed");
        assert_eq!(child.rep_id, "r1");
        assert_eq!(child.source, AssignmentSource::Cascaded);
    }

    #[test]
    fn build_lp_renders_the_problem_text() {
        let data = BuildData {
            accounts: vec![account("a1", 100.0), account("a2", 200.0)],
            reps: vec![rep("r1"), rep("r2")],
            targets: None,
        };
        let config = EngineConfig::default();
        let router = router();
        let text = Engine::new(&config, &router)
            .build_lp(&data, &opts())
            .expect("builds");

        assert!(text.starts_with("Maximize"));
        assert!(text.contains("assign_a1:"));
        assert!(text.contains("x_a1_r1"));
        assert!(text.trim_end().ends_with("End"));
    }

    #[test]
    fn reruns_produce_identical_proposals() {
        let data = BuildData {
            accounts: vec![
                account("a1", 120.0),
                account("a2", 120.0),
                account("a3", 90.0),
                account("a4", 90.0),
            ],
            reps: vec![rep("r1"), rep("r2")],
            targets: None,
        };
        let config = EngineConfig::default();
        let router = router();
        let engine = Engine::new(&config, &router);

        let first = engine.run(&data, &opts()).expect("first run");
        let second = engine.run(&data, &opts()).expect("second run");
        assert_eq!(first.proposals, second.proposals);
    }
}
