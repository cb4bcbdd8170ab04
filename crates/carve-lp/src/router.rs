//! Backend selection and failure fallback.
//!
//! Small problems solve in-process; large ones go to the remote native
//! service. A crash on the embedded path (memory, solver bug) gets one
//! retry against the remote backend before the error surfaces. The
//! router is an explicit object constructed once and passed by
//! reference — no lazy globals.

use tracing::{debug, warn};

use crate::backend::{SolveError, SolverBackend, SolverResponse};
use crate::problem::LpProblem;

/// Default variable-count ceiling for the embedded path.
pub const DEFAULT_EMBEDDED_VAR_LIMIT: usize = 5_000;

/// A solve result annotated with the backend that produced it.
#[derive(Debug)]
pub struct RoutedSolve {
    pub response: SolverResponse,
    /// Backend name, for logs and telemetry.
    pub backend: &'static str,
    /// True when the embedded path failed and the remote answered.
    pub fell_back: bool,
}

/// Routes problems to a backend by size and handles embedded failure.
pub struct SolverRouter {
    embedded: Box<dyn SolverBackend>,
    remote: Option<Box<dyn SolverBackend>>,
    embedded_var_limit: usize,
}

impl std::fmt::Debug for SolverRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverRouter")
            .field("embedded", &self.embedded.name())
            .field("remote", &self.remote.as_ref().map(|r| r.name()))
            .field("embedded_var_limit", &self.embedded_var_limit)
            .finish()
    }
}

impl SolverRouter {
    #[must_use]
    pub fn new(
        embedded: Box<dyn SolverBackend>,
        remote: Option<Box<dyn SolverBackend>>,
        embedded_var_limit: usize,
    ) -> Self {
        Self {
            embedded,
            remote,
            embedded_var_limit,
        }
    }

    /// Solve via the backend chosen by problem size.
    ///
    /// Routing:
    /// - at most `embedded_var_limit` variables → embedded;
    /// - larger → remote, or embedded with a warning when no remote
    ///   endpoint is configured;
    /// - embedded `Backend` failure → one retry on the remote, if any.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`SolveError`] once fallback options are
    /// exhausted.
    pub fn solve(&self, problem: &LpProblem) -> Result<RoutedSolve, SolveError> {
        let vars = problem.variable_count();
        let use_embedded = vars <= self.embedded_var_limit || self.remote.is_none();

        if vars > self.embedded_var_limit && self.remote.is_none() {
            warn!(
                variables = vars,
                limit = self.embedded_var_limit,
                "problem exceeds embedded limit but no remote solver is configured"
            );
        }

        if use_embedded {
            debug!(variables = vars, backend = self.embedded.name(), "routing solve");
            match self.embedded.solve(problem) {
                Ok(response) => {
                    return Ok(RoutedSolve {
                        response,
                        backend: self.embedded.name(),
                        fell_back: false,
                    })
                }
                Err(SolveError::Backend { message }) => {
                    // Embedded process failure; the remote service may
                    // still get an answer out of the same problem.
                    if let Some(remote) = &self.remote {
                        warn!(%message, "embedded solver failed; retrying on remote backend");
                        let response = remote.solve(problem)?;
                        return Ok(RoutedSolve {
                            response,
                            backend: remote.name(),
                            fell_back: true,
                        });
                    }
                    return Err(SolveError::Backend { message });
                }
                Err(err) => return Err(err),
            }
        }

        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| SolveError::Backend {
                message: "no remote solver configured".to_string(),
            })?;
        debug!(variables = vars, backend = remote.name(), "routing solve");
        let response = remote.solve(problem)?;
        Ok(RoutedSolve {
            response,
            backend: remote.name(),
            fell_back: false,
        })
    }

    #[must_use]
    pub const fn embedded_var_limit(&self) -> usize {
        self.embedded_var_limit
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::backend::{Column, SolverStatus};

    /// Scripted backend for router tests.
    struct FakeBackend {
        label: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl FakeBackend {
        fn boxed(label: &'static str, fail: bool, calls: &Arc<AtomicUsize>) -> Box<Self> {
            Box::new(Self {
                label,
                fail,
                calls: Arc::clone(calls),
            })
        }
    }

    impl SolverBackend for FakeBackend {
        fn solve(&self, _problem: &LpProblem) -> Result<SolverResponse, SolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SolveError::Backend {
                    message: "scripted failure".to_string(),
                });
            }
            Ok(SolverResponse {
                status: SolverStatus::Optimal,
                objective_value: 1.0,
                columns: HashMap::from([("x".to_string(), Column { primal: 1.0 })]),
            })
        }

        fn name(&self) -> &'static str {
            self.label
        }
    }

    fn problem_with_vars(n: usize) -> LpProblem {
        let mut p = LpProblem::new();
        for i in 0..n {
            p.add_binary(format!("x{i}")).expect("fresh");
        }
        p
    }

    #[test]
    fn small_problem_routes_to_embedded() {
        let embedded_calls = Arc::new(AtomicUsize::new(0));
        let remote_calls = Arc::new(AtomicUsize::new(0));
        let router = SolverRouter::new(
            FakeBackend::boxed("embedded", false, &embedded_calls),
            Some(FakeBackend::boxed("remote", false, &remote_calls)),
            10,
        );

        let routed = router.solve(&problem_with_vars(5)).expect("solves");
        assert_eq!(routed.backend, "embedded");
        assert!(!routed.fell_back);
        assert_eq!(embedded_calls.load(Ordering::SeqCst), 1);
        assert_eq!(remote_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn large_problem_routes_to_remote() {
        let embedded_calls = Arc::new(AtomicUsize::new(0));
        let remote_calls = Arc::new(AtomicUsize::new(0));
        let router = SolverRouter::new(
            FakeBackend::boxed("embedded", false, &embedded_calls),
            Some(FakeBackend::boxed("remote", false, &remote_calls)),
            10,
        );

        let routed = router.solve(&problem_with_vars(11)).expect("solves");
        assert_eq!(routed.backend, "remote");
        assert_eq!(embedded_calls.load(Ordering::SeqCst), 0);
        assert_eq!(remote_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn embedded_crash_falls_back_to_remote_once() {
        let embedded_calls = Arc::new(AtomicUsize::new(0));
        let remote_calls = Arc::new(AtomicUsize::new(0));
        let router = SolverRouter::new(
            FakeBackend::boxed("embedded", true, &embedded_calls),
            Some(FakeBackend::boxed("remote", false, &remote_calls)),
            10,
        );

        let routed = router.solve(&problem_with_vars(5)).expect("fallback succeeds");
        assert_eq!(routed.backend, "remote");
        assert!(routed.fell_back);
        assert_eq!(embedded_calls.load(Ordering::SeqCst), 1);
        assert_eq!(remote_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn embedded_crash_without_remote_surfaces_error() {
        let embedded_calls = Arc::new(AtomicUsize::new(0));
        let router = SolverRouter::new(
            FakeBackend::boxed("embedded", true, &embedded_calls),
            None,
            10,
        );

        let err = router.solve(&problem_with_vars(5)).expect_err("no fallback");
        assert!(matches!(err, SolveError::Backend { .. }));
    }

    #[test]
    fn oversized_problem_without_remote_uses_embedded_anyway() {
        let embedded_calls = Arc::new(AtomicUsize::new(0));
        let router = SolverRouter::new(
            FakeBackend::boxed("embedded", false, &embedded_calls),
            None,
            10,
        );

        let routed = router.solve(&problem_with_vars(50)).expect("solves");
        assert_eq!(routed.backend, "embedded");
        assert_eq!(embedded_calls.load(Ordering::SeqCst), 1);
    }
}
