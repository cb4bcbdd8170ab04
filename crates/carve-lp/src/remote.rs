//! Remote MILP backend: the natively-deployed solver service.
//!
//! Ships the LP-format text over HTTP and parses the service's JSON
//! answer. The wire contract is stable regardless of the solver binary
//! behind the endpoint:
//!
//! ```text
//! POST {endpoint}
//!   { "problem": "<LP text>" }
//! 200 OK
//!   { "status": "Optimal", "objectiveValue": 1.5,
//!     "columns": { "x_a_r1": { "Primal": 1.0 } } }
//! ```

use std::error::Error as _;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::backend::{SolveError, SolverBackend, SolverResponse};
use crate::format::write_lp;
use crate::problem::LpProblem;

/// Default request timeout for the remote path. Native solves on large
/// problems can legitimately take minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client for the remote solver service.
pub struct RemoteSolver {
    endpoint: String,
    agent: ureq::Agent,
    timeout: Duration,
}

impl std::fmt::Debug for RemoteSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSolver")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RemoteSolver {
    /// Build a client for `endpoint` with a bounded per-request timeout.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.into(),
            agent,
            timeout,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SolverBackend for RemoteSolver {
    fn solve(&self, problem: &LpProblem) -> Result<SolverResponse, SolveError> {
        let lp_text = write_lp(problem);
        debug!(
            endpoint = %self.endpoint,
            bytes = lp_text.len(),
            variables = problem.variable_count(),
            "posting problem to remote solver"
        );

        let started = Instant::now();
        let result = self
            .agent
            .post(&self.endpoint)
            .send_json(ureq::json!({ "problem": lp_text }));

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(SolveError::Backend {
                    message: format!("remote solver returned HTTP {code}: {body}"),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                if is_timeout(&transport) {
                    return Err(SolveError::Timeout {
                        elapsed: started.elapsed(),
                    });
                }
                return Err(SolveError::Transport {
                    message: transport.to_string(),
                });
            }
        };

        response
            .into_json::<SolverResponse>()
            .map_err(|err| SolveError::Malformed {
                message: err.to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "remote-native"
    }
}

/// Distinguish a socket timeout from other transport failures so the
/// caller can apply the timeout policy rather than the outage policy.
fn is_timeout(transport: &ureq::Transport) -> bool {
    transport
        .source()
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some_and(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        })
}
