//! Command handlers.

pub mod lp;
pub mod optimize;

use std::path::Path;

use anyhow::Context;
use carve_core::{BuildData, EngineConfig};
use carve_lp::{EmbeddedSolver, RemoteSolver, SolverBackend, SolverRouter};
use clap::ValueEnum;
use std::time::Duration;

/// Which account kinds a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Batch {
    Customer,
    Prospect,
    #[default]
    All,
}

impl Batch {
    pub fn label(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Prospect => "prospect",
            Self::All => "all",
        }
    }

    /// The per-kind runs this selection expands to. Customers and
    /// prospects never share a decision space, so `all` means one run
    /// per kind, not one combined run.
    pub fn expand(self) -> Vec<Self> {
        match self {
            Self::All => vec![Self::Customer, Self::Prospect],
            single => vec![single],
        }
    }
}

/// Load config from a file or fall back to validated defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => {
            let config = EngineConfig::default();
            config.validate().context("default configuration")?;
            Ok(config)
        }
    }
}

/// Load a snapshot and drop accounts outside the selected batch.
pub fn load_snapshot(path: &Path, batch: Batch) -> anyhow::Result<BuildData> {
    let mut data = BuildData::from_json_file(path)?;
    data.accounts.retain(|account| match batch {
        Batch::Customer => account.kind == carve_core::AccountKind::Customer,
        Batch::Prospect => account.kind == carve_core::AccountKind::Prospect,
        Batch::All => true,
    });
    Ok(data)
}

/// Build the solver router from config.
pub fn build_router(config: &EngineConfig) -> SolverRouter {
    let embedded = Box::new(EmbeddedSolver::new(Duration::from_secs(
        config.solver.embedded_timeout_secs,
    )));
    let remote: Option<Box<dyn SolverBackend>> =
        config.solver.remote_endpoint.as_ref().map(|endpoint| {
            Box::new(RemoteSolver::new(
                endpoint.clone(),
                Duration::from_secs(config.solver.remote_timeout_secs),
            )) as Box<dyn SolverBackend>
        });
    SolverRouter::new(embedded, remote, config.solver.embedded_var_limit)
}
