//! `carve lp`: print the LP text for a snapshot without solving.

use std::path::PathBuf;

use carve_core::{Engine, RunOptions};
use chrono::NaiveDate;
use clap::Args;

use crate::cmd::{build_router, load_config, load_snapshot, Batch};

#[derive(Args, Debug)]
pub struct LpArgs {
    /// Build snapshot (JSON with accounts and reps).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Engine configuration (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Which account kinds to include; `all` prints one problem per kind.
    #[arg(long, value_enum, default_value_t = Batch::All)]
    pub batch: Batch,

    /// Anchor date for tenure and window math (YYYY-MM-DD, default today).
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

pub fn run_lp(args: &LpArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let router = build_router(&config);

    let as_of = args
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let batches = args.batch.expand();
    let multiple = batches.len() > 1;
    for batch in batches {
        let data = load_snapshot(&args.input, batch)?;
        if multiple && data.accounts.is_empty() {
            continue;
        }
        let mut opts = RunOptions::new(as_of);
        opts.batch = batch.label().to_string();

        let text = Engine::new(&config, &router).build_lp(&data, &opts)?;
        if multiple {
            // LP-format comment marking which batch the problem covers.
            println!("\\ batch: {}", batch.label());
        }
        print!("{text}");
    }
    Ok(())
}
