//! `carve optimize`: run the full balancing pipeline over a snapshot.
//!
//! Customers and prospects are optimized in separate runs even when
//! `--batch all` is selected; each batch gets its own run record and
//! its own rendered outcome.

use std::path::PathBuf;
use std::sync::mpsc::sync_channel;

use carve_core::{Engine, JsonlSink, Progress, RunOptions, RunOutcome, TelemetryRecorder};
use chrono::NaiveDate;
use clap::Args;
use tracing::info;

use crate::cmd::{build_router, load_config, load_snapshot, Batch};
use crate::output::{render_json, render_outcome_human, OutputMode};

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Build snapshot (JSON with accounts and reps).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Engine configuration (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Which account kinds to optimize; `all` runs one batch per kind.
    #[arg(long, value_enum, default_value_t = Batch::All)]
    pub batch: Batch,

    /// Anchor date for tenure and window math (YYYY-MM-DD, default today).
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Print stage progress to stderr.
    #[arg(long)]
    pub progress: bool,

    /// Append a run record to this JSON-lines file.
    #[arg(long)]
    pub telemetry: Option<PathBuf>,
}

pub fn run_optimize(args: &OptimizeArgs, output: OutputMode) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let router = build_router(&config);

    let as_of = args
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let mut progress_tx = None;
    let progress_printer = args.progress.then(|| {
        let (tx, rx) = sync_channel::<Progress>(16);
        progress_tx = Some(tx);
        std::thread::spawn(move || {
            while let Ok(stage) = rx.recv() {
                eprintln!("progress: {stage:?}");
            }
        })
    });

    let recorder = args
        .telemetry
        .as_ref()
        .map_or_else(TelemetryRecorder::disabled, |path| {
            TelemetryRecorder::new(JsonlSink::new(path.clone()))
        });

    let mut outcomes: Vec<(&'static str, RunOutcome)> = Vec::new();
    for batch in args.batch.expand() {
        let data = load_snapshot(&args.input, batch)?;
        let mut opts = RunOptions::new(as_of);
        opts.batch = batch.label().to_string();
        opts.progress = progress_tx.clone();

        let outcome = Engine::new(&config, &router)
            .with_telemetry(&recorder)
            .run(&data, &opts)?;
        info!(
            batch = batch.label(),
            proposals = outcome.proposals.len(),
            "batch complete"
        );
        outcomes.push((batch.label(), outcome));
    }

    // Closing the progress sender ends the printer thread.
    drop(progress_tx);
    if let Some(handle) = progress_printer {
        let _ = handle.join();
    }
    recorder.shutdown();

    if output.is_json() {
        if let [(_, outcome)] = outcomes.as_slice() {
            render_json(outcome)?;
        } else {
            let mut by_batch = serde_json::Map::new();
            for (label, outcome) in &outcomes {
                by_batch.insert((*label).to_string(), serde_json::to_value(outcome)?);
            }
            render_json(&serde_json::Value::Object(by_batch))?;
        }
    } else {
        for (i, (label, outcome)) in outcomes.iter().enumerate() {
            if outcomes.len() > 1 {
                if i > 0 {
                    println!();
                }
                println!("Batch: {label}");
            }
            render_outcome_human(outcome)?;
        }
    }
    Ok(())
}
