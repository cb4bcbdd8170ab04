//! Fire-and-forget run telemetry.
//!
//! Records go into a bounded channel drained by a worker thread; a full
//! queue drops the record with a warning. Nothing here can fail or delay
//! an optimization result; sink errors are logged and swallowed.

use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::Warning;
use crate::metrics::RunMetrics;

/// Bounded queue depth. Runs are long; depth only needs to cover bursts.
const QUEUE_DEPTH: usize = 64;

/// One persisted run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub batch: String,
    pub account_count: usize,
    pub rep_count: usize,
    pub variable_count: usize,
    pub constraint_count: usize,
    /// Engine config snapshot, serialized for later analysis.
    pub config: serde_json::Value,
    pub solver_status: Option<String>,
    pub solver_backend: Option<String>,
    pub solve_millis: Option<u128>,
    pub warnings: Vec<String>,
    pub metrics: Option<RunMetrics>,
}

/// Where records end up.
pub trait TelemetrySink: Send + 'static {
    /// Persist one record. Errors are the sink's to report; the caller
    /// has already moved on.
    fn persist(&mut self, record: &RunRecord) -> anyhow::Result<()>;
}

/// JSON-lines file sink.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TelemetrySink for JsonlSink {
    fn persist(&mut self, record: &RunRecord) -> anyhow::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        serde_json::to_writer(&mut file, record)?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Hands records to a worker thread without ever blocking the pipeline.
#[derive(Debug)]
pub struct TelemetryRecorder {
    sender: Option<SyncSender<RunRecord>>,
    worker: Option<JoinHandle<()>>,
}

impl TelemetryRecorder {
    /// Spawn the worker around a sink.
    #[must_use]
    pub fn new<S: TelemetrySink>(mut sink: S) -> Self {
        let (sender, receiver) = sync_channel::<RunRecord>(QUEUE_DEPTH);
        let worker = std::thread::Builder::new()
            .name("carve-telemetry".to_string())
            .spawn(move || {
                while let Ok(record) = receiver.recv() {
                    if let Err(err) = sink.persist(&record) {
                        error!(%err, run_id = %record.run_id, "telemetry persist failed");
                    } else {
                        debug!(run_id = %record.run_id, "telemetry persisted");
                    }
                }
            })
            .ok();
        if worker.is_none() {
            warn!("telemetry worker failed to spawn; records will be dropped");
        }
        Self {
            sender: Some(sender),
            worker,
        }
    }

    /// A recorder that drops everything; for callers that opt out.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            sender: None,
            worker: None,
        }
    }

    /// Submit a record. Never blocks; returns a warning when the record
    /// was dropped so the run can surface it.
    pub fn record(&self, record: RunRecord) -> Option<Warning> {
        let Some(sender) = &self.sender else {
            return None; // disabled on purpose, not worth a warning
        };
        match sender.try_send(record) {
            Ok(()) => None,
            Err(TrySendError::Full(record) | TrySendError::Disconnected(record)) => {
                warn!(run_id = %record.run_id, "telemetry queue unavailable; dropping record");
                Some(Warning::TelemetryDropped)
            }
        }
    }

    /// Drain the queue and join the worker. Safe to skip (dropping the
    /// recorder also ends the worker), but callers that want records
    /// flushed before exit call this.
    pub fn shutdown(mut self) {
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for TelemetryRecorder {
    fn drop(&mut self) {
        drop(self.sender.take());
        // Worker exits once the channel closes; no join on drop so an
        // unwinding caller is never blocked.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Sender;

    struct ChannelSink(Sender<String>);

    impl TelemetrySink for ChannelSink {
        fn persist(&mut self, record: &RunRecord) -> anyhow::Result<()> {
            self.0.send(record.run_id.clone())?;
            Ok(())
        }
    }

    fn record(run_id: &str) -> RunRecord {
        RunRecord {
            run_id: run_id.to_string(),
            batch: "customer".to_string(),
            account_count: 1,
            rep_count: 1,
            variable_count: 1,
            constraint_count: 1,
            config: serde_json::Value::Null,
            solver_status: None,
            solver_backend: None,
            solve_millis: None,
            warnings: Vec::new(),
            metrics: None,
        }
    }

    #[test]
    fn records_reach_the_sink() {
        let (tx, rx) = std::sync::mpsc::channel();
        let recorder = TelemetryRecorder::new(ChannelSink(tx));
        assert!(recorder.record(record("run-1")).is_none());
        recorder.shutdown();
        assert_eq!(rx.recv().expect("persisted"), "run-1");
    }

    #[test]
    fn disabled_recorder_drops_silently() {
        let recorder = TelemetryRecorder::disabled();
        assert!(recorder.record(record("run-1")).is_none());
    }

    #[test]
    fn jsonl_sink_appends_one_line_per_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("runs.jsonl");
        let mut sink = JsonlSink::new(path.clone());
        sink.persist(&record("run-1")).expect("writes");
        sink.persist(&record("run-2")).expect("writes");

        let contents = std::fs::read_to_string(&path).expect("readable");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: RunRecord = serde_json::from_str(lines[0]).expect("valid json");
        assert_eq!(parsed.run_id, "run-1");
    }
}
