//! Shared output layer for human/JSON parity across commands.

use std::io::{self, Write};

use carve_core::{AssignmentSource, RunOutcome};
use serde::Serialize;

/// Width of human separators.
pub const RULE_WIDTH: usize = 72;

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Write a horizontal separator.
pub fn rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    rule(w)
}

/// Left-aligned key/value line.
pub fn kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<22} {}", format!("{key}:"), value.as_ref())
}

/// Serialize a value as pretty JSON on stdout.
pub fn render_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

fn source_label(source: &AssignmentSource) -> String {
    match source {
        AssignmentSource::Strategic => "strategic".to_string(),
        AssignmentSource::Locked(kind) => format!("locked/{}", kind.as_str()),
        AssignmentSource::Optimized => "optimized".to_string(),
        AssignmentSource::Cascaded => "cascaded".to_string(),
    }
}

/// Render a run outcome as human-readable sections.
pub fn render_outcome_human(outcome: &RunOutcome) -> anyhow::Result<()> {
    let mut w = io::stdout().lock();

    section(&mut w, "Proposals")?;
    for proposal in &outcome.proposals {
        writeln!(
            w,
            "{:<18} -> {:<12} [{:<24}] {}",
            proposal.account_id,
            proposal.rep_id,
            source_label(&proposal.source),
            proposal.rationale
        )?;
    }
    if !outcome.unassigned.is_empty() {
        writeln!(w)?;
        section(&mut w, "Unassigned")?;
        for id in &outcome.unassigned {
            writeln!(w, "{id}")?;
        }
    }

    writeln!(w)?;
    section(&mut w, "Rep loads")?;
    for load in &outcome.metrics.rep_loads {
        writeln!(
            w,
            "{:<12} accounts {:>4}  arr {:>14.2}  atr {:>14.2}  pipeline {:>14.2}",
            load.rep_id, load.account_count, load.arr, load.atr, load.pipeline
        )?;
    }

    writeln!(w)?;
    section(&mut w, "Metrics")?;
    kv(&mut w, "continuity rate", format!("{:.3}", outcome.metrics.continuity_rate))?;
    kv(&mut w, "geo exact rate", format!("{:.3}", outcome.metrics.geo_exact_rate))?;
    kv(&mut w, "geo sibling rate", format!("{:.3}", outcome.metrics.geo_sibling_rate))?;
    kv(&mut w, "geo cross rate", format!("{:.3}", outcome.metrics.geo_cross_rate))?;
    kv(&mut w, "tier exact rate", format!("{:.3}", outcome.metrics.tier_exact_rate))?;
    kv(&mut w, "balance variance", format!("{:.2}", outcome.metrics.balance_variance))?;
    kv(
        &mut w,
        "unresolved slack",
        format!("{:.2}", outcome.metrics.unresolved_slack),
    )?;
    if let Some(solver) = &outcome.solver {
        kv(&mut w, "solver backend", &solver.backend)?;
        kv(&mut w, "solver status", format!("{:?}", solver.status))?;
        kv(&mut w, "solve millis", solver.solve_millis.to_string())?;
        kv(&mut w, "variables", solver.variables.to_string())?;
        kv(&mut w, "constraints", solver.constraints.to_string())?;
    }

    if !outcome.warnings.is_empty() {
        writeln!(w)?;
        section(&mut w, "Warnings")?;
        for warning in &outcome.warnings {
            writeln!(w, "! {warning}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_pads_keys_to_a_column() {
        let mut buf = Vec::new();
        kv(&mut buf, "status", "ok").expect("writes");
        let line = String::from_utf8(buf).expect("utf8");
        assert!(line.starts_with("status:"));
        assert!(line.ends_with(" ok\n"));
        // Key column is 22 wide plus the separating space.
        assert_eq!(line.find("ok").expect("value present"), 23);
    }

    #[test]
    fn source_labels_name_the_lock_kind() {
        let label = source_label(&AssignmentSource::Locked(carve_core::LockKind::AtRisk));
        assert_eq!(label, "locked/at_risk");
    }
}
