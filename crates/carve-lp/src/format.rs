//! CPLEX LP-format text writer.
//!
//! Sections in order: `Maximize`, `Subject To`, `Bounds`, `Binary`, `End`.
//! This text is the wire payload for the remote solver backend, so output
//! must be deterministic: terms render in insertion order and floats use
//! Rust's shortest round-trip formatting (never scientific notation).

use std::fmt::Write as _;

use crate::problem::{LpProblem, VarKind};

/// Maximum terms per line before wrapping with a continuation indent.
const TERMS_PER_LINE: usize = 8;

/// Render a problem as LP-format text.
#[must_use]
pub fn write_lp(problem: &LpProblem) -> String {
    let mut out = String::new();

    out.push_str("Maximize\n");
    let _ = write!(out, " obj:");
    write_terms(&mut out, problem.objective());
    out.push('\n');

    out.push_str("Subject To\n");
    for c in problem.constraints() {
        let _ = write!(out, " {}:", c.name);
        write_terms(&mut out, &c.terms);
        let _ = write!(out, " {} {}", c.op.symbol(), fmt_num(c.rhs));
        out.push('\n');
    }

    out.push_str("Bounds\n");
    for v in problem.variables() {
        if let VarKind::Continuous { lower, upper } = v.kind {
            if upper.is_infinite() {
                let _ = writeln!(out, " {} >= {}", v.name, fmt_num(lower));
            } else {
                let _ = writeln!(out, " {} <= {} <= {}", fmt_num(lower), v.name, fmt_num(upper));
            }
        }
    }

    let binaries: Vec<&str> = problem
        .variables()
        .iter()
        .filter(|v| v.kind == VarKind::Binary)
        .map(|v| v.name.as_str())
        .collect();
    if !binaries.is_empty() {
        out.push_str("Binary\n");
        for name in binaries {
            let _ = writeln!(out, " {name}");
        }
    }

    out.push_str("End\n");
    out
}

/// Write `+/- coeff name` terms, wrapping every [`TERMS_PER_LINE`] terms.
fn write_terms(out: &mut String, terms: &[(String, f64)]) {
    for (i, (name, coeff)) in terms.iter().enumerate() {
        if i > 0 && i % TERMS_PER_LINE == 0 {
            out.push_str("\n   ");
        }
        let sign = if coeff.is_sign_negative() { '-' } else { '+' };
        let _ = write!(out, " {sign} {} {name}", fmt_num(coeff.abs()));
    }
}

/// Format a float without scientific notation and without trailing noise.
///
/// Rust's `Display` for `f64` is already shortest-round-trip decimal, which
/// the LP format accepts; this only normalizes negative zero.
fn fmt_num(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}
