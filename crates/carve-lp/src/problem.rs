//! In-memory MILP problem model.
//!
//! A problem is a maximize objective over named variables, a list of
//! linear constraints, and per-variable kind/bounds. Variables and
//! constraints keep insertion order so serialization (and therefore the
//! remote wire payload) is deterministic.

use std::collections::HashMap;

/// Variable kind and bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    /// 0/1 decision variable.
    Binary,
    /// Continuous variable with `[lower, upper]` bounds. `upper` may be
    /// `f64::INFINITY` for an unbounded slack.
    Continuous { lower: f64, upper: f64 },
}

/// Relational operator of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Eq,
    Le,
    Ge,
}

impl ConstraintOp {
    /// LP-format spelling.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }
}

/// One named variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
}

/// One named linear constraint: `Σ coeff·var  op  rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    /// `(variable name, coefficient)` pairs in insertion order.
    pub terms: Vec<(String, f64)>,
    pub op: ConstraintOp,
    pub rhs: f64,
}

/// Errors raised while assembling a problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProblemError {
    #[error("duplicate variable name: {0}")]
    DuplicateVariable(String),
    #[error("unknown variable referenced: {0}")]
    UnknownVariable(String),
}

/// A complete MILP instance (maximize sense).
#[derive(Debug, Clone, Default)]
pub struct LpProblem {
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
    constraints: Vec<Constraint>,
    objective: Vec<(String, f64)>,
}

impl LpProblem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binary decision variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> Result<(), ProblemError> {
        self.add_variable(name.into(), VarKind::Binary)
    }

    /// Add a continuous variable with bounds. Pass `f64::INFINITY` as the
    /// upper bound for an unbounded variable.
    pub fn add_continuous(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
    ) -> Result<(), ProblemError> {
        self.add_variable(name.into(), VarKind::Continuous { lower, upper })
    }

    fn add_variable(&mut self, name: String, kind: VarKind) -> Result<(), ProblemError> {
        if self.index.contains_key(&name) {
            return Err(ProblemError::DuplicateVariable(name));
        }
        self.index.insert(name.clone(), self.variables.len());
        self.variables.push(Variable { name, kind });
        Ok(())
    }

    /// Set the objective coefficient for a variable. Coefficients default
    /// to zero; setting one twice keeps the last value.
    pub fn set_objective(&mut self, name: &str, coeff: f64) -> Result<(), ProblemError> {
        if !self.index.contains_key(name) {
            return Err(ProblemError::UnknownVariable(name.to_string()));
        }
        if let Some(entry) = self.objective.iter_mut().find(|(n, _)| n == name) {
            entry.1 = coeff;
        } else {
            self.objective.push((name.to_string(), coeff));
        }
        Ok(())
    }

    /// Add a named constraint. All referenced variables must exist.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(String, f64)>,
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<(), ProblemError> {
        for (var, _) in &terms {
            if !self.index.contains_key(var) {
                return Err(ProblemError::UnknownVariable(var.clone()));
            }
        }
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            op,
            rhs,
        });
        Ok(())
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Objective terms in insertion order.
    #[must_use]
    pub fn objective(&self) -> &[(String, f64)] {
        &self.objective
    }

    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn binary_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    #[must_use]
    pub fn contains_variable(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}
