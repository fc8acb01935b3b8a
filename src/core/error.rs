//! Error types for pipeline construction and invocation

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Which side of a step an arity check refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityKind {
    Inputs,
    Outputs,
}

impl fmt::Display for ArityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArityKind::Inputs => write!(f, "input"),
            ArityKind::Outputs => write!(f, "output"),
        }
    }
}

/// Construction-time validation failures
///
/// A pipeline that fails with any of these is never built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "input key(s) {} are also memory keys ({}); input and memory keys must not overlap",
        fmt_names(.overlapping),
        fmt_names(.memory_keys)
    )]
    OverlappingMemoryKeys {
        overlapping: BTreeSet<String>,
        memory_keys: BTreeSet<String>,
    },

    #[error(
        "step '{step}' is missing required input keys: {}, only had {}",
        fmt_names(.missing),
        fmt_names(.known)
    )]
    MissingInput {
        step: String,
        missing: BTreeSet<String>,
        known: BTreeSet<String>,
    },

    #[error("step '{step}' returned keys that already exist: {}", fmt_names(.duplicates))]
    DuplicateOutput {
        step: String,
        duplicates: BTreeSet<String>,
    },

    #[error(
        "expected output variables that were not found: {}, only had {}",
        fmt_names(.missing),
        fmt_names(.known)
    )]
    UnknownOutput {
        missing: BTreeSet<String>,
        known: BTreeSet<String>,
    },

    #[error("steps in a scalar pipeline must have exactly one {kind}, got '{step}' with {count} {kind}s")]
    Arity {
        step: String,
        kind: ArityKind,
        count: usize,
    },

    #[error("pipeline has no steps to infer its outputs from; declare output variables or set return_all")]
    EmptyPipeline,
}

/// Errors raised by a step while it runs
#[derive(Debug, Error)]
pub enum StepError {
    #[error("step '{step}' failed: {message}")]
    Failed { step: String, message: String },

    #[error("step '{step}' did not return its output key '{key}'")]
    MissingOutput { step: String, key: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StepError {
    pub fn failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        StepError::Failed {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Invocation-time failures
#[derive(Debug, Error)]
pub enum RunError {
    #[error("missing input keys: {}", fmt_names(.missing))]
    MissingInputs { missing: BTreeSet<String> },

    #[error(transparent)]
    Step(#[from] StepError),
}

fn fmt_names(names: &BTreeSet<String>) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{}'", n)).collect();
    format!("{{{}}}", quoted.join(", "))
}
