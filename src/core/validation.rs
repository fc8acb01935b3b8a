//! Construction-time validation of step sequences
//!
//! Keyed pipelines are checked with [`resolve_keys`]: a single pass over the
//! steps in declaration order that tracks which names are available at each
//! position. Scalar pipelines only need [`check_arity`].

use crate::core::{
    error::{ArityKind, ValidationError},
    step::{Memory, SharedStep},
};
use indexmap::IndexSet;
use std::collections::BTreeSet;
use tracing::debug;

/// Names a keyed pipeline reads and writes, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKeys {
    pub input_keys: Vec<String>,
    pub memory_keys: Vec<String>,
    pub output_keys: Vec<String>,
}

/// Check that every step's inputs are available when it runs and that no step
/// shadows an earlier name, then settle the pipeline's output names.
///
/// When `output_variables` is `None` the outputs are inferred: every name
/// introduced after the inputs if `return_all` is set, otherwise the last
/// step's outputs, which an empty step list cannot provide.
pub fn resolve_keys(
    input_variables: &[String],
    steps: &[SharedStep],
    memory: Option<&dyn Memory>,
    output_variables: Option<&[String]>,
    return_all: bool,
) -> Result<ResolvedKeys, ValidationError> {
    let memory_keys = memory.map(|m| m.memory_variables()).unwrap_or_default();
    let overlapping: BTreeSet<String> = input_variables
        .iter()
        .filter(|key| memory_keys.contains(*key))
        .cloned()
        .collect();
    if !overlapping.is_empty() {
        return Err(ValidationError::OverlappingMemoryKeys {
            overlapping,
            memory_keys: memory_keys.iter().cloned().collect(),
        });
    }

    let seed: IndexSet<String> = input_variables
        .iter()
        .chain(memory_keys.iter())
        .cloned()
        .collect();

    let known = steps.iter().try_fold(seed, |mut known, step| {
        let step_memory = step
            .memory()
            .map(|m| m.memory_variables())
            .unwrap_or_default();

        let missing: BTreeSet<String> = step
            .input_keys()
            .into_iter()
            .filter(|key| !known.contains(key) && !step_memory.contains(key))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingInput {
                step: step.name().to_string(),
                missing,
                known: known.iter().cloned().collect(),
            });
        }

        let outputs = step.output_keys();
        let duplicates: BTreeSet<String> = outputs
            .iter()
            .filter(|key| known.contains(*key))
            .cloned()
            .collect();
        if !duplicates.is_empty() {
            return Err(ValidationError::DuplicateOutput {
                step: step.name().to_string(),
                duplicates,
            });
        }

        debug!("Step {} adds keys {:?}", step.name(), outputs);
        known.extend(outputs);
        Ok(known)
    })?;

    let output_keys = match output_variables {
        Some(declared) => {
            let missing: BTreeSet<String> = declared
                .iter()
                .filter(|key| !known.contains(*key))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(ValidationError::UnknownOutput {
                    missing,
                    known: known.iter().cloned().collect(),
                });
            }
            declared.to_vec()
        }
        None if return_all => known
            .iter()
            .filter(|key| !input_variables.contains(*key))
            .cloned()
            .collect(),
        None => match steps.last() {
            Some(last) => last.output_keys(),
            None => return Err(ValidationError::EmptyPipeline),
        },
    };

    Ok(ResolvedKeys {
        input_keys: input_variables.to_vec(),
        memory_keys,
        output_keys,
    })
}

/// Check that every step takes exactly one input and produces one output
///
/// An empty sequence passes; such a pipeline returns its input unchanged.
pub fn check_arity(steps: &[SharedStep]) -> Result<(), ValidationError> {
    for step in steps {
        let inputs = step.input_keys().len();
        if inputs != 1 {
            return Err(ValidationError::Arity {
                step: step.name().to_string(),
                kind: ArityKind::Inputs,
                count: inputs,
            });
        }
        let outputs = step.output_keys().len();
        if outputs != 1 {
            return Err(ValidationError::Arity {
                step: step.name().to_string(),
                kind: ArityKind::Outputs,
                count: outputs,
            });
        }
    }

    Ok(())
}
