//! Per-invocation value store

use crate::core::step::Values;
use serde_json::Value;

/// Values accumulated while a keyed pipeline runs
///
/// Created fresh for every invocation, seeded with the caller's inputs, grown
/// by each step's outputs and dropped once the declared outputs are extracted.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    values: Values,
}

impl Accumulator {
    /// Seed a new accumulator with the caller's inputs
    pub fn seed(inputs: &Values) -> Self {
        Self {
            values: inputs.clone(),
        }
    }

    /// Everything known so far
    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge a step's outputs
    ///
    /// Construction-time validation guarantees the keys are new, so nothing
    /// already accumulated is overwritten.
    pub fn merge(&mut self, outputs: Values) {
        self.values.extend(outputs);
    }

    /// Extract the named values, in the order given
    pub fn project(mut self, keys: &[String]) -> Values {
        keys.iter()
            .filter_map(|key| self.values.shift_remove_entry(key))
            .collect()
    }
}
