//! Fixed-value memory

use crate::core::{
    error::StepError,
    step::{Memory, Values},
};

/// Memory that always resolves to the same values
#[derive(Debug, Clone, Default)]
pub struct StaticMemory {
    values: Values,
}

impl StaticMemory {
    pub fn new(values: Values) -> Self {
        Self { values }
    }
}

impl Memory for StaticMemory {
    fn memory_variables(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn load_memory_variables(&self, _inputs: &Values) -> Result<Values, StepError> {
        Ok(self.values.clone())
    }
}
