//! Closure-backed steps

use crate::core::{
    callback::RunScope,
    error::StepError,
    step::{require_text, Memory, Step, Values},
};
use serde_json::Value;
use std::sync::Arc;

type KeyedFn = dyn Fn(&Values) -> Result<Values, StepError> + Send + Sync;
type TextFn = dyn Fn(&str) -> Result<String, StepError> + Send + Sync;

/// Keyed step running a closure over the values it is given
#[derive(Clone)]
pub struct FnStep {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    memory: Option<Arc<dyn Memory>>,
    f: Arc<KeyedFn>,
}

impl FnStep {
    pub fn new<F>(name: &str, inputs: &[&str], outputs: &[&str], f: F) -> Self
    where
        F: Fn(&Values) -> Result<Values, StepError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            memory: None,
            f: Arc::new(f),
        }
    }

    /// Resolve some of this step's inputs from `memory` instead of the pipeline
    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }
}

impl Step for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_keys(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn output_keys(&self) -> Vec<String> {
        self.outputs.clone()
    }

    fn memory(&self) -> Option<&dyn Memory> {
        self.memory.as_deref()
    }

    fn call(&self, inputs: &Values, _scope: &RunScope) -> Result<Values, StepError> {
        match &self.memory {
            Some(memory) => {
                let mut resolved = inputs.clone();
                for (key, value) in memory.load_memory_variables(inputs)? {
                    resolved.entry(key).or_insert(value);
                }
                (self.f)(&resolved)
            }
            None => (self.f)(inputs),
        }
    }
}

impl std::fmt::Debug for FnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// Single-input, single-output step running a closure over text
#[derive(Clone)]
pub struct TextFnStep {
    name: String,
    input_key: String,
    output_key: String,
    f: Arc<TextFn>,
}

impl TextFnStep {
    /// Step reading `input` and writing `output`
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&str) -> Result<String, StepError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            input_key: "input".to_string(),
            output_key: "output".to_string(),
            f: Arc::new(f),
        }
    }

    pub fn with_keys(mut self, input_key: &str, output_key: &str) -> Self {
        self.input_key = input_key.to_string();
        self.output_key = output_key.to_string();
        self
    }
}

impl Step for TextFnStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_keys(&self) -> Vec<String> {
        vec![self.input_key.clone()]
    }

    fn output_keys(&self) -> Vec<String> {
        vec![self.output_key.clone()]
    }

    fn call(&self, inputs: &Values, scope: &RunScope) -> Result<Values, StepError> {
        let input = require_text(&self.name, inputs, &self.input_key)?;
        let output = self.run(&input, scope)?;
        let mut outputs = Values::new();
        outputs.insert(self.output_key.clone(), Value::String(output));
        Ok(outputs)
    }

    fn run(&self, input: &str, _scope: &RunScope) -> Result<String, StepError> {
        (self.f)(input)
    }
}

impl std::fmt::Debug for TextFnStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextFnStep")
            .field("name", &self.name)
            .field("input_key", &self.input_key)
            .field("output_key", &self.output_key)
            .finish_non_exhaustive()
    }
}
