//! Keyed and scalar pipelines
//!
//! Both are validated once, when built, and are immutable afterwards. Each
//! invocation works on its own values, so one pipeline can serve concurrent
//! callers without locking.

use crate::{
    core::{
        callback::{ProgressCallback, RunScope},
        error::{RunError, StepError, ValidationError},
        step::{require_text, Memory, SharedStep, Step, Values},
        validation::{check_arity, resolve_keys, ResolvedKeys},
    },
    execution::{drive_blocking, run_keyed, run_scalar, Blocking, Suspending},
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Construction settings for a [`KeyedPipeline`]
#[derive(Clone)]
pub struct KeyedPipelineConfig {
    pub name: String,
    pub steps: Vec<SharedStep>,
    pub input_variables: Vec<String>,
    /// Declared outputs; inferred from the steps when `None`
    pub output_variables: Option<Vec<String>>,
    /// With inferred outputs, return every produced name instead of only the
    /// last step's outputs
    pub return_all: bool,
    pub memory: Option<Arc<dyn Memory>>,
}

impl KeyedPipelineConfig {
    pub fn new<S: Into<String>>(
        steps: Vec<SharedStep>,
        input_variables: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: "keyed_pipeline".to_string(),
            steps,
            input_variables: input_variables.into_iter().map(Into::into).collect(),
            output_variables: None,
            return_all: false,
            memory: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_output_variables<S: Into<String>>(
        mut self,
        output_variables: impl IntoIterator<Item = S>,
    ) -> Self {
        self.output_variables = Some(output_variables.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_return_all(mut self, return_all: bool) -> Self {
        self.return_all = return_all;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Validate and build the pipeline
    pub fn build(self) -> Result<KeyedPipeline, ValidationError> {
        KeyedPipeline::new(self)
    }
}

/// Pipeline threading a growing set of named values through its steps
#[derive(Clone)]
pub struct KeyedPipeline {
    name: String,
    steps: Vec<SharedStep>,
    keys: ResolvedKeys,
    return_all: bool,
    memory: Option<Arc<dyn Memory>>,
}

impl KeyedPipeline {
    /// Validate the step sequence and settle the output names
    pub fn new(config: KeyedPipelineConfig) -> Result<Self, ValidationError> {
        let keys = resolve_keys(
            &config.input_variables,
            &config.steps,
            config.memory.as_deref(),
            config.output_variables.as_deref(),
            config.return_all,
        )?;
        debug!(
            "Built pipeline {}: inputs {:?}, outputs {:?}",
            config.name, keys.input_keys, keys.output_keys
        );

        Ok(Self {
            name: config.name,
            steps: config.steps,
            keys,
            return_all: config.return_all,
            memory: config.memory,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[SharedStep] {
        &self.steps
    }

    pub fn input_variables(&self) -> &[String] {
        &self.keys.input_keys
    }

    pub fn output_variables(&self) -> &[String] {
        &self.keys.output_keys
    }

    pub fn memory_variables(&self) -> &[String] {
        &self.keys.memory_keys
    }

    pub fn return_all(&self) -> bool {
        self.return_all
    }

    /// Run every step, blocking the calling thread
    pub fn invoke(&self, inputs: &Values) -> Result<Values, RunError> {
        self.invoke_in(inputs, &RunScope::noop())
    }

    pub fn invoke_with_callback(
        &self,
        inputs: &Values,
        callback: Arc<dyn ProgressCallback>,
    ) -> Result<Values, RunError> {
        self.invoke_in(inputs, &RunScope::new(callback))
    }

    /// Run every step, reporting under `scope`
    pub fn invoke_in(&self, inputs: &Values, scope: &RunScope) -> Result<Values, RunError> {
        drive_blocking(run_keyed(
            &Blocking,
            &self.name,
            &self.steps,
            self.memory.as_deref(),
            &self.keys,
            inputs,
            scope,
        ))
    }

    /// Run every step, awaiting each in turn
    pub async fn ainvoke(&self, inputs: &Values) -> Result<Values, RunError> {
        self.ainvoke_in(inputs, &RunScope::noop()).await
    }

    pub async fn ainvoke_with_callback(
        &self,
        inputs: &Values,
        callback: Arc<dyn ProgressCallback>,
    ) -> Result<Values, RunError> {
        self.ainvoke_in(inputs, &RunScope::new(callback)).await
    }

    pub async fn ainvoke_in(&self, inputs: &Values, scope: &RunScope) -> Result<Values, RunError> {
        run_keyed(
            &Suspending,
            &self.name,
            &self.steps,
            self.memory.as_deref(),
            &self.keys,
            inputs,
            scope,
        )
        .await
    }
}

#[async_trait]
impl Step for KeyedPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_keys(&self) -> Vec<String> {
        self.keys.input_keys.clone()
    }

    fn output_keys(&self) -> Vec<String> {
        self.keys.output_keys.clone()
    }

    fn memory(&self) -> Option<&dyn Memory> {
        self.memory.as_deref()
    }

    fn call(&self, inputs: &Values, scope: &RunScope) -> Result<Values, StepError> {
        self.invoke_in(inputs, scope)
            .map_err(|e| nested_error(&self.name, e))
    }

    async fn acall(&self, inputs: &Values, scope: &RunScope) -> Result<Values, StepError> {
        self.ainvoke_in(inputs, scope)
            .await
            .map_err(|e| nested_error(&self.name, e))
    }
}

impl std::fmt::Debug for KeyedPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedPipeline")
            .field("name", &self.name)
            .field("steps", &step_names(&self.steps))
            .field("keys", &self.keys)
            .field("return_all", &self.return_all)
            .finish_non_exhaustive()
    }
}

/// Construction settings for a [`ScalarPipeline`]
#[derive(Clone)]
pub struct ScalarPipelineConfig {
    pub name: String,
    pub steps: Vec<SharedStep>,
    /// Trim whitespace from each intermediate value
    pub strip_outputs: bool,
    pub input_key: String,
    pub output_key: String,
}

impl ScalarPipelineConfig {
    pub fn new(steps: Vec<SharedStep>) -> Self {
        Self {
            name: "scalar_pipeline".to_string(),
            steps,
            strip_outputs: false,
            input_key: "input".to_string(),
            output_key: "output".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_strip_outputs(mut self, strip_outputs: bool) -> Self {
        self.strip_outputs = strip_outputs;
        self
    }

    pub fn with_input_key(mut self, key: impl Into<String>) -> Self {
        self.input_key = key.into();
        self
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = key.into();
        self
    }

    /// Check step arity and build the pipeline
    pub fn build(self) -> Result<ScalarPipeline, ValidationError> {
        ScalarPipeline::new(self)
    }
}

/// Pipeline piping one value through single-input, single-output steps
#[derive(Clone)]
pub struct ScalarPipeline {
    name: String,
    steps: Vec<SharedStep>,
    strip_outputs: bool,
    input_key: String,
    output_key: String,
}

impl ScalarPipeline {
    pub fn new(config: ScalarPipelineConfig) -> Result<Self, ValidationError> {
        check_arity(&config.steps)?;

        Ok(Self {
            name: config.name,
            steps: config.steps,
            strip_outputs: config.strip_outputs,
            input_key: config.input_key,
            output_key: config.output_key,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[SharedStep] {
        &self.steps
    }

    pub fn strip_outputs(&self) -> bool {
        self.strip_outputs
    }

    pub fn input_key(&self) -> &str {
        &self.input_key
    }

    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    /// Pipe `input` through every step, blocking the calling thread
    pub fn invoke(&self, input: &str) -> Result<String, RunError> {
        self.invoke_in(input, &RunScope::noop())
    }

    pub fn invoke_with_callback(
        &self,
        input: &str,
        callback: Arc<dyn ProgressCallback>,
    ) -> Result<String, RunError> {
        self.invoke_in(input, &RunScope::new(callback))
    }

    pub fn invoke_in(&self, input: &str, scope: &RunScope) -> Result<String, RunError> {
        drive_blocking(run_scalar(
            &Blocking,
            &self.name,
            &self.steps,
            self.strip_outputs,
            input,
            scope,
        ))
    }

    /// Pipe `input` through every step, awaiting each in turn
    pub async fn ainvoke(&self, input: &str) -> Result<String, RunError> {
        self.ainvoke_in(input, &RunScope::noop()).await
    }

    pub async fn ainvoke_with_callback(
        &self,
        input: &str,
        callback: Arc<dyn ProgressCallback>,
    ) -> Result<String, RunError> {
        self.ainvoke_in(input, &RunScope::new(callback)).await
    }

    pub async fn ainvoke_in(&self, input: &str, scope: &RunScope) -> Result<String, RunError> {
        run_scalar(
            &Suspending,
            &self.name,
            &self.steps,
            self.strip_outputs,
            input,
            scope,
        )
        .await
    }

    fn output(&self, value: String) -> Values {
        let mut outputs = Values::new();
        outputs.insert(self.output_key.clone(), Value::String(value));
        outputs
    }
}

#[async_trait]
impl Step for ScalarPipeline {
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
        self.invoke_in(&input, scope)
            .map(|value| self.output(value))
            .map_err(|e| nested_error(&self.name, e))
    }

    async fn acall(&self, inputs: &Values, scope: &RunScope) -> Result<Values, StepError> {
        let input = require_text(&self.name, inputs, &self.input_key)?;
        self.ainvoke_in(&input, scope)
            .await
            .map(|value| self.output(value))
            .map_err(|e| nested_error(&self.name, e))
    }
}

impl std::fmt::Debug for ScalarPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarPipeline")
            .field("name", &self.name)
            .field("steps", &step_names(&self.steps))
            .field("strip_outputs", &self.strip_outputs)
            .field("input_key", &self.input_key)
            .field("output_key", &self.output_key)
            .finish()
    }
}

/// A nested pipeline's failure, as seen by its parent
fn nested_error(pipeline: &str, error: RunError) -> StepError {
    match error {
        RunError::Step(e) => e,
        other => StepError::failed(pipeline, other.to_string()),
    }
}

fn step_names(steps: &[SharedStep]) -> Vec<&str> {
    steps.iter().map(|s| s.name()).collect()
}
