//! Test utility steps for stepline scenarios

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stepline::core::{RunScope, SharedStep, Step, StepError, Values};

/// Build a value map from pairs
pub fn vals(pairs: &[(&str, Value)]) -> Values {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Shared, ordered record of what steps did
#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Keyed step that adds one to its single input
///
/// Records `start:<name>` / `end:<name>` and the keys it was given. Its
/// suspendable form sleeps for `delay` before finishing.
pub struct CountingStep {
    name: String,
    input: String,
    output: String,
    delay: Option<Duration>,
    log: Log,
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

impl CountingStep {
    pub fn new(name: &str, input: &str, output: &str, log: &Log) -> Self {
        Self {
            name: name.to_string(),
            input: input.to_string(),
            output: output.to_string(),
            delay: None,
            log: log.clone(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Keys visible to this step, one entry per call
    pub fn seen(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        self.seen.clone()
    }

    pub fn shared(self) -> SharedStep {
        Arc::new(self)
    }

    fn compute(&self, inputs: &Values) -> Result<Values, StepError> {
        self.seen
            .lock()
            .unwrap()
            .push(inputs.keys().cloned().collect());
        let n = inputs
            .get(&self.input)
            .and_then(Value::as_i64)
            .ok_or_else(|| StepError::failed(&self.name, format!("'{}' is not a number", self.input)))?;
        Ok(vals(&[(self.output.as_str(), json!(n + 1))]))
    }
}

#[async_trait]
impl Step for CountingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_keys(&self) -> Vec<String> {
        vec![self.input.clone()]
    }

    fn output_keys(&self) -> Vec<String> {
        vec![self.output.clone()]
    }

    fn call(&self, inputs: &Values, _scope: &RunScope) -> Result<Values, StepError> {
        self.log.push(format!("start:{}", self.name));
        let out = self.compute(inputs);
        self.log.push(format!("end:{}", self.name));
        out
    }

    async fn acall(&self, inputs: &Values, _scope: &RunScope) -> Result<Values, StepError> {
        self.log.push(format!("start:{}", self.name));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let out = self.compute(inputs);
        self.log.push(format!("end:{}", self.name));
        out
    }
}

/// Step that always fails with `StepError::Failed`
pub struct FailingStep {
    name: String,
    input: String,
    output: String,
    log: Log,
}

impl FailingStep {
    pub fn shared(name: &str, input: &str, output: &str, log: &Log) -> SharedStep {
        Arc::new(Self {
            name: name.to_string(),
            input: input.to_string(),
            output: output.to_string(),
            log: log.clone(),
        })
    }
}

impl Step for FailingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_keys(&self) -> Vec<String> {
        vec![self.input.clone()]
    }

    fn output_keys(&self) -> Vec<String> {
        vec![self.output.clone()]
    }

    fn call(&self, _inputs: &Values, _scope: &RunScope) -> Result<Values, StepError> {
        self.log.push(format!("start:{}", self.name));
        Err(StepError::failed(&self.name, "upstream unavailable"))
    }
}

/// Single-value step applying `f`, recording each input and its scope tag
///
/// With [`TextStep::with_delay`], its suspendable form sleeps before finishing
/// and records `start:<name>` / `end:<name>` around the wait.
pub struct TextStep {
    name: String,
    f: fn(&str) -> String,
    inputs: Log,
    tags: Log,
    delay: Option<(Duration, Log)>,
}

impl TextStep {
    pub fn new(name: &str, f: fn(&str) -> String) -> Self {
        Self {
            name: name.to_string(),
            f,
            inputs: Log::new(),
            tags: Log::new(),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration, log: &Log) -> Self {
        self.delay = Some((delay, log.clone()));
        self
    }

    pub fn inputs(&self) -> Log {
        self.inputs.clone()
    }

    pub fn tags(&self) -> Log {
        self.tags.clone()
    }

    pub fn shared(self) -> SharedStep {
        Arc::new(self)
    }
}

#[async_trait]
impl Step for TextStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_keys(&self) -> Vec<String> {
        vec!["input".to_string()]
    }

    fn output_keys(&self) -> Vec<String> {
        vec!["output".to_string()]
    }

    fn call(&self, inputs: &Values, scope: &RunScope) -> Result<Values, StepError> {
        let input = stepline::core::require_text(&self.name, inputs, "input")?;
        let output = self.run(&input, scope)?;
        Ok(vals(&[("output", json!(output))]))
    }

    fn run(&self, input: &str, scope: &RunScope) -> Result<String, StepError> {
        self.inputs.push(input);
        self.tags.push(scope.tag.clone().unwrap_or_default());
        Ok((self.f)(input))
    }

    async fn acall(&self, inputs: &Values, scope: &RunScope) -> Result<Values, StepError> {
        let Some((delay, log)) = &self.delay else {
            return self.call(inputs, scope);
        };
        log.push(format!("start:{}", self.name));
        tokio::time::sleep(*delay).await;
        let out = self.call(inputs, scope);
        log.push(format!("end:{}", self.name));
        out
    }
}

pub fn uppercase(s: &str) -> String {
    s.to_uppercase()
}

pub fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}

pub fn pad(s: &str) -> String {
    format!("  {}  ", s)
}
