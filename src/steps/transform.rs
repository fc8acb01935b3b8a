//! Built-in text transforms

use crate::core::{
    callback::RunScope,
    error::StepError,
    step::{require_text, Step, Values},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text operation applied by a [`TransformStep`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextOp {
    Uppercase,
    Lowercase,
    Reverse,
    Trim,
    Identity,
}

impl TextOp {
    pub fn apply(&self, text: &str) -> String {
        match self {
            TextOp::Uppercase => text.to_uppercase(),
            TextOp::Lowercase => text.to_lowercase(),
            TextOp::Reverse => text.chars().rev().collect(),
            TextOp::Trim => text.trim().to_string(),
            TextOp::Identity => text.to_string(),
        }
    }
}

/// Applies a [`TextOp`] to one input, writing one output
#[derive(Debug, Clone)]
pub struct TransformStep {
    name: String,
    op: TextOp,
    input_key: String,
    output_key: String,
}

impl TransformStep {
    pub fn new(name: &str, op: TextOp, input_key: &str, output_key: &str) -> Self {
        Self {
            name: name.to_string(),
            op,
            input_key: input_key.to_string(),
            output_key: output_key.to_string(),
        }
    }

    pub fn op(&self) -> TextOp {
        self.op
    }
}

impl Step for TransformStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_keys(&self) -> Vec<String> {
        vec![self.input_key.clone()]
    }

    fn output_keys(&self) -> Vec<String> {
        vec![self.output_key.clone()]
    }

    fn call(&self, inputs: &Values, _scope: &RunScope) -> Result<Values, StepError> {
        let text = require_text(&self.name, inputs, &self.input_key)?;
        let mut outputs = Values::new();
        outputs.insert(self.output_key.clone(), Value::String(self.op.apply(&text)));
        Ok(outputs)
    }
}
