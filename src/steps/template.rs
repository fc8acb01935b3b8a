//! Template rendering step

use crate::core::{
    callback::RunScope,
    error::StepError,
    step::{value_to_text, Step, Values},
};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Renders `{{ name }}` placeholders into a single output value
///
/// The step's inputs are exactly the placeholder names, in order of first use.
#[derive(Debug, Clone)]
pub struct TemplateStep {
    name: String,
    template: String,
    inputs: Vec<String>,
    output_key: String,
}

impl TemplateStep {
    pub fn new(name: &str, template: &str, output_key: &str) -> Self {
        let mut inputs: Vec<String> = Vec::new();
        for caps in placeholder().captures_iter(template) {
            let var = caps[1].to_string();
            if !inputs.contains(&var) {
                inputs.push(var);
            }
        }

        Self {
            name: name.to_string(),
            template: template.to_string(),
            inputs,
            output_key: output_key.to_string(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute every placeholder from `values`
    pub fn render(&self, values: &Values) -> Result<String, StepError> {
        if let Some(missing) = self.inputs.iter().find(|key| !values.contains_key(*key)) {
            return Err(StepError::failed(
                &self.name,
                format!("template variable '{}' not provided", missing),
            ));
        }

        let rendered = placeholder().replace_all(&self.template, |caps: &Captures| {
            values
                .get(&caps[1])
                .cloned()
                .map(value_to_text)
                .unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

impl Step for TemplateStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_keys(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn output_keys(&self) -> Vec<String> {
        vec![self.output_key.clone()]
    }

    fn call(&self, inputs: &Values, _scope: &RunScope) -> Result<Values, StepError> {
        let rendered = self.render(inputs)?;
        let mut outputs = Values::new();
        outputs.insert(self.output_key.clone(), Value::String(rendered));
        Ok(outputs)
    }
}
