//! Pipeline definitions loaded from YAML

use crate::{
    core::{
        pipeline::{KeyedPipeline, KeyedPipelineConfig, ScalarPipeline, ScalarPipelineConfig},
        step::{SharedStep, Values},
    },
    steps::{StaticMemory, TemplateStep, TextOp, TransformStep},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Which kind of pipeline a definition builds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Threads named values through the steps
    #[default]
    Keyed,
    /// Pipes one text value through single-input, single-output steps
    Scalar,
}

/// Top-level pipeline definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub kind: PipelineKind,

    /// Names the caller must supply (keyed pipelines)
    #[serde(default)]
    pub input_variables: Vec<String>,

    /// Names returned to the caller (keyed pipelines); inferred when absent
    #[serde(default)]
    pub output_variables: Option<Vec<String>>,

    /// Return every produced name when outputs are inferred (keyed pipelines)
    #[serde(default)]
    pub return_all: bool,

    /// Fixed values available to every step (keyed pipelines)
    #[serde(default)]
    pub memory: Option<Values>,

    /// Trim whitespace between steps (scalar pipelines)
    #[serde(default)]
    pub strip_outputs: bool,

    /// Key the single input is read from when nested (scalar pipelines)
    #[serde(default = "default_input_key")]
    pub input_key: String,

    /// Key the single output is written to when nested (scalar pipelines)
    #[serde(default = "default_output_key")]
    pub output_key: String,

    /// Steps, in execution order
    pub steps: Vec<StepConfig>,
}

/// Step definition, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepConfig {
    /// Render `{{ name }}` placeholders into `output`
    Template {
        id: String,
        template: String,
        output: String,
    },

    /// Apply a built-in text operation
    Transform {
        id: String,
        op: TextOp,
        #[serde(default = "default_input_key")]
        input: String,
        #[serde(default = "default_output_key")]
        output: String,
    },

    /// A nested pipeline used as one step
    Pipeline { pipeline: Box<PipelineConfig> },
}

fn default_input_key() -> String {
    "input".to_string()
}

fn default_output_key() -> String {
    "output".to_string()
}

impl StepConfig {
    pub fn id(&self) -> &str {
        match self {
            StepConfig::Template { id, .. } | StepConfig::Transform { id, .. } => id,
            StepConfig::Pipeline { pipeline } => &pipeline.name,
        }
    }

    /// Build the step this definition describes
    pub fn to_step(&self) -> Result<SharedStep> {
        let step: SharedStep = match self {
            StepConfig::Template {
                id,
                template,
                output,
            } => Arc::new(TemplateStep::new(id, template, output)),
            StepConfig::Transform {
                id,
                op,
                input,
                output,
            } => Arc::new(TransformStep::new(id, *op, input, output)),
            StepConfig::Pipeline { pipeline } => pipeline.build()?.into_step(),
        };
        Ok(step)
    }
}

/// A validated pipeline of either kind
#[derive(Debug, Clone)]
pub enum BuiltPipeline {
    Keyed(KeyedPipeline),
    Scalar(ScalarPipeline),
}

impl BuiltPipeline {
    pub fn name(&self) -> &str {
        match self {
            BuiltPipeline::Keyed(p) => p.name(),
            BuiltPipeline::Scalar(p) => p.name(),
        }
    }

    pub fn step_count(&self) -> usize {
        match self {
            BuiltPipeline::Keyed(p) => p.steps().len(),
            BuiltPipeline::Scalar(p) => p.steps().len(),
        }
    }

    pub fn input_keys(&self) -> Vec<String> {
        match self {
            BuiltPipeline::Keyed(p) => p.input_variables().to_vec(),
            BuiltPipeline::Scalar(p) => vec![p.input_key().to_string()],
        }
    }

    pub fn output_keys(&self) -> Vec<String> {
        match self {
            BuiltPipeline::Keyed(p) => p.output_variables().to_vec(),
            BuiltPipeline::Scalar(p) => vec![p.output_key().to_string()],
        }
    }

    pub fn into_step(self) -> SharedStep {
        match self {
            BuiltPipeline::Keyed(p) => Arc::new(p),
            BuiltPipeline::Scalar(p) => Arc::new(p),
        }
    }
}

impl PipelineConfig {
    /// Load a pipeline definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse a pipeline definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the definition's shape; dependency checks happen in [`PipelineConfig::build`]
    pub fn validate(&self) -> Result<()> {
        let mut seen_ids = HashSet::new();
        for step in &self.steps {
            if !seen_ids.insert(step.id()) {
                anyhow::bail!("Duplicate step ID: {}", step.id());
            }
            if let StepConfig::Pipeline { pipeline } = step {
                pipeline
                    .validate()
                    .with_context(|| format!("In nested pipeline '{}'", pipeline.name))?;
            }
        }

        if self.kind == PipelineKind::Scalar && self.memory.is_some() {
            anyhow::bail!("Pipeline '{}': memory is only supported on keyed pipelines", self.name);
        }

        Ok(())
    }

    /// Build and validate the pipeline
    pub fn build(&self) -> Result<BuiltPipeline> {
        let steps = self
            .steps
            .iter()
            .map(|step| {
                step.to_step()
                    .with_context(|| format!("Failed to build step '{}'", step.id()))
            })
            .collect::<Result<Vec<_>>>()?;

        let built = match self.kind {
            PipelineKind::Keyed => {
                let mut config = KeyedPipelineConfig::new(steps, self.input_variables.iter())
                    .with_name(&self.name)
                    .with_return_all(self.return_all);
                if let Some(outputs) = &self.output_variables {
                    config = config.with_output_variables(outputs.iter());
                }
                if let Some(memory) = &self.memory {
                    config = config.with_memory(Arc::new(StaticMemory::new(memory.clone())));
                }
                BuiltPipeline::Keyed(
                    config
                        .build()
                        .with_context(|| format!("Invalid pipeline '{}'", self.name))?,
                )
            }
            PipelineKind::Scalar => BuiltPipeline::Scalar(
                ScalarPipelineConfig::new(steps)
                    .with_name(&self.name)
                    .with_strip_outputs(self.strip_outputs)
                    .with_input_key(&self.input_key)
                    .with_output_key(&self.output_key)
                    .build()
                    .with_context(|| format!("Invalid pipeline '{}'", self.name))?,
            ),
        };

        Ok(built)
    }
}
