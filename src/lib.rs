//! stepline - compose validated, linear step pipelines over named values

pub mod cli;
pub mod core;
pub mod execution;
pub mod steps;

// Re-export commonly used types
pub use core::{KeyedPipeline, KeyedPipelineConfig, ScalarPipeline, ScalarPipelineConfig};
pub use core::{Memory, SharedStep, Step, Values};
pub use core::{PipelineEvent, ProgressCallback, RunScope};
pub use core::{RunError, StepError, ValidationError};
