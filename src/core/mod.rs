//! Core domain models
//!
//! Steps, the values they exchange, the validation that runs when a pipeline
//! is built, and the pipelines themselves.

pub mod callback;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod step;
pub mod validation;

pub use callback::{NoopCallback, PipelineEvent, ProgressCallback, RunScope};
pub use context::Accumulator;
pub use error::{ArityKind, RunError, StepError, ValidationError};
pub use pipeline::*;
pub use step::*;
