//! Concrete step kinds
//!
//! Pipelines accept anything implementing [`crate::core::Step`]; these are the
//! kinds shipped with the crate and buildable from YAML.

pub mod function;
pub mod memory;
pub mod template;
pub mod transform;

pub use function::{FnStep, TextFnStep};
pub use memory::StaticMemory;
pub use template::TemplateStep;
pub use transform::{TextOp, TransformStep};
