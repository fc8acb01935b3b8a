//! Pipeline execution: invocation strategies and the sequencing loops

pub mod engine;
pub mod executor;

pub use engine::{run_keyed, run_scalar};
pub use executor::{drive_blocking, Blocking, Invocation, Suspending};
