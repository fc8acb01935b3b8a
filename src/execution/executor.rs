//! Step invocation strategies
//!
//! The sequencing loops in [`crate::execution::engine`] are written once and
//! parameterized over an [`Invocation`]. [`Blocking`] calls a step's blocking
//! form and is driven to completion with [`drive_blocking`]; [`Suspending`]
//! awaits the step's suspendable form on the caller's runtime.

use crate::core::{
    callback::RunScope,
    error::StepError,
    step::{Step, Values},
};
use async_trait::async_trait;
use futures::{executor::block_on, FutureExt};
use indexmap::IndexSet;
use std::{future::Future, pin::pin};

/// Drive a sequencing loop that uses [`Blocking`] to completion
///
/// Such a loop finishes on its first poll without entering an executor, so
/// calls may nest on one thread.
pub fn drive_blocking<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    match future.as_mut().now_or_never() {
        Some(output) => output,
        None => block_on(future),
    }
}

/// How a single step is invoked
#[async_trait]
pub trait Invocation: Send + Sync {
    /// Name of the mode, for logs
    fn mode(&self) -> &'static str;

    /// Invoke the keyed form of a step
    async fn call(
        &self,
        step: &dyn Step,
        inputs: &Values,
        scope: &RunScope,
    ) -> Result<Values, StepError>;

    /// Invoke the single-value form of a step
    async fn run(&self, step: &dyn Step, input: &str, scope: &RunScope)
        -> Result<String, StepError>;
}

/// Invoke steps through their blocking forms
///
/// Every future this produces is ready on first poll.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blocking;

#[async_trait]
impl Invocation for Blocking {
    fn mode(&self) -> &'static str {
        "blocking"
    }

    async fn call(
        &self,
        step: &dyn Step,
        inputs: &Values,
        scope: &RunScope,
    ) -> Result<Values, StepError> {
        step.call(inputs, scope)
    }

    async fn run(
        &self,
        step: &dyn Step,
        input: &str,
        scope: &RunScope,
    ) -> Result<String, StepError> {
        step.run(input, scope)
    }
}

/// Invoke steps through their suspendable forms
#[derive(Debug, Clone, Copy, Default)]
pub struct Suspending;

#[async_trait]
impl Invocation for Suspending {
    fn mode(&self) -> &'static str {
        "suspending"
    }

    async fn call(
        &self,
        step: &dyn Step,
        inputs: &Values,
        scope: &RunScope,
    ) -> Result<Values, StepError> {
        step.acall(inputs, scope).await
    }

    async fn run(
        &self,
        step: &dyn Step,
        input: &str,
        scope: &RunScope,
    ) -> Result<String, StepError> {
        step.arun(input, scope).await
    }
}

/// Keep only a step's declared outputs, failing if any is absent
///
/// A key declared more than once is collected once.
pub fn collect_outputs(step: &dyn Step, mut outputs: Values) -> Result<Values, StepError> {
    let declared: IndexSet<String> = step.output_keys().into_iter().collect();
    declared
        .into_iter()
        .map(|key| match outputs.shift_remove(&key) {
            Some(value) => Ok((key, value)),
            None => Err(StepError::MissingOutput {
                step: step.name().to_string(),
                key,
            }),
        })
        .collect()
}
