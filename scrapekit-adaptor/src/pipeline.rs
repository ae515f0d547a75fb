//! Adaptor pipelines.
//!
//! An [`Adaptor`] is an ordered list of [`Step`]s. Running it feeds the input
//! through each step in turn:
//!
//! - a JSON array input is fed as its elements
//! - a step returning a JSON array fans out: every element goes through the
//!   next step on its own, and the results are concatenated in order
//! - the result is always a flat list of the final values
//!
//! Each run gets a fresh side-channel argument map built from the arguments
//! bound on the pipeline, overlaid with the caller's overrides. Steps may read
//! and modify it; nothing is carried over to the next run.

use crate::error::{AdaptorError, AdaptorResult, StepError, StepResult};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Side-channel arguments visible to every step of one run.
pub type AdaptorArgs = Map<String, Value>;

/// One transformation stage of a pipeline.
///
/// Returning a JSON array fans the elements out to the next step. Returning
/// an empty array drops the value.
pub trait Step: Send + Sync {
    fn apply(&self, value: Value, args: &mut AdaptorArgs) -> StepResult<Value>;

    /// Label used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Step for F
where
    F: Fn(Value, &mut AdaptorArgs) -> StepResult<Value> + Send + Sync,
{
    fn apply(&self, value: Value, args: &mut AdaptorArgs) -> StepResult<Value> {
        self(value, args)
    }
}

/// Wraps a closure that ignores the side-channel arguments.
struct Unary<F>(F);

impl<F> Step for Unary<F>
where
    F: Fn(Value) -> StepResult<Value> + Send + Sync,
{
    fn apply(&self, value: Value, _args: &mut AdaptorArgs) -> StepResult<Value> {
        (self.0)(value)
    }

    fn name(&self) -> &str {
        "fn"
    }
}

/// A failed step inside one run.
struct StepFailure {
    index: usize,
    error: StepError,
}

/// A composable chain of steps with bound default arguments.
///
/// Cloning is cheap: steps are shared.
#[derive(Clone, Default)]
pub struct Adaptor {
    name: Option<String>,
    steps: Vec<Arc<dyn Step>>,
    args: AdaptorArgs,
}

impl Adaptor {
    /// An empty pipeline. Running it returns the input unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias of [`Adaptor::new`], reads better at call sites that mean "no transformation".
    pub fn identity() -> Self {
        Self::default()
    }

    /// A pipeline of a single step.
    pub fn single(step: impl Step + 'static) -> Self {
        Self::new().then(step)
    }

    /// Appends a step.
    ///
    /// Another `Adaptor` is a valid step; it runs with the caller's current
    /// arguments as overrides.
    #[must_use]
    pub fn then(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Appends an already shared step.
    #[must_use]
    pub fn then_shared(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends a closure that takes the side-channel arguments.
    #[must_use]
    pub fn then_with<F>(self, f: F) -> Self
    where
        F: Fn(Value, &mut AdaptorArgs) -> StepResult<Value> + Send + Sync + 'static,
    {
        self.then(f)
    }

    /// Appends a closure that ignores the side-channel arguments.
    #[must_use]
    pub fn then_fn<F>(self, f: F) -> Self
    where
        F: Fn(Value) -> StepResult<Value> + Send + Sync + 'static,
    {
        self.then(Unary(f))
    }

    /// Binds a default side-channel argument.
    #[must_use]
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Binds several default side-channel arguments.
    #[must_use]
    pub fn args(mut self, args: AdaptorArgs) -> Self {
        self.args.extend(args);
        self
    }

    /// Labels the pipeline for logs and errors.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn named_if_unnamed(self, name: impl FnOnce() -> String) -> Self {
        if self.name.is_some() { self } else { self.named(name()) }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn bound_args(&self) -> &AdaptorArgs {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the pipeline with its bound arguments.
    pub fn run(&self, value: impl Into<Value>) -> AdaptorResult<Vec<Value>> {
        self.run_with(value, &AdaptorArgs::new())
    }

    /// Runs the pipeline with per-call argument overrides.
    ///
    /// Overrides take precedence over bound arguments for this call only.
    pub fn run_with(
        &self,
        value: impl Into<Value>,
        overrides: &AdaptorArgs,
    ) -> AdaptorResult<Vec<Value>> {
        let mut args = self.call_args(overrides);
        self.execute(value.into(), &mut args)
            .map_err(|failure| AdaptorError::Step {
                pipeline: self.label().to_string(),
                index: failure.index,
                source: failure.error,
            })
    }

    fn call_args(&self, overrides: &AdaptorArgs) -> AdaptorArgs {
        let mut args = self.args.clone();
        for (key, value) in overrides {
            args.insert(key.clone(), value.clone());
        }
        args
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    fn execute(&self, input: Value, args: &mut AdaptorArgs) -> Result<Vec<Value>, StepFailure> {
        let mut values = Vec::new();
        push_flattened(&mut values, input);
        let inputs = values.len();

        for (index, step) in self.steps.iter().enumerate() {
            let mut next = Vec::with_capacity(values.len());
            for value in values {
                let out = step
                    .apply(value, args)
                    .map_err(|error| StepFailure { index, error })?;
                push_flattened(&mut next, out);
            }
            values = next;
        }

        debug!(
            pipeline = self.label(),
            steps = self.steps.len(),
            inputs,
            outputs = values.len(),
            "Pipeline run"
        );
        Ok(values)
    }
}

impl Step for Adaptor {
    fn apply(&self, value: Value, args: &mut AdaptorArgs) -> StepResult<Value> {
        let mut nested = self.call_args(args);
        self.execute(value, &mut nested)
            .map(Value::Array)
            .map_err(|failure| StepError::Nested {
                pipeline: self.label().to_string(),
                index: failure.index,
                source: Box::new(failure.error),
            })
    }

    fn name(&self) -> &str {
        self.label()
    }
}

impl fmt::Debug for Adaptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adaptor")
            .field("name", &self.name)
            .field("steps", &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("args", &self.args)
            .finish()
    }
}

fn push_flattened(out: &mut Vec<Value>, value: Value) {
    match value {
        Value::Array(values) => out.extend(values),
        other => out.push(other),
    }
}
