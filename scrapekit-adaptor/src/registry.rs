//! Named step factories, used to build pipelines from configuration.

use crate::error::{AdaptorError, AdaptorResult};
use crate::pipeline::Step;
use crate::steps;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Parameters given to a step in configuration, minus its name.
pub type StepParams = Map<String, Value>;

/// Builds a step from its configuration parameters.
pub type StepFactory = Arc<dyn Fn(&StepParams) -> AdaptorResult<Arc<dyn Step>> + Send + Sync>;

/// Maps step names to factories.
#[derive(Clone, Default)]
pub struct StepRegistry {
    factories: HashMap<String, StepFactory>,
}

impl StepRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every step of [`crate::steps`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_plain("trim", steps::trim);
        registry.register_plain("normalize_whitespace", steps::normalize_whitespace);
        registry.register_plain("lowercase", steps::lowercase);
        registry.register_plain("uppercase", steps::uppercase);
        registry.register_plain("title_case", steps::title_case);
        registry.register_plain("swap_case", steps::swap_case);
        registry.register_plain("drop_last_char", steps::drop_last_char);
        registry.register_plain("strip_brackets", steps::strip_brackets);
        registry.register_plain("decode_entities", steps::decode_entities);
        registry.register_plain("drop_empty", steps::drop_empty);
        registry.register_plain("to_integer", steps::to_integer);
        registry.register_plain("to_float", steps::to_float);
        registry.register_plain("to_bool", steps::to_bool);

        registry.register("split_on", |p| {
            let sep = str_param(p, "split_on", "sep")?;
            if sep.is_empty() {
                return Err(AdaptorError::Config("step `split_on` requires a non-empty `sep`".to_string()));
            }
            Ok(Arc::new(steps::split_on(sep)))
        });
        registry.register("replace", |p| {
            let from = str_param(p, "replace", "from")?;
            let to = str_param(p, "replace", "to")?;
            Ok(Arc::new(steps::replace(from, to)))
        });
        registry.register("strip_suffix_chars", |p| {
            Ok(Arc::new(steps::strip_suffix_chars(usize_param(p, "strip_suffix_chars", "n")?)))
        });
        registry.register("add_from_arg", |p| {
            Ok(Arc::new(steps::add_from_arg(str_param(p, "add_from_arg", "key")?)))
        });
        registry
    }

    /// Registers a factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&StepParams) -> AdaptorResult<Arc<dyn Step>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Registers a step that takes no parameters.
    pub fn register_plain<S, F>(&mut self, name: impl Into<String>, make: F)
    where
        S: Step + 'static,
        F: Fn() -> S + Send + Sync + 'static,
    {
        self.register(name, move |_| Ok(Arc::new(make()) as Arc<dyn Step>));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered step names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Instantiates the step `name` with `params`.
    pub fn create(&self, name: &str, params: &StepParams) -> AdaptorResult<Arc<dyn Step>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| AdaptorError::UnknownStep(name.to_string()))?;
        factory(params)
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry").field("steps", &self.names()).finish()
    }
}

fn str_param(params: &StepParams, step: &str, key: &str) -> AdaptorResult<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AdaptorError::Config(format!("step `{step}` requires text parameter `{key}`")))
}

fn usize_param(params: &StepParams, step: &str, key: &str) -> AdaptorResult<usize> {
    params
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            AdaptorError::Config(format!("step `{step}` requires non-negative integer parameter `{key}`"))
        })
}
