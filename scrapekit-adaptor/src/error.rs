//! Error types for pipelines and item adaptors.

use scrapekit_item::ItemError;
use thiserror::Error;

/// Result type returned by a single step.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for adaptor operations.
pub type AdaptorResult<T> = Result<T, AdaptorError>;

/// Failure raised by a step while transforming one value.
#[derive(Debug, Error)]
pub enum StepError {
    /// The step cannot handle this kind of value.
    #[error("{step}: expected {expected} input, got {found}")]
    InvalidInput {
        step: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Text could not be parsed into the requested type.
    #[error("{step}: cannot parse {input:?}: {reason}")]
    Parse {
        step: String,
        input: String,
        reason: String,
    },

    /// An arithmetic result does not fit a JSON number.
    #[error("{step}: numeric overflow")]
    Overflow { step: String },

    /// A side-channel argument the step requires was not supplied.
    #[error("missing side-channel argument `{0}`")]
    MissingArg(String),

    /// A side-channel argument has the wrong type.
    #[error("side-channel argument `{key}` must be {expected}")]
    InvalidArg { key: String, expected: &'static str },

    /// A nested pipeline failed.
    #[error("pipeline `{pipeline}` failed at step {index}: {source}")]
    Nested {
        pipeline: String,
        index: usize,
        source: Box<StepError>,
    },

    #[error("{0}")]
    Custom(String),
}

/// Errors from building adaptor classes or adapting values.
#[derive(Debug, Error)]
pub enum AdaptorError {
    /// Neither the class nor any ancestor names an item schema.
    #[error("adaptor `{0}` has no item schema")]
    MissingSchema(String),

    /// A pipeline was declared for a field the item type does not have.
    #[error("adaptor `{adaptor}` declares a pipeline for `{field}`, which item type `{item_type}` does not declare")]
    UnknownField {
        adaptor: String,
        item_type: String,
        field: String,
    },

    /// A step failed while running a field pipeline.
    #[error("pipeline `{pipeline}` failed at step {index}: {source}")]
    Step {
        pipeline: String,
        index: usize,
        source: StepError,
    },

    #[error(transparent)]
    Item(#[from] ItemError),

    /// A configuration names a step that is not registered.
    #[error("unknown step `{0}`")]
    UnknownStep(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
