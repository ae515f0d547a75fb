//! Item adaptors for scraped data.
//!
//! An item adaptor cleans raw scraped values on their way into a typed
//! [`Item`](scrapekit_item::Item):
//! - [`Adaptor`]: a composable pipeline of [`Step`]s with fan-out/flatten semantics
//! - [`AdaptorClass`]: binds an item schema's fields to pipelines, with inheritance
//! - [`ItemAdaptor`]: one item being filled through a class, via `get`/`set`
//! - [`steps`]: ready-made cleaning and coercion steps
//! - [`AdaptorConfig`] / [`StepRegistry`]: classes declared in TOML
//!
//! Nothing here installs a `tracing` subscriber; pipelines log at `debug`.

mod class;
mod config;
mod error;
mod instance;
mod pipeline;
mod registry;
pub mod steps;

pub use class::{AdaptorClass, AdaptorClassBuilder, PipelineSource};
pub use config::{AdaptorConfig, AdaptorSection, FieldEntry, ItemConfig, PipelineEntry, StepEntry};
pub use error::{AdaptorError, AdaptorResult, StepError, StepResult};
pub use instance::ItemAdaptor;
pub use pipeline::{Adaptor, AdaptorArgs, Step};
pub use registry::{StepFactory, StepParams, StepRegistry};
