//! Adaptor classes declared in TOML.
//!
//! ```toml
//! [item]
//! type = "product"
//! fields = [
//!   { name = "title", type = "text" },
//!   { name = "tags", type = "text", multi = true },
//! ]
//!
//! [adaptor]
//! name = "ProductAdaptor"
//! default = { steps = [{ step = "normalize_whitespace" }] }
//!
//! [adaptor.fields.tags]
//! steps = [{ step = "split_on", sep = "," }, { step = "trim" }]
//! ```
//!
//! Every step entry names a factory in a [`StepRegistry`]; its other keys are
//! passed to the factory as parameters.

use crate::class::AdaptorClass;
use crate::error::{AdaptorError, AdaptorResult};
use crate::pipeline::{Adaptor, AdaptorArgs};
use crate::registry::{StepParams, StepRegistry};
use scrapekit_item::{ElementType, FieldDef, FieldKind, ItemSchema};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AdaptorConfig {
    pub item: ItemConfig,
    #[serde(default)]
    pub adaptor: AdaptorSection,
}

/// The `[item]` table: the item type to fill.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemConfig {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    #[serde(rename = "type", default = "default_element_type")]
    pub element_type: ElementType,
    #[serde(default)]
    pub multi: bool,
}

fn default_element_type() -> ElementType {
    ElementType::Text
}

impl From<&FieldEntry> for FieldDef {
    fn from(entry: &FieldEntry) -> Self {
        FieldDef {
            name: entry.name.clone(),
            element_type: entry.element_type,
            kind: if entry.multi { FieldKind::Multi } else { FieldKind::Single },
        }
    }
}

/// The `[adaptor]` table: field pipelines and the default pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct AdaptorSection {
    #[serde(default = "default_adaptor_name")]
    pub name: String,
    #[serde(default)]
    pub default: Option<PipelineEntry>,
    #[serde(default)]
    pub fields: BTreeMap<String, PipelineEntry>,
}

fn default_adaptor_name() -> String {
    "ItemAdaptor".to_string()
}

impl Default for AdaptorSection {
    fn default() -> Self {
        Self {
            name: default_adaptor_name(),
            default: None,
            fields: BTreeMap::new(),
        }
    }
}

/// One pipeline: its steps and bound arguments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineEntry {
    #[serde(default)]
    pub steps: Vec<StepEntry>,
    #[serde(default)]
    pub args: AdaptorArgs,
}

/// `{ step = "name", ...params }`
#[derive(Debug, Clone, Deserialize)]
pub struct StepEntry {
    pub step: String,
    #[serde(flatten)]
    pub params: StepParams,
}

impl AdaptorConfig {
    pub fn from_toml_str(s: &str) -> AdaptorResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> AdaptorResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), adaptor = %config.adaptor.name, "Loaded adaptor config");
        Ok(config)
    }

    /// Builds the item schema declared under `[item]`.
    pub fn schema(&self) -> AdaptorResult<Arc<ItemSchema>> {
        if self.item.fields.is_empty() {
            return Err(AdaptorError::Config(format!(
                "item type `{}` declares no fields",
                self.item.item_type
            )));
        }
        let schema = ItemSchema::builder(self.item.item_type.clone())
            .fields(self.item.fields.iter().map(FieldDef::from))
            .build()?;
        Ok(schema)
    }

    /// Builds the adaptor class, resolving step names against `registry`.
    pub fn build(&self, registry: &StepRegistry) -> AdaptorResult<Arc<AdaptorClass>> {
        let mut builder = AdaptorClass::builder(self.adaptor.name.clone()).item_schema(self.schema()?);

        if let Some(entry) = &self.adaptor.default {
            builder = builder.default_adaptor(build_pipeline(entry, registry)?);
        }
        for (field, entry) in &self.adaptor.fields {
            builder = builder.field(field.clone(), build_pipeline(entry, registry)?);
        }

        builder.build()
    }
}

fn build_pipeline(entry: &PipelineEntry, registry: &StepRegistry) -> AdaptorResult<Adaptor> {
    let pipeline = entry.steps.iter().try_fold(Adaptor::new(), |pipeline, step| {
        Ok::<_, AdaptorError>(pipeline.then_shared(registry.create(&step.step, &step.params)?))
    })?;
    Ok(pipeline.args(entry.args.clone()))
}
