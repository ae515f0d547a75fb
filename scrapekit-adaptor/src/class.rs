//! Adaptor classes: which pipeline each item field goes through.
//!
//! A class binds an item schema to per-field pipelines and may extend a
//! parent class. Resolution happens once, in [`AdaptorClassBuilder::build`].
//! For every field of the schema the effective pipeline is, in order:
//!
//! 1. a pipeline declared on this class
//! 2. a pipeline declared on the nearest ancestor that declares one
//! 3. the default adaptor of the nearest class that declares one
//! 4. the identity pipeline

use crate::error::{AdaptorError, AdaptorResult};
use crate::pipeline::{Adaptor, Step};
use crate::StepResult;
use scrapekit_item::{ItemError, ItemSchema};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Where a field's resolved pipeline came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSource {
    /// Declared on the class itself.
    Declared,
    /// Declared on the named ancestor class.
    Inherited(String),
    /// The default adaptor, declared on the named class.
    Default(String),
    Identity,
}

#[derive(Debug, Clone)]
struct ResolvedField {
    adaptor: Adaptor,
    source: PipelineSource,
}

/// A resolved adaptor class. Create instances with [`crate::ItemAdaptor::new`].
#[derive(Debug)]
pub struct AdaptorClass {
    name: String,
    parent: Option<Arc<AdaptorClass>>,
    schema: Arc<ItemSchema>,
    declared: BTreeMap<String, Adaptor>,
    own_default: Option<Adaptor>,
    resolved: HashMap<String, ResolvedField>,
}

impl AdaptorClass {
    /// Starts declaring a class.
    pub fn builder(name: impl Into<String>) -> AdaptorClassBuilder {
        AdaptorClassBuilder {
            name: name.into(),
            parent: None,
            schema: None,
            fields: BTreeMap::new(),
            default_adaptor: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<AdaptorClass>> {
        self.parent.as_ref()
    }

    pub fn schema(&self) -> &Arc<ItemSchema> {
        &self.schema
    }

    /// The resolved pipeline for `field`, for composing it into a child class.
    pub fn field_adaptor(&self, field: &str) -> Option<&Adaptor> {
        self.resolved.get(field).map(|r| &r.adaptor)
    }

    /// Like [`AdaptorClass::field_adaptor`], failing on undeclared fields.
    pub fn pipeline(&self, field: &str) -> AdaptorResult<&Adaptor> {
        self.field_adaptor(field).ok_or_else(|| {
            AdaptorError::Item(ItemError::UnknownField {
                item_type: self.schema.item_type().to_string(),
                field: field.to_string(),
            })
        })
    }

    pub fn resolution(&self, field: &str) -> Option<&PipelineSource> {
        self.resolved.get(field).map(|r| &r.source)
    }

    /// Field names with a resolved pipeline, in schema order.
    pub fn field_adaptors(&self) -> impl Iterator<Item = &str> {
        self.schema.field_names().filter(|f| self.resolved.contains_key(*f))
    }

    /// Field names this class declares pipelines for itself.
    pub fn declared_fields(&self) -> impl Iterator<Item = &str> {
        self.declared.keys().map(String::as_str)
    }

    /// The effective default adaptor: this class's own, or the nearest ancestor's.
    pub fn default_adaptor(&self) -> Option<&Adaptor> {
        self.lineage().find_map(|c| c.own_default.as_ref())
    }

    /// This class followed by its ancestors, nearest first.
    pub fn lineage(&self) -> impl Iterator<Item = &AdaptorClass> {
        std::iter::successors(Some(self), |c| c.parent.as_deref())
    }

    fn resolve(&mut self) {
        let mut resolved = HashMap::with_capacity(self.schema.fields().len());

        for field in self.schema.field_names() {
            let entry = self.resolve_field(field);
            debug!(
                adaptor = %self.name,
                field,
                source = ?entry.source,
                "Resolved field pipeline"
            );
            resolved.insert(field.to_string(), entry);
        }

        self.resolved = resolved;
    }

    fn resolve_field(&self, field: &str) -> ResolvedField {
        if let Some(adaptor) = self.declared.get(field) {
            return ResolvedField {
                adaptor: adaptor.clone(),
                source: PipelineSource::Declared,
            };
        }

        let ancestors = || self.lineage().skip(1);

        if let Some((class, adaptor)) =
            ancestors().find_map(|c| c.declared.get(field).map(|a| (c, a)))
        {
            return ResolvedField {
                adaptor: adaptor.clone(),
                source: PipelineSource::Inherited(class.name.clone()),
            };
        }

        if let Some((class, adaptor)) =
            self.lineage().find_map(|c| c.own_default.as_ref().map(|a| (c, a)))
        {
            return ResolvedField {
                adaptor: adaptor.clone(),
                source: PipelineSource::Default(class.name.clone()),
            };
        }

        ResolvedField {
            adaptor: Adaptor::identity().named(format!("{}.{}", self.name, field)),
            source: PipelineSource::Identity,
        }
    }
}

/// Builder returned by [`AdaptorClass::builder`].
pub struct AdaptorClassBuilder {
    name: String,
    parent: Option<Arc<AdaptorClass>>,
    schema: Option<Arc<ItemSchema>>,
    fields: BTreeMap<String, Adaptor>,
    default_adaptor: Option<Adaptor>,
}

impl AdaptorClassBuilder {
    /// Binds the item type this class fills. Inherited from the parent if omitted.
    #[must_use]
    pub fn item_schema(mut self, schema: Arc<ItemSchema>) -> Self {
        self.schema = Some(schema);
        self
    }

    #[must_use]
    pub fn extends(mut self, parent: &Arc<AdaptorClass>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Declares the pipeline for `field`. A later declaration for the same
    /// field replaces an earlier one.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>, adaptor: Adaptor) -> Self {
        self.fields.insert(field.into(), adaptor);
        self
    }

    /// Declares a single-step pipeline for `field`.
    #[must_use]
    pub fn field_step(self, field: impl Into<String>, step: impl Step + 'static) -> Self {
        self.field(field, Adaptor::single(step))
    }

    /// Declares a pipeline for `field` from a closure that ignores arguments.
    #[must_use]
    pub fn field_fn<F>(self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> StepResult<Value> + Send + Sync + 'static,
    {
        self.field(field, Adaptor::new().then_fn(f))
    }

    /// Declares the pipeline for every field without one of its own.
    #[must_use]
    pub fn default_adaptor(mut self, adaptor: Adaptor) -> Self {
        self.default_adaptor = Some(adaptor);
        self
    }

    /// Validates the declarations and resolves every field's pipeline.
    pub fn build(self) -> AdaptorResult<Arc<AdaptorClass>> {
        let schema = match self.schema {
            Some(schema) => schema,
            None => self
                .parent
                .as_ref()
                .map(|p| Arc::clone(&p.schema))
                .ok_or_else(|| AdaptorError::MissingSchema(self.name.clone()))?,
        };

        if let Some(field) = self.fields.keys().find(|f| !schema.contains(f)) {
            return Err(AdaptorError::UnknownField {
                adaptor: self.name.clone(),
                item_type: schema.item_type().to_string(),
                field: field.clone(),
            });
        }

        let name = self.name;
        let declared = self
            .fields
            .into_iter()
            .map(|(field, adaptor)| {
                let adaptor = adaptor.named_if_unnamed(|| format!("{name}.{field}"));
                (field, adaptor)
            })
            .collect();
        let own_default = self
            .default_adaptor
            .map(|a| a.named_if_unnamed(|| format!("{name}.default")));

        let mut class = AdaptorClass {
            name,
            parent: self.parent,
            schema,
            declared,
            own_default,
            resolved: HashMap::new(),
        };
        class.resolve();

        info!(
            adaptor = %class.name,
            item_type = class.schema.item_type(),
            fields = class.resolved.len(),
            "Adaptor class resolved"
        );
        Ok(Arc::new(class))
    }
}
