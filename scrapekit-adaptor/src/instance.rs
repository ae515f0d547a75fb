use crate::class::AdaptorClass;
use crate::error::AdaptorResult;
use crate::pipeline::AdaptorArgs;
use scrapekit_item::{FieldKind, Item};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// One item being filled through an [`AdaptorClass`].
///
/// Every write runs the raw value through the field's resolved pipeline and
/// stores the final output: the whole list for multi-valued fields, the last
/// value for single-valued ones. Reads return what is stored.
#[derive(Debug)]
pub struct ItemAdaptor {
    class: Arc<AdaptorClass>,
    item: Item,
}

impl ItemAdaptor {
    /// Creates an adaptor around a fresh, empty item.
    pub fn new(class: &Arc<AdaptorClass>) -> Self {
        Self {
            class: Arc::clone(class),
            item: Item::new(Arc::clone(class.schema())),
        }
    }

    /// Adapts every key of `record` into a fresh item, in the record's order.
    pub fn adapt_record(class: &Arc<AdaptorClass>, record: &Map<String, Value>) -> AdaptorResult<Item> {
        let mut adaptor = Self::new(class);
        adaptor.set_many(record.iter().map(|(k, v)| (k.as_str(), v.clone())))?;
        Ok(adaptor.into_item())
    }

    pub fn class(&self) -> &Arc<AdaptorClass> {
        &self.class
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn into_item(self) -> Item {
        self.item
    }

    /// Field names with a resolved pipeline.
    pub fn field_adaptors(&self) -> impl Iterator<Item = &str> {
        self.class.field_adaptors()
    }

    /// Returns the stored value of `field`.
    pub fn get(&self, field: &str) -> AdaptorResult<Option<&Value>> {
        Ok(self.item.get(field)?)
    }

    /// Runs `raw` through the field's pipeline and stores the result.
    pub fn set(&mut self, field: &str, raw: impl Into<Value>) -> AdaptorResult<()> {
        self.set_with(field, raw, &AdaptorArgs::new())
    }

    /// Like [`ItemAdaptor::set`], with per-call side-channel overrides.
    ///
    /// On any error the item is left as it was.
    pub fn set_with(
        &mut self,
        field: &str,
        raw: impl Into<Value>,
        overrides: &AdaptorArgs,
    ) -> AdaptorResult<()> {
        let kind = self.class.schema().require(field)?.kind;
        let pipeline = self.class.pipeline(field)?;
        let mut values = pipeline.run_with(raw, overrides)?;

        debug!(
            adaptor = self.class.name(),
            field,
            values = values.len(),
            "Assigning field"
        );

        match kind {
            FieldKind::Multi => self.item.set(field, Value::Array(values))?,
            FieldKind::Single => match values.pop() {
                Some(value) => self.item.set(field, value)?,
                None => {
                    self.item.clear(field)?;
                }
            },
        }
        Ok(())
    }

    /// Assigns several fields in order, stopping at the first failure.
    /// Fields assigned before the failure keep their new values.
    pub fn set_many<'a, I, V>(&mut self, values: I) -> AdaptorResult<()>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Into<Value>,
    {
        for (field, raw) in values {
            self.set(field, raw)?;
        }
        Ok(())
    }
}
