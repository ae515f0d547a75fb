use crate::schema::{FieldDef, FieldKind, ItemSchema};
use crate::{ItemError, Result, json_type_name};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A record bound to an [`ItemSchema`].
///
/// Only declared fields can be read or written, and every write is checked
/// against the field's element type before anything is stored. Unset fields
/// read as `None`.
#[derive(Debug, Clone)]
pub struct Item {
    schema: Arc<ItemSchema>,
    values: Map<String, Value>,
}

impl Item {
    /// Creates an empty item of the given type.
    pub fn new(schema: Arc<ItemSchema>) -> Self {
        Self {
            schema,
            values: Map::new(),
        }
    }

    pub fn schema(&self) -> &Arc<ItemSchema> {
        &self.schema
    }

    pub fn item_type(&self) -> &str {
        self.schema.item_type()
    }

    /// Returns the stored value of `field`, or `None` if it was never set.
    pub fn get(&self, field: &str) -> Result<Option<&Value>> {
        self.schema.require(field)?;
        Ok(self.values.get(field))
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Stores `value` in `field`.
    ///
    /// Multi-valued fields take a JSON array whose elements all match the
    /// element type; single-valued fields take one matching value.
    pub fn set(&mut self, field: &str, value: Value) -> Result<()> {
        let def = self.schema.require(field)?;
        check_value(def, &value)?;
        self.values.insert(def.name.clone(), value);
        Ok(())
    }

    /// Unsets `field`, returning its previous value.
    pub fn clear(&mut self, field: &str) -> Result<Option<Value>> {
        self.schema.require(field)?;
        Ok(self.values.shift_remove(field))
    }

    /// The stored field values, in assignment order.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    /// The stored field values as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Serializes the whole item, type name included.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.item_type() == other.item_type() && self.values == other.values
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Item", 2)?;
        s.serialize_field("item_type", self.item_type())?;
        s.serialize_field("fields", &self.values)?;
        s.end()
    }
}

fn check_value(def: &FieldDef, value: &Value) -> Result<()> {
    match def.kind {
        FieldKind::Single => check_element(def, value),
        FieldKind::Multi => match value {
            Value::Array(elements) => elements.iter().try_for_each(|v| check_element(def, v)),
            other => Err(ItemError::ExpectedSequence {
                field: def.name.clone(),
                found: json_type_name(other),
            }),
        },
    }
}

fn check_element(def: &FieldDef, value: &Value) -> Result<()> {
    if def.element_type.accepts(value) {
        Ok(())
    } else {
        Err(ItemError::TypeMismatch {
            field: def.name.clone(),
            expected: def.element_type,
            found: json_type_name(value),
        })
    }
}
