//! Typed item records for scraped data.
//!
//! Defines the record side of scrapekit:
//! - [`ItemSchema`]: an item type's named fields, inherited additively from a parent schema
//! - [`FieldDef`]: one field with its name, element type and single/multi kind
//! - [`Item`]: a record bound to a schema, validating every write against it
//!
//! Values are plain `serde_json::Value`s. A multi-valued field always stores a
//! JSON array whose elements match the field's element type.

mod item;
mod schema;

pub use item::Item;
pub use schema::{ElementType, FieldDef, FieldKind, ItemSchema, ItemSchemaBuilder};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, ItemError>;

/// Errors raised while declaring schemas or writing item fields.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("item type `{item_type}` does not declare field `{field}`")]
    UnknownField { item_type: String, field: String },

    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("field `{field}` expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: ElementType,
        found: &'static str,
    },

    #[error("multi-valued field `{field}` expects a list, got {found}")]
    ExpectedSequence { field: String, found: &'static str },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Short JSON type name used in error messages.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "text",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
