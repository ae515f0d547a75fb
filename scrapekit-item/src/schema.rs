use crate::{ItemError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// The element type stored in a field.
///
/// For multi-valued fields this is the type of each list element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Text,
    Integer,
    Float,
    Boolean,
    /// Any JSON value, including null.
    Json,
}

impl ElementType {
    /// Whether `value` may be stored in a field of this type.
    /// `Float` also accepts integers.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Text => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Json => true,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a field holds one value or a list of values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Single,
    Multi,
}

/// A field declared on an item schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub element_type: ElementType,
    #[serde(default)]
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            element_type,
            kind: FieldKind::Single,
        }
    }

    /// Shorthand for a text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Text)
    }

    /// Shorthand for an integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Integer)
    }

    /// Shorthand for a float field.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Float)
    }

    /// Shorthand for a boolean field.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Boolean)
    }

    /// Shorthand for an untyped JSON field.
    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, ElementType::Json)
    }

    /// Turns this declaration into a multi-valued field.
    #[must_use]
    pub fn multi(mut self) -> Self {
        self.kind = FieldKind::Multi;
        self
    }

    pub fn is_multi(&self) -> bool {
        self.kind == FieldKind::Multi
    }
}

/// Describes an item type: its name and the full set of fields it carries.
///
/// Fields are inherited from the parent schema. A child declaration with the
/// same name as an inherited field replaces it in place, so field order is
/// always ancestors first, then the child's new fields.
#[derive(Debug, Clone)]
pub struct ItemSchema {
    item_type: String,
    parent: Option<Arc<ItemSchema>>,
    fields: Vec<FieldDef>,
}

impl ItemSchema {
    /// Starts declaring a new item type.
    pub fn builder(item_type: impl Into<String>) -> ItemSchemaBuilder {
        ItemSchemaBuilder {
            item_type: item_type.into(),
            parent: None,
            fields: Vec::new(),
        }
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn parent(&self) -> Option<&Arc<ItemSchema>> {
        self.parent.as_ref()
    }

    /// All fields, inherited ones included.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Walks the parent chain, nearest ancestor first.
    pub fn ancestors(&self) -> impl Iterator<Item = &ItemSchema> {
        std::iter::successors(self.parent.as_deref(), |s| s.parent.as_deref())
    }

    /// Looks up a field, failing with [`ItemError::UnknownField`].
    pub fn require(&self, name: &str) -> Result<&FieldDef> {
        self.field(name).ok_or_else(|| ItemError::UnknownField {
            item_type: self.item_type.clone(),
            field: name.to_string(),
        })
    }
}

/// Builder returned by [`ItemSchema::builder`].
#[derive(Debug)]
pub struct ItemSchemaBuilder {
    item_type: String,
    parent: Option<Arc<ItemSchema>>,
    fields: Vec<FieldDef>,
}

impl ItemSchemaBuilder {
    /// Inherits every field of `parent`.
    #[must_use]
    pub fn extends(mut self, parent: &Arc<ItemSchema>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    #[must_use]
    pub fn field(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    #[must_use]
    pub fn fields(mut self, defs: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(defs);
        self
    }

    /// Merges the declared fields over the parent's and freezes the schema.
    ///
    /// Fails if this declaration names the same field twice.
    pub fn build(self) -> Result<Arc<ItemSchema>> {
        let mut fields = self
            .parent
            .as_ref()
            .map(|p| p.fields.clone())
            .unwrap_or_default();
        let mut declared = HashSet::new();

        for def in self.fields {
            if !declared.insert(def.name.clone()) {
                return Err(ItemError::DuplicateField(def.name));
            }
            match fields.iter().position(|f| f.name == def.name) {
                Some(i) => fields[i] = def,
                None => fields.push(def),
            }
        }

        Ok(Arc::new(ItemSchema {
            item_type: self.item_type,
            parent: self.parent,
            fields,
        }))
    }
}
