//! Collection role definitions.

use crate::value::JavaType;
use serde::{Deserialize, Serialize};

/// A mapped collection, identified by its role `Owner.property`.
///
/// Entity-valued collections are one-to-many: the element rows live in the
/// element entity's table and `key_column` is the foreign key there. Value
/// collections live in their own `table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDef {
    pub role: String,
    pub table: String,
    pub key_column: String,
    pub element: ElementDef,
    #[serde(default)]
    pub index_column: Option<String>,
    #[serde(default)]
    pub fetch: FetchStyle,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default = "default_lazy")]
    pub lazy: bool,
    /// SQL restriction applied whenever the collection is loaded or
    /// filtered; `{alias}` stands for the collection table alias.
    #[serde(default, rename = "where")]
    pub restriction: Option<String>,
}

fn default_lazy() -> bool {
    true
}

/// What a collection contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementDef {
    Entity { entity: String },
    Value { column: String, java_type: JavaType },
}

/// How a collection is fetched when it is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStyle {
    #[default]
    Select,
    Join,
    Subselect,
    Batch,
}

impl CollectionDef {
    pub fn new(
        role: impl Into<String>,
        table: impl Into<String>,
        key_column: impl Into<String>,
        element: ElementDef,
    ) -> Self {
        Self {
            role: role.into(),
            table: table.into(),
            key_column: key_column.into(),
            element,
            index_column: None,
            fetch: FetchStyle::Select,
            batch_size: None,
            lazy: true,
            restriction: None,
        }
    }

    pub fn with_index_column(mut self, column: impl Into<String>) -> Self {
        self.index_column = Some(column.into());
        self
    }

    pub fn with_fetch(mut self, fetch: FetchStyle) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn with_restriction(mut self, restriction: impl Into<String>) -> Self {
        self.restriction = Some(restriction.into());
        self
    }

    /// Owning entity name.
    pub fn owner(&self) -> &str {
        self.role
            .rsplit_once('.')
            .map(|(owner, _)| owner)
            .unwrap_or(&self.role)
    }

    /// Property name on the owner.
    pub fn property(&self) -> &str {
        self.role
            .rsplit_once('.')
            .map(|(_, property)| property)
            .unwrap_or(&self.role)
    }

    pub fn is_indexed(&self) -> bool {
        self.index_column.is_some()
    }

    pub fn element_entity(&self) -> Option<&str> {
        match &self.element {
            ElementDef::Entity { entity } => Some(entity),
            ElementDef::Value { .. } => None,
        }
    }
}

impl ElementDef {
    pub fn entity(name: impl Into<String>) -> Self {
        ElementDef::Entity { entity: name.into() }
    }

    pub fn value(column: impl Into<String>, java_type: JavaType) -> Self {
        ElementDef::Value {
            column: column.into(),
            java_type,
        }
    }
}
