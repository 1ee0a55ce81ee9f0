//! Entity definitions.

use crate::value::JavaType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A mapped entity: one class stored in one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name; the fully qualified class name.
    pub name: String,
    pub table: String,
    /// Required on root entities; subclasses inherit it.
    #[serde(default)]
    pub identifier: Option<IdentifierDef>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    #[serde(default)]
    pub many_to_one: Vec<ManyToOneDef>,
    /// Mapped superclass entity, if this entity is a subclass.
    #[serde(default)]
    pub superclass: Option<String>,
    /// Only returned by queries naming this entity exactly.
    #[serde(default)]
    pub explicit_polymorphism: bool,
}

/// Identifier property and how its values are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierDef {
    pub property: String,
    pub column: String,
    pub java_type: JavaType,
    #[serde(default)]
    pub generator: GeneratorDef,
}

/// Generator strategy name plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorDef {
    pub strategy: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Default for GeneratorDef {
    fn default() -> Self {
        Self {
            strategy: "assigned".to_string(),
            params: BTreeMap::new(),
        }
    }
}

/// A basic-valued property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub column: String,
    pub java_type: JavaType,
    /// Natural type of the column, when it differs from `java_type`.
    #[serde(default)]
    pub column_type: Option<JavaType>,
    #[serde(default)]
    pub lazy: bool,
    /// Converter spec, e.g. `yes_no` or `enum_ordinal:RED,GREEN`.
    #[serde(default)]
    pub converter: Option<String>,
}

/// A many-to-one association stored as a foreign key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManyToOneDef {
    pub name: String,
    pub column: String,
    /// Target entity name.
    pub target: String,
}

impl EntityDef {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            identifier: None,
            properties: Vec::new(),
            many_to_one: Vec::new(),
            superclass: None,
            explicit_polymorphism: false,
        }
    }

    pub fn with_identifier(mut self, identifier: IdentifierDef) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_many_to_one(
        mut self,
        name: impl Into<String>,
        column: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.many_to_one.push(ManyToOneDef {
            name: name.into(),
            column: column.into(),
            target: target.into(),
        });
        self
    }

    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_explicit_polymorphism(mut self) -> Self {
        self.explicit_polymorphism = true;
        self
    }

    /// Property declared directly on this entity.
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Many-to-one declared directly on this entity.
    pub fn many_to_one(&self, name: &str) -> Option<&ManyToOneDef> {
        self.many_to_one.iter().find(|m| m.name == name)
    }

    pub fn simple_name(&self) -> &str {
        super::types::simple_name(&self.name)
    }
}

impl IdentifierDef {
    pub fn new(property: impl Into<String>, column: impl Into<String>, java_type: JavaType) -> Self {
        Self {
            property: property.into(),
            column: column.into(),
            java_type,
            generator: GeneratorDef::default(),
        }
    }

    pub fn with_generator<I, K, V>(mut self, strategy: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.generator = GeneratorDef {
            strategy: strategy.into(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        };
        self
    }
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, column: impl Into<String>, java_type: JavaType) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            java_type,
            column_type: None,
            lazy: false,
            converter: None,
        }
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn with_column_type(mut self, column_type: JavaType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    pub fn with_converter(mut self, converter: impl Into<String>) -> Self {
        self.converter = Some(converter.into());
        self
    }
}
