//! Class and interface declarations used for assignability checks.

use serde::{Deserialize, Serialize};

/// A class or interface that queries may name.
///
/// Entities get an implicit type declaration; explicit ones are only needed
/// for unmapped supertypes such as interfaces or abstract base classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Fully qualified name.
    pub name: String,
    /// Direct superclass and implemented interfaces.
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            is_abstract: false,
        }
    }

    pub fn with_supertype(mut self, supertype: impl Into<String>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Unqualified name, used for auto-imports.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }
}

pub(crate) fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
