//! Serialized mapping documents.

use super::{CollectionDef, EntityDef, TypeDef};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The on-disk form of a mapping: JSON with entities, collections, extra
/// type declarations and explicit imports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingDocument {
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub collections: Vec<CollectionDef>,
    /// Import name to class name.
    #[serde(default)]
    pub imports: BTreeMap<String, String>,
}

impl MappingDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Mapping(format!("invalid mapping document: {}", e)))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Mapping(format!("could not read mapping {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Mapping(format!("could not serialize mapping: {}", e)))
    }

    pub fn with_type(mut self, ty: TypeDef) -> Self {
        self.types.push(ty);
        self
    }

    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_collection(mut self, collection: CollectionDef) -> Self {
        self.collections.push(collection);
        self
    }

    pub fn with_import(mut self, name: impl Into<String>, class_name: impl Into<String>) -> Self {
        self.imports.insert(name.into(), class_name.into());
        self
    }
}
