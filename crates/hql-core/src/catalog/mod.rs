//! Mapping metamodel.
//!
//! The catalog holds the entity, collection and type metadata that queries
//! are resolved against. It is built once from a [`MappingDocument`] and is
//! immutable afterwards.

mod catalog;
mod collection;
mod entity;
mod mapping;
mod types;

pub use catalog::Catalog;
pub use collection::{CollectionDef, ElementDef, FetchStyle};
pub use entity::{EntityDef, GeneratorDef, IdentifierDef, ManyToOneDef, PropertyDef};
pub use mapping::MappingDocument;
pub use types::TypeDef;
