//! Identifier generation.
//!
//! Generators are created once per entity by the
//! [`IdentifierGeneratorFactory`] and shared by every session, so each one
//! guards its own mutable state. Generators that need database objects
//! (sequences, hi/lo tables) also report their DDL; post-insert generators
//! resolve the identifier after the row has been inserted.

mod assigned;
mod ddl;
mod factory;
mod foreign;
mod hilo;
mod identity;
mod increment;
mod select;
mod sequence;
mod seqhilo;
mod uuid_hex;

pub use assigned::Assigned;
pub use ddl::{generator_ddl, GeneratorDdl};
pub use factory::{create_number, identifier_from_value, GeneratorConstructor, IdentifierGeneratorFactory};
pub use foreign::ForeignGenerator;
pub use hilo::{TableGenerator, TableHiLoGenerator};
pub use identity::{IdentityGenerator, SequenceIdentityGenerator};
pub use increment::IncrementGenerator;
pub use select::SelectGenerator;
pub use sequence::SequenceGenerator;
pub use seqhilo::SequenceHiLoGenerator;
pub use uuid_hex::{GuidGenerator, UuidGenerator, UuidHexGenerator};

use crate::catalog::{Catalog, EntityDef, IdentifierDef};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::value::{EntityInstance, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Database access needed by generators during save.
pub trait GenerationSession {
    /// The identifier already set on `entity`, looked up by the identifier
    /// property name.
    fn identifier_of(&self, entity: &EntityInstance, property: &str) -> Option<Value> {
        entity.get(property).filter(|v| !v.is_null()).cloned()
    }

    /// Run a query and return the first column of the first row, if any.
    fn select_value(&mut self, sql: &str, parameters: &[Value]) -> Result<Option<Value>>;

    /// Run an update and return the affected row count.
    fn execute_update(&mut self, sql: &str, parameters: &[Value]) -> Result<u64>;
}

/// Outcome of [`IdentifierGenerator::generate`].
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedId {
    Value(Value),
    /// The database assigns the identifier on insert; call
    /// [`PostInsertIdentifierGenerator::retrieve_generated_id`] afterwards.
    PostInsert,
}

impl GeneratedId {
    pub fn into_value(self) -> Option<Value> {
        match self {
            GeneratedId::Value(value) => Some(value),
            GeneratedId::PostInsert => None,
        }
    }
}

pub trait IdentifierGenerator: fmt::Debug + Send + Sync {
    fn generate(&self, session: &mut dyn GenerationSession, entity: &EntityInstance) -> Result<GeneratedId>;

    fn as_persistent(&self) -> Option<&dyn PersistentIdentifierGenerator> {
        None
    }

    fn as_post_insert(&self) -> Option<&dyn PostInsertIdentifierGenerator> {
        None
    }
}

/// A generator backed by a database object it can create and drop.
pub trait PersistentIdentifierGenerator: IdentifierGenerator {
    fn sql_create_strings(&self, dialect: &dyn Dialect) -> Result<Vec<String>>;

    fn sql_drop_strings(&self, dialect: &dyn Dialect) -> Result<Vec<String>>;

    /// Generators with the same key share one database object.
    fn generator_key(&self) -> String;
}

/// A generator whose value is produced by the insert itself.
pub trait PostInsertIdentifierGenerator: IdentifierGenerator {
    fn retrieve_generated_id(
        &self,
        session: &mut dyn GenerationSession,
        entity: &EntityInstance,
    ) -> Result<Value>;
}

/// Everything a generator is configured with, once, at construction.
#[derive(Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub catalog: &'a Catalog,
    pub entity: &'a EntityDef,
    pub identifier: &'a IdentifierDef,
    pub dialect: &'a dyn Dialect,
}

impl<'a> GeneratorContext<'a> {
    pub fn params(&self) -> &'a BTreeMap<String, String> {
        &self.identifier.generator.params
    }

    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.params().get(name).map(String::as_str)
    }

    /// A required parameter, or a mapping error naming the strategy.
    pub fn required_param(&self, name: &str, strategy: &str) -> Result<&'a str> {
        self.param(name).ok_or_else(|| {
            Error::Mapping(format!(
                "param named \"{}\" is required for {} id generation strategy",
                name, strategy
            ))
        })
    }

    /// An integer parameter, or `default` when absent.
    pub fn int_param(&self, name: &str, default: i64) -> Result<i64> {
        match self.param(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::Mapping(format!("generator parameter {} must be an integer, got '{}'", name, raw))
            }),
        }
    }
}

impl fmt::Debug for GeneratorContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorContext")
            .field("entity", &self.entity.name)
            .field("identifier", &self.identifier.property)
            .field("dialect", &self.dialect.name())
            .finish()
    }
}
