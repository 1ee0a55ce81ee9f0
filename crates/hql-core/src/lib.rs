//! HQL core - query translation, result assembly and identifier generation.
//!
//! This crate turns HQL queries into SQL against a mapping [`Catalog`],
//! assembles JDBC rows back into values and entities, and generates
//! identifiers for new entities. Database access always goes through
//! caller-supplied traits ([`JdbcExecutor`], [`GenerationSession`]).
//!
//! # Usage
//!
//! ```rust
//! use hql_core::{Catalog, EntityDef, IdentifierDef, JavaType, MappingDocument, SessionFactory, Settings};
//!
//! let document = MappingDocument::new().with_entity(
//!     EntityDef::new("Dog", "dogs").with_identifier(IdentifierDef::new("id", "id", JavaType::Long)),
//! );
//! let factory = SessionFactory::new(Catalog::new(document).unwrap(), Settings::default()).unwrap();
//! let plan = factory.hql_query_plan("from Dog d", false).unwrap();
//! assert_eq!(plan.sql_strings().len(), 1);
//! ```

pub mod catalog;
pub mod config;
pub mod dialect;
pub mod error;
pub mod hql;
pub mod id;
pub mod loader;
pub mod results;
pub mod session_factory;
pub mod sql;
pub mod value;

pub use catalog::{
    Catalog, CollectionDef, ElementDef, EntityDef, FetchStyle, GeneratorDef, IdentifierDef,
    ManyToOneDef, MappingDocument, PropertyDef, TypeDef,
};
pub use config::Settings;
pub use dialect::{Dialect, DialectKind, H2Dialect, MySQLDialect, PostgreSQLDialect};
pub use error::{Error, Result};
pub use hql::{
    concrete_queries, FilterQueryPlan, FilterTranslator, HqlQueryPlan, ImplementorSource,
    JdbcExecutor, QueryParameters, QueryPlanCache, QueryTranslator, QueryTranslatorImpl, Row,
    RowSelection, TranslationContext,
};
pub use id::{
    GeneratedId, GenerationSession, IdentifierGenerator, IdentifierGeneratorFactory,
    PersistentIdentifierGenerator, PostInsertIdentifierGenerator,
};
pub use loader::{BatchFetchStyle, CollectionLoader};
pub use results::{DomainResult, JdbcValuesSource, ListJdbcValues};
pub use session_factory::SessionFactory;
pub use value::{EntityInstance, JavaType, Value};

/// Re-export the query language front end.
pub use hql_lang as lang;
