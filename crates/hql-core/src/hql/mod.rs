//! HQL translation: polymorphic query splitting, semantic analysis to the
//! SQL AST, compiled translators, plans and result holders.

pub mod holder;
pub mod parameters;
pub mod plan;
mod semantic;
pub mod splitter;
pub mod translator;

pub use holder::{
    ConstructorTransformer, HolderInstantiator, ListTransformer, MapTransformer, ResultTransformer,
    Row,
};
pub use parameters::{QueryParameters, RowSelection};
pub use plan::{CacheStats, FilterQueryPlan, HqlQueryPlan, QueryPlanCache, QueryPlanKey};
pub use semantic::Translation;
pub use splitter::{concrete_queries, ImplementorSource};
pub use translator::{
    FilterTranslator, JdbcExecutor, QueryTranslator, QueryTranslatorImpl, TranslationContext,
};
