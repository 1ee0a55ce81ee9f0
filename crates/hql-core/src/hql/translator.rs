//! Query and filter translators.
//!
//! A translator holds one concrete HQL query (already split by the
//! [`splitter`](super::splitter)) and moves from uncompiled to compiled
//! exactly once. The compiled form is immutable: the SQL AST, the rendered
//! SQL, the parameter specs and the result graph are shared by every
//! execution.

use super::holder::Row;
use super::parameters::QueryParameters;
use super::semantic::{SemanticAnalyzer, Translation};
use crate::catalog::Catalog;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::results::{DomainResult, JdbcValuesSource, ListResultsConsumer};
use crate::sql::{JdbcOperation, ParameterSpec, SqlAstRenderer, SqlStatement};
use crate::value::Value;
use hql_lang::CollectionProperties;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Caller-supplied access to a database connection.
pub trait JdbcExecutor {
    fn execute_query(&mut self, sql: &str, parameters: &[Value]) -> Result<Box<dyn JdbcValuesSource>>;

    /// Run an update or delete and return the affected row count.
    fn execute_update(&mut self, sql: &str, parameters: &[Value]) -> Result<u64>;
}

/// Shared, immutable inputs of query compilation.
#[derive(Debug, Clone)]
pub struct TranslationContext {
    pub catalog: Arc<Catalog>,
    pub dialect: Arc<dyn Dialect>,
    pub collection_properties: Arc<CollectionProperties>,
    /// Query substitutions such as `true` to `1`.
    pub substitutions: Arc<BTreeMap<String, String>>,
}

impl TranslationContext {
    pub fn new(catalog: Arc<Catalog>, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            catalog,
            dialect,
            collection_properties: Arc::new(CollectionProperties::standard()),
            substitutions: Arc::new(BTreeMap::new()),
        }
    }

    pub fn with_substitutions(mut self, substitutions: BTreeMap<String, String>) -> Self {
        self.substitutions = Arc::new(substitutions);
        self
    }
}

/// A compiled HQL query.
pub trait QueryTranslator: Send + Sync {
    /// Compile the query. Calling it again once compiled does nothing.
    fn compile(&mut self, context: &TranslationContext, shallow: bool) -> Result<()>;

    fn is_compiled(&self) -> bool;

    fn query_string(&self) -> &str;

    /// The SQL this query runs, without row limits.
    fn sql_string(&self) -> Result<&str>;

    fn collect_sql_strings(&self) -> Vec<String> {
        self.sql_string().map(|s| vec![s.to_string()]).unwrap_or_default()
    }

    fn parameter_specs(&self) -> &[ParameterSpec];

    /// Tables read or written by the query.
    fn query_spaces(&self) -> &[String];

    fn return_aliases(&self) -> &[String];

    fn return_types(&self) -> &[String];

    fn is_manipulation_statement(&self) -> bool;

    fn list(&self, executor: &mut dyn JdbcExecutor, parameters: &QueryParameters) -> Result<Vec<Row>>;

    fn execute_update(&self, executor: &mut dyn JdbcExecutor, parameters: &QueryParameters) -> Result<u64>;
}

/// A query whose implicit root is the elements of a mapped collection.
pub trait FilterTranslator: QueryTranslator {
    fn compile_filter(
        &mut self,
        context: &TranslationContext,
        collection_role: &str,
        shallow: bool,
    ) -> Result<()>;
}

#[derive(Debug)]
struct Compiled {
    dialect: Arc<dyn Dialect>,
    translation: Translation,
    operation: JdbcOperation,
    shallow: bool,
}

/// Translator backed by the HQL parser and the SQL AST renderer.
#[derive(Debug)]
pub struct QueryTranslatorImpl {
    query: String,
    compiled: Option<Compiled>,
}

impl QueryTranslatorImpl {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            compiled: None,
        }
    }

    pub fn statement(&self) -> Option<&SqlStatement> {
        self.compiled.as_ref().map(|c| &c.translation.statement)
    }

    pub fn results(&self) -> &[DomainResult] {
        self.compiled
            .as_ref()
            .map(|c| c.translation.results.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_shallow(&self) -> bool {
        self.compiled.as_ref().is_some_and(|c| c.shallow)
    }

    fn compiled(&self) -> Result<&Compiled> {
        self.compiled
            .as_ref()
            .ok_or_else(|| Error::query("query has not been compiled", &self.query))
    }

    fn finish_compile(&mut self, context: &TranslationContext, translation: Translation, shallow: bool) {
        let operation = SqlAstRenderer::render(context.dialect.as_ref(), &translation.statement);
        debug!(hql = %self.query, sql = %operation.sql, "compiled query");
        self.compiled = Some(Compiled {
            dialect: Arc::clone(&context.dialect),
            translation,
            operation,
            shallow,
        });
    }
}

impl QueryTranslator for QueryTranslatorImpl {
    fn compile(&mut self, context: &TranslationContext, shallow: bool) -> Result<()> {
        if self.compiled.is_some() {
            debug!(hql = %self.query, "compile() : the query is already compiled");
            return Ok(());
        }
        let statement = hql_lang::parse(&self.query).map_err(|e| Error::from_parse(&e, &self.query))?;
        let translation = SemanticAnalyzer::new(
            &context.catalog,
            &context.collection_properties,
            &context.substitutions,
            &self.query,
            shallow,
        )
        .translate(&statement)?;
        self.finish_compile(context, translation, shallow);
        Ok(())
    }

    fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    fn query_string(&self) -> &str {
        &self.query
    }

    fn sql_string(&self) -> Result<&str> {
        Ok(&self.compiled()?.operation.sql)
    }

    fn parameter_specs(&self) -> &[ParameterSpec] {
        self.compiled
            .as_ref()
            .map(|c| c.operation.parameters.as_slice())
            .unwrap_or(&[])
    }

    fn query_spaces(&self) -> &[String] {
        self.compiled
            .as_ref()
            .map(|c| c.translation.query_spaces.as_slice())
            .unwrap_or(&[])
    }

    fn return_aliases(&self) -> &[String] {
        self.compiled
            .as_ref()
            .map(|c| c.translation.return_aliases.as_slice())
            .unwrap_or(&[])
    }

    fn return_types(&self) -> &[String] {
        self.compiled
            .as_ref()
            .map(|c| c.translation.return_types.as_slice())
            .unwrap_or(&[])
    }

    fn is_manipulation_statement(&self) -> bool {
        self.compiled
            .as_ref()
            .is_some_and(|c| !matches!(c.translation.statement, SqlStatement::Select(_)))
    }

    fn list(&self, executor: &mut dyn JdbcExecutor, parameters: &QueryParameters) -> Result<Vec<Row>> {
        let compiled = self.compiled()?;
        let SqlStatement::Select(select) = &compiled.translation.statement else {
            return Err(Error::execution_request("Not supported for DML operations", &self.query));
        };

        let selection = parameters.row_selection;
        let limited;
        let operation = if selection.is_defined() {
            limited = SqlAstRenderer::render_limited(
                compiled.dialect.as_ref(),
                select,
                selection.max_rows,
                selection.first_row,
            );
            &limited
        } else {
            &compiled.operation
        };

        let values = parameters.bind(&operation.parameters, &self.query)?;
        let mut source = executor.execute_query(&operation.sql, &values)?;
        ListResultsConsumer::consume(
            source.as_mut(),
            &compiled.translation.results,
            &compiled.translation.holder,
        )
    }

    fn execute_update(&self, executor: &mut dyn JdbcExecutor, parameters: &QueryParameters) -> Result<u64> {
        let compiled = self.compiled()?;
        if matches!(compiled.translation.statement, SqlStatement::Select(_)) {
            return Err(Error::execution_request("Not supported for select queries", &self.query));
        }
        let values = parameters.bind(&compiled.operation.parameters, &self.query)?;
        executor.execute_update(&compiled.operation.sql, &values)
    }
}

impl FilterTranslator for QueryTranslatorImpl {
    fn compile_filter(
        &mut self,
        context: &TranslationContext,
        collection_role: &str,
        shallow: bool,
    ) -> Result<()> {
        if self.compiled.is_some() {
            debug!(hql = %self.query, "compile() : the query is already compiled");
            return Ok(());
        }
        let collection = context
            .catalog
            .collection(collection_role)
            .ok_or_else(|| Error::Mapping(format!("collection role is not mapped: {}", collection_role)))?;
        let filter =
            hql_lang::parse_filter(&self.query).map_err(|e| Error::from_parse(&e, &self.query))?;
        let translation = SemanticAnalyzer::new(
            &context.catalog,
            &context.collection_properties,
            &context.substitutions,
            &self.query,
            shallow,
        )
        .translate_filter(&filter, collection)?;
        self.finish_compile(context, translation, shallow);
        Ok(())
    }
}
