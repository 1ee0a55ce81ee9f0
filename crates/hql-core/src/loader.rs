//! Collection loading.
//!
//! A [`CollectionLoader`] builds and runs the SQL that initializes one
//! collection role for a set of owner keys. Select, join and batch fetching
//! restrict the collection key to a list of parameters; subselect fetching
//! re-runs the owner query as a subquery instead.

use crate::catalog::{Catalog, CollectionDef, ElementDef, FetchStyle};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::hql::JdbcExecutor;
use crate::results::{BasicResult, DomainResult, JdbcRowProcessingState, JdbcValuesSource};
use crate::sql::{
    Expression, FilterPredicate, InListPredicate, InSubQueryPredicate, ParameterSpec, Predicate,
    SelectStatement, SqlAstRenderer, SqlSelection, TableGroup, TableReference,
};
use crate::value::{JavaType, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How keys are grouped into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchFetchStyle {
    /// Split keys into the largest pre-built batch sizes that fit.
    #[default]
    Legacy,
    /// Use the smallest pre-built size that holds all keys, repeating the
    /// last key to fill it.
    Padded,
}

impl FromStr for BatchFetchStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(BatchFetchStyle::Legacy),
            "padded" => Ok(BatchFetchStyle::Padded),
            other => Err(Error::Config(format!("unknown batch fetch style: {}", other))),
        }
    }
}

impl fmt::Display for BatchFetchStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchFetchStyle::Legacy => f.write_str("legacy"),
            BatchFetchStyle::Padded => f.write_str("padded"),
        }
    }
}

fn next_batch_size(size: usize) -> usize {
    if size <= 10 {
        size - 1
    } else if size / 2 < 10 {
        10
    } else {
        size / 2
    }
}

/// Pre-built batch sizes for `max`, largest first: halving down to 10,
/// then every size from 10 to 1.
pub fn batch_sizes(max: usize) -> Vec<usize> {
    let mut sizes = Vec::new();
    let mut size = max.max(1);
    loop {
        sizes.push(size);
        if size <= 1 {
            break;
        }
        size = next_batch_size(size);
    }
    sizes
}

/// Group `keys` into the batches one statement each will load.
pub fn batch_key_chunks(style: BatchFetchStyle, keys: &[Value], max: usize) -> Vec<Vec<Value>> {
    let sizes = batch_sizes(max);
    let largest = sizes[0];
    let mut chunks = Vec::new();
    let mut remaining = keys;
    while !remaining.is_empty() {
        match style {
            BatchFetchStyle::Legacy => {
                let size = sizes
                    .iter()
                    .copied()
                    .find(|&s| s <= remaining.len())
                    .unwrap_or(1);
                chunks.push(remaining[..size].to_vec());
                remaining = &remaining[size..];
            }
            BatchFetchStyle::Padded => {
                let take = remaining.len().min(largest);
                let size = sizes
                    .iter()
                    .rev()
                    .copied()
                    .find(|&s| s >= take)
                    .unwrap_or(largest);
                let mut chunk = remaining[..take].to_vec();
                if let Some(last) = chunk.last().cloned() {
                    chunk.resize(size, last);
                }
                chunks.push(chunk);
                remaining = &remaining[take..];
            }
        }
    }
    chunks
}

/// One loaded collection row.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEntry {
    pub key: Value,
    pub index: Option<Value>,
    pub element: Value,
}

/// Loads the elements of one collection role.
#[derive(Debug)]
pub struct CollectionLoader<'a> {
    collection: &'a CollectionDef,
    table: &'a str,
    alias: String,
    element_column: &'a str,
    element_type: JavaType,
    batch_size: usize,
    style: BatchFetchStyle,
}

impl<'a> CollectionLoader<'a> {
    /// Loader for `role`. The collection's own batch size wins over
    /// `default_batch_size`; only batch fetching uses more than one key.
    pub fn new(
        catalog: &'a Catalog,
        role: &str,
        default_batch_size: usize,
        style: BatchFetchStyle,
    ) -> Result<Self> {
        let collection = catalog
            .collection(role)
            .ok_or_else(|| Error::Mapping(format!("collection role is not mapped: {}", role)))?;
        let (table, element_column, element_type) = match &collection.element {
            ElementDef::Value { column, java_type } => {
                (collection.table.as_str(), column.as_str(), *java_type)
            }
            ElementDef::Entity { entity } => {
                let entity = catalog.resolve_entity(entity)?;
                let id = catalog.identifier(entity)?;
                (entity.table.as_str(), id.column.as_str(), id.java_type)
            }
        };
        let batch_size = match collection.fetch {
            FetchStyle::Batch => collection.batch_size.unwrap_or(default_batch_size).max(1),
            FetchStyle::Select | FetchStyle::Join => default_batch_size.max(1),
            FetchStyle::Subselect => 1,
        };
        let alias: String = table
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(10)
            .collect::<String>()
            .to_ascii_lowercase();
        Ok(Self {
            collection,
            table,
            alias: format!("{}0_", alias),
            element_column,
            element_type,
            batch_size,
            style,
        })
    }

    pub fn collection(&self) -> &CollectionDef {
        self.collection
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn base_select(&self) -> SelectStatement {
        let column = |c: &str| Expression::column(&self.alias, c);
        let mut selections = vec![SqlSelection {
            expression: column(&self.collection.key_column),
            alias: None,
        }];
        if let Some(index) = &self.collection.index_column {
            selections.push(SqlSelection {
                expression: column(index),
                alias: None,
            });
        }
        selections.push(SqlSelection {
            expression: column(self.element_column),
            alias: None,
        });
        let mut select = SelectStatement {
            selections,
            from: vec![TableGroup::new(TableReference::new(self.table, &self.alias))],
            ..Default::default()
        };
        if let Some(restriction) = self.collection.restriction.as_deref() {
            select.restrict(Predicate::Filter(FilterPredicate::new(
                restriction.replace("{alias}", &self.alias),
            )));
        }
        select
    }

    /// `select ... where key in (?, ...)` for `key_count` keys.
    pub fn key_select(&self, key_count: usize) -> SelectStatement {
        let mut select = self.base_select();
        select.restrict(Predicate::InList(InListPredicate {
            test: Expression::column(&self.alias, &self.collection.key_column),
            list: (0..key_count)
                .map(|i| Expression::Parameter(ParameterSpec::Ordinal(i as u32)))
                .collect(),
            negated: false,
        }));
        select
    }

    /// `select ... where key in (select <owner id> from <owner query>)`.
    ///
    /// `owner_id` is the owner identifier expression as it appears in the
    /// owner query.
    pub fn subselect(&self, owner_query: &SelectStatement, owner_id: Expression) -> SelectStatement {
        let mut sub = owner_query.clone();
        sub.distinct = false;
        sub.selections = vec![SqlSelection {
            expression: owner_id,
            alias: None,
        }];
        sub.order_by.clear();

        let mut select = self.base_select();
        select.restrict(Predicate::InSubQuery(InSubQueryPredicate {
            test: Expression::column(&self.alias, &self.collection.key_column),
            sub_query: Box::new(sub),
            negated: false,
        }));
        select
    }

    /// Load the collections owned by `keys`, one statement per batch.
    pub fn load(
        &self,
        dialect: &dyn Dialect,
        executor: &mut dyn JdbcExecutor,
        keys: &[Value],
    ) -> Result<Vec<CollectionEntry>> {
        let mut entries = Vec::new();
        for chunk in batch_key_chunks(self.style, keys, self.batch_size) {
            let operation = SqlAstRenderer::render(dialect, &crate::sql::SqlStatement::Select(self.key_select(chunk.len())));
            debug!(role = %self.collection.role, keys = chunk.len(), sql = %operation.sql, "loading collection batch");
            let mut source = executor.execute_query(&operation.sql, &chunk)?;
            self.read(source.as_mut(), &mut entries)?;
        }
        Ok(entries)
    }

    /// Load with a subselect over an already executed owner query.
    pub fn load_subselect(
        &self,
        dialect: &dyn Dialect,
        executor: &mut dyn JdbcExecutor,
        owner_query: &SelectStatement,
        owner_id: Expression,
        owner_parameters: &[Value],
    ) -> Result<Vec<CollectionEntry>> {
        let select = self.subselect(owner_query, owner_id);
        let operation = SqlAstRenderer::render(dialect, &crate::sql::SqlStatement::Select(select));
        debug!(role = %self.collection.role, sql = %operation.sql, "loading collection by subselect");
        let mut source = executor.execute_query(&operation.sql, owner_parameters)?;
        let mut entries = Vec::new();
        self.read(source.as_mut(), &mut entries)?;
        Ok(entries)
    }

    fn read(&self, source: &mut dyn JdbcValuesSource, entries: &mut Vec<CollectionEntry>) -> Result<()> {
        let indexed = self.collection.index_column.is_some();
        let key = DomainResult::Basic(BasicResult::new(0, None, JavaType::Object, JavaType::Object, None));
        let index = indexed
            .then(|| DomainResult::Basic(BasicResult::new(1, None, JavaType::Integer, JavaType::Integer, None)));
        let element_position = if indexed { 2 } else { 1 };
        let element = DomainResult::Basic(BasicResult::new(
            element_position,
            None,
            self.element_type,
            self.element_type,
            None,
        ));

        while source.next_row()? {
            let state = JdbcRowProcessingState::new(source.current_row());
            let key = key.assemble(&state)?;
            let element = element.assemble(&state)?;
            if key.is_null() || element.is_null() {
                continue;
            }
            entries.push(CollectionEntry {
                key,
                index: index.as_ref().map(|i| i.assemble(&state)).transpose()?,
                element,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDef, IdentifierDef, MappingDocument};
    use crate::dialect::PostgreSQLDialect;
    use crate::results::ListJdbcValues;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        let document = MappingDocument::new()
            .with_entity(
                EntityDef::new("Dog", "dogs")
                    .with_identifier(IdentifierDef::new("id", "id", JavaType::Long)),
            )
            .with_entity(
                EntityDef::new("Kitten", "kittens")
                    .with_identifier(IdentifierDef::new("id", "id", JavaType::Long)),
            )
            .with_collection(
                CollectionDef::new("Dog.kittens", "kittens", "mother_id", ElementDef::entity("Kitten"))
                    .with_fetch(FetchStyle::Batch)
                    .with_batch_size(4),
            )
            .with_collection(
                CollectionDef::new("Dog.nicknames", "dog_nicknames", "dog_id", ElementDef::value("nickname", JavaType::String))
                    .with_index_column("position"),
            );
        Catalog::new(document).unwrap()
    }

    struct Recording {
        sql: Vec<String>,
        rows: Vec<Vec<Value>>,
    }

    impl JdbcExecutor for Recording {
        fn execute_query(&mut self, sql: &str, _: &[Value]) -> Result<Box<dyn JdbcValuesSource>> {
            self.sql.push(sql.to_string());
            Ok(Box::new(ListJdbcValues::new(std::mem::take(&mut self.rows))))
        }

        fn execute_update(&mut self, _: &str, _: &[Value]) -> Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_batch_sizes() {
        assert_eq!(batch_sizes(1), vec![1]);
        assert_eq!(batch_sizes(4), vec![4, 3, 2, 1]);
        assert_eq!(batch_sizes(16), vec![16, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(batch_sizes(50), vec![50, 25, 12, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_legacy_chunks() {
        let keys: Vec<Value> = (1..=7).map(Value::Int64).collect();
        let sizes: Vec<usize> = batch_key_chunks(BatchFetchStyle::Legacy, &keys, 4)
            .iter()
            .map(Vec::len)
            .collect();
        assert_eq!(sizes, vec![4, 3]);
    }

    #[test]
    fn test_padded_chunks_repeat_last_key() {
        let keys: Vec<Value> = (1..=13).map(Value::Int64).collect();
        let chunks = batch_key_chunks(BatchFetchStyle::Padded, &keys, 16);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 16);
        assert_eq!(chunks[0][15], Value::Int64(13));
    }

    #[test]
    fn test_batch_fetch_style_parse() {
        assert_eq!("PADDED".parse::<BatchFetchStyle>().unwrap(), BatchFetchStyle::Padded);
        assert!("dynamic".parse::<BatchFetchStyle>().is_err());
    }

    #[test]
    fn test_key_select_sql() {
        let catalog = catalog();
        let loader = CollectionLoader::new(&catalog, "Dog.kittens", 1, BatchFetchStyle::Legacy).unwrap();
        assert_eq!(loader.batch_size(), 4);
        let op = SqlAstRenderer::render(
            &PostgreSQLDialect,
            &crate::sql::SqlStatement::Select(loader.key_select(2)),
        );
        assert_eq!(
            op.sql,
            "select kittens0_.mother_id, kittens0_.id from kittens kittens0_ where kittens0_.mother_id in (?, ?)"
        );
    }

    #[test]
    fn test_load_indexed_values() {
        let catalog = catalog();
        let loader = CollectionLoader::new(&catalog, "Dog.nicknames", 1, BatchFetchStyle::Legacy).unwrap();
        let mut executor = Recording {
            sql: Vec::new(),
            rows: vec![
                vec![Value::Int64(1), Value::Int32(0), Value::String("Rexy".into())],
                vec![Value::Int64(1), Value::Int32(1), Value::Null],
            ],
        };
        let entries = loader
            .load(&PostgreSQLDialect, &mut executor, &[Value::Int64(1)])
            .unwrap();
        assert_eq!(
            entries,
            vec![CollectionEntry {
                key: Value::Int64(1),
                index: Some(Value::Int32(0)),
                element: Value::String("Rexy".into()),
            }]
        );
        assert_eq!(executor.sql.len(), 1);
    }

    #[test]
    fn test_unknown_role() {
        let catalog = catalog();
        assert!(matches!(
            CollectionLoader::new(&catalog, "Dog.fleas", 1, BatchFetchStyle::Legacy),
            Err(Error::Mapping(_))
        ));
    }
}
