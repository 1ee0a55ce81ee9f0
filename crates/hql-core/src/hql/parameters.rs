//! Parameter values supplied when a compiled query is executed.

use crate::error::{Error, Result};
use crate::sql::ParameterSpec;
use crate::value::Value;
use std::collections::BTreeMap;

/// First row and maximum row count for paged queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowSelection {
    pub first_row: Option<u64>,
    pub max_rows: Option<u64>,
}

impl RowSelection {
    pub fn is_defined(&self) -> bool {
        self.first_row.is_some_and(|f| f > 0) || self.max_rows.is_some()
    }
}

/// Values for positional and named parameters, the owner key of a filter
/// and the row selection.
#[derive(Debug, Clone, Default)]
pub struct QueryParameters {
    pub positional: Vec<Value>,
    pub named: BTreeMap<String, Value>,
    pub collection_key: Option<Value>,
    pub row_selection: RowSelection,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positional(mut self, value: Value) -> Self {
        self.positional.push(value);
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: Value) -> Self {
        self.named.insert(name.into(), value);
        self
    }

    pub fn with_collection_key(mut self, key: Value) -> Self {
        self.collection_key = Some(key);
        self
    }

    pub fn with_first_row(mut self, first_row: u64) -> Self {
        self.row_selection.first_row = Some(first_row);
        self
    }

    pub fn with_max_rows(mut self, max_rows: u64) -> Self {
        self.row_selection.max_rows = Some(max_rows);
        self
    }

    /// Resolve the values for `specs`, in order.
    pub fn bind(&self, specs: &[ParameterSpec], query: &str) -> Result<Vec<Value>> {
        specs
            .iter()
            .map(|spec| match spec {
                ParameterSpec::Named(name) => self.named.get(name).cloned().ok_or_else(|| {
                    Error::query(format!("no value bound for named parameter :{}", name), query)
                }),
                ParameterSpec::Ordinal(ordinal) => self
                    .positional
                    .get(*ordinal as usize)
                    .cloned()
                    .ok_or_else(|| {
                        Error::query(
                            format!("no value bound for ordinal parameter {}", ordinal + 1),
                            query,
                        )
                    }),
                ParameterSpec::Fixed(value) => Ok(value.clone()),
                ParameterSpec::CollectionKey => self
                    .collection_key
                    .clone()
                    .ok_or_else(|| Error::query("no collection key bound for filter", query)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bind_in_spec_order() {
        let params = QueryParameters::new()
            .with_positional(Value::Int32(7))
            .with_named("name", Value::String("Rex".into()))
            .with_collection_key(Value::Int64(1));
        let specs = vec![
            ParameterSpec::Named("name".into()),
            ParameterSpec::CollectionKey,
            ParameterSpec::Fixed(Value::Bool(true)),
            ParameterSpec::Ordinal(0),
        ];
        assert_eq!(
            params.bind(&specs, "q").unwrap(),
            vec![
                Value::String("Rex".into()),
                Value::Int64(1),
                Value::Bool(true),
                Value::Int32(7),
            ]
        );
    }

    #[test]
    fn test_missing_parameter_is_query_error() {
        let err = QueryParameters::new()
            .bind(&[ParameterSpec::Named("min".into())], "from Dog where age > :min")
            .unwrap_err();
        assert!(err.is_query_error());
        assert!(err.to_string().contains(":min"));

        let err = QueryParameters::new()
            .bind(&[ParameterSpec::Ordinal(1)], "q")
            .unwrap_err();
        assert!(err.to_string().contains("ordinal parameter 2"));
    }

    #[test]
    fn test_row_selection_defined() {
        assert!(!RowSelection::default().is_defined());
        assert!(!QueryParameters::new().with_first_row(0).row_selection.is_defined());
        assert!(QueryParameters::new().with_max_rows(5).row_selection.is_defined());
    }
}
