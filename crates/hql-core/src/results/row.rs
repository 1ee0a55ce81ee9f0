//! Access to the current JDBC row while results are assembled.

use crate::error::{Error, Result};
use crate::value::Value;

/// The values of the row being processed, addressed by column position.
pub trait RowProcessingState {
    fn jdbc_value(&self, position: usize) -> Result<&Value>;

    /// The outermost state, for nested contexts.
    fn unwrap(&self) -> &dyn RowProcessingState;
}

/// State over one raw JDBC row.
#[derive(Debug, Clone, Copy)]
pub struct JdbcRowProcessingState<'a> {
    row: &'a [Value],
}

impl<'a> JdbcRowProcessingState<'a> {
    pub fn new(row: &'a [Value]) -> Self {
        Self { row }
    }
}

impl RowProcessingState for JdbcRowProcessingState<'_> {
    fn jdbc_value(&self, position: usize) -> Result<&Value> {
        self.row.get(position).ok_or_else(|| {
            Error::Jdbc(format!(
                "row has {} columns, no value at position {}",
                self.row.len(),
                position
            ))
        })
    }

    fn unwrap(&self) -> &dyn RowProcessingState {
        self
    }
}

/// A window into a parent row starting at `offset`, used for the columns
/// of one entity within a wider row.
pub struct NestedRowProcessingState<'a> {
    parent: &'a dyn RowProcessingState,
    offset: usize,
}

impl<'a> NestedRowProcessingState<'a> {
    pub fn new(parent: &'a dyn RowProcessingState, offset: usize) -> Self {
        Self { parent, offset }
    }
}

impl RowProcessingState for NestedRowProcessingState<'_> {
    fn jdbc_value(&self, position: usize) -> Result<&Value> {
        self.parent.jdbc_value(self.offset + position)
    }

    fn unwrap(&self) -> &dyn RowProcessingState {
        self.parent.unwrap()
    }
}

/// A cursor over JDBC rows.
pub trait JdbcValuesSource {
    /// Advance to the next row; false once exhausted.
    fn next_row(&mut self) -> Result<bool>;

    fn current_row(&self) -> &[Value];
}

/// Rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct ListJdbcValues {
    rows: Vec<Vec<Value>>,
    current: Option<usize>,
}

impl ListJdbcValues {
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows,
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl JdbcValuesSource for ListJdbcValues {
    fn next_row(&mut self) -> Result<bool> {
        let next = self.current.map_or(0, |i| i + 1);
        if next < self.rows.len() {
            self.current = Some(next);
            Ok(true)
        } else {
            self.current = Some(self.rows.len());
            Ok(false)
        }
    }

    fn current_row(&self) -> &[Value] {
        self.current
            .and_then(|i| self.rows.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_state_offsets_into_parent() {
        let row = vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)];
        let root = JdbcRowProcessingState::new(&row);
        let nested = NestedRowProcessingState::new(&root, 1);
        assert_eq!(nested.jdbc_value(1).unwrap(), &Value::Int32(3));
        assert!(nested.jdbc_value(2).is_err());
        assert_eq!(nested.unwrap().jdbc_value(0).unwrap(), &Value::Int32(1));
    }

    #[test]
    fn test_list_values_iterate_once() {
        let mut values = ListJdbcValues::new(vec![vec![Value::Int32(1)], vec![Value::Int32(2)]]);
        assert!(values.current_row().is_empty());
        assert!(values.next_row().unwrap());
        assert_eq!(values.current_row(), &[Value::Int32(1)]);
        assert!(values.next_row().unwrap());
        assert!(!values.next_row().unwrap());
        assert!(!values.next_row().unwrap());
        assert!(values.current_row().is_empty());
    }
}
