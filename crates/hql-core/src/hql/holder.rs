//! Shaping assembled rows into constructor calls, maps or lists.

use crate::error::{Error, Result};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One row of a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// A single selected value.
    Value(Value),
    Tuple(Vec<Value>),
    /// `select new map(...)`, keyed by alias or position.
    Map(BTreeMap<String, Value>),
    /// `select new list(...)`.
    List(Vec<Value>),
    /// `select new Foo(...)`: the class and its constructor arguments.
    Instance { class: String, args: Vec<Value> },
}

impl Row {
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Row::Value(value) => value.to_json(),
            Row::Tuple(values) | Row::List(values) => {
                Json::Array(values.iter().map(Value::to_json).collect())
            }
            Row::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Row::Instance { class, args } => serde_json::json!({
                "$new": class,
                "args": args.iter().map(Value::to_json).collect::<Vec<_>>(),
            }),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |f: &mut fmt::Formatter<'_>, values: &[Value]| -> fmt::Result {
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", value)?;
            }
            Ok(())
        };
        match self {
            Row::Value(value) => write!(f, "{}", value),
            Row::Tuple(values) => {
                f.write_str("[")?;
                list(f, values)?;
                f.write_str("]")
            }
            Row::List(values) => {
                f.write_str("list(")?;
                list(f, values)?;
                f.write_str(")")
            }
            Row::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                f.write_str("}")
            }
            Row::Instance { class, args } => {
                write!(f, "new {}(", class)?;
                list(f, args)?;
                f.write_str(")")
            }
        }
    }
}

pub trait ResultTransformer: fmt::Debug + Send + Sync {
    fn transform_tuple(&self, tuple: Vec<Value>, aliases: &[Option<String>]) -> Result<Row>;
}

/// `select new Foo(a, b)`.
#[derive(Debug, Clone)]
pub struct ConstructorTransformer {
    class: String,
    arity: usize,
}

impl ConstructorTransformer {
    pub fn new(class: impl Into<String>, arity: usize) -> Self {
        Self {
            class: class.into(),
            arity,
        }
    }
}

impl ResultTransformer for ConstructorTransformer {
    fn transform_tuple(&self, tuple: Vec<Value>, _aliases: &[Option<String>]) -> Result<Row> {
        if tuple.len() != self.arity {
            return Err(Error::Persistence(format!(
                "could not instantiate {}: expected {} arguments, got {}",
                self.class,
                self.arity,
                tuple.len()
            )));
        }
        Ok(Row::Instance {
            class: self.class.clone(),
            args: tuple,
        })
    }
}

/// `select new map(...)`; unaliased items are keyed by their position.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapTransformer;

impl ResultTransformer for MapTransformer {
    fn transform_tuple(&self, tuple: Vec<Value>, aliases: &[Option<String>]) -> Result<Row> {
        let map = tuple
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let key = aliases
                    .get(i)
                    .and_then(|a| a.clone())
                    .unwrap_or_else(|| i.to_string());
                (key, value)
            })
            .collect();
        Ok(Row::Map(map))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListTransformer;

impl ResultTransformer for ListTransformer {
    fn transform_tuple(&self, tuple: Vec<Value>, _aliases: &[Option<String>]) -> Result<Row> {
        Ok(Row::List(tuple))
    }
}

/// Applies the query's result transformer, if any, to each row.
#[derive(Debug, Clone)]
pub struct HolderInstantiator {
    transformer: Option<Arc<dyn ResultTransformer>>,
    aliases: Vec<Option<String>>,
}

impl HolderInstantiator {
    pub const NOOP: HolderInstantiator = HolderInstantiator {
        transformer: None,
        aliases: Vec::new(),
    };

    /// A constructor transformer wins over `return_map`, which wins over
    /// `return_list`.
    pub fn new(
        constructor: Option<ConstructorTransformer>,
        return_map: bool,
        return_list: bool,
        aliases: Vec<Option<String>>,
    ) -> Self {
        let transformer: Option<Arc<dyn ResultTransformer>> = if let Some(c) = constructor {
            Some(Arc::new(c))
        } else if return_map {
            Some(Arc::new(MapTransformer))
        } else if return_list {
            Some(Arc::new(ListTransformer))
        } else {
            None
        };
        Self {
            transformer,
            aliases,
        }
    }

    pub fn with_transformer(transformer: Arc<dyn ResultTransformer>, aliases: Vec<Option<String>>) -> Self {
        Self {
            transformer: Some(transformer),
            aliases,
        }
    }

    pub fn is_required(&self) -> bool {
        self.transformer.is_some()
    }

    pub fn instantiate(&self, row: Vec<Value>) -> Result<Row> {
        match &self.transformer {
            Some(transformer) => transformer.transform_tuple(row, &self.aliases),
            None => Ok(Row::Tuple(row)),
        }
    }
}

impl Default for HolderInstantiator {
    fn default() -> Self {
        Self::NOOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tuple() -> Vec<Value> {
        vec![Value::String("Rex".into()), Value::Int32(3)]
    }

    #[test]
    fn test_noop_passes_rows_through() {
        let holder = HolderInstantiator::NOOP;
        assert!(!holder.is_required());
        assert_eq!(holder.instantiate(tuple()).unwrap(), Row::Tuple(tuple()));
    }

    #[test]
    fn test_constructor_takes_priority() {
        let holder = HolderInstantiator::new(
            Some(ConstructorTransformer::new("DogSummary", 2)),
            true,
            true,
            vec![None, None],
        );
        assert!(holder.is_required());
        assert_eq!(
            holder.instantiate(tuple()).unwrap(),
            Row::Instance {
                class: "DogSummary".into(),
                args: tuple()
            }
        );
        assert!(holder.instantiate(vec![Value::Null]).is_err());
    }

    #[test]
    fn test_map_before_list() {
        let holder = HolderInstantiator::new(None, true, true, vec![Some("name".into()), None]);
        let row = holder.instantiate(tuple()).unwrap();
        let mut expected = BTreeMap::new();
        expected.insert("name".to_string(), Value::String("Rex".into()));
        expected.insert("1".to_string(), Value::Int32(3));
        assert_eq!(row, Row::Map(expected));

        let holder = HolderInstantiator::new(None, false, true, Vec::new());
        assert_eq!(holder.instantiate(tuple()).unwrap(), Row::List(tuple()));
    }
}
