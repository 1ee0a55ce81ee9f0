//! Per-column value extraction strategies.

use super::converter::BasicValueConverter;
use super::row::RowProcessingState;
use crate::error::{Error, Result};
use crate::value::{JavaType, Value};
use std::sync::Arc;

/// How one basic value is read from a row. Chosen once when the result
/// graph is built and reused for every row.
#[derive(Debug, Clone)]
pub enum BasicResultAssembler {
    /// Read the column and convert it if a converter is present.
    Direct {
        position: usize,
        converter: Option<Arc<dyn BasicValueConverter>>,
    },
    /// As `Direct`, then coerce to a declared type that differs from the
    /// column's natural type.
    Coercing {
        position: usize,
        converter: Option<Arc<dyn BasicValueConverter>>,
        target: JavaType,
    },
    /// A value that is not selected and cannot be loaded lazily.
    Unfetched,
    /// A lazy basic attribute that is not selected; yields the unfetched
    /// marker so it can be loaded later.
    UnfetchedBasicPart,
}

impl BasicResultAssembler {
    pub fn assemble(&self, state: &dyn RowProcessingState) -> Result<Value> {
        match self {
            BasicResultAssembler::Direct {
                position,
                converter,
            } => {
                let raw = extract_raw_value(*position, converter.as_deref(), state)?;
                convert(raw, converter.as_deref())
            }
            BasicResultAssembler::Coercing {
                position,
                converter,
                target,
            } => {
                let raw = extract_raw_value(*position, converter.as_deref(), state)?;
                target.coerce(convert(raw, converter.as_deref())?)
            }
            BasicResultAssembler::Unfetched => Ok(Value::Null),
            BasicResultAssembler::UnfetchedBasicPart => Ok(Value::Unfetched),
        }
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            BasicResultAssembler::Direct { position, .. }
            | BasicResultAssembler::Coercing { position, .. } => Some(*position),
            BasicResultAssembler::Unfetched | BasicResultAssembler::UnfetchedBasicPart => None,
        }
    }
}

/// Read the raw column value, checking it against the converter's
/// relational type.
fn extract_raw_value(
    position: usize,
    converter: Option<&dyn BasicValueConverter>,
    state: &dyn RowProcessingState,
) -> Result<Value> {
    let raw = state.jdbc_value(position)?.clone();
    if let Some(converter) = converter {
        let expected = converter.relational_java_type();
        if let Some(actual) = JavaType::of(&raw) {
            if actual != expected {
                return Err(Error::Coercion(format!(
                    "expected raw value of type {} at position {}, found {}",
                    expected, position, actual
                )));
            }
        }
    }
    Ok(raw)
}

fn convert(raw: Value, converter: Option<&dyn BasicValueConverter>) -> Result<Value> {
    match converter {
        Some(converter) => converter.to_domain_value(raw),
        None => Ok(raw),
    }
}
