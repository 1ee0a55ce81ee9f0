//! Conversions between a column's relational value and its domain value.

use crate::error::{Error, Result};
use crate::value::{JavaType, Value};
use std::fmt;
use std::sync::Arc;

pub trait BasicValueConverter: fmt::Debug + Send + Sync {
    /// Type of the value exposed to the application.
    fn domain_java_type(&self) -> JavaType;

    /// Type of the value stored in the column.
    fn relational_java_type(&self) -> JavaType;

    fn to_domain_value(&self, relational: Value) -> Result<Value>;

    fn to_relational_value(&self, domain: Value) -> Result<Value>;
}

/// Enum stored as its zero-based ordinal.
#[derive(Debug, Clone)]
pub struct EnumOrdinalConverter {
    constants: Vec<String>,
}

impl EnumOrdinalConverter {
    pub fn new(constants: Vec<String>) -> Self {
        Self { constants }
    }
}

impl BasicValueConverter for EnumOrdinalConverter {
    fn domain_java_type(&self) -> JavaType {
        JavaType::Enum
    }

    fn relational_java_type(&self) -> JavaType {
        JavaType::Integer
    }

    fn to_domain_value(&self, relational: Value) -> Result<Value> {
        if relational.is_null() {
            return Ok(Value::Null);
        }
        relational
            .as_i64()
            .and_then(|ordinal| usize::try_from(ordinal).ok())
            .and_then(|ordinal| self.constants.get(ordinal))
            .map(|name| Value::Enum(name.clone()))
            .ok_or_else(|| Error::Coercion(format!("no enum constant with ordinal {}", relational)))
    }

    fn to_relational_value(&self, domain: Value) -> Result<Value> {
        if domain.is_null() {
            return Ok(Value::Null);
        }
        let name = domain.as_str().unwrap_or_default();
        self.constants
            .iter()
            .position(|c| c == name)
            .and_then(|ordinal| i32::try_from(ordinal).ok())
            .map(Value::Int32)
            .ok_or_else(|| Error::Coercion(format!("unknown enum constant {}", domain)))
    }
}

/// Enum stored as its constant name.
#[derive(Debug, Clone)]
pub struct EnumStringConverter {
    constants: Vec<String>,
}

impl EnumStringConverter {
    pub fn new(constants: Vec<String>) -> Self {
        Self { constants }
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.constants.iter().any(|c| c == name) {
            Ok(())
        } else {
            Err(Error::Coercion(format!("unknown enum constant {}", name)))
        }
    }
}

impl BasicValueConverter for EnumStringConverter {
    fn domain_java_type(&self) -> JavaType {
        JavaType::Enum
    }

    fn relational_java_type(&self) -> JavaType {
        JavaType::String
    }

    fn to_domain_value(&self, relational: Value) -> Result<Value> {
        match relational {
            Value::Null => Ok(Value::Null),
            Value::String(name) => {
                self.check(&name)?;
                Ok(Value::Enum(name))
            }
            other => Err(Error::Coercion(format!("expected enum name, got {:?}", other))),
        }
    }

    fn to_relational_value(&self, domain: Value) -> Result<Value> {
        match domain {
            Value::Null => Ok(Value::Null),
            Value::Enum(name) | Value::String(name) => {
                self.check(&name)?;
                Ok(Value::String(name))
            }
            other => Err(Error::Coercion(format!("expected enum, got {:?}", other))),
        }
    }
}

/// Boolean stored as `'Y'` / `'N'`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YesNoConverter;

impl BasicValueConverter for YesNoConverter {
    fn domain_java_type(&self) -> JavaType {
        JavaType::Boolean
    }

    fn relational_java_type(&self) -> JavaType {
        JavaType::String
    }

    fn to_domain_value(&self, relational: Value) -> Result<Value> {
        match relational.as_str() {
            _ if relational.is_null() => Ok(Value::Null),
            Some("Y") | Some("y") => Ok(Value::Bool(true)),
            Some("N") | Some("n") => Ok(Value::Bool(false)),
            _ => Err(Error::Coercion(format!("expected 'Y' or 'N', got {:?}", relational))),
        }
    }

    fn to_relational_value(&self, domain: Value) -> Result<Value> {
        match domain {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::String(if b { "Y" } else { "N" }.to_string())),
            other => Err(Error::Coercion(format!("expected boolean, got {:?}", other))),
        }
    }
}

/// Resolve a converter from its mapping spelling:
/// `yes_no`, `enum_ordinal:A,B,C` or `enum_string:A,B,C`.
pub fn converter_for(spec: &str) -> Result<Arc<dyn BasicValueConverter>> {
    let (name, args) = match spec.split_once(':') {
        Some((name, args)) => (name.trim(), Some(args)),
        None => (spec.trim(), None),
    };
    let constants = || -> Result<Vec<String>> {
        let constants: Vec<String> = args
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        if constants.is_empty() {
            return Err(Error::Mapping(format!("converter {} requires enum constants", name)));
        }
        Ok(constants)
    };
    match name {
        "yes_no" => Ok(Arc::new(YesNoConverter)),
        "enum_ordinal" => Ok(Arc::new(EnumOrdinalConverter::new(constants()?))),
        "enum_string" => Ok(Arc::new(EnumStringConverter::new(constants()?))),
        _ => Err(Error::Mapping(format!("unknown value converter: {}", spec))),
    }
}
