//! Runtime values and the Java-like types they are declared with.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value read from or bound to a JDBC statement, or assembled into a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
    Uuid(uuid::Uuid),
    /// Name of an enum constant.
    Enum(String),
    Entity(Box<EntityInstance>),
    /// Marker for a lazy property that was not selected.
    Unfetched,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integral value widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityInstance> {
        match self {
            Value::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Convert to a JSON value for display.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null | Value::Unfetched => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int16(v) => Json::from(*v),
            Value::Int32(v) => Json::from(*v),
            Value::Int64(v) => Json::from(*v),
            Value::Float32(v) => Json::from(f64::from(*v)),
            Value::Float64(v) => Json::from(*v),
            Value::String(s) | Value::Enum(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::String(hex::encode(b)),
            Value::Timestamp(t) => Json::from(*t),
            Value::Uuid(u) => Json::String(u.to_string()),
            Value::Entity(e) => {
                let mut map = serde_json::Map::new();
                map.insert("$entity".into(), Json::String(e.entity_name.clone()));
                for (name, value) in &e.properties {
                    map.insert(name.clone(), value.to_json());
                }
                Json::Object(map)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(s) | Value::Enum(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Timestamp(t) => write!(f, "{}", t),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Entity(e) => write!(f, "{}", e),
            Value::Unfetched => f.write_str("<unfetched>"),
        }
    }
}

/// An assembled entity: its name and property values in mapping order.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    pub entity_name: String,
    pub properties: Vec<(String, Value)>,
}

impl EntityInstance {
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            properties: Vec::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for EntityInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.entity_name)?;
        for (i, (name, value)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("}")
    }
}

/// Declared type of a property, identifier or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum JavaType {
    Boolean,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Binary,
    Timestamp,
    Uuid,
    Enum,
    /// Unknown or untyped; never coerced.
    Object,
}

impl JavaType {
    /// Parse a type name, accepting primitive, simple and qualified spellings.
    pub fn from_name(name: &str) -> Option<JavaType> {
        let simple = name.rsplit('.').next().unwrap_or(name);
        let ty = match simple.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => JavaType::Boolean,
            "short" => JavaType::Short,
            "int" | "integer" => JavaType::Integer,
            "long" => JavaType::Long,
            "float" => JavaType::Float,
            "double" => JavaType::Double,
            "string" => JavaType::String,
            "binary" | "byte[]" | "bytes" => JavaType::Binary,
            "timestamp" | "instant" | "date" => JavaType::Timestamp,
            "uuid" => JavaType::Uuid,
            "enum" => JavaType::Enum,
            "object" | "serializable" => JavaType::Object,
            _ => return None,
        };
        Some(ty)
    }

    pub fn name(self) -> &'static str {
        match self {
            JavaType::Boolean => "Boolean",
            JavaType::Short => "Short",
            JavaType::Integer => "Integer",
            JavaType::Long => "Long",
            JavaType::Float => "Float",
            JavaType::Double => "Double",
            JavaType::String => "String",
            JavaType::Binary => "byte[]",
            JavaType::Timestamp => "Timestamp",
            JavaType::Uuid => "UUID",
            JavaType::Enum => "Enum",
            JavaType::Object => "Object",
        }
    }

    /// The type a raw value naturally has, if it has one.
    pub fn of(value: &Value) -> Option<JavaType> {
        let ty = match value {
            Value::Bool(_) => JavaType::Boolean,
            Value::Int16(_) => JavaType::Short,
            Value::Int32(_) => JavaType::Integer,
            Value::Int64(_) => JavaType::Long,
            Value::Float32(_) => JavaType::Float,
            Value::Float64(_) => JavaType::Double,
            Value::String(_) => JavaType::String,
            Value::Bytes(_) => JavaType::Binary,
            Value::Timestamp(_) => JavaType::Timestamp,
            Value::Uuid(_) => JavaType::Uuid,
            Value::Enum(_) => JavaType::Enum,
            Value::Null | Value::Entity(_) | Value::Unfetched => return None,
        };
        Some(ty)
    }

    pub fn is_integral(self) -> bool {
        matches!(self, JavaType::Short | JavaType::Integer | JavaType::Long)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral() || matches!(self, JavaType::Float | JavaType::Double)
    }

    /// Convert `value` to this type.
    ///
    /// Nulls, unfetched markers and entities pass through untouched, as does
    /// any value when the target is `Object`.
    pub fn coerce(self, value: Value) -> Result<Value> {
        if matches!(value, Value::Null | Value::Unfetched | Value::Entity(_))
            || self == JavaType::Object
            || JavaType::of(&value) == Some(self)
        {
            return Ok(value);
        }

        let fail = |value: &Value| {
            Error::Coercion(format!("cannot coerce {:?} to {}", value, self.name()))
        };

        let coerced = match (self, &value) {
            (JavaType::Short, v) => Value::Int16(
                integral_of(v)
                    .and_then(|i| i16::try_from(i).ok())
                    .ok_or_else(|| fail(v))?,
            ),
            (JavaType::Integer, v) => Value::Int32(
                integral_of(v)
                    .and_then(|i| i32::try_from(i).ok())
                    .ok_or_else(|| fail(v))?,
            ),
            (JavaType::Long, v) => Value::Int64(integral_of(v).ok_or_else(|| fail(v))?),
            (JavaType::Double, v) => Value::Float64(floating_of(v).ok_or_else(|| fail(v))?),
            (JavaType::Float, v) => {
                Value::Float32(floating_of(v).ok_or_else(|| fail(v))? as f32)
            }
            (JavaType::Boolean, Value::String(s)) => match s.as_str() {
                "true" | "Y" | "T" => Value::Bool(true),
                "false" | "N" | "F" => Value::Bool(false),
                _ => return Err(fail(&value)),
            },
            (JavaType::Boolean, v) => match v.as_i64() {
                Some(0) => Value::Bool(false),
                Some(1) => Value::Bool(true),
                _ => return Err(fail(v)),
            },
            (JavaType::String, v) => Value::String(v.to_string()),
            (JavaType::Enum, Value::String(s)) => Value::Enum(s.clone()),
            (JavaType::Uuid, Value::String(s)) => {
                Value::Uuid(uuid::Uuid::parse_str(s).map_err(|_| fail(&value))?)
            }
            (JavaType::Timestamp, Value::Int64(t)) => Value::Timestamp(*t),
            (JavaType::Binary, Value::String(s)) => {
                Value::Bytes(hex::decode(s).map_err(|_| fail(&value))?)
            }
            _ => return Err(fail(&value)),
        };
        Ok(coerced)
    }
}

fn integral_of(value: &Value) -> Option<i64> {
    match value {
        Value::Float32(f) if f.fract() == 0.0 => Some(*f as i64),
        Value::Float64(f) if f.fract() == 0.0 => Some(*f as i64),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        other => other.as_i64(),
    }
}

fn floating_of(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(f) => Some(f64::from(*f)),
        Value::Float64(f) => Some(*f),
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_i64().map(|i| i as f64),
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for JavaType {
    type Error = String;

    fn try_from(name: String) -> std::result::Result<Self, Self::Error> {
        JavaType::from_name(&name).ok_or_else(|| format!("unknown java type: {}", name))
    }
}

impl From<JavaType> for String {
    fn from(ty: JavaType) -> Self {
        ty.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parses_type_names() {
        assert_eq!(JavaType::from_name("java.lang.Integer"), Some(JavaType::Integer));
        assert_eq!(JavaType::from_name("int"), Some(JavaType::Integer));
        assert_eq!(JavaType::from_name("Long"), Some(JavaType::Long));
        assert_eq!(JavaType::from_name("java.util.UUID"), Some(JavaType::Uuid));
        assert_eq!(JavaType::from_name("Widget"), None);
    }

    #[test]
    fn test_coerces_between_integral_types() {
        assert_eq!(JavaType::Long.coerce(Value::Int32(7)).unwrap(), Value::Int64(7));
        assert_eq!(JavaType::Short.coerce(Value::Int64(7)).unwrap(), Value::Int16(7));
        assert!(JavaType::Short.coerce(Value::Int64(70_000)).is_err());
        assert_eq!(JavaType::Double.coerce(Value::Int32(2)).unwrap(), Value::Float64(2.0));
    }

    #[test]
    fn test_passes_through_nulls_and_objects() {
        assert_eq!(JavaType::Integer.coerce(Value::Null).unwrap(), Value::Null);
        assert_eq!(
            JavaType::Object.coerce(Value::String("x".into())).unwrap(),
            Value::String("x".into())
        );
    }

    #[test]
    fn test_rejects_incompatible_values() {
        let err = JavaType::Integer.coerce(Value::String("abc".into())).unwrap_err();
        assert!(matches!(err, Error::Coercion(_)));
        assert!(JavaType::Uuid.coerce(Value::Int32(1)).is_err());
    }

    #[test]
    fn test_entity_properties_are_replaced_in_place() {
        let mut dog = EntityInstance::new("Dog")
            .with("id", Value::Int64(1))
            .with("name", Value::String("Rex".into()));
        dog.set("name", Value::String("Max".into()));
        assert_eq!(dog.properties.len(), 2);
        assert_eq!(dog.get("name"), Some(&Value::String("Max".into())));
        assert_eq!(dog.to_string(), "Dog{id=1, name=Max}");
    }

    #[test]
    fn test_serde_uses_type_names() {
        let ty: JavaType = serde_json::from_str("\"java.lang.Long\"").unwrap();
        assert_eq!(ty, JavaType::Long);
        assert_eq!(serde_json::to_string(&JavaType::Integer).unwrap(), "\"Integer\"");
        assert!(serde_json::from_str::<JavaType>("\"Widget\"").is_err());
    }
}
