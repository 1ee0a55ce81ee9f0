use super::{identifier_from_value, GeneratedId, GenerationSession, GeneratorContext, IdentifierGenerator};
use crate::error::{Error, Result};
use crate::value::{EntityInstance, JavaType, Value};
use parking_lot::Mutex;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SEPARATOR: &str = "separator";

/// Loopback address; identifiers embed the address of the generating host.
const HOST_ADDRESS: i32 = 0x7F00_0001;

fn current_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Process start time, shifted the same way every generator sees it.
fn process_time() -> i32 {
    static START: OnceLock<i32> = OnceLock::new();
    *START.get_or_init(|| (current_millis() as u64 >> 8) as i32)
}

/// 32 hex digits built from host address, process start, current time and
/// a counter, optionally split by a separator.
#[derive(Debug)]
pub struct UuidHexGenerator {
    separator: String,
    counter: Mutex<i16>,
}

impl UuidHexGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Self {
        Self::with_separator(ctx.param(SEPARATOR).unwrap_or(""))
    }

    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            counter: Mutex::new(0),
        }
    }

    fn next_count(&self) -> i16 {
        let mut counter = self.counter.lock();
        if *counter < 0 {
            *counter = 0;
        }
        let count = *counter;
        *counter = counter.wrapping_add(1);
        count
    }

    /// The next identifier string.
    pub fn next_hex(&self) -> String {
        let millis = current_millis();
        let hi_time = (millis as u64 >> 32) as i16;
        let lo_time = millis as i32;
        [
            hex::encode(HOST_ADDRESS.to_be_bytes()),
            hex::encode(process_time().to_be_bytes()),
            hex::encode(hi_time.to_be_bytes()),
            hex::encode(lo_time.to_be_bytes()),
            hex::encode(self.next_count().to_be_bytes()),
        ]
        .join(self.separator.as_str())
    }
}

impl IdentifierGenerator for UuidHexGenerator {
    fn generate(&self, _: &mut dyn GenerationSession, _: &EntityInstance) -> Result<GeneratedId> {
        Ok(GeneratedId::Value(Value::String(self.next_hex())))
    }
}

/// Random (version 4) UUIDs.
#[derive(Debug, Clone)]
pub struct UuidGenerator {
    id_type: JavaType,
}

impl UuidGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Self {
        Self {
            id_type: ctx.identifier.java_type,
        }
    }
}

impl IdentifierGenerator for UuidGenerator {
    fn generate(&self, _: &mut dyn GenerationSession, _: &EntityInstance) -> Result<GeneratedId> {
        let uuid = uuid::Uuid::new_v4();
        let value = match self.id_type {
            JavaType::Uuid | JavaType::Object => Value::Uuid(uuid),
            JavaType::String => Value::String(uuid.to_string()),
            JavaType::Binary => Value::Bytes(uuid.as_bytes().to_vec()),
            other => {
                return Err(Error::IdentifierGeneration(format!(
                    "uuid generation cannot produce {}",
                    other.name()
                )))
            }
        };
        Ok(GeneratedId::Value(value))
    }
}

/// GUIDs produced by the database.
#[derive(Debug, Clone)]
pub struct GuidGenerator {
    sql: String,
    id_type: JavaType,
}

impl GuidGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Result<Self> {
        Ok(Self {
            sql: ctx.dialect.select_guid_string()?,
            id_type: ctx.identifier.java_type,
        })
    }
}

impl IdentifierGenerator for GuidGenerator {
    fn generate(&self, session: &mut dyn GenerationSession, _: &EntityInstance) -> Result<GeneratedId> {
        let guid = session
            .select_value(&self.sql, &[])?
            .ok_or_else(|| Error::IdentifierGeneration("the database returned no guid".to_string()))?;
        let text = match guid {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(GeneratedId::Value(identifier_from_value(Value::String(text), self.id_type)?))
    }
}
