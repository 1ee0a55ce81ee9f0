use super::{
    identifier_from_value, GeneratedId, GenerationSession, GeneratorContext, IdentifierGenerator,
    PostInsertIdentifierGenerator,
};
use crate::error::{Error, Result};
use crate::value::{EntityInstance, JavaType, Value};
use tracing::debug;

pub const SEQUENCE: &str = "sequence";
pub const DEFAULT_SEQUENCE_NAME: &str = "hibernate_sequence";

fn no_identity_value() -> Error {
    Error::Persistence("The database returned no natively generated identity value".to_string())
}

/// Identity column: the insert produces the key, read back with the
/// dialect's identity select.
#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    sql: String,
    id_type: JavaType,
}

impl IdentityGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Result<Self> {
        let sql = ctx
            .dialect
            .identity_select_string(&ctx.entity.table, &ctx.identifier.column)?;
        Ok(Self {
            sql,
            id_type: ctx.identifier.java_type,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl IdentifierGenerator for IdentityGenerator {
    fn generate(&self, _: &mut dyn GenerationSession, _: &EntityInstance) -> Result<GeneratedId> {
        Ok(GeneratedId::PostInsert)
    }

    fn as_post_insert(&self) -> Option<&dyn PostInsertIdentifierGenerator> {
        Some(self)
    }
}

impl PostInsertIdentifierGenerator for IdentityGenerator {
    fn retrieve_generated_id(
        &self,
        session: &mut dyn GenerationSession,
        entity: &EntityInstance,
    ) -> Result<Value> {
        let value = session.select_value(&self.sql, &[])?.ok_or_else(no_identity_value)?;
        debug!(entity = %entity.entity_name, id = %value, "natively generated identity");
        identifier_from_value(value, self.id_type)
    }
}

/// A sequence consumed by the insert itself, read back with the current
/// value of the sequence.
#[derive(Debug, Clone)]
pub struct SequenceIdentityGenerator {
    sequence_name: String,
    sql: String,
    id_type: JavaType,
}

impl SequenceIdentityGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Result<Self> {
        let sequence_name = ctx.param(SEQUENCE).unwrap_or(DEFAULT_SEQUENCE_NAME).to_string();
        let sql = ctx.dialect.sequence_current_value_string(&sequence_name)?;
        Ok(Self {
            sequence_name,
            sql,
            id_type: ctx.identifier.java_type,
        })
    }

    pub fn sequence_name(&self) -> &str {
        &self.sequence_name
    }
}

impl IdentifierGenerator for SequenceIdentityGenerator {
    fn generate(&self, _: &mut dyn GenerationSession, _: &EntityInstance) -> Result<GeneratedId> {
        Ok(GeneratedId::PostInsert)
    }

    fn as_post_insert(&self) -> Option<&dyn PostInsertIdentifierGenerator> {
        Some(self)
    }
}

impl PostInsertIdentifierGenerator for SequenceIdentityGenerator {
    fn retrieve_generated_id(&self, session: &mut dyn GenerationSession, _: &EntityInstance) -> Result<Value> {
        let value = session.select_value(&self.sql, &[])?.ok_or_else(no_identity_value)?;
        identifier_from_value(value, self.id_type)
    }
}
