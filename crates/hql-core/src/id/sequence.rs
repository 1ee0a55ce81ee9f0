use super::{
    create_number, GeneratedId, GenerationSession, GeneratorContext, IdentifierGenerator,
    PersistentIdentifierGenerator,
};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::value::{EntityInstance, JavaType};
use tracing::debug;

pub const SEQUENCE: &str = "sequence";
/// Extra text appended to the `create sequence` statement.
pub const PARAMETERS: &str = "parameters";
pub const DEFAULT_SEQUENCE_NAME: &str = "hibernate_sequence";

/// Identifiers from a database sequence, one round trip per value.
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    sequence_name: String,
    parameters: Option<String>,
    sql: String,
    id_type: JavaType,
}

impl SequenceGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Result<Self> {
        let sequence_name = ctx.param(SEQUENCE).unwrap_or(DEFAULT_SEQUENCE_NAME).to_string();
        let sql = ctx.dialect.sequence_next_value_string(&sequence_name)?;
        Ok(Self {
            sequence_name,
            parameters: ctx.param(PARAMETERS).map(str::to_string),
            sql,
            id_type: ctx.identifier.java_type,
        })
    }

    pub fn sequence_name(&self) -> &str {
        &self.sequence_name
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Fetch the next raw sequence value.
    pub fn next_value(&self, session: &mut dyn GenerationSession) -> Result<i64> {
        let value = session.select_value(&self.sql, &[])?.ok_or_else(|| {
            Error::IdentifierGeneration(format!("sequence {} returned no value", self.sequence_name))
        })?;
        let next = value.as_i64().ok_or_else(|| {
            Error::IdentifierGeneration(format!(
                "sequence {} returned a non-numeric value: {}",
                self.sequence_name, value
            ))
        })?;
        debug!(sequence = %self.sequence_name, value = next, "sequence value obtained");
        Ok(next)
    }
}

impl IdentifierGenerator for SequenceGenerator {
    fn generate(&self, session: &mut dyn GenerationSession, _: &EntityInstance) -> Result<GeneratedId> {
        let next = self.next_value(session)?;
        Ok(GeneratedId::Value(create_number(next, self.id_type)?))
    }

    fn as_persistent(&self) -> Option<&dyn PersistentIdentifierGenerator> {
        Some(self)
    }
}

impl PersistentIdentifierGenerator for SequenceGenerator {
    fn sql_create_strings(&self, dialect: &dyn Dialect) -> Result<Vec<String>> {
        let mut ddl = dialect.create_sequence_strings(&self.sequence_name, 1, 1)?;
        if let Some(parameters) = &self.parameters {
            for statement in &mut ddl {
                statement.push(' ');
                statement.push_str(parameters);
            }
        }
        Ok(ddl)
    }

    fn sql_drop_strings(&self, dialect: &dyn Dialect) -> Result<Vec<String>> {
        dialect.drop_sequence_strings(&self.sequence_name)
    }

    fn generator_key(&self) -> String {
        self.sequence_name.clone()
    }
}
