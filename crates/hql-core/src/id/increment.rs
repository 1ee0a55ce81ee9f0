use super::{create_number, GeneratedId, GenerationSession, GeneratorContext, IdentifierGenerator};
use crate::error::{Error, Result};
use crate::value::{EntityInstance, JavaType};
use parking_lot::Mutex;
use tracing::debug;

pub const TABLES: &str = "tables";
pub const COLUMN: &str = "column";

/// Max of the id column(s) plus one, read once and then counted in
/// memory. Only safe when no other process inserts into the tables.
#[derive(Debug)]
pub struct IncrementGenerator {
    sql: String,
    id_type: JavaType,
    next: Mutex<Option<i64>>,
}

impl IncrementGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Result<Self> {
        let column = ctx.param(COLUMN).unwrap_or(&ctx.identifier.column);
        let tables: Vec<&str> = match ctx.param(TABLES) {
            Some(list) => list.split(',').map(str::trim).filter(|t| !t.is_empty()).collect(),
            None => vec![ctx.entity.table.as_str()],
        };
        let sql = match tables.as_slice() {
            [] => {
                return Err(Error::Mapping(format!(
                    "no tables given for increment generation of {}",
                    ctx.entity.name
                )))
            }
            [table] => format!("select max({}) from {}", column, table),
            many => {
                let union = many
                    .iter()
                    .map(|table| format!("select {} from {}", column, table))
                    .collect::<Vec<_>>()
                    .join(" union ");
                format!("select max(ids_.{}) from ( {} ) ids_", column, union)
            }
        };
        Ok(Self {
            sql,
            id_type: ctx.identifier.java_type,
            next: Mutex::new(None),
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl IdentifierGenerator for IncrementGenerator {
    fn generate(&self, session: &mut dyn GenerationSession, _: &EntityInstance) -> Result<GeneratedId> {
        let mut next = self.next.lock();
        let value = match *next {
            Some(value) => value,
            None => {
                let max = session.select_value(&self.sql, &[])?.and_then(|v| v.as_i64());
                let first = max.map_or(1, |m| m + 1);
                debug!(sql = %self.sql, first, "first free id");
                first
            }
        };
        *next = Some(value + 1);
        Ok(GeneratedId::Value(create_number(value, self.id_type)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::IdentifierDef;
    use crate::dialect::PostgreSQLDialect;
    use crate::id::testing::{dog_catalog, dog_context, ScriptedSession};
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn generator(params: Vec<(&str, &str)>) -> IncrementGenerator {
        let catalog = dog_catalog(IdentifierDef::new("id", "dog_id", JavaType::Long).with_generator("increment", params));
        IncrementGenerator::configure(&dog_context(&catalog, &PostgreSQLDialect)).unwrap()
    }

    #[test]
    fn test_counts_from_max() {
        let generator = generator(vec![]);
        assert_eq!(generator.sql(), "select max(dog_id) from dogs");
        let mut session = ScriptedSession::answering([Some(Value::Int64(41))]);
        let dog = EntityInstance::new("Dog");
        assert_eq!(generator.generate(&mut session, &dog).unwrap(), GeneratedId::Value(Value::Int64(42)));
        assert_eq!(generator.generate(&mut session, &dog).unwrap(), GeneratedId::Value(Value::Int64(43)));
        assert_eq!(session.statements().len(), 1);
    }

    #[test]
    fn test_empty_table_starts_at_one() {
        let generator = generator(vec![]);
        let id = generator
            .generate(&mut ScriptedSession::default(), &EntityInstance::new("Dog"))
            .unwrap();
        assert_eq!(id, GeneratedId::Value(Value::Int64(1)));
    }

    #[test]
    fn test_several_tables() {
        let generator = generator(vec![("tables", "dogs, cats"), ("column", "id")]);
        assert_eq!(
            generator.sql(),
            "select max(ids_.id) from ( select id from dogs union select id from cats ) ids_"
        );
    }
}
