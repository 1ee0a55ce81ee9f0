use super::{
    create_number, GeneratedId, GenerationSession, GeneratorContext, IdentifierGenerator,
    PersistentIdentifierGenerator,
};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::value::{EntityInstance, JavaType, Value};
use parking_lot::Mutex;
use tracing::debug;

pub const TABLE: &str = "table";
pub const COLUMN: &str = "column";
pub const MAX_LO: &str = "max_lo";
pub const DEFAULT_TABLE_NAME: &str = "hibernate_unique_key";
pub const DEFAULT_COLUMN_NAME: &str = "next_hi";
pub const DEFAULT_MAX_LO: i64 = i16::MAX as i64;

/// A single-row table holding the next hi value, advanced with an
/// optimistic update.
#[derive(Debug, Clone)]
pub struct TableGenerator {
    table: String,
    column: String,
    query: String,
    update: String,
}

impl TableGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Self {
        let table = ctx.param(TABLE).unwrap_or(DEFAULT_TABLE_NAME).to_string();
        let column = ctx.param(COLUMN).unwrap_or(DEFAULT_COLUMN_NAME).to_string();
        Self {
            query: format!("select {} from {} for update", column, table),
            update: format!("update {} set {} = ? where {} = ?", table, column, column),
            table,
            column,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Read the current value and advance it. Retries when another
    /// process updated the row in between.
    pub fn next_value(&self, session: &mut dyn GenerationSession) -> Result<i64> {
        loop {
            let current = session
                .select_value(&self.query, &[])?
                .and_then(|v| v.as_i64())
                .ok_or_else(|| {
                    Error::IdentifierGeneration(format!(
                        "could not read a hi value - you need to populate the table: {}",
                        self.table
                    ))
                })?;
            let next = current.checked_add(1).ok_or_else(|| {
                Error::IdentifierGeneration(format!("hi value in {} is exhausted", self.table))
            })?;
            let updated = session.execute_update(&self.update, &[Value::Int64(next), Value::Int64(current)])?;
            if updated > 0 {
                return Ok(current);
            }
            debug!(table = %self.table, "hi value changed concurrently, retrying");
        }
    }

    pub fn sql_create_strings(&self) -> Vec<String> {
        vec![
            format!("create table {} ( {} integer )", self.table, self.column),
            format!("insert into {} values ( 0 )", self.table),
        ]
    }

    pub fn sql_drop_strings(&self, dialect: &dyn Dialect) -> Vec<String> {
        vec![dialect.drop_table_string(&self.table)]
    }
}

#[derive(Debug)]
struct HiLoState {
    lo: i64,
    hi: i64,
}

/// Hi/lo over [`TableGenerator`].
#[derive(Debug)]
pub struct TableHiLoGenerator {
    table: TableGenerator,
    max_lo: i64,
    id_type: JavaType,
    state: Mutex<HiLoState>,
}

impl TableHiLoGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Result<Self> {
        let max_lo = ctx.int_param(MAX_LO, DEFAULT_MAX_LO)?;
        let exhausted = max_lo
            .checked_add(1)
            .ok_or_else(|| Error::IdentifierGeneration(format!("{} out of range: {}", MAX_LO, max_lo)))?;
        Ok(Self {
            table: TableGenerator::configure(ctx),
            max_lo,
            id_type: ctx.identifier.java_type,
            state: Mutex::new(HiLoState {
                lo: exhausted,
                hi: 0,
            }),
        })
    }
}

impl IdentifierGenerator for TableHiLoGenerator {
    fn generate(&self, session: &mut dyn GenerationSession, _: &EntityInstance) -> Result<GeneratedId> {
        if self.max_lo < 1 {
            let mut value = self.table.next_value(session)?;
            if value == 0 {
                value = self.table.next_value(session)?;
            }
            return Ok(GeneratedId::Value(create_number(value, self.id_type)?));
        }

        let mut state = self.state.lock();
        if state.lo > self.max_lo {
            let hival = self.table.next_value(session)?;
            state.hi = hival
                .checked_mul(self.max_lo + 1)
                .ok_or_else(|| Error::IdentifierGeneration(format!("hi value {} overflows the identifier range", hival)))?;
            state.lo = if hival == 0 { 1 } else { 0 };
            debug!(table = %self.table.table(), hi = state.hi, "new hi value");
        }
        let value = state
            .hi
            .checked_add(state.lo)
            .ok_or_else(|| Error::IdentifierGeneration(format!("identifier overflows after {}", state.hi)))?;
        state.lo += 1;
        Ok(GeneratedId::Value(create_number(value, self.id_type)?))
    }

    fn as_persistent(&self) -> Option<&dyn PersistentIdentifierGenerator> {
        Some(self)
    }
}

impl PersistentIdentifierGenerator for TableHiLoGenerator {
    fn sql_create_strings(&self, _: &dyn Dialect) -> Result<Vec<String>> {
        Ok(self.table.sql_create_strings())
    }

    fn sql_drop_strings(&self, dialect: &dyn Dialect) -> Result<Vec<String>> {
        Ok(self.table.sql_drop_strings(dialect))
    }

    fn generator_key(&self) -> String {
        self.table.table().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::IdentifierDef;
    use crate::dialect::PostgreSQLDialect;
    use crate::id::testing::{dog_catalog, dog_context, ScriptedSession};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hilo_blocks() {
        let catalog = dog_catalog(
            IdentifierDef::new("id", "id", JavaType::Integer).with_generator("hilo", vec![("max_lo", "10")]),
        );
        let generator = TableHiLoGenerator::configure(&dog_context(&catalog, &PostgreSQLDialect)).unwrap();
        let mut session = ScriptedSession::answering([Some(Value::Int64(3))]);
        let first = generator.generate(&mut session, &EntityInstance::new("Dog")).unwrap();
        let second = generator.generate(&mut session, &EntityInstance::new("Dog")).unwrap();
        assert_eq!(first, GeneratedId::Value(Value::Int32(33)));
        assert_eq!(second, GeneratedId::Value(Value::Int32(34)));
        assert_eq!(
            session.statements(),
            vec![
                "select next_hi from hibernate_unique_key for update".to_string(),
                "update hibernate_unique_key set next_hi = ? where next_hi = ?".to_string(),
            ]
        );
    }

    #[test]
    fn test_optimistic_retry() {
        let catalog = dog_catalog(IdentifierDef::new("id", "id", JavaType::Long).with_generator(
            "hilo",
            vec![("table", "ids"), ("column", "hi")],
        ));
        let generator = TableHiLoGenerator::configure(&dog_context(&catalog, &PostgreSQLDialect)).unwrap();
        let mut session = ScriptedSession::answering([Some(Value::Int64(1)), Some(Value::Int64(2))]);
        session.updates.lock().extend([0, 1]);
        let id = generator.generate(&mut session, &EntityInstance::new("Dog")).unwrap();
        assert_eq!(id, GeneratedId::Value(Value::Int64(2 * (DEFAULT_MAX_LO + 1))));
        assert_eq!(session.statements().len(), 4);
    }

    #[test]
    fn test_hi_value_overflow_is_a_generation_error() {
        let catalog = dog_catalog(
            IdentifierDef::new("id", "id", JavaType::Long).with_generator("hilo", vec![("max_lo", "9")]),
        );
        let generator = TableHiLoGenerator::configure(&dog_context(&catalog, &PostgreSQLDialect)).unwrap();
        let mut session = ScriptedSession::answering([Some(Value::Int64(i64::MAX / 5)), Some(Value::Int64(i64::MAX))]);
        let err = generator.generate(&mut session, &EntityInstance::new("Dog")).unwrap_err();
        assert!(matches!(err, Error::IdentifierGeneration(_)));

        // a column already at the top cannot be advanced
        let err = generator.generate(&mut session, &EntityInstance::new("Dog")).unwrap_err();
        assert!(matches!(err, Error::IdentifierGeneration(_)));
        assert_eq!(session.statements().len(), 3);
    }

    #[test]
    fn test_unpopulated_table() {
        let catalog = dog_catalog(
            IdentifierDef::new("id", "id", JavaType::Long).with_generator("hilo", Vec::<(String, String)>::new()),
        );
        let generator = TableHiLoGenerator::configure(&dog_context(&catalog, &PostgreSQLDialect)).unwrap();
        let err = generator
            .generate(&mut ScriptedSession::default(), &EntityInstance::new("Dog"))
            .unwrap_err();
        assert!(err.to_string().contains("populate the table: hibernate_unique_key"));
    }

    #[test]
    fn test_ddl() {
        let catalog = dog_catalog(
            IdentifierDef::new("id", "id", JavaType::Long).with_generator("hilo", Vec::<(String, String)>::new()),
        );
        let generator = TableHiLoGenerator::configure(&dog_context(&catalog, &PostgreSQLDialect)).unwrap();
        assert_eq!(
            generator.sql_create_strings(&PostgreSQLDialect).unwrap(),
            vec![
                "create table hibernate_unique_key ( next_hi integer )".to_string(),
                "insert into hibernate_unique_key values ( 0 )".to_string(),
            ]
        );
        assert_eq!(
            generator.sql_drop_strings(&PostgreSQLDialect).unwrap(),
            vec!["drop table if exists hibernate_unique_key".to_string()]
        );
        assert_eq!(generator.generator_key(), "hibernate_unique_key");
    }
}
