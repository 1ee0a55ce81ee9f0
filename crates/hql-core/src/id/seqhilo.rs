use super::{
    create_number, GeneratedId, GenerationSession, GeneratorContext, IdentifierGenerator,
    PersistentIdentifierGenerator, SequenceGenerator,
};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::value::{EntityInstance, JavaType};
use parking_lot::Mutex;
use tracing::debug;

pub const MAX_LO: &str = "max_lo";
pub const DEFAULT_MAX_LO: i64 = 9;

#[derive(Debug)]
struct HiLoState {
    lo: i64,
    hi: i64,
}

/// Hi/lo over a sequence: each sequence value reserves a block of
/// `max_lo + 1` identifiers handed out in memory.
#[derive(Debug)]
pub struct SequenceHiLoGenerator {
    sequence: SequenceGenerator,
    max_lo: i64,
    id_type: JavaType,
    state: Mutex<HiLoState>,
}

impl SequenceHiLoGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Result<Self> {
        let max_lo = ctx.int_param(MAX_LO, DEFAULT_MAX_LO)?;
        let exhausted = max_lo
            .checked_add(1)
            .ok_or_else(|| Error::IdentifierGeneration(format!("{} out of range: {}", MAX_LO, max_lo)))?;
        Ok(Self {
            sequence: SequenceGenerator::configure(ctx)?,
            max_lo,
            id_type: ctx.identifier.java_type,
            state: Mutex::new(HiLoState {
                lo: exhausted,
                hi: 0,
            }),
        })
    }

    pub fn max_lo(&self) -> i64 {
        self.max_lo
    }
}

impl IdentifierGenerator for SequenceHiLoGenerator {
    fn generate(&self, session: &mut dyn GenerationSession, _: &EntityInstance) -> Result<GeneratedId> {
        if self.max_lo < 1 {
            // no hi/lo; a fresh sequence may start at 0, which is never an id
            let mut value = self.sequence.next_value(session)?;
            if value == 0 {
                value = self.sequence.next_value(session)?;
            }
            return Ok(GeneratedId::Value(create_number(value, self.id_type)?));
        }

        let mut state = self.state.lock();
        if state.lo > self.max_lo {
            let hival = self.sequence.next_value(session)?;
            state.hi = hival
                .checked_mul(self.max_lo + 1)
                .ok_or_else(|| Error::IdentifierGeneration(format!("hi value {} overflows the identifier range", hival)))?;
            state.lo = if hival == 0 { 1 } else { 0 };
            debug!(sequence = %self.sequence.sequence_name(), hi = state.hi, "new hi value");
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

impl PersistentIdentifierGenerator for SequenceHiLoGenerator {
    fn sql_create_strings(&self, dialect: &dyn Dialect) -> Result<Vec<String>> {
        self.sequence.sql_create_strings(dialect)
    }

    fn sql_drop_strings(&self, dialect: &dyn Dialect) -> Result<Vec<String>> {
        self.sequence.sql_drop_strings(dialect)
    }

    fn generator_key(&self) -> String {
        self.sequence.generator_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, IdentifierDef};
    use crate::dialect::H2Dialect;
    use crate::id::testing::{dog_catalog, dog_context, ScriptedSession};
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn catalog(max_lo: &str) -> Catalog {
        dog_catalog(
            IdentifierDef::new("id", "id", JavaType::Long)
                .with_generator("seqhilo", vec![("sequence", "dog_seq"), ("max_lo", max_lo)]),
        )
    }

    fn ids(generator: &SequenceHiLoGenerator, session: &mut ScriptedSession, n: usize) -> Vec<i64> {
        (0..n)
            .map(|_| {
                generator
                    .generate(&mut *session, &EntityInstance::new("Dog"))
                    .unwrap()
                    .into_value()
                    .and_then(|v| v.as_i64())
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_blocks_of_max_lo_plus_one() {
        let catalog = catalog("2");
        let generator = SequenceHiLoGenerator::configure(&dog_context(&catalog, &H2Dialect)).unwrap();
        let mut session = ScriptedSession::answering([Some(Value::Int64(1)), Some(Value::Int64(2))]);
        assert_eq!(ids(&generator, &mut session, 6), vec![3, 4, 5, 6, 7, 8]);
        assert_eq!(session.statements().len(), 2);
    }

    #[test]
    fn test_zero_hi_never_yields_zero() {
        let catalog = catalog("9");
        let generator = SequenceHiLoGenerator::configure(&dog_context(&catalog, &H2Dialect)).unwrap();
        let mut session = ScriptedSession::answering([Some(Value::Int64(0)), Some(Value::Int64(1))]);
        assert_eq!(ids(&generator, &mut session, 2), vec![1, 2]);
    }

    #[test]
    fn test_max_lo_zero_delegates_and_skips_zero() {
        let catalog = catalog("0");
        let generator = SequenceHiLoGenerator::configure(&dog_context(&catalog, &H2Dialect)).unwrap();
        let mut session = ScriptedSession::answering([
            Some(Value::Int64(0)),
            Some(Value::Int64(1)),
            Some(Value::Int64(2)),
        ]);
        assert_eq!(ids(&generator, &mut session, 2), vec![1, 2]);
    }

    #[test]
    fn test_hi_value_overflow_is_a_generation_error() {
        let catalog = catalog("9");
        let generator = SequenceHiLoGenerator::configure(&dog_context(&catalog, &H2Dialect)).unwrap();
        let mut session = ScriptedSession::answering([Some(Value::Int64(i64::MAX / 5)), Some(Value::Int64(4))]);
        let err = generator
            .generate(&mut session, &EntityInstance::new("Dog"))
            .unwrap_err();
        assert!(matches!(err, Error::IdentifierGeneration(_)));

        // the failed block is not used; the next call fetches a fresh one
        assert_eq!(ids(&generator, &mut session, 2), vec![40, 41]);
    }

    #[test]
    fn test_last_id_of_the_range_overflows() {
        let catalog = catalog("2");
        let generator = SequenceHiLoGenerator::configure(&dog_context(&catalog, &H2Dialect)).unwrap();
        let mut session = ScriptedSession::answering([Some(Value::Int64(i64::MAX / 3))]);
        assert_eq!(ids(&generator, &mut session, 2), vec![i64::MAX - 1, i64::MAX]);
        let err = generator
            .generate(&mut session, &EntityInstance::new("Dog"))
            .unwrap_err();
        assert!(matches!(err, Error::IdentifierGeneration(_)));
    }

    #[test]
    fn test_max_lo_out_of_range() {
        let catalog = catalog(&i64::MAX.to_string());
        let err = SequenceHiLoGenerator::configure(&dog_context(&catalog, &H2Dialect)).unwrap_err();
        assert!(matches!(err, Error::IdentifierGeneration(_)));
    }

    #[test]
    fn test_default_max_lo() {
        let catalog = dog_catalog(
            IdentifierDef::new("id", "id", JavaType::Long)
                .with_generator("seqhilo", Vec::<(String, String)>::new()),
        );
        let generator = SequenceHiLoGenerator::configure(&dog_context(&catalog, &H2Dialect)).unwrap();
        assert_eq!(generator.max_lo(), DEFAULT_MAX_LO);
        assert_eq!(generator.generator_key(), "hibernate_sequence");
    }
}
