//! Integration tests for identifier generation through the session factory.

use hql_core::id::create_number;
use hql_core::{
    Catalog, EntityDef, EntityInstance, Error, GeneratedId, GenerationSession, IdentifierDef,
    JavaType, MappingDocument, SessionFactory, Settings, Value,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// A session over a shared in-memory sequence.
struct SequenceSession<'a> {
    sequence: &'a AtomicI64,
    statements: Vec<String>,
}

impl<'a> SequenceSession<'a> {
    fn new(sequence: &'a AtomicI64) -> Self {
        Self {
            sequence,
            statements: Vec::new(),
        }
    }
}

impl GenerationSession for SequenceSession<'_> {
    fn select_value(&mut self, sql: &str, _: &[Value]) -> hql_core::Result<Option<Value>> {
        self.statements.push(sql.to_string());
        Ok(Some(Value::Int64(self.sequence.fetch_add(1, Ordering::SeqCst))))
    }

    fn execute_update(&mut self, sql: &str, _: &[Value]) -> hql_core::Result<u64> {
        self.statements.push(sql.to_string());
        Ok(1)
    }
}

fn factory(strategy: &str, params: Vec<(&str, &str)>) -> SessionFactory {
    let document = MappingDocument::new().with_entity(
        EntityDef::new("Dog", "dogs")
            .with_identifier(IdentifierDef::new("id", "id", JavaType::Long).with_generator(strategy, params)),
    );
    SessionFactory::new(Catalog::new(document).expect("valid mapping"), Settings::default()).expect("factory")
}

fn next_id(factory: &SessionFactory, session: &mut dyn GenerationSession) -> i64 {
    let generated = factory
        .generator("Dog")
        .unwrap()
        .generate(session, &EntityInstance::new("Dog"))
        .unwrap();
    match generated {
        GeneratedId::Value(Value::Int64(id)) => id,
        other => panic!("expected a long identifier, got {:?}", other),
    }
}

#[test]
fn test_seqhilo_ids_are_unique_across_threads() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 250;

    let factory = factory("seqhilo", vec![("sequence", "dog_seq"), ("max_lo", "5")]);
    let sequence = AtomicI64::new(0);
    let ids = Mutex::new(Vec::with_capacity(THREADS * PER_THREAD));

    std::thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                let mut session = SequenceSession::new(&sequence);
                let local: Vec<i64> = (0..PER_THREAD).map(|_| next_id(&factory, &mut session)).collect();
                ids.lock().unwrap().extend(local);
            });
        }
    });

    let ids = ids.into_inner().unwrap();
    let distinct: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(ids.len(), THREADS * PER_THREAD);
    assert_eq!(distinct.len(), ids.len());
    assert!(!distinct.contains(&0));
}

#[test]
fn test_seqhilo_blocks() {
    let factory = factory("seqhilo", vec![("sequence", "dog_seq"), ("max_lo", "2")]);
    let sequence = AtomicI64::new(1);
    let mut session = SequenceSession::new(&sequence);
    let ids: Vec<i64> = (0..4).map(|_| next_id(&factory, &mut session)).collect();

    assert_eq!(ids, vec![3, 4, 5, 6]);
    assert_eq!(
        session.statements,
        vec!["select nextval('dog_seq')".to_string(), "select nextval('dog_seq')".to_string()]
    );
}

#[test]
fn test_seqhilo_without_blocks_skips_zero() {
    let factory = factory("seqhilo", vec![("sequence", "dog_seq"), ("max_lo", "0")]);
    let sequence = AtomicI64::new(0);
    let mut session = SequenceSession::new(&sequence);

    assert_eq!(next_id(&factory, &mut session), 1);
    assert_eq!(next_id(&factory, &mut session), 2);
}

#[test]
fn test_increment_counts_from_the_current_max() {
    let factory = factory("increment", vec![]);
    let sequence = AtomicI64::new(41);
    let mut session = SequenceSession::new(&sequence);

    assert_eq!(next_id(&factory, &mut session), 42);
    assert_eq!(next_id(&factory, &mut session), 43);
    assert_eq!(session.statements, vec!["select max(id) from dogs".to_string()]);
}

#[test]
fn test_native_on_postgres_uses_a_sequence() {
    let factory = factory("native", vec![]);
    let sequence = AtomicI64::new(10);
    let mut session = SequenceSession::new(&sequence);

    assert_eq!(next_id(&factory, &mut session), 10);
    assert_eq!(session.statements, vec!["select nextval('hibernate_sequence')".to_string()]);
}

#[test]
fn test_create_number() {
    assert_eq!(create_number(5, JavaType::Integer).unwrap(), Value::Int32(5));
    assert_eq!(create_number(5, JavaType::Short).unwrap(), Value::Int16(5));
    assert_eq!(create_number(5, JavaType::Long).unwrap(), Value::Int64(5));

    let err = create_number(5, JavaType::Double).unwrap_err();
    assert!(matches!(err, Error::IdentifierGeneration(_)));
    let err = create_number(i64::from(i32::MAX) + 1, JavaType::Integer).unwrap_err();
    assert!(matches!(err, Error::IdentifierGeneration(_)));
}

#[test]
fn test_unknown_strategy_fails_factory() {
    let document = MappingDocument::new().with_entity(
        EntityDef::new("Dog", "dogs").with_identifier(
            IdentifierDef::new("id", "id", JavaType::Long).with_generator("no.such.Generator", Vec::<(String, String)>::new()),
        ),
    );
    let err = SessionFactory::new(Catalog::new(document).unwrap(), Settings::default()).unwrap_err();
    assert!(matches!(err, Error::Mapping(_)));
}
