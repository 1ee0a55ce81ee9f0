//! Integration tests for query splitting, translation and execution.

use hql_core::sql::{Junction, JunctionNature, Operator, Predicate};
use hql_core::{
    Catalog, CollectionDef, ElementDef, EntityDef, Error, IdentifierDef, JavaType, JdbcExecutor,
    JdbcValuesSource, ListJdbcValues, MappingDocument, PropertyDef, QueryParameters, Row,
    SessionFactory, Settings, TypeDef, Value,
};
use pretty_assertions::assert_eq;

/// Executor answering from canned rows chosen by the table a statement
/// reads, and recording every statement it sees.
#[derive(Default)]
struct RecordingExecutor {
    answers: Vec<(&'static str, Vec<Vec<Value>>)>,
    statements: Vec<(String, Vec<Value>)>,
    updated: u64,
}

impl RecordingExecutor {
    fn answering(table: &'static str, rows: Vec<Vec<Value>>) -> Self {
        Self::default().and(table, rows)
    }

    fn and(mut self, table: &'static str, rows: Vec<Vec<Value>>) -> Self {
        self.answers.push((table, rows));
        self
    }

    fn sql(&self) -> Vec<&str> {
        self.statements.iter().map(|(sql, _)| sql.as_str()).collect()
    }
}

impl JdbcExecutor for RecordingExecutor {
    fn execute_query(&mut self, sql: &str, parameters: &[Value]) -> hql_core::Result<Box<dyn JdbcValuesSource>> {
        self.statements.push((sql.to_string(), parameters.to_vec()));
        let rows = self
            .answers
            .iter()
            .find(|(table, _)| sql.contains(&format!(" from {} ", table)))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default();
        Ok(Box::new(ListJdbcValues::new(rows)))
    }

    fn execute_update(&mut self, sql: &str, parameters: &[Value]) -> hql_core::Result<u64> {
        self.statements.push((sql.to_string(), parameters.to_vec()));
        Ok(self.updated)
    }
}

struct TestContext {
    factory: SessionFactory,
}

impl TestContext {
    fn new() -> Self {
        let animal = |name: &str, table: &str| {
            EntityDef::new(name, table)
                .with_identifier(IdentifierDef::new("id", "id", JavaType::Long))
                .with_property(PropertyDef::new("name", "name", JavaType::String))
                .with_property(PropertyDef::new("age", "age", JavaType::Integer))
        };
        let document = MappingDocument::new()
            .with_type(TypeDef::new("Animal").abstract_type())
            .with_type(TypeDef::new("Dog").with_supertype("Animal"))
            .with_type(TypeDef::new("Cat").with_supertype("Animal"))
            .with_entity(animal("Dog", "dogs"))
            .with_entity(animal("Cat", "cats"))
            .with_entity(
                EntityDef::new("Kennel", "kennels")
                    .with_identifier(IdentifierDef::new("id", "id", JavaType::Long)),
            )
            .with_collection(CollectionDef::new(
                "Kennel.dogs",
                "dogs",
                "kennel_id",
                ElementDef::entity("Dog"),
            ));
        let catalog = Catalog::new(document).expect("valid mapping");
        let factory = SessionFactory::new(catalog, Settings::default()).expect("factory");
        Self { factory }
    }
}

fn dog_row(id: i64, name: &str, age: i32) -> Vec<Value> {
    vec![Value::Int64(id), Value::String(name.to_string()), Value::Int32(age)]
}

// ---- splitting ----

#[test]
fn test_split_bare_polymorphic_query() {
    let ctx = TestContext::new();
    let queries = ctx.factory.concrete_queries("from Animal").unwrap();
    assert_eq!(queries, vec!["from Dog".to_string(), "from Cat".to_string()]);
}

#[test]
fn test_split_keeps_the_rest_of_the_query() {
    let ctx = TestContext::new();
    let queries = ctx
        .factory
        .concrete_queries("select a.name from Animal a where a.age > 3")
        .unwrap();
    assert_eq!(
        queries,
        vec![
            "select a.name from Dog a where a.age > 3".to_string(),
            "select a.name from Cat a where a.age > 3".to_string(),
        ]
    );
}

#[test]
fn test_split_is_deterministic() {
    let ctx = TestContext::new();
    let query = "from Animal a, Animal b where a.age = b.age";
    let first = ctx.factory.concrete_queries(query).unwrap();
    let second = ctx.factory.concrete_queries(query).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn test_concrete_query_is_unchanged() {
    let ctx = TestContext::new();
    let query = "select d.name from Dog d where d.age > 3";
    assert_eq!(ctx.factory.concrete_queries(query).unwrap(), vec![query.to_string()]);
}

// ---- translation ----

#[test]
fn test_scalar_query_sql() {
    let ctx = TestContext::new();
    let plan = ctx
        .factory
        .hql_query_plan("select d.name from Dog d where d.age > :min", false)
        .unwrap();
    assert_eq!(
        plan.sql_strings(),
        &["select dog0_.name as col_0_0_ from dogs dog0_ where dog0_.age>?".to_string()]
    );
    assert_eq!(plan.query_spaces(), &["dogs".to_string()]);
    assert!(plan.named_parameters().contains("min"));
    assert!(!plan.is_manipulation());
}

#[test]
fn test_entity_query_lists_entities() {
    let ctx = TestContext::new();
    let plan = ctx
        .factory
        .hql_query_plan("from Dog d where d.name = :name", false)
        .unwrap();
    assert_eq!(
        plan.sql_strings(),
        &["select dog0_.id as col_0_0_, dog0_.name as col_0_1_, dog0_.age as col_0_2_ \
           from dogs dog0_ where dog0_.name=?"
            .to_string()]
    );

    let mut executor = RecordingExecutor::answering("dogs", vec![dog_row(1, "Rex", 3)]);
    let params = QueryParameters::new().with_named("name", Value::String("Rex".into()));
    let rows = plan.perform_list(&mut executor, &params).unwrap();

    assert_eq!(rows.len(), 1);
    let Row::Value(Value::Entity(dog)) = &rows[0] else {
        panic!("expected an entity row, got {:?}", rows[0]);
    };
    assert_eq!(dog.entity_name, "Dog");
    assert_eq!(dog.get("id"), Some(&Value::Int64(1)));
    assert_eq!(dog.get("name"), Some(&Value::String("Rex".into())));
    assert_eq!(executor.statements[0].1, vec![Value::String("Rex".into())]);
}

#[test]
fn test_shallow_query_selects_identifiers() {
    let ctx = TestContext::new();
    let plan = ctx.factory.hql_query_plan("from Dog d", true).unwrap();
    assert_eq!(
        plan.sql_strings(),
        &["select dog0_.id as col_0_0_ from dogs dog0_".to_string()]
    );
}

#[test]
fn test_missing_parameter_is_reported() {
    let ctx = TestContext::new();
    let plan = ctx
        .factory
        .hql_query_plan("from Dog d where d.name = :name", false)
        .unwrap();
    let err = plan
        .perform_list(&mut RecordingExecutor::default(), &QueryParameters::new())
        .unwrap_err();
    assert!(matches!(err, Error::Query { .. }));
}

#[test]
fn test_polymorphic_plan_merges_rows() {
    let ctx = TestContext::new();
    let plan = ctx.factory.hql_query_plan("select a.name from Animal a", false).unwrap();
    assert_eq!(
        plan.sql_strings(),
        &[
            "select dog0_.name as col_0_0_ from dogs dog0_".to_string(),
            "select cat0_.name as col_0_0_ from cats cat0_".to_string(),
        ]
    );

    let mut executor = RecordingExecutor::answering("dogs", vec![vec![Value::String("Rex".into())]])
        .and("cats", vec![vec![Value::String("Tom".into())], vec![Value::String("Kit".into())]]);
    let rows = plan.perform_list(&mut executor, &QueryParameters::new()).unwrap();
    assert_eq!(
        rows,
        vec![
            Row::Value(Value::String("Rex".into())),
            Row::Value(Value::String("Tom".into())),
            Row::Value(Value::String("Kit".into())),
        ]
    );
}

#[test]
fn test_polymorphic_row_selection_applies_in_memory() {
    let ctx = TestContext::new();
    let plan = ctx.factory.hql_query_plan("select a.name from Animal a", false).unwrap();
    let mut executor = RecordingExecutor::answering("dogs", vec![vec![Value::String("Rex".into())]])
        .and("cats", vec![vec![Value::String("Tom".into())], vec![Value::String("Kit".into())]]);
    let params = QueryParameters::new().with_first_row(1).with_max_rows(1);
    let rows = plan.perform_list(&mut executor, &params).unwrap();

    assert_eq!(rows, vec![Row::Value(Value::String("Tom".into()))]);
    assert!(executor.sql().iter().all(|sql| !sql.contains("limit")));
}

#[test]
fn test_single_plan_limits_in_sql() {
    let ctx = TestContext::new();
    let plan = ctx.factory.hql_query_plan("select d.name from Dog d", false).unwrap();
    let mut executor = RecordingExecutor::default();
    plan.perform_list(&mut executor, &QueryParameters::new().with_max_rows(5))
        .unwrap();
    assert!(executor.sql()[0].ends_with(" limit ?"));
}

#[test]
fn test_update_and_delete() {
    let ctx = TestContext::new();
    let update = ctx
        .factory
        .hql_query_plan("update Dog set name = :name where age > 10", false)
        .unwrap();
    assert!(update.is_manipulation());
    assert_eq!(
        update.sql_strings(),
        &["update dogs set name=? where age>10".to_string()]
    );

    let mut executor = RecordingExecutor {
        updated: 2,
        ..Default::default()
    };
    let params = QueryParameters::new().with_named("name", Value::String("Old".into()));
    assert_eq!(update.perform_execute_update(&mut executor, &params).unwrap(), 2);

    let delete = ctx.factory.hql_query_plan("delete from Cat where age < 1", false).unwrap();
    assert_eq!(delete.sql_strings(), &["delete from cats where age<1".to_string()]);
}

#[test]
fn test_execute_update_rejects_select() {
    let ctx = TestContext::new();
    let plan = ctx.factory.hql_query_plan("from Dog", false).unwrap();
    let err = plan
        .perform_execute_update(&mut RecordingExecutor::default(), &QueryParameters::new())
        .unwrap_err();
    let Error::QueryExecutionRequest { message, query } = err else {
        panic!("expected an execution request error");
    };
    assert_eq!(message, "Not supported for select queries");
    assert_eq!(query, "from Dog");
}

#[test]
fn test_list_rejects_manipulation() {
    let ctx = TestContext::new();
    let plan = ctx.factory.hql_query_plan("delete from Dog", false).unwrap();
    let err = plan
        .perform_list(&mut RecordingExecutor::default(), &QueryParameters::new())
        .unwrap_err();
    assert!(matches!(err, Error::QueryExecutionRequest { .. }));
}

#[test]
fn test_unknown_entity_and_property_are_mapping_errors() {
    let ctx = TestContext::new();
    for query in ["from Unicorn u", "from Dog d where d.wings = 1", "select d.nickname from Dog d"] {
        let Err(err) = ctx.factory.hql_query_plan(query, false) else {
            panic!("{} should not translate", query);
        };
        assert!(matches!(err, Error::Mapping(_)), "{}: {:?}", query, err);
    }

    let Err(err) = ctx.factory.hql_query_plan("select d.name.length from Dog d", false) else {
        panic!("dereferencing a scalar should not translate");
    };
    assert!(matches!(err, Error::Query { .. }));
}

// ---- filters ----

#[test]
fn test_filter_restricts_to_collection_key() {
    let ctx = TestContext::new();
    let filter = ctx
        .factory
        .filter_query_plan("where this.age > 1", "Kennel.dogs", false)
        .unwrap();
    assert_eq!(filter.collection_role(), "Kennel.dogs");
    assert_eq!(
        filter.plan().sql_strings(),
        &["select dog0_.id as col_0_0_, dog0_.name as col_0_1_, dog0_.age as col_0_2_ \
           from dogs dog0_ where dog0_.kennel_id=? and dog0_.age>1"
            .to_string()]
    );

    let mut executor = RecordingExecutor::answering("dogs", vec![dog_row(4, "Rex", 2)]);
    let params = QueryParameters::new().with_collection_key(Value::Int64(7));
    let rows = filter.perform_list(&mut executor, &params).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(executor.statements[0].1, vec![Value::Int64(7)]);
}

#[test]
fn test_filter_without_key_fails() {
    let ctx = TestContext::new();
    let filter = ctx.factory.filter_query_plan("where this.age > 1", "Kennel.dogs", false).unwrap();
    let err = filter
        .perform_list(&mut RecordingExecutor::default(), &QueryParameters::new())
        .unwrap_err();
    assert!(matches!(err, Error::Query { .. }));
}

// ---- plan cache ----

#[test]
fn test_plans_are_cached() {
    let ctx = TestContext::new();
    let first = ctx.factory.hql_query_plan("from Dog d", false).unwrap();
    let second = ctx.factory.hql_query_plan("from Dog d", false).unwrap();
    let shallow = ctx.factory.hql_query_plan("from Dog d", true).unwrap();

    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert!(!std::sync::Arc::ptr_eq(&first, &shallow));
    assert_eq!(ctx.factory.plan_cache().len(), 2);
    assert_eq!(ctx.factory.plan_cache().stats().hits(), 1);
}

// ---- predicate algebra ----

#[test]
fn test_operator_negation_is_an_involution() {
    for op in Operator::ALL {
        assert_eq!(op.negate().negate(), op);
        assert_ne!(op.negate(), op);
    }
}

#[test]
fn test_operator_sql_text_is_distinct() {
    let texts: std::collections::HashSet<&str> = Operator::ALL.iter().map(|op| op.sql_text()).collect();
    assert_eq!(texts.len(), Operator::ALL.len());
}

#[test]
fn test_junction_emptiness_counts_children() {
    for nature in [JunctionNature::Conjunction, JunctionNature::Disjunction] {
        let mut junction = Junction::new(nature);
        assert!(junction.is_empty());
        junction.add(Predicate::Junction(Junction::new(JunctionNature::Conjunction)));
        assert!(!junction.is_empty());
    }
}

// ---- collection properties ----

#[test]
fn test_index_is_not_a_plain_collection_property() {
    let ctx = TestContext::new();
    let properties = ctx.factory.collection_properties();
    assert!(!properties.is_collection_property("index"));
    assert!(properties.is_any_collection_property("index"));
    assert!(properties.is_collection_property("size"));
}
