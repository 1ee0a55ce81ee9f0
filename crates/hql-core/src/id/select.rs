use super::{
    identifier_from_value, GeneratedId, GenerationSession, GeneratorContext, IdentifierGenerator,
    PostInsertIdentifierGenerator,
};
use crate::error::{Error, Result};
use crate::value::{EntityInstance, JavaType, Value};

pub const KEY: &str = "key";

/// Reads the id assigned by a database trigger, locating the inserted row
/// through a unique property.
#[derive(Debug, Clone)]
pub struct SelectGenerator {
    entity_name: String,
    key_property: String,
    sql: String,
    id_type: JavaType,
}

impl SelectGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Result<Self> {
        let key_property = ctx.required_param(KEY, "select")?;
        let key = ctx.catalog.find_property(ctx.entity, key_property).ok_or_else(|| {
            Error::Mapping(format!(
                "unknown key property {} for select generation of {}",
                key_property, ctx.entity.name
            ))
        })?;
        let sql = format!(
            "select {} from {} where {} = ?",
            ctx.identifier.column, ctx.entity.table, key.column
        );
        Ok(Self {
            entity_name: ctx.entity.name.clone(),
            key_property: key_property.to_string(),
            sql,
            id_type: ctx.identifier.java_type,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl IdentifierGenerator for SelectGenerator {
    fn generate(&self, _: &mut dyn GenerationSession, _: &EntityInstance) -> Result<GeneratedId> {
        Ok(GeneratedId::PostInsert)
    }

    fn as_post_insert(&self) -> Option<&dyn PostInsertIdentifierGenerator> {
        Some(self)
    }
}

impl PostInsertIdentifierGenerator for SelectGenerator {
    fn retrieve_generated_id(
        &self,
        session: &mut dyn GenerationSession,
        entity: &EntityInstance,
    ) -> Result<Value> {
        let key = entity.get(&self.key_property).cloned().unwrap_or(Value::Null);
        let value = session.select_value(&self.sql, &[key])?.ok_or_else(|| {
            Error::IdentifierGeneration(format!(
                "the inserted row could not be located by the unique key: {}",
                self.entity_name
            ))
        })?;
        identifier_from_value(value, self.id_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, IdentifierDef, MappingDocument, PropertyDef};
    use crate::dialect::PostgreSQLDialect;
    use crate::id::testing::{dog_context, entity, ScriptedSession};
    use pretty_assertions::assert_eq;

    fn catalog(params: Vec<(&str, &str)>) -> Catalog {
        let dog = entity(
            "Dog",
            "dogs",
            IdentifierDef::new("id", "id", JavaType::Long).with_generator("select", params),
        )
        .with_property(PropertyDef::new("name", "dog_name", JavaType::String));
        Catalog::new(MappingDocument::new().with_entity(dog)).unwrap()
    }

    #[test]
    fn test_select_by_unique_key() {
        let catalog = catalog(vec![("key", "name")]);
        let generator = SelectGenerator::configure(&dog_context(&catalog, &PostgreSQLDialect)).unwrap();
        assert_eq!(generator.sql(), "select id from dogs where dog_name = ?");

        let dog = EntityInstance::new("Dog").with("name", Value::String("rex".into()));
        let mut session = ScriptedSession::answering([Some(Value::Int64(9))]);
        assert_eq!(generator.generate(&mut session, &dog).unwrap(), GeneratedId::PostInsert);
        assert_eq!(generator.retrieve_generated_id(&mut session, &dog).unwrap(), Value::Int64(9));
    }

    #[test]
    fn test_key_is_required() {
        let catalog = catalog(vec![]);
        let err = SelectGenerator::configure(&dog_context(&catalog, &PostgreSQLDialect)).unwrap_err();
        assert!(matches!(err, Error::Mapping(_)));
    }
}
