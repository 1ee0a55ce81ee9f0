use super::{GeneratedId, GenerationSession, GeneratorContext, IdentifierGenerator};
use crate::error::{Error, Result};
use crate::value::EntityInstance;

/// The application sets the identifier before save.
#[derive(Debug, Clone)]
pub struct Assigned {
    entity_name: String,
    property: String,
}

impl Assigned {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Self {
        Self {
            entity_name: ctx.entity.name.clone(),
            property: ctx.identifier.property.clone(),
        }
    }
}

impl IdentifierGenerator for Assigned {
    fn generate(&self, session: &mut dyn GenerationSession, entity: &EntityInstance) -> Result<GeneratedId> {
        session
            .identifier_of(entity, &self.property)
            .map(GeneratedId::Value)
            .ok_or_else(|| {
                Error::IdentifierGeneration(format!(
                    "ids for this class must be manually assigned before calling save(): {}",
                    self.entity_name
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::IdentifierDef;
    use crate::dialect::H2Dialect;
    use crate::id::testing::{dog_catalog, dog_context, ScriptedSession};
    use crate::value::{JavaType, Value};

    fn generator() -> Assigned {
        let catalog = dog_catalog(IdentifierDef::new("code", "code", JavaType::String));
        Assigned::configure(&dog_context(&catalog, &H2Dialect))
    }

    #[test]
    fn test_returns_assigned_id() {
        let dog = EntityInstance::new("Dog").with("code", Value::String("rex".into()));
        let id = generator().generate(&mut ScriptedSession::default(), &dog).unwrap();
        assert_eq!(id, GeneratedId::Value(Value::String("rex".into())));
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let dog = EntityInstance::new("Dog").with("code", Value::Null);
        let err = generator().generate(&mut ScriptedSession::default(), &dog).unwrap_err();
        assert_eq!(
            err.to_string(),
            "identifier generation error: ids for this class must be manually assigned before calling save(): Dog"
        );
    }
}
