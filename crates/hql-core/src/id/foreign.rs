use super::{identifier_from_value, GeneratedId, GenerationSession, GeneratorContext, IdentifierGenerator};
use crate::error::{Error, Result};
use crate::value::{EntityInstance, JavaType, Value};

pub const PROPERTY: &str = "property";

/// Shares the identifier of an associated entity, typically across a
/// one-to-one association.
#[derive(Debug, Clone)]
pub struct ForeignGenerator {
    property: String,
    /// Identifier property of the associated entity.
    target_identifier: String,
    id_type: JavaType,
}

impl ForeignGenerator {
    pub fn configure(ctx: &GeneratorContext<'_>) -> Result<Self> {
        let property = ctx.required_param(PROPERTY, "foreign")?;
        let association = ctx.catalog.find_many_to_one(ctx.entity, property).ok_or_else(|| {
            Error::Mapping(format!(
                "foreign id property {} is not an association of {}",
                property, ctx.entity.name
            ))
        })?;
        let target = ctx.catalog.resolve_entity(&association.target)?;
        let target_identifier = ctx.catalog.identifier(target)?;
        Ok(Self {
            property: property.to_string(),
            target_identifier: target_identifier.property.clone(),
            id_type: ctx.identifier.java_type,
        })
    }

    pub fn property(&self) -> &str {
        &self.property
    }
}

impl IdentifierGenerator for ForeignGenerator {
    fn generate(&self, session: &mut dyn GenerationSession, entity: &EntityInstance) -> Result<GeneratedId> {
        let associated = match entity.get(&self.property) {
            None | Some(Value::Null) => {
                return Err(Error::IdentifierGeneration(format!(
                    "attempted to assign id from null one-to-one property: {}",
                    self.property
                )))
            }
            Some(value) => value,
        };
        let id = match associated {
            Value::Entity(target) => session
                .identifier_of(target, &self.target_identifier)
                .ok_or_else(|| {
                    Error::IdentifierGeneration(format!(
                        "associated {} for property {} has no identifier yet",
                        target.entity_name, self.property
                    ))
                })?,
            // a bare reference holding the associated identifier
            other => other.clone(),
        };
        Ok(GeneratedId::Value(identifier_from_value(id, self.id_type)?))
    }
}
