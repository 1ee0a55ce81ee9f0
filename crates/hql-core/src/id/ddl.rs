use super::IdentifierGenerator;
use crate::dialect::Dialect;
use crate::error::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Schema statements for the database objects backing identifier
/// generators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratorDdl {
    pub create: Vec<String>,
    pub drop: Vec<String>,
}

impl GeneratorDdl {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.drop.is_empty()
    }
}

/// Collect DDL for every persistent generator, once per generator key.
pub fn generator_ddl<'a, I>(generators: I, dialect: &dyn Dialect) -> Result<GeneratorDdl>
where
    I: IntoIterator<Item = &'a Arc<dyn IdentifierGenerator>>,
{
    let mut seen = HashSet::new();
    let mut ddl = GeneratorDdl::default();
    for generator in generators {
        let Some(persistent) = generator.as_persistent() else {
            continue;
        };
        let key = persistent.generator_key();
        if !seen.insert(key.clone()) {
            debug!(key = %key, "generator object already declared");
            continue;
        }
        ddl.create.extend(persistent.sql_create_strings(dialect)?);
        ddl.drop.extend(persistent.sql_drop_strings(dialect)?);
    }
    Ok(ddl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, IdentifierDef, MappingDocument};
    use crate::dialect::PostgreSQLDialect;
    use crate::id::testing::entity;
    use crate::id::{GeneratorContext, IdentifierGeneratorFactory};
    use crate::value::JavaType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shared_sequence_declared_once() {
        let seq = |strategy: &str| {
            IdentifierDef::new("id", "id", JavaType::Long).with_generator(strategy, vec![("sequence", "shared_seq")])
        };
        let document = MappingDocument::new()
            .with_entity(entity("Dog", "dogs", seq("sequence")))
            .with_entity(entity("Cat", "cats", seq("seqhilo")))
            .with_entity(entity("Bird", "birds", IdentifierDef::new("id", "id", JavaType::Long)));
        let catalog = Catalog::new(document).unwrap();
        let factory = IdentifierGeneratorFactory::standard();
        let generators: Vec<Arc<dyn IdentifierGenerator>> = catalog
            .entities()
            .iter()
            .map(|e| {
                let ctx = GeneratorContext {
                    catalog: &catalog,
                    entity: e,
                    identifier: catalog.identifier(e).unwrap(),
                    dialect: &PostgreSQLDialect,
                };
                factory.create(&ctx).unwrap()
            })
            .collect();

        let ddl = generator_ddl(&generators, &PostgreSQLDialect).unwrap();
        assert_eq!(
            ddl.create,
            vec!["create sequence shared_seq start with 1 increment by 1".to_string()]
        );
        assert_eq!(ddl.drop, vec!["drop sequence if exists shared_seq".to_string()]);
    }

    #[test]
    fn test_no_persistent_generators() {
        let ddl = generator_ddl(std::iter::empty(), &PostgreSQLDialect).unwrap();
        assert!(ddl.is_empty());
    }
}
