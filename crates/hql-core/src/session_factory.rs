//! The session factory: everything built once from the mapping and the
//! settings and shared by every session.

use crate::catalog::Catalog;
use crate::config::Settings;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::hql::{
    concrete_queries, FilterQueryPlan, HqlQueryPlan, ImplementorSource, QueryPlanCache,
    TranslationContext,
};
use crate::id::{generator_ddl, GeneratorContext, GeneratorDdl, IdentifierGenerator, IdentifierGeneratorFactory};
use crate::loader::CollectionLoader;
use hql_lang::CollectionProperties;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Immutable metadata plus the shared query plan cache and identifier
/// generators.
pub struct SessionFactory {
    catalog: Arc<Catalog>,
    dialect: Arc<dyn Dialect>,
    settings: Settings,
    context: TranslationContext,
    /// One generator per hierarchy root, keyed by entity name.
    generators: BTreeMap<String, Arc<dyn IdentifierGenerator>>,
    plan_cache: QueryPlanCache,
}

impl SessionFactory {
    /// Build a factory with the standard generator strategies.
    pub fn new(catalog: Catalog, settings: Settings) -> Result<Self> {
        Self::with_generator_factory(catalog, settings, &IdentifierGeneratorFactory::standard())
    }

    /// Build a factory, creating every entity's generator with `factory`.
    pub fn with_generator_factory(
        catalog: Catalog,
        settings: Settings,
        factory: &IdentifierGeneratorFactory,
    ) -> Result<Self> {
        let catalog = Arc::new(catalog);
        let dialect = settings.dialect.create();

        let mut generators = BTreeMap::new();
        for entity in catalog.entities() {
            let Some(identifier) = &entity.identifier else {
                continue;
            };
            let ctx = GeneratorContext {
                catalog: &catalog,
                entity,
                identifier,
                dialect: dialect.as_ref(),
            };
            let generator = factory.create(&ctx)?;
            debug!(entity = %entity.name, strategy = %identifier.generator.strategy, "configured id generator");
            generators.insert(entity.name.clone(), generator);
        }

        let context = TranslationContext::new(Arc::clone(&catalog), Arc::clone(&dialect))
            .with_substitutions(settings.substitutions.clone());
        let plan_cache = QueryPlanCache::new(settings.plan_cache_max_size);

        info!(
            entities = catalog.entities().len(),
            collections = catalog.collections().len(),
            dialect = %settings.dialect,
            "session factory built"
        );

        Ok(Self {
            catalog,
            dialect,
            settings,
            context,
            generators,
            plan_cache,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn collection_properties(&self) -> &CollectionProperties {
        &self.context.collection_properties
    }

    pub fn translation_context(&self) -> &TranslationContext {
        &self.context
    }

    pub fn plan_cache(&self) -> &QueryPlanCache {
        &self.plan_cache
    }

    /// Expand a polymorphic query into one query per concrete implementor.
    pub fn concrete_queries(&self, query: &str) -> Result<Vec<String>> {
        concrete_queries(query, self)
    }

    /// The cached plan for `query`, compiling it on a miss.
    pub fn hql_query_plan(&self, query: &str, shallow: bool) -> Result<Arc<HqlQueryPlan>> {
        self.plan_cache.hql_query_plan(query, shallow, || {
            HqlQueryPlan::new(query, shallow, &self.context, self)
        })
    }

    /// The cached plan for a filter over the collection `role`.
    pub fn filter_query_plan(&self, filter: &str, role: &str, shallow: bool) -> Result<Arc<FilterQueryPlan>> {
        if self.catalog.collection(role).is_none() {
            return Err(Error::Mapping(format!("collection role is not mapped: {}", role)));
        }
        self.plan_cache.filter_query_plan(filter, role, shallow, || {
            FilterQueryPlan::new(filter, role, shallow, &self.context, self)
        })
    }

    /// The identifier generator of an entity; subclasses share the
    /// generator of their hierarchy root.
    pub fn generator(&self, entity_name: &str) -> Result<&Arc<dyn IdentifierGenerator>> {
        let entity = self.catalog.resolve_entity(entity_name)?;
        let root = self.catalog.root_entity(entity);
        self.generators
            .get(&root.name)
            .ok_or_else(|| Error::Mapping(format!("entity {} has no identifier", entity_name)))
    }

    pub fn generators(&self) -> impl Iterator<Item = (&str, &Arc<dyn IdentifierGenerator>)> {
        self.generators.iter().map(|(name, g)| (name.as_str(), g))
    }

    /// Schema statements for every sequence and table the generators use.
    pub fn generator_ddl(&self) -> Result<GeneratorDdl> {
        generator_ddl(self.generators.values(), self.dialect.as_ref())
    }

    /// A loader for the collection `role`, using the configured batch
    /// fetch settings.
    pub fn collection_loader(&self, role: &str) -> Result<CollectionLoader<'_>> {
        CollectionLoader::new(
            &self.catalog,
            role,
            self.settings.default_batch_fetch_size,
            self.settings.batch_fetch_style,
        )
    }
}

impl ImplementorSource for SessionFactory {
    fn imported_class_name(&self, name: &str) -> Result<Option<String>> {
        ImplementorSource::imported_class_name(self.catalog.as_ref(), name)
    }

    fn implementors(&self, class_name: &str) -> Result<Vec<String>> {
        ImplementorSource::implementors(self.catalog.as_ref(), class_name)
    }
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("dialect", &self.dialect.name())
            .field("entities", &self.catalog.entities().len())
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .field("cached_plans", &self.plan_cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CollectionDef, ElementDef, EntityDef, IdentifierDef, MappingDocument, TypeDef};
    use crate::dialect::DialectKind;
    use crate::value::JavaType;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        let document = MappingDocument::new()
            .with_type(TypeDef::new("org.zoo.Animal").abstract_type())
            .with_type(TypeDef::new("org.zoo.Dog").with_supertype("org.zoo.Animal"))
            .with_type(TypeDef::new("org.zoo.Cat").with_supertype("org.zoo.Animal"))
            .with_entity(EntityDef::new("org.zoo.Dog", "dogs").with_identifier(
                IdentifierDef::new("id", "id", JavaType::Long).with_generator("seqhilo", vec![("sequence", "dog_seq")]),
            ))
            .with_entity(EntityDef::new("org.zoo.Puppy", "puppies").with_superclass("org.zoo.Dog"))
            .with_entity(EntityDef::new("org.zoo.Cat", "cats").with_identifier(
                IdentifierDef::new("id", "id", JavaType::Long).with_generator("sequence", vec![("sequence", "dog_seq")]),
            ))
            .with_entity(EntityDef::new("org.zoo.Kennel", "kennels").with_identifier(
                IdentifierDef::new("id", "id", JavaType::Long).with_generator("hilo", Vec::<(String, String)>::new()),
            ))
            .with_collection(CollectionDef::new(
                "org.zoo.Kennel.dogs",
                "dogs",
                "kennel_id",
                ElementDef::entity("org.zoo.Dog"),
            ));
        Catalog::new(document).unwrap()
    }

    #[test]
    fn test_generators_shared_by_subclasses() {
        let factory = SessionFactory::new(catalog(), Settings::default()).unwrap();
        let dog = factory.generator("org.zoo.Dog").unwrap();
        let puppy = factory.generator("org.zoo.Puppy").unwrap();
        assert!(Arc::ptr_eq(dog, puppy));
        assert_eq!(factory.generators().count(), 3);
    }

    #[test]
    fn test_generator_ddl_is_deduplicated() {
        let factory = SessionFactory::new(catalog(), Settings::default()).unwrap();
        let ddl = factory.generator_ddl().unwrap();
        assert_eq!(
            ddl.create,
            vec![
                "create sequence dog_seq start with 1 increment by 1".to_string(),
                "create table hibernate_unique_key ( next_hi integer )".to_string(),
                "insert into hibernate_unique_key values ( 0 )".to_string(),
            ]
        );
        assert_eq!(ddl.drop.len(), 2);
    }

    #[test]
    fn test_sequences_fail_on_mysql() {
        let settings = Settings::default().with_dialect(DialectKind::MySQL);
        let err = SessionFactory::new(catalog(), settings).unwrap_err();
        assert!(matches!(err, Error::Mapping(_)));
    }

    #[test]
    fn test_splits_through_catalog() {
        let factory = SessionFactory::new(catalog(), Settings::default()).unwrap();
        let queries = factory.concrete_queries("from org.zoo.Animal a").unwrap();
        assert_eq!(
            queries,
            vec!["from org.zoo.Dog a".to_string(), "from org.zoo.Cat a".to_string()]
        );
    }

    #[test]
    fn test_unknown_filter_role() {
        let factory = SessionFactory::new(catalog(), Settings::default()).unwrap();
        let err = factory.filter_query_plan("where this.id > 1", "org.zoo.Kennel.cats", false).unwrap_err();
        assert!(matches!(err, Error::Mapping(_)));
    }

    #[test]
    fn test_collection_loader_uses_settings() {
        let settings = Settings::default().with_default_batch_fetch_size(8);
        let factory = SessionFactory::new(catalog(), settings).unwrap();
        let loader = factory.collection_loader("org.zoo.Kennel.dogs").unwrap();
        assert_eq!(loader.batch_size(), 8);
    }
}
