//! Immutable catalog built from a mapping document.

use super::types::simple_name;
use super::{CollectionDef, EntityDef, IdentifierDef, ManyToOneDef, MappingDocument, PropertyDef, TypeDef};
use crate::error::{Error, Result};
use crate::hql::ImplementorSource;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

/// Resolved mapping metadata.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: HashMap<String, TypeDef>,
    /// Entities in mapping order; `implementors` depends on it.
    entities: Vec<EntityDef>,
    entity_index: HashMap<String, usize>,
    collections: Vec<CollectionDef>,
    collection_index: HashMap<String, usize>,
    imports: HashMap<String, String>,
}

impl Catalog {
    /// Validate a mapping document and build the catalog.
    pub fn new(document: MappingDocument) -> Result<Self> {
        let MappingDocument {
            types: declared_types,
            entities,
            collections,
            imports: explicit_imports,
        } = document;

        let mut entity_index = HashMap::new();
        for (i, entity) in entities.iter().enumerate() {
            if entity_index.insert(entity.name.clone(), i).is_some() {
                return Err(Error::Mapping(format!(
                    "duplicate entity mapping {}",
                    entity.name
                )));
            }
        }

        let mut types: HashMap<String, TypeDef> = HashMap::new();
        let mut type_order = Vec::new();
        for ty in declared_types {
            type_order.push(ty.name.clone());
            types.insert(ty.name.clone(), ty);
        }
        for entity in &entities {
            let ty = types
                .entry(entity.name.clone())
                .or_insert_with(|| TypeDef::new(entity.name.clone()));
            if let Some(superclass) = &entity.superclass {
                if !ty.supertypes.contains(superclass) {
                    ty.supertypes.push(superclass.clone());
                }
            }
        }

        let mut catalog = Catalog {
            types,
            entities,
            entity_index,
            collections: Vec::new(),
            collection_index: HashMap::new(),
            imports: HashMap::new(),
        };

        catalog.validate_entities()?;

        for collection in collections {
            catalog.add_collection(collection)?;
        }

        let auto_import_names: Vec<String> = catalog
            .entities
            .iter()
            .map(|e| e.name.clone())
            .chain(type_order)
            .collect();
        for name in auto_import_names {
            let short = simple_name(&name).to_string();
            match catalog.imports.get(&short) {
                Some(existing) if *existing != name => {
                    warn!(import = %short, kept = %existing, ignored = %name, "duplicate auto-import");
                }
                Some(_) => {}
                None => {
                    catalog.imports.insert(short, name);
                }
            }
        }

        for (name, class_name) in explicit_imports {
            if !catalog.is_known_class(&class_name) {
                return Err(Error::Mapping(format!(
                    "import {} refers to unknown class {}",
                    name, class_name
                )));
            }
            catalog.imports.insert(name, class_name);
        }

        Ok(catalog)
    }

    fn validate_entities(&self) -> Result<()> {
        for entity in &self.entities {
            let mut seen = HashSet::new();
            let mut current = entity;
            loop {
                if !seen.insert(current.name.as_str()) {
                    return Err(Error::Mapping(format!(
                        "circular superclass chain at {}",
                        entity.name
                    )));
                }
                match &current.superclass {
                    Some(superclass) => {
                        current = self.entity(superclass).ok_or_else(|| {
                            Error::Mapping(format!(
                                "superclass {} of {} is not a mapped entity",
                                superclass, current.name
                            ))
                        })?;
                    }
                    None => break,
                }
            }

            if current.identifier.is_none() {
                return Err(Error::Mapping(format!(
                    "entity {} has no identifier",
                    entity.name
                )));
            }

            for association in &entity.many_to_one {
                if self.entity(&association.target).is_none() {
                    return Err(Error::Mapping(format!(
                        "association {}.{} refers to unmapped entity {}",
                        entity.name, association.name, association.target
                    )));
                }
            }
        }
        Ok(())
    }

    fn add_collection(&mut self, collection: CollectionDef) -> Result<()> {
        if self.entity(collection.owner()).is_none() {
            return Err(Error::Mapping(format!(
                "collection {} is owned by unmapped entity {}",
                collection.role,
                collection.owner()
            )));
        }
        if let Some(element) = collection.element_entity() {
            if self.entity(element).is_none() {
                return Err(Error::Mapping(format!(
                    "collection {} has unmapped element entity {}",
                    collection.role, element
                )));
            }
        }
        if self.collection_index.contains_key(&collection.role) {
            return Err(Error::Mapping(format!(
                "duplicate collection mapping {}",
                collection.role
            )));
        }
        self.collection_index
            .insert(collection.role.clone(), self.collections.len());
        self.collections.push(collection);
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entity_index.get(name).map(|&i| &self.entities[i])
    }

    pub fn entities(&self) -> &[EntityDef] {
        &self.entities
    }

    pub fn collection(&self, role: &str) -> Option<&CollectionDef> {
        self.collection_index.get(role).map(|&i| &self.collections[i])
    }

    pub fn collections(&self) -> &[CollectionDef] {
        &self.collections
    }

    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Class name an import name stands for; the name itself if not imported.
    pub fn imported_class_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.imports.get(name).map(String::as_str).unwrap_or(name)
    }

    /// True for mapped entities and declared types.
    pub fn is_known_class(&self, name: &str) -> bool {
        self.types.contains_key(name) || self.entity_index.contains_key(name)
    }

    /// Look up an entity by entity name or import name.
    pub fn resolve_entity(&self, name: &str) -> Result<&EntityDef> {
        self.entity(self.imported_class_name(name))
            .ok_or_else(|| Error::Mapping(format!("{} is not mapped", name)))
    }

    /// True if `class` is `target` or one of its subtypes.
    pub fn is_assignable(&self, class: &str, target: &str) -> bool {
        let mut queue = VecDeque::from([class]);
        let mut seen = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(ty) = self.types.get(current) {
                queue.extend(ty.supertypes.iter().map(String::as_str));
            }
        }
        false
    }

    /// Entity names a query against `class_name` has to cover.
    ///
    /// Entities are visited in mapping order. An entity with explicit
    /// polymorphism is only returned when named exactly, and then alone.
    /// Subclasses whose mapped superclass is already covered are left out.
    /// An unknown class is returned as is.
    pub fn implementors(&self, class_name: &str) -> Vec<String> {
        if !self.is_known_class(class_name) {
            return vec![class_name.to_string()];
        }

        let mut results = Vec::new();
        for entity in &self.entities {
            let is_mapped_class = entity.name == class_name;
            if entity.explicit_polymorphism {
                if is_mapped_class {
                    return vec![class_name.to_string()];
                }
            } else if is_mapped_class {
                results.push(entity.name.clone());
            } else if self.is_assignable(&entity.name, class_name) {
                let assignable_superclass = entity
                    .superclass
                    .as_deref()
                    .is_some_and(|superclass| self.is_assignable(superclass, class_name));
                if !assignable_superclass {
                    results.push(entity.name.clone());
                }
            }
        }
        results
    }

    /// The entity and its mapped superclasses, most derived first.
    pub fn hierarchy<'a>(&'a self, entity: &'a EntityDef) -> Vec<&'a EntityDef> {
        let mut chain = vec![entity];
        let mut current = entity;
        while let Some(superclass) = current.superclass.as_deref().and_then(|s| self.entity(s)) {
            if chain.iter().any(|e| e.name == superclass.name) {
                break;
            }
            chain.push(superclass);
            current = superclass;
        }
        chain
    }

    /// Identifier of an entity, inherited from the root of its hierarchy.
    pub fn identifier<'a>(&'a self, entity: &'a EntityDef) -> Result<&'a IdentifierDef> {
        self.hierarchy(entity)
            .into_iter()
            .find_map(|e| e.identifier.as_ref())
            .ok_or_else(|| Error::Mapping(format!("entity {} has no identifier", entity.name)))
    }

    /// Entity declaring the identifier, i.e. the hierarchy root.
    pub fn root_entity<'a>(&'a self, entity: &'a EntityDef) -> &'a EntityDef {
        self.hierarchy(entity)
            .into_iter()
            .find(|e| e.identifier.is_some())
            .unwrap_or(entity)
    }

    pub fn find_property<'a>(&'a self, entity: &'a EntityDef, name: &str) -> Option<&'a PropertyDef> {
        self.hierarchy(entity).into_iter().find_map(|e| e.property(name))
    }

    pub fn find_many_to_one<'a>(&'a self, entity: &'a EntityDef, name: &str) -> Option<&'a ManyToOneDef> {
        self.hierarchy(entity)
            .into_iter()
            .find_map(|e| e.many_to_one(name))
    }

    /// Collection mapped on the entity or one of its superclasses.
    pub fn find_collection<'a>(&'a self, entity: &'a EntityDef, property: &str) -> Option<&'a CollectionDef> {
        self.hierarchy(entity)
            .into_iter()
            .find_map(|e| self.collection(&format!("{}.{}", e.name, property)))
    }

    /// All basic properties, superclass properties first.
    pub fn all_properties<'a>(&'a self, entity: &'a EntityDef) -> Vec<&'a PropertyDef> {
        self.hierarchy(entity)
            .into_iter()
            .rev()
            .flat_map(|e| e.properties.iter())
            .collect()
    }

    /// All many-to-one associations, superclass associations first.
    pub fn all_many_to_one<'a>(&'a self, entity: &'a EntityDef) -> Vec<&'a ManyToOneDef> {
        self.hierarchy(entity)
            .into_iter()
            .rev()
            .flat_map(|e| e.many_to_one.iter())
            .collect()
    }
}

impl ImplementorSource for Catalog {
    fn imported_class_name(&self, name: &str) -> Result<Option<String>> {
        let class_name = Catalog::imported_class_name(self, name);
        Ok(self
            .is_known_class(class_name)
            .then(|| class_name.to_string()))
    }

    fn implementors(&self, class_name: &str) -> Result<Vec<String>> {
        Ok(Catalog::implementors(self, class_name))
    }
}
