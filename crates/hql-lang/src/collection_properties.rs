//! Pseudo-properties that may follow a collection-valued path.
//!
//! `d.kittens.size`, `maxIndex(d.kittens)` and friends are not mapped
//! properties; they are resolved against the collection itself. Lookups are
//! case-insensitive and return the canonical spelling.

use std::collections::HashMap;

pub const COLLECTION_ELEMENTS: &str = "elements";
pub const COLLECTION_INDICES: &str = "indices";
pub const COLLECTION_SIZE: &str = "size";
pub const COLLECTION_MAX_INDEX: &str = "maxIndex";
pub const COLLECTION_MIN_INDEX: &str = "minIndex";
pub const COLLECTION_MAX_ELEMENT: &str = "maxElement";
pub const COLLECTION_MIN_ELEMENT: &str = "minElement";
pub const COLLECTION_INDEX: &str = "index";

const COLLECTION_INDEX_LOWER: &str = "index";

/// Immutable table of collection pseudo-properties keyed by lower-case name.
#[derive(Debug, Clone)]
pub struct CollectionProperties {
    by_lower_name: HashMap<String, &'static str>,
}

impl CollectionProperties {
    /// The standard HQL pseudo-properties.
    pub fn standard() -> Self {
        let by_lower_name = [
            COLLECTION_ELEMENTS,
            COLLECTION_INDICES,
            COLLECTION_SIZE,
            COLLECTION_MAX_INDEX,
            COLLECTION_MIN_INDEX,
            COLLECTION_MAX_ELEMENT,
            COLLECTION_MIN_ELEMENT,
            COLLECTION_INDEX,
        ]
        .into_iter()
        .map(|name| (name.to_lowercase(), name))
        .collect();

        Self { by_lower_name }
    }

    /// True for every pseudo-property except `index`.
    ///
    /// `index` is resolved by the indexed-collection join mapping, not by the
    /// generic collection property mapping, so it must not be claimed here.
    pub fn is_collection_property(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        if key == COLLECTION_INDEX_LOWER {
            return false;
        }
        self.by_lower_name.contains_key(&key)
    }

    /// True for every pseudo-property, `index` included.
    pub fn is_any_collection_property(&self, name: &str) -> bool {
        self.by_lower_name.contains_key(&name.to_lowercase())
    }

    /// Canonical spelling of `name`, or `None` if it is not a pseudo-property.
    pub fn normalized_property_name(&self, name: &str) -> Option<&'static str> {
        self.by_lower_name.get(&name.to_lowercase()).copied()
    }

    /// All canonical names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_lower_name.values().copied()
    }
}

impl Default for CollectionProperties {
    fn default() -> Self {
        Self::standard()
    }
}
