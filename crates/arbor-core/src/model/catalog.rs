use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::identifier::Identifier;
use super::record::Record;
use crate::errors::{ArborError, Result};

/// Ordered, unique-keyed collection of entities
///
/// Keys are the entities' own ids. Insertion order is preserved; replacing an
/// entity keeps its position.
#[derive(Clone, Default)]
pub struct Catalog(Arc<IndexMap<Identifier, Record>>);

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// `InvalidArgument` if an entity has no `id` field, or if two entities
    /// share an id.
    pub fn of(entities: impl IntoIterator<Item = Record>) -> Result<Self> {
        let mut map = IndexMap::new();
        for entity in entities {
            let id = entity_id(&entity)?;
            if map.contains_key(&id) {
                return Err(ArborError::invalid_argument(
                    entity.type_name(),
                    format!("duplicate catalog id {:?}", id.as_str()),
                ));
            }
            map.insert(id, entity);
        }
        Ok(Catalog(Arc::new(map)))
    }

    /// Copy with `entity` added or replaced; a no-op if an equal entity is
    /// already present under the same id
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the entity has no `id` field.
    pub fn with_entity(&self, entity: Record) -> Result<Self> {
        let id = entity_id(&entity)?;
        if let Some(existing) = self.0.get(&id) {
            if existing == &entity {
                return Ok(self.clone());
            }
        }
        let mut map = (*self.0).clone();
        map.insert(id, entity);
        Ok(Catalog(Arc::new(map)))
    }

    pub fn without_id(&self, id: &str) -> Self {
        if !self.0.contains_key(id) {
            return self.clone();
        }
        let mut map = (*self.0).clone();
        map.shift_remove(id);
        Catalog(Arc::new(map))
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &Identifier> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ptr_eq(&self, other: &Catalog) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn entity_id(entity: &Record) -> Result<Identifier> {
    entity.id().cloned().ok_or_else(|| {
        ArborError::invalid_argument(entity.type_name(), "catalog entries need an id field")
    })
}

impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.len() == other.len()
                && self
                    .0
                    .iter()
                    .zip(other.0.iter())
                    .all(|(a, b)| a.0 == b.0 && a.1 == b.1))
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}
