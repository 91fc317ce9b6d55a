use std::sync::Arc;

use indexmap::IndexMap;

use super::identifier::Identifier;
use super::listing::require_catalog_domain;
use super::node::Node;
use super::record::Record;
use crate::errors::{ArborError, Result};
use crate::reference::Reference;
use crate::session::ReadSession;

/// Ordered map keyed by ids drawn from a domain catalog
#[derive(Debug, Clone)]
pub struct SideTable {
    domain: Reference,
    entries: Arc<IndexMap<Identifier, Node>>,
}

impl SideTable {
    /// # Errors
    ///
    /// `TypeMismatch` if `domain` does not refer to a catalog.
    pub fn empty(domain: Reference) -> Result<Self> {
        Self::of(domain, [])
    }

    /// # Errors
    ///
    /// `TypeMismatch` if `domain` does not refer to a catalog.
    pub fn of(
        domain: Reference,
        entries: impl IntoIterator<Item = (Identifier, Node)>,
    ) -> Result<Self> {
        require_catalog_domain(&domain)?;
        Ok(SideTable {
            domain,
            entries: Arc::new(entries.into_iter().collect()),
        })
    }

    pub fn domain(&self) -> &Reference {
        &self.domain
    }

    /// Copy with the entry for `id` set; replacement keeps its position
    pub fn with_entry(&self, id: Identifier, value: Node) -> Self {
        if let Some(existing) = self.entries.get(&id) {
            if existing.ptr_eq(&value) {
                return self.clone();
            }
        }
        let mut entries = (*self.entries).clone();
        entries.insert(id, value);
        SideTable {
            domain: self.domain.clone(),
            entries: Arc::new(entries),
        }
    }

    pub fn without_id(&self, id: &str) -> Self {
        if !self.entries.contains_key(id) {
            return self.clone();
        }
        let mut entries = (*self.entries).clone();
        entries.shift_remove(id);
        SideTable {
            domain: self.domain.clone(),
            entries: Arc::new(entries),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &Identifier> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &Node)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ptr_eq(&self, other: &SideTable) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries) && self.domain == other.domain
    }

    /// Resolve a key to its entity in the domain catalog
    ///
    /// # Errors
    ///
    /// `NonexistentEntry` if the domain lacks the key.
    pub fn key_in(&self, session: &ReadSession, id: &str) -> Result<Record> {
        let domain = self.domain.value(session)?;
        domain
            .as_catalog()
            .and_then(|c| c.get(id))
            .cloned()
            .ok_or_else(|| ArborError::nonexistent(format!("{}/{}", self.domain.path(), id)))
    }
}

impl PartialEq for SideTable {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a.0 == b.0 && a.1 == b.1)
    }
}
