use std::sync::Arc;

use indexmap::IndexSet;

use super::identifier::Identifier;
use super::record::Record;
use crate::errors::{ArborError, Result};
use crate::reference::Reference;
use crate::schema::TypeExpr;
use crate::session::ReadSession;

/// Ordered set of ids pointing into a catalog elsewhere in the tree
///
/// Entries may dangle: the domain catalog need not contain them. A dangling
/// entry only becomes an error when it is resolved.
#[derive(Debug, Clone)]
pub struct Listing {
    domain: Reference,
    ids: Arc<IndexSet<Identifier>>,
}

impl Listing {
    /// # Errors
    ///
    /// `TypeMismatch` if `domain` does not refer to a catalog.
    pub fn empty(domain: Reference) -> Result<Self> {
        Self::of(domain, [])
    }

    /// # Errors
    ///
    /// `TypeMismatch` if `domain` does not refer to a catalog.
    pub fn of(domain: Reference, ids: impl IntoIterator<Item = Identifier>) -> Result<Self> {
        require_catalog_domain(&domain)?;
        Ok(Listing {
            domain,
            ids: Arc::new(ids.into_iter().collect()),
        })
    }

    pub fn domain(&self) -> &Reference {
        &self.domain
    }

    /// Copy with `id` added at the end; a no-op if already present
    pub fn with_id(&self, id: Identifier) -> Self {
        if self.ids.contains(&id) {
            return self.clone();
        }
        let mut ids = (*self.ids).clone();
        ids.insert(id);
        Listing {
            domain: self.domain.clone(),
            ids: Arc::new(ids),
        }
    }

    pub fn without_id(&self, id: &str) -> Self {
        if !self.ids.contains(id) {
            return self.clone();
        }
        let mut ids = (*self.ids).clone();
        ids.shift_remove(id);
        Listing {
            domain: self.domain.clone(),
            ids: Arc::new(ids),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &Identifier> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ptr_eq(&self, other: &Listing) -> bool {
        Arc::ptr_eq(&self.ids, &other.ids) && self.domain == other.domain
    }

    /// Resolve an entry through the domain catalog
    ///
    /// # Errors
    ///
    /// `NonexistentEntry` if the id is not listed or the domain lacks it.
    pub fn value_in(&self, session: &ReadSession, id: &str) -> Result<Record> {
        self.value_if_exists_in(session, id)?.ok_or_else(|| {
            ArborError::nonexistent(format!("{}/{}", self.domain.path(), id))
        })
    }

    /// # Errors
    ///
    /// Failures other than absence, such as getter errors along the domain path.
    pub fn value_if_exists_in(&self, session: &ReadSession, id: &str) -> Result<Option<Record>> {
        if !self.contains(id) {
            return Ok(None);
        }
        let Some(domain) = self.domain.value_if_exists(session)? else {
            return Ok(None);
        };
        Ok(domain.as_catalog().and_then(|c| c.get(id)).cloned())
    }
}

pub(crate) fn require_catalog_domain(domain: &Reference) -> Result<()> {
    match domain.target_type() {
        TypeExpr::Catalog(_) => Ok(()),
        other => Err(ArborError::type_mismatch(
            domain.path(),
            "Catalog",
            other,
        )),
    }
}

impl PartialEq for Listing {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.ids.len() == other.ids.len()
            && self.ids.iter().eq(other.ids.iter())
    }
}
