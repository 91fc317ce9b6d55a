use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::binding::BindingEnvironment;
use crate::compiler::{Compiler, Dereferencer};
use crate::errors::{ArborError, Result};
use crate::model::{Identifier, Node};
use crate::path::{Path, Segment};
use crate::schema::TypeExpr;
use crate::session::ReadSession;

/// Typed handle on a location in the state tree
///
/// Built only through a [`Compiler`], so its target type has always been
/// checked against the schema. Two references are equal when they have the
/// same path and root type.
#[derive(Clone)]
pub struct Reference {
    path: Path,
    accessor: Arc<Dereferencer>,
    compiler: Arc<Compiler>,
}

impl Reference {
    pub(crate) fn new(path: Path, accessor: Arc<Dereferencer>, compiler: Arc<Compiler>) -> Self {
        Self {
            path,
            accessor,
            compiler,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn target_type(&self) -> &TypeExpr {
        self.accessor.target_type()
    }

    pub fn root_type_name(&self) -> &str {
        self.compiler.schema().root_name()
    }

    pub fn compiler(&self) -> &Arc<Compiler> {
        &self.compiler
    }

    pub fn accessor(&self) -> &Arc<Dereferencer> {
        &self.accessor
    }

    pub fn is_definite(&self) -> bool {
        self.path.is_definite()
    }

    /// Value in the session's snapshot
    ///
    /// # Errors
    ///
    /// `IndefiniteReference` for unbound parameters, `NonexistentEntry` when
    /// absent, and user accessor failures unchanged.
    pub fn value(&self, session: &ReadSession) -> Result<Node> {
        self.get(session.root())
    }

    /// # Errors
    ///
    /// As for [`value`](Self::value), except absence is `Ok(None)`.
    pub fn value_if_exists(&self, session: &ReadSession) -> Result<Option<Node>> {
        self.value_if_exists_in(session.root())
    }

    /// # Errors
    ///
    /// As for [`value_if_exists`](Self::value_if_exists).
    pub fn exists(&self, session: &ReadSession) -> Result<bool> {
        Ok(self.value_if_exists(session)?.is_some())
    }

    /// Resolve against an explicit root
    ///
    /// # Errors
    ///
    /// As for [`value`](Self::value).
    pub fn get(&self, root: &Node) -> Result<Node> {
        self.require_definite()?;
        self.accessor.get(root, &self.path)
    }

    /// # Errors
    ///
    /// As for [`value_if_exists`](Self::value_if_exists).
    pub fn value_if_exists_in(&self, root: &Node) -> Result<Option<Node>> {
        self.require_definite()?;
        self.accessor.value_if_exists(root, &self.path)
    }

    /// New root with this location replaced
    ///
    /// # Errors
    ///
    /// See [`Dereferencer::with`].
    pub fn with(&self, root: &Node, value: Node) -> Result<Node> {
        self.require_definite()?;
        self.accessor.with(root, &self.path, value)
    }

    /// New root with this location removed
    ///
    /// # Errors
    ///
    /// See [`Dereferencer::without`].
    pub fn without(&self, root: &Node) -> Result<Node> {
        self.require_definite()?;
        self.accessor.without(root, &self.path)
    }

    /// Reference one segment deeper
    ///
    /// # Errors
    ///
    /// Compile errors, or `TypeMismatch` against `expected`.
    pub fn then(&self, segment: Segment, expected: &TypeExpr) -> Result<Reference> {
        self.compiler
            .reference(self.path.then_segment(segment), expected)
    }

    /// # Errors
    ///
    /// Compile errors, or `TypeMismatch` against `expected`.
    pub fn then_id(&self, id: &Identifier, expected: &TypeExpr) -> Result<Reference> {
        self.then(Segment::from(id.clone()), expected)
    }

    /// Reference to the parent location
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for the root reference; `TypeMismatch` against
    /// `expected`.
    pub fn enclosing(&self, expected: &TypeExpr) -> Result<Reference> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| ArborError::invalid_argument(&self.path, "the root has no parent"))?;
        self.compiler.reference(parent, expected)
    }

    /// Reference to the first `len` segments of this one, whatever its type
    ///
    /// # Errors
    ///
    /// Never for prefixes of a compiled path; kept fallible for the cache.
    pub fn truncated_to(&self, len: usize) -> Result<Reference> {
        self.compiler
            .structural_reference(self.path.truncated_to(len))
    }

    /// # Errors
    ///
    /// Compile errors for the bound path.
    pub fn bound_by(&self, env: &BindingEnvironment) -> Result<Reference> {
        self.rebound(self.path.bound_by(env))
    }

    /// # Errors
    ///
    /// `InvalidArgument` if more ids than parameters are given.
    pub fn bound_to(&self, ids: &[Identifier]) -> Result<Reference> {
        self.rebound(self.path.bound_to(ids)?)
    }

    pub fn parameters_from(&self, definite: &Path) -> Option<BindingEnvironment> {
        self.path.parameters_from(definite)
    }

    fn rebound(&self, path: Path) -> Result<Reference> {
        if path == self.path {
            return Ok(self.clone());
        }
        let accessor = self.compiler.accessor(&path)?;
        Ok(Reference::new(path, accessor, Arc::clone(&self.compiler)))
    }

    fn require_definite(&self) -> Result<()> {
        if self.path.is_definite() {
            Ok(())
        } else {
            Err(ArborError::IndefiniteReference {
                path: self.path.to_string(),
            })
        }
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.root_type_name() == other.root_type_name()
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.root_type_name().hash(state);
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reference<{}>({}{})",
            self.target_type(),
            self.root_type_name(),
            self.path
        )
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}
