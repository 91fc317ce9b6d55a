//! Compiled accessor for one path shape
//!
//! A `Dereferencer` is a step table interpreted by a single dispatch loop. It
//! is shared by every path with the same canonical shape, so the concrete
//! path is passed to each operation and entry ids are read from it.

use std::sync::Arc;

use super::step::{Step, StepKind};
use crate::errors::{ArborError, Result};
use crate::model::{Identifier, Node, Record};
use crate::path::{Path, Segment};
use crate::schema::{Schema, TypeExpr};

#[derive(Debug)]
pub struct Dereferencer {
    schema: Arc<Schema>,
    steps: Vec<Step>,
    canonical: Path,
    target: TypeExpr,
}

impl Dereferencer {
    pub(crate) fn new(schema: Arc<Schema>, steps: Vec<Step>, canonical: Path) -> Self {
        let target = steps
            .last()
            .map(|s| s.result.clone())
            .unwrap_or_else(|| schema.root_type());
        Self {
            schema,
            steps,
            canonical,
            target,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Fully parameterized form shared by every path of this shape
    pub fn canonical_path(&self) -> &Path {
        &self.canonical
    }

    pub fn target_type(&self) -> &TypeExpr {
        &self.target
    }

    /// # Errors
    ///
    /// `NonexistentEntry` naming the first missing prefix of `path`,
    /// `IndefiniteReference` if an entry segment is a parameter, and user
    /// accessor failures unchanged.
    pub fn get(&self, root: &Node, path: &Path) -> Result<Node> {
        let mut current = root.clone();
        for (i, step) in self.steps.iter().enumerate() {
            current = self.hop(&current, step, path, i)?;
        }
        Ok(current)
    }

    /// Like [`get`](Self::get), with absence reported as `None`
    ///
    /// # Errors
    ///
    /// Everything `get` reports except `NonexistentEntry`.
    pub fn value_if_exists(&self, root: &Node, path: &Path) -> Result<Option<Node>> {
        match self.get(root, path) {
            Ok(v) => Ok(Some(v)),
            Err(ArborError::NonexistentEntry { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// New root with the node at `path` replaced by `value`
    ///
    /// Only the ancestors of the target are rebuilt. If nothing changes the
    /// original root is returned, pointer-identical.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for phantom fields and union cases, `TypeMismatch`
    /// if `value` does not conform, `NonexistentEntry` if an ancestor is
    /// missing, and user accessor failures unchanged.
    pub fn with(&self, root: &Node, path: &Path, value: Node) -> Result<Node> {
        match self.steps.last().map(|s| &s.kind) {
            Some(StepKind::PhantomField { .. }) => {
                return Err(ArborError::invalid_argument(
                    path,
                    "cannot replace a phantom field",
                ))
            }
            Some(StepKind::UnionCase { .. }) => {
                return Err(ArborError::invalid_argument(
                    path,
                    "cannot replace a union case directly; replace the union",
                ))
            }
            _ => {}
        }
        self.schema
            .check_value(&path.to_string(), &self.target, &value)?;
        if self.steps.is_empty() {
            return Ok(value);
        }

        let ancestors = self.ancestors(root, path)?;
        self.fold(root, path, &ancestors, self.steps.len(), value)
    }

    /// New root with the node at `path` removed
    ///
    /// Removing an absent entry, or a phantom field, returns the original
    /// root unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for the root, plain fields and union cases;
    /// `NonexistentEntry` if an ancestor is missing.
    pub fn without(&self, root: &Node, path: &Path) -> Result<Node> {
        let Some(last) = self.steps.last() else {
            return Err(ArborError::invalid_argument(path, "cannot delete the root"));
        };
        match &last.kind {
            StepKind::Field { .. } => {
                return Err(ArborError::invalid_argument(
                    path,
                    "cannot delete a plain field",
                ))
            }
            StepKind::UnionCase { .. } => {
                return Err(ArborError::invalid_argument(
                    path,
                    "cannot delete the selected case of a union",
                ))
            }
            StepKind::PhantomField { .. } => return Ok(root.clone()),
            _ => {}
        }

        let n = self.steps.len();
        let ancestors = self.ancestors(root, path)?;
        let parent = &ancestors[n - 1];
        let removed = self.remove(parent, last, path, n - 1)?;
        if removed.ptr_eq(parent) {
            return Ok(root.clone());
        }
        self.fold(root, path, &ancestors, n - 1, removed)
    }

    /// Nodes on the path from the root to the target's parent
    fn ancestors(&self, root: &Node, path: &Path) -> Result<Vec<Node>> {
        let n = self.steps.len();
        let mut ancestors = Vec::with_capacity(n);
        ancestors.push(root.clone());
        for i in 0..n.saturating_sub(1) {
            let next = self.hop(&ancestors[i], &self.steps[i], path, i)?;
            ancestors.push(next);
        }
        Ok(ancestors)
    }

    /// Rebuild levels `depth-1 ..= 0`, starting with `replacement` as the
    /// new child at `depth`
    fn fold(
        &self,
        root: &Node,
        path: &Path,
        ancestors: &[Node],
        depth: usize,
        mut replacement: Node,
    ) -> Result<Node> {
        for k in (0..depth).rev() {
            let parent = &ancestors[k];
            let rebuilt = self.put(parent, &self.steps[k], path, k, replacement)?;
            if rebuilt.ptr_eq(parent) {
                return Ok(root.clone());
            }
            replacement = rebuilt;
        }
        Ok(replacement)
    }

    fn hop(&self, node: &Node, step: &Step, path: &Path, i: usize) -> Result<Node> {
        let missing = || ArborError::nonexistent(path.truncated_to(i + 1));
        match &step.kind {
            StepKind::Field { index, .. } | StepKind::OptionalField { index, .. } => {
                self.record_at(node, step, path, i)?
                    .slot(*index)?
                    .ok_or_else(missing)
            }
            StepKind::PhantomField { .. } => Err(missing()),
            StepKind::CatalogEntry => {
                let id = entry_id(path, i)?;
                match node {
                    Node::Catalog(c) => c.get(id).cloned().map(Node::Record).ok_or_else(missing),
                    other => Err(unexpected(other, step, path, i)),
                }
            }
            StepKind::ListingEntry => {
                let id = entry_id(path, i)?;
                match node {
                    Node::Listing(l) if l.contains(id) => Ok(Node::ListingEntry),
                    Node::Listing(_) => Err(missing()),
                    other => Err(unexpected(other, step, path, i)),
                }
            }
            StepKind::SideTableEntry => {
                let id = entry_id(path, i)?;
                match node {
                    Node::SideTable(t) => t.get(id).cloned().ok_or_else(missing),
                    other => Err(unexpected(other, step, path, i)),
                }
            }
            StepKind::UnionCase { tag } => match node {
                Node::Union(u) if u.tag() == tag => Ok(u.case().clone()),
                Node::Union(_) => Err(missing()),
                other => Err(unexpected(other, step, path, i)),
            },
        }
    }

    fn put(&self, parent: &Node, step: &Step, path: &Path, i: usize, child: Node) -> Result<Node> {
        match &step.kind {
            StepKind::Field { index, .. } | StepKind::OptionalField { index, .. } => self
                .record_at(parent, step, path, i)?
                .with_slot(*index, Some(child))
                .map(Node::Record),
            StepKind::PhantomField { .. } => Err(ArborError::invalid_argument(
                path.truncated_to(i + 1),
                "phantom fields hold no value",
            )),
            StepKind::CatalogEntry => {
                let id = entry_id(path, i)?;
                let (Node::Catalog(catalog), Node::Record(entity)) = (parent, &child) else {
                    return Err(unexpected(parent, step, path, i));
                };
                if entity.id().map(Identifier::as_str) != Some(id) {
                    return Err(ArborError::invalid_argument(
                        path.truncated_to(i + 1),
                        format!(
                            "entity id {:?} does not match its path segment",
                            entity.id().map(Identifier::as_str).unwrap_or_default()
                        ),
                    ));
                }
                catalog.with_entity(entity.clone()).map(Node::Catalog)
            }
            StepKind::ListingEntry => match parent {
                Node::Listing(l) => Ok(Node::Listing(l.with_id(entry_identifier(path, i)?))),
                other => Err(unexpected(other, step, path, i)),
            },
            StepKind::SideTableEntry => match parent {
                Node::SideTable(t) => Ok(Node::SideTable(
                    t.with_entry(entry_identifier(path, i)?, child),
                )),
                other => Err(unexpected(other, step, path, i)),
            },
            StepKind::UnionCase { tag } => match parent {
                Node::Union(u) if u.tag() == tag => Ok(Node::Union(u.with_case(child))),
                Node::Union(_) => Err(ArborError::nonexistent(path.truncated_to(i + 1))),
                other => Err(unexpected(other, step, path, i)),
            },
        }
    }

    fn remove(&self, parent: &Node, step: &Step, path: &Path, i: usize) -> Result<Node> {
        match &step.kind {
            StepKind::OptionalField { index, .. } => self
                .record_at(parent, step, path, i)?
                .with_slot(*index, None)
                .map(Node::Record),
            StepKind::CatalogEntry => match parent {
                Node::Catalog(c) => Ok(Node::Catalog(c.without_id(entry_id(path, i)?))),
                other => Err(unexpected(other, step, path, i)),
            },
            StepKind::ListingEntry => match parent {
                Node::Listing(l) => Ok(Node::Listing(l.without_id(entry_id(path, i)?))),
                other => Err(unexpected(other, step, path, i)),
            },
            StepKind::SideTableEntry => match parent {
                Node::SideTable(t) => Ok(Node::SideTable(t.without_id(entry_id(path, i)?))),
                other => Err(unexpected(other, step, path, i)),
            },
            StepKind::Field { .. } | StepKind::PhantomField { .. } | StepKind::UnionCase { .. } => {
                Err(ArborError::invalid_argument(
                    path.truncated_to(i + 1),
                    format!("cannot remove a {}", step.kind.label()),
                ))
            }
        }
    }

    fn record_at<'a>(
        &self,
        node: &'a Node,
        step: &Step,
        path: &Path,
        i: usize,
    ) -> Result<&'a Record> {
        node.as_record()
            .ok_or_else(|| unexpected(node, step, path, i))
    }
}

fn entry_id(path: &Path, i: usize) -> Result<&str> {
    match path.segment(i) {
        Some(Segment::Name(n)) => Ok(n),
        Some(Segment::Param(_)) => Err(ArborError::IndefiniteReference {
            path: path.to_string(),
        }),
        None => Err(ArborError::Internal {
            message: format!("path {} is shorter than its accessor", path),
        }),
    }
}

fn entry_identifier(path: &Path, i: usize) -> Result<Identifier> {
    Identifier::new(entry_id(path, i)?)
}

/// The tree disagrees with the compiled shape; only reachable with nodes
/// built outside the schema's checks
fn unexpected(node: &Node, step: &Step, path: &Path, i: usize) -> ArborError {
    ArborError::type_mismatch(
        path.truncated_to(i),
        format!("container for a {}", step.kind.label()),
        node.describe(),
    )
}

