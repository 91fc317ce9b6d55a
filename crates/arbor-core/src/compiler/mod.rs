//! Dereferencer compiler
//!
//! Turns a path into a [`Dereferencer`] by classifying the current type at
//! every segment. Accessors are cached twice in bounded LRU caches: by the
//! exact path, and by the canonical "fully parameterized" path, so that every
//! concrete instantiation of one shape shares a single compiled accessor.

mod dereferencer;
mod step;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

pub use dereferencer::Dereferencer;
pub use step::{Step, StepKind};

use crate::errors::{ArborError, Result};
use crate::path::{Path, Segment};
use crate::reference::Reference;
use crate::schema::{FieldKind, NamedType, Schema, TypeExpr};

pub const DEFAULT_ACCESSOR_CACHE_CAPACITY: usize = 1024;

struct AccessorCache {
    by_path: LruCache<Path, Arc<Dereferencer>>,
    by_shape: LruCache<Path, Arc<Dereferencer>>,
}

/// Compiler for one schema
///
/// Owned by whoever builds the tree for that schema and handed to every
/// reference it creates.
pub struct Compiler {
    schema: Arc<Schema>,
    cache: Mutex<AccessorCache>,
}

impl Compiler {
    pub fn new(schema: Arc<Schema>, capacity: NonZeroUsize) -> Arc<Self> {
        Arc::new(Self {
            schema,
            cache: Mutex::new(AccessorCache {
                by_path: LruCache::new(capacity),
                by_shape: LruCache::new(capacity),
            }),
        })
    }

    pub fn with_default_capacity(schema: Arc<Schema>) -> Arc<Self> {
        let capacity = NonZeroUsize::new(DEFAULT_ACCESSOR_CACHE_CAPACITY)
            .unwrap_or(NonZeroUsize::MIN);
        Self::new(schema, capacity)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Compiled accessor for `path`, from cache when possible
    ///
    /// # Errors
    ///
    /// Type errors when a segment cannot be classified against the schema.
    pub fn accessor(&self, path: &Path) -> Result<Arc<Dereferencer>> {
        if let Some(hit) = self.cache.lock().by_path.get(path) {
            return Ok(Arc::clone(hit));
        }

        let (steps, canonical) = self.compile(path)?;

        let mut cache = self.cache.lock();
        let accessor = match cache.by_shape.get(&canonical) {
            Some(shared) => Arc::clone(shared),
            None => {
                let fresh = Arc::new(Dereferencer::new(
                    Arc::clone(&self.schema),
                    steps,
                    canonical.clone(),
                ));
                tracing::trace!(path = %path, canonical = %canonical, "compiled accessor");
                cache.by_shape.put(canonical, Arc::clone(&fresh));
                fresh
            }
        };
        cache.by_path.put(path.clone(), Arc::clone(&accessor));
        Ok(accessor)
    }

    /// # Errors
    ///
    /// Type errors, as for [`accessor`](Self::accessor).
    pub fn canonical_path(&self, path: &Path) -> Result<Path> {
        Ok(self.accessor(path)?.canonical_path().clone())
    }

    /// Reference to `path`, checked against the expected target type
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the structural type at `path` differs from
    /// `expected`, and any compile error for the path.
    pub fn reference(self: &Arc<Self>, path: Path, expected: &TypeExpr) -> Result<Reference> {
        let accessor = self.accessor(&path)?;
        if accessor.target_type() != expected {
            return Err(ArborError::type_mismatch(
                &path,
                expected,
                accessor.target_type(),
            ));
        }
        Ok(Reference::new(path, accessor, Arc::clone(self)))
    }

    /// Reference whose target type is whatever `path` structurally leads to
    ///
    /// # Errors
    ///
    /// Compile errors for the path.
    pub fn structural_reference(self: &Arc<Self>, path: Path) -> Result<Reference> {
        let accessor = self.accessor(&path)?;
        Ok(Reference::new(path, accessor, Arc::clone(self)))
    }

    /// # Errors
    ///
    /// `InvalidPath` or compile errors for `text`.
    pub fn parse_reference(
        self: &Arc<Self>,
        text: &str,
        expected: &TypeExpr,
    ) -> Result<Reference> {
        self.reference(Path::parse(text)?, expected)
    }

    pub fn root_reference(self: &Arc<Self>) -> Result<Reference> {
        self.structural_reference(Path::empty())
    }

    /// Number of distinct compiled shapes currently cached
    pub fn cached_shapes(&self) -> usize {
        self.cache.lock().by_shape.len()
    }

    fn compile(&self, path: &Path) -> Result<(Vec<Step>, Path)> {
        let mut ty = self.schema.root_type();
        let mut steps = Vec::with_capacity(path.len());
        let mut canonical = Vec::with_capacity(path.len());
        let mut placeholders: HashMap<String, usize> = HashMap::new();

        for (i, segment) in path.segments().iter().enumerate() {
            let at = || path.truncated_to(i).to_string();
            let unknown = |type_name: &dyn std::fmt::Display| ArborError::UnknownSegment {
                path: at(),
                segment: segment.to_string(),
                type_name: type_name.to_string(),
            };

            let (kind, result) = match &ty {
                TypeExpr::Named(name) => match self.schema.named(name) {
                    Some(NamedType::Record(record)) => {
                        let field_name = segment.as_name().ok_or_else(|| unknown(name))?;
                        let index = record.field_index(field_name).ok_or_else(|| unknown(name))?;
                        let field = &record.fields()[index];
                        let name = field.name.clone();
                        let kind = match field.kind {
                            FieldKind::Plain => StepKind::Field { index, name },
                            FieldKind::Optional => StepKind::OptionalField { index, name },
                            FieldKind::Phantom => StepKind::PhantomField { index, name },
                        };
                        (kind, field.ty.clone())
                    }
                    Some(NamedType::Union(union)) => {
                        let tag = segment.as_name().ok_or_else(|| unknown(name))?;
                        let case = union.case_type(tag).ok_or_else(|| ArborError::UnknownTag {
                            path: at(),
                            tag: tag.to_string(),
                            union_name: name.clone(),
                        })?;
                        (
                            StepKind::UnionCase {
                                tag: tag.to_string(),
                            },
                            case.clone(),
                        )
                    }
                    None => {
                        return Err(ArborError::UnknownType {
                            type_name: name.clone(),
                        })
                    }
                },
                TypeExpr::Catalog(entry) => (StepKind::CatalogEntry, (**entry).clone()),
                TypeExpr::Listing(_) => (StepKind::ListingEntry, TypeExpr::ListingEntry),
                TypeExpr::SideTable(_, value) => (StepKind::SideTableEntry, (**value).clone()),
                TypeExpr::Scalar(_) | TypeExpr::ListingEntry => return Err(unknown(&ty)),
            };

            let canonical_segment = if kind.is_entry() {
                let base = ty
                    .entry_key_type()
                    .map(TypeExpr::placeholder_name)
                    .unwrap_or_else(|| "entry".to_string());
                let count = placeholders.entry(base.clone()).or_insert(0);
                *count += 1;
                let name = if *count == 1 {
                    base
                } else {
                    format!("{}{}", base, count)
                };
                Segment::Param(name)
            } else {
                segment.clone()
            };
            canonical.push(canonical_segment);

            steps.push(Step {
                kind,
                result: result.clone(),
            });
            ty = result;
        }

        Ok((steps, Path::from_segments(canonical)))
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("root", &self.schema.root_name())
            .field("cached_shapes", &self.cached_shapes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScalarKind;
    use crate::schema::{RecordType, UnionType};

    fn compiler() -> Arc<Compiler> {
        let child = RecordType::builder("Child")
            .id_field()
            .field("label", TypeExpr::scalar(ScalarKind::Str))
            .field("children", TypeExpr::catalog_of("Child"))
            .build()
            .unwrap();
        let circle = RecordType::builder("Circle")
            .field("radius", TypeExpr::scalar(ScalarKind::Int))
            .build()
            .unwrap();
        let shape = UnionType::builder("Shape")
            .case("circle", TypeExpr::named("Circle"))
            .build()
            .unwrap();
        let root = RecordType::builder("Root")
            .field("children", TypeExpr::catalog_of("Child"))
            .field("favorites", TypeExpr::listing_of("Child"))
            .optional("shape", TypeExpr::named("Shape"))
            .phantom("legacy", TypeExpr::scalar(ScalarKind::Str))
            .build()
            .unwrap();
        let schema = Schema::builder("Root")
            .record(root)
            .record(child)
            .record(circle)
            .union(shape)
            .build()
            .unwrap();
        Compiler::with_default_capacity(schema)
    }

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn test_step_classification() {
        let c = compiler();
        let kinds: Vec<StepKind> = c
            .accessor(&p("/children/c1/label"))
            .unwrap()
            .steps()
            .iter()
            .map(|s| s.kind.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::Field {
                    index: 0,
                    name: "children".to_string()
                },
                StepKind::CatalogEntry,
                StepKind::Field {
                    index: 1,
                    name: "label".to_string()
                },
            ]
        );

        let union = c.accessor(&p("/shape/circle/radius")).unwrap();
        assert_eq!(
            union.steps()[1].kind,
            StepKind::UnionCase {
                tag: "circle".to_string()
            }
        );
        assert_eq!(union.target_type(), &TypeExpr::scalar(ScalarKind::Int));
    }

    #[test]
    fn test_canonical_placeholders_disambiguate() {
        let c = compiler();
        assert_eq!(
            c.canonical_path(&p("/children/a/children/b/label")).unwrap(),
            p("/children/-child-/children/-child2-/label")
        );
        assert_eq!(
            c.canonical_path(&p("/favorites/x")).unwrap(),
            p("/favorites/-child-")
        );
    }

    #[test]
    fn test_same_shape_shares_accessor() {
        let c = compiler();
        let a = c.accessor(&p("/children/a/label")).unwrap();
        let b = c.accessor(&p("/children/b/label")).unwrap();
        let param = c.accessor(&p("/children/-x-/label")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &param));
        assert_eq!(c.cached_shapes(), 1);
    }

    #[test]
    fn test_type_errors() {
        let c = compiler();
        assert!(c.accessor(&p("/nope")).unwrap_err().is_type_error());
        assert!(matches!(
            c.accessor(&p("/shape/square")),
            Err(ArborError::UnknownTag { .. })
        ));
        assert!(c.accessor(&p("/children/c1/label/deeper")).unwrap_err().is_type_error());
        assert!(c.accessor(&p("/-x-")).unwrap_err().is_type_error());

        let err = c
            .reference(p("/children/c1"), &TypeExpr::scalar(ScalarKind::Str))
            .unwrap_err();
        assert!(matches!(err, ArborError::TypeMismatch { .. }));
    }

    #[test]
    fn test_empty_path_is_identity() {
        let c = compiler();
        let root = c.accessor(&Path::empty()).unwrap();
        assert!(root.steps().is_empty());
        assert_eq!(root.target_type(), &TypeExpr::named("Root"));
    }

    #[test]
    fn test_bounded_cache_evicts() {
        let c = Compiler::new(
            Arc::clone(compiler().schema()),
            NonZeroUsize::new(1).unwrap(),
        );
        c.accessor(&p("/children")).unwrap();
        c.accessor(&p("/favorites")).unwrap();
        assert_eq!(c.cached_shapes(), 1);
    }
}
