//! Explicit type tables for the state tree
//!
//! A [`Schema`] names the root record type and every record and union type
//! reachable from it. It is the only source of structural information the
//! compiler uses; nothing is discovered at run time.

mod record_type;
mod types;

use std::sync::Arc;

use indexmap::IndexMap;

pub use record_type::{
    ConstructorCheck, FieldDef, FieldGetter, RecordType, RecordTypeBuilder, UnionType,
    UnionTypeBuilder, ID_FIELD,
};
pub use types::{FieldKind, TypeExpr};

use crate::errors::{ArborError, Result};
use crate::model::Node;

#[derive(Debug, Clone)]
pub enum NamedType {
    Record(Arc<RecordType>),
    Union(Arc<UnionType>),
}

impl NamedType {
    pub fn name(&self) -> &str {
        match self {
            NamedType::Record(r) => r.name(),
            NamedType::Union(u) => u.name(),
        }
    }
}

#[derive(Debug)]
pub struct Schema {
    root: String,
    types: IndexMap<String, NamedType>,
}

impl Schema {
    pub fn builder(root: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            root: root.into(),
            types: Vec::new(),
        }
    }

    pub fn root_name(&self) -> &str {
        &self.root
    }

    pub fn root_type(&self) -> TypeExpr {
        TypeExpr::Named(self.root.clone())
    }

    pub fn named(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    pub fn record_type(&self, name: &str) -> Option<&Arc<RecordType>> {
        match self.types.get(name) {
            Some(NamedType::Record(r)) => Some(r),
            _ => None,
        }
    }

    pub fn union_type(&self, name: &str) -> Option<&Arc<UnionType>> {
        match self.types.get(name) {
            Some(NamedType::Union(u)) => Some(u),
            _ => None,
        }
    }

    /// Shallow conformance check of `node` against `ty`
    ///
    /// Checks the node's own shape and, for containers and unions, the type
    /// of their immediate contents. Deeper levels were checked when they were
    /// built.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` naming `at` when the node does not conform.
    pub fn check_value(&self, at: &str, ty: &TypeExpr, node: &Node) -> Result<()> {
        let mismatch = || ArborError::type_mismatch(at, ty, node.describe());
        match (ty, node) {
            (TypeExpr::Scalar(kind), Node::Scalar(s)) if s.kind() == *kind => Ok(()),
            (TypeExpr::Named(name), Node::Record(r)) if r.type_name() == name => Ok(()),
            (TypeExpr::Named(name), Node::Union(u)) => {
                let union = self.union_type(name).ok_or_else(mismatch)?;
                let case_ty = union.case_type(u.tag()).ok_or_else(|| ArborError::UnknownTag {
                    path: at.to_string(),
                    tag: u.tag().to_string(),
                    union_name: name.clone(),
                })?;
                self.check_value(at, case_ty, u.case())
            }
            (TypeExpr::Catalog(entry), Node::Catalog(c)) => {
                let entry_name = entry.name().unwrap_or_default();
                match c.iter().find(|e| e.type_name() != entry_name) {
                    Some(bad) => Err(ArborError::type_mismatch(at, entry, bad.type_name())),
                    None => Ok(()),
                }
            }
            (TypeExpr::Listing(entry), Node::Listing(l)) => {
                self.check_domain(at, entry, l.domain().target_type())
            }
            (TypeExpr::SideTable(key, value), Node::SideTable(t)) => {
                self.check_domain(at, key, t.domain().target_type())?;
                for (id, v) in t.iter() {
                    self.check_value(&format!("{}/{}", at.trim_end_matches('/'), id), value, v)?;
                }
                Ok(())
            }
            (TypeExpr::ListingEntry, Node::ListingEntry) => Ok(()),
            _ => Err(mismatch()),
        }
    }

    fn check_domain(&self, at: &str, entry: &TypeExpr, domain: &TypeExpr) -> Result<()> {
        match domain {
            TypeExpr::Catalog(domain_entry) if **domain_entry == *entry => Ok(()),
            other => Err(ArborError::type_mismatch(
                at,
                TypeExpr::Catalog(Box::new(entry.clone())),
                other,
            )),
        }
    }
}

pub struct SchemaBuilder {
    root: String,
    types: Vec<NamedType>,
}

impl SchemaBuilder {
    pub fn record(mut self, ty: Arc<RecordType>) -> Self {
        self.types.push(NamedType::Record(ty));
        self
    }

    pub fn union(mut self, ty: Arc<UnionType>) -> Self {
        self.types.push(NamedType::Union(ty));
        self
    }

    /// # Errors
    ///
    /// `UnknownType` for unresolved names (including the root), and
    /// `TypeMismatch` when the root is not a record, a name is declared twice,
    /// or a container is keyed by something other than an entity record.
    pub fn build(self) -> Result<Arc<Schema>> {
        let mut types = IndexMap::new();
        for ty in self.types {
            let name = ty.name().to_string();
            if types.insert(name.clone(), ty).is_some() {
                return Err(ArborError::type_mismatch(
                    &name,
                    "a single declaration",
                    "duplicate type name",
                ));
            }
        }
        let schema = Schema {
            root: self.root,
            types,
        };

        match schema.named(&schema.root) {
            Some(NamedType::Record(_)) => {}
            Some(NamedType::Union(_)) => {
                return Err(ArborError::type_mismatch(&schema.root, "record", "union"))
            }
            None => {
                return Err(ArborError::UnknownType {
                    type_name: schema.root.clone(),
                })
            }
        }

        for ty in schema.types.values() {
            match ty {
                NamedType::Record(r) => {
                    for field in r.fields() {
                        schema.validate_expr(&format!("{}.{}", r.name(), field.name), &field.ty)?;
                    }
                }
                NamedType::Union(u) => {
                    for (tag, case) in u.cases() {
                        schema.validate_expr(&format!("{}.{}", u.name(), tag), case)?;
                    }
                }
            }
        }
        Ok(Arc::new(schema))
    }
}

impl Schema {
    fn validate_expr(&self, at: &str, ty: &TypeExpr) -> Result<()> {
        match ty {
            TypeExpr::Scalar(_) | TypeExpr::ListingEntry => Ok(()),
            TypeExpr::Named(name) => match self.named(name) {
                Some(_) => Ok(()),
                None => Err(ArborError::UnknownType {
                    type_name: name.clone(),
                }),
            },
            TypeExpr::Catalog(entry) | TypeExpr::Listing(entry) => self.validate_entity(at, entry),
            TypeExpr::SideTable(key, value) => {
                self.validate_entity(at, key)?;
                self.validate_expr(at, value)
            }
        }
    }

    fn validate_entity(&self, at: &str, entry: &TypeExpr) -> Result<()> {
        let name = entry
            .name()
            .ok_or_else(|| ArborError::type_mismatch(at, "entity record", entry))?;
        match self.named(name) {
            Some(NamedType::Record(r)) if r.is_entity() => Ok(()),
            Some(_) => Err(ArborError::type_mismatch(at, "entity record with an id", name)),
            None => Err(ArborError::UnknownType {
                type_name: name.to_string(),
            }),
        }
    }
}
