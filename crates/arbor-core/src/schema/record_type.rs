//! Accessor and constructor tables for record and union types
//!
//! A `RecordType` is the explicit, per-type description of a state node:
//! its field table (in declaration order), optional getter overrides, and an
//! optional constructor check that every new instance must pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::types::{FieldKind, TypeExpr};
use crate::errors::{ArborError, Result};
use crate::model::{Identifier, Node, Record, ScalarKind};

/// Getter override for a field
///
/// Receives the record and returns the field's value. User code may fail;
/// the error propagates unchanged to whoever read or rebuilt the record.
pub type FieldGetter = Arc<dyn Fn(&Record) -> Result<Option<Node>> + Send + Sync>;

/// Check run on the field values of every newly constructed instance
pub type ConstructorCheck = Arc<dyn Fn(&RecordType, &[Option<Node>]) -> Result<()> + Send + Sync>;

/// Name of the field that carries an entity's identifier
pub const ID_FIELD: &str = "id";

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub ty: TypeExpr,
}

pub struct RecordType {
    name: String,
    fields: Vec<FieldDef>,
    index: HashMap<String, usize>,
    getters: Vec<Option<FieldGetter>>,
    constructor: Option<ConstructorCheck>,
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
            getters: Vec::new(),
            constructor: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn field_at(&self, index: usize) -> Option<&FieldDef> {
        self.fields.get(index)
    }

    pub fn getter(&self, index: usize) -> Option<&FieldGetter> {
        self.getters.get(index).and_then(Option::as_ref)
    }

    /// Entities are records with a plain `id` field of kind Identifier
    pub fn is_entity(&self) -> bool {
        self.field_index(ID_FIELD)
            .and_then(|i| self.field_at(i))
            .map(|f| f.kind == FieldKind::Plain && f.ty == TypeExpr::Scalar(ScalarKind::Id))
            .unwrap_or(false)
    }

    pub(crate) fn run_constructor(&self, slots: &[Option<Node>]) -> Result<()> {
        match &self.constructor {
            Some(check) => check(self, slots),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field(
                "getters",
                &self
                    .getters
                    .iter()
                    .enumerate()
                    .filter(|(_, g)| g.is_some())
                    .map(|(i, _)| self.fields[i].name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

pub struct RecordTypeBuilder {
    name: String,
    fields: Vec<FieldDef>,
    getters: Vec<(String, FieldGetter)>,
    constructor: Option<ConstructorCheck>,
}

impl RecordTypeBuilder {
    fn push(mut self, name: impl Into<String>, kind: FieldKind, ty: TypeExpr) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
            ty,
        });
        self
    }

    pub fn field(self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.push(name, FieldKind::Plain, ty)
    }

    pub fn optional(self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.push(name, FieldKind::Optional, ty)
    }

    pub fn phantom(self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.push(name, FieldKind::Phantom, ty)
    }

    /// Convenience for the entity `id` field
    pub fn id_field(self) -> Self {
        self.field(ID_FIELD, TypeExpr::Scalar(ScalarKind::Id))
    }

    pub fn getter<F>(mut self, field: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Record) -> Result<Option<Node>> + Send + Sync + 'static,
    {
        self.getters.push((field.into(), Arc::new(getter)));
        self
    }

    pub fn constructor<F>(mut self, check: F) -> Self
    where
        F: Fn(&RecordType, &[Option<Node>]) -> Result<()> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(check));
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` for duplicate or invalid field names and for
    /// getters naming an undeclared field.
    pub fn build(self) -> Result<Arc<RecordType>> {
        let mut index = HashMap::new();
        for (i, field) in self.fields.iter().enumerate() {
            Identifier::new(&field.name).map_err(|_| {
                ArborError::invalid_argument(
                    &self.name,
                    format!("field name {:?} is not a valid segment", field.name),
                )
            })?;
            if index.insert(field.name.clone(), i).is_some() {
                return Err(ArborError::invalid_argument(
                    &self.name,
                    format!("duplicate field {:?}", field.name),
                ));
            }
        }

        let mut getters: Vec<Option<FieldGetter>> = vec![None; self.fields.len()];
        for (field, getter) in self.getters {
            let i = *index.get(&field).ok_or_else(|| {
                ArborError::invalid_argument(
                    &self.name,
                    format!("getter for undeclared field {:?}", field),
                )
            })?;
            getters[i] = Some(getter);
        }

        Ok(Arc::new(RecordType {
            name: self.name,
            fields: self.fields,
            index,
            getters,
            constructor: self.constructor,
        }))
    }
}

/// A closed set of named cases
#[derive(Debug, Clone)]
pub struct UnionType {
    name: String,
    cases: IndexMap<String, TypeExpr>,
}

impl UnionType {
    pub fn builder(name: impl Into<String>) -> UnionTypeBuilder {
        UnionTypeBuilder {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn case_type(&self, tag: &str) -> Option<&TypeExpr> {
        self.cases.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.cases.keys().map(String::as_str)
    }

    pub fn cases(&self) -> impl Iterator<Item = (&str, &TypeExpr)> {
        self.cases.iter().map(|(k, v)| (k.as_str(), v))
    }
}

pub struct UnionTypeBuilder {
    name: String,
    cases: Vec<(String, TypeExpr)>,
}

impl UnionTypeBuilder {
    pub fn case(mut self, tag: impl Into<String>, ty: TypeExpr) -> Self {
        self.cases.push((tag.into(), ty));
        self
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` for duplicate or invalid tags, or an empty case set.
    pub fn build(self) -> Result<Arc<UnionType>> {
        if self.cases.is_empty() {
            return Err(ArborError::invalid_argument(
                &self.name,
                "a union needs at least one case",
            ));
        }
        let mut cases = IndexMap::new();
        for (tag, ty) in self.cases {
            Identifier::new(&tag).map_err(|_| {
                ArborError::invalid_argument(&self.name, format!("tag {:?} is not valid", tag))
            })?;
            if cases.insert(tag.clone(), ty).is_some() {
                return Err(ArborError::invalid_argument(
                    &self.name,
                    format!("duplicate tag {:?}", tag),
                ));
            }
        }
        Ok(Arc::new(UnionType {
            name: self.name,
            cases,
        }))
    }
}
