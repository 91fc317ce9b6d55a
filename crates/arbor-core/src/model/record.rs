use std::fmt;
use std::sync::Arc;

use super::identifier::Identifier;
use super::node::{opt_ptr_eq, Node};
use crate::errors::{ArborError, Result};
use crate::schema::{FieldDef, FieldKind, RecordType, ID_FIELD};

/// Instance of a schema record type
///
/// Slots follow the type's field table. Reads through [`Record::slot`] honour
/// getter overrides; [`Record::stored`] returns the raw slot.
#[derive(Clone)]
pub struct Record(Arc<RecordInner>);

struct RecordInner {
    ty: Arc<RecordType>,
    slots: Vec<Option<Node>>,
}

impl Record {
    pub fn builder(ty: &Arc<RecordType>) -> RecordBuilder {
        RecordBuilder {
            ty: Arc::clone(ty),
            slots: vec![None; ty.fields().len()],
            unknown: Vec::new(),
        }
    }

    /// Validate slots against the field table, then run the constructor check
    fn construct(ty: Arc<RecordType>, slots: Vec<Option<Node>>) -> Result<Self> {
        for (field, slot) in ty.fields().iter().zip(&slots) {
            match (field.kind, slot) {
                (FieldKind::Plain, None) => {
                    return Err(ArborError::invalid_argument(
                        format!("{}.{}", ty.name(), field.name),
                        "plain field requires a value",
                    ))
                }
                (FieldKind::Phantom, Some(_)) => {
                    return Err(ArborError::invalid_argument(
                        format!("{}.{}", ty.name(), field.name),
                        "phantom field cannot hold a value",
                    ))
                }
                _ => {}
            }
        }
        ty.run_constructor(&slots)?;
        Ok(Record(Arc::new(RecordInner { ty, slots })))
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.0.ty
    }

    pub fn type_name(&self) -> &str {
        self.0.ty.name()
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Raw stored value, bypassing getter overrides
    pub fn stored(&self, index: usize) -> Option<&Node> {
        self.0.slots.get(index).and_then(Option::as_ref)
    }

    /// Field value at `index`, through the getter override if one is declared
    ///
    /// # Errors
    ///
    /// Whatever the getter override returns, unchanged.
    pub fn slot(&self, index: usize) -> Result<Option<Node>> {
        match self.0.ty.getter(index) {
            Some(getter) => getter(self),
            None => Ok(self.stored(index).cloned()),
        }
    }

    /// Field value by name
    ///
    /// # Errors
    ///
    /// `UnknownSegment` if the type declares no such field; getter failures
    /// propagate unchanged.
    pub fn get(&self, field: &str) -> Result<Option<Node>> {
        let index = self.index_of(field)?;
        self.slot(index)
    }

    /// Copy of this record with one field replaced (or cleared)
    ///
    /// # Errors
    ///
    /// `UnknownSegment` for undeclared fields; getter and constructor
    /// failures propagate unchanged.
    pub fn with(&self, field: &str, value: Option<Node>) -> Result<Record> {
        let index = self.index_of(field)?;
        self.with_slot(index, value)
    }

    /// Rebuild with one slot replaced
    ///
    /// Sibling values are read through their getters so that user accessor
    /// failures surface on the write path too. Returns `self` unchanged when
    /// every resulting slot is identical to the stored one.
    pub(crate) fn with_slot(&self, index: usize, value: Option<Node>) -> Result<Record> {
        let count = self.0.slots.len();
        let mut slots = Vec::with_capacity(count);
        for i in 0..count {
            if i == index {
                slots.push(value.clone());
            } else {
                slots.push(self.slot(i)?);
            }
        }
        let unchanged = slots
            .iter()
            .enumerate()
            .all(|(i, s)| opt_ptr_eq(s.as_ref(), self.stored(i)));
        if unchanged {
            return Ok(self.clone());
        }
        Record::construct(Arc::clone(&self.0.ty), slots)
    }

    /// The entity id, for records whose type declares an `id` field
    pub fn id(&self) -> Option<&Identifier> {
        let index = self.0.ty.field_index(ID_FIELD)?;
        self.stored(index)?.as_scalar()?.as_id()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldDef, Option<&Node>)> {
        self.0
            .ty
            .fields()
            .iter()
            .zip(self.0.slots.iter().map(Option::as_ref))
    }

    fn index_of(&self, field: &str) -> Result<usize> {
        self.0
            .ty
            .field_index(field)
            .ok_or_else(|| ArborError::UnknownSegment {
                path: self.type_name().to_string(),
                segment: field.to_string(),
                type_name: self.type_name().to_string(),
            })
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.type_name() == other.type_name() && self.0.slots == other.0.slots)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.type_name());
        for (field, value) in self.fields() {
            if let Some(value) = value {
                s.field(&field.name, value);
            }
        }
        s.finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{}({})", self.type_name(), id),
            None => f.write_str(self.type_name()),
        }
    }
}

pub struct RecordBuilder {
    ty: Arc<RecordType>,
    slots: Vec<Option<Node>>,
    unknown: Vec<String>,
}

impl RecordBuilder {
    pub fn set(mut self, field: &str, value: impl Into<Node>) -> Self {
        match self.ty.field_index(field) {
            Some(i) => self.slots[i] = Some(value.into()),
            None => self.unknown.push(field.to_string()),
        }
        self
    }

    /// Sets the entity `id` field
    pub fn id(self, id: Identifier) -> Self {
        self.set(ID_FIELD, Node::id(id))
    }

    /// # Errors
    ///
    /// `UnknownSegment` for undeclared fields, `InvalidArgument` for missing
    /// plain fields or populated phantoms, and whatever the constructor check
    /// reports.
    pub fn build(self) -> Result<Record> {
        if let Some(field) = self.unknown.into_iter().next() {
            return Err(ArborError::UnknownSegment {
                path: self.ty.name().to_string(),
                segment: field,
                type_name: self.ty.name().to_string(),
            });
        }
        Record::construct(self.ty, self.slots)
    }
}
