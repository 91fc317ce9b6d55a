use crate::schema::TypeExpr;

/// How one path segment is traversed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Field { index: usize, name: String },
    OptionalField { index: usize, name: String },
    PhantomField { index: usize, name: String },
    CatalogEntry,
    ListingEntry,
    SideTableEntry,
    UnionCase { tag: String },
}

impl StepKind {
    /// Steps whose segment is an entry id rather than a literal name
    pub fn is_entry(&self) -> bool {
        matches!(
            self,
            StepKind::CatalogEntry | StepKind::ListingEntry | StepKind::SideTableEntry
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Field { .. } => "field",
            StepKind::OptionalField { .. } => "optional field",
            StepKind::PhantomField { .. } => "phantom field",
            StepKind::CatalogEntry => "catalog entry",
            StepKind::ListingEntry => "listing entry",
            StepKind::SideTableEntry => "side table entry",
            StepKind::UnionCase { .. } => "union case",
        }
    }
}

/// One compiled hop: its kind and the type it lands on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub result: TypeExpr,
}
