use std::fmt;

use crate::model::ScalarKind;

/// Structural type of a node, as declared by the schema
///
/// Equality of two `TypeExpr`s is the type-check relation used when a
/// reference declares the target type it expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Scalar(ScalarKind),
    /// A record or tagged union declared in the schema
    Named(String),
    /// Catalog of the named entity type
    Catalog(Box<TypeExpr>),
    /// Listing whose domain is a catalog of the named entity type
    Listing(Box<TypeExpr>),
    /// Side table keyed by ids of the first type, holding values of the second
    SideTable(Box<TypeExpr>, Box<TypeExpr>),
    /// Value found at a present listing entry
    ListingEntry,
}

impl TypeExpr {
    pub fn scalar(kind: ScalarKind) -> Self {
        TypeExpr::Scalar(kind)
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    pub fn catalog_of(entry: impl Into<String>) -> Self {
        TypeExpr::Catalog(Box::new(TypeExpr::named(entry)))
    }

    pub fn listing_of(entry: impl Into<String>) -> Self {
        TypeExpr::Listing(Box::new(TypeExpr::named(entry)))
    }

    pub fn side_table(key: impl Into<String>, value: TypeExpr) -> Self {
        TypeExpr::SideTable(Box::new(TypeExpr::named(key)), Box::new(value))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            TypeExpr::Named(n) => Some(n),
            _ => None,
        }
    }

    /// The entity type whose ids index this container, if it is one
    pub fn entry_key_type(&self) -> Option<&TypeExpr> {
        match self {
            TypeExpr::Catalog(entry) | TypeExpr::Listing(entry) => Some(entry),
            TypeExpr::SideTable(key, _) => Some(key),
            _ => None,
        }
    }

    /// Parameter name derived from a type: `ChildNode` becomes `childNode`
    pub fn placeholder_name(&self) -> String {
        let base = match self {
            TypeExpr::Named(n) => n.clone(),
            TypeExpr::Scalar(kind) => kind.to_string(),
            other => other.to_string(),
        };
        let mut chars = base.chars().filter(|c| c.is_alphanumeric() || *c == '_');
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => "entry".to_string(),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Scalar(kind) => write!(f, "{}", kind),
            TypeExpr::Named(n) => f.write_str(n),
            TypeExpr::Catalog(entry) => write!(f, "Catalog<{}>", entry),
            TypeExpr::Listing(entry) => write!(f, "Listing<{}>", entry),
            TypeExpr::SideTable(k, v) => write!(f, "SideTable<{}, {}>", k, v),
            TypeExpr::ListingEntry => f.write_str("ListingEntry"),
        }
    }
}

/// How a record field holds its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Always present
    Plain,
    /// Present or absent; absence is a valid state
    Optional,
    /// Never holds a value; kept for schema compatibility
    Phantom,
}
