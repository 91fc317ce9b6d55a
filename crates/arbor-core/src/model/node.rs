use std::fmt;

use super::catalog::Catalog;
use super::identifier::Identifier;
use super::listing::Listing;
use super::record::Record;
use super::scalar::Scalar;
use super::side_table::SideTable;
use super::union::TaggedUnion;

/// A value in the state tree
///
/// Composite variants are cheap to clone: each one is a handle onto shared,
/// immutable contents. Once a node is reachable from a published root it is
/// never modified; updates build new nodes along the changed spine.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Record(Record),
    Catalog(Catalog),
    Listing(Listing),
    SideTable(SideTable),
    Union(TaggedUnion),
    /// Value found at a present listing entry
    ListingEntry,
}

impl Node {
    pub fn str(value: impl Into<String>) -> Self {
        Node::Scalar(Scalar::Str(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Node::Scalar(Scalar::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Node::Scalar(Scalar::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Node::Scalar(Scalar::Bool(value))
    }

    pub fn id(value: Identifier) -> Self {
        Node::Scalar(Scalar::Id(value))
    }

    /// Reference identity for composites, value equality for scalars
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Scalar(a), Node::Scalar(b)) => a == b,
            (Node::Record(a), Node::Record(b)) => a.ptr_eq(b),
            (Node::Catalog(a), Node::Catalog(b)) => a.ptr_eq(b),
            (Node::Listing(a), Node::Listing(b)) => a.ptr_eq(b),
            (Node::SideTable(a), Node::SideTable(b)) => a.ptr_eq(b),
            (Node::Union(a), Node::Union(b)) => a.ptr_eq(b),
            (Node::ListingEntry, Node::ListingEntry) => true,
            _ => false,
        }
    }

    /// Short structural description used in type errors
    pub fn describe(&self) -> String {
        match self {
            Node::Scalar(s) => s.kind().to_string(),
            Node::Record(r) => r.type_name().to_string(),
            Node::Catalog(_) => "Catalog".to_string(),
            Node::Listing(_) => "Listing".to_string(),
            Node::SideTable(_) => "SideTable".to_string(),
            Node::Union(u) => format!("Union case {:?}", u.tag()),
            Node::ListingEntry => "ListingEntry".to_string(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Node::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_catalog(&self) -> Option<&Catalog> {
        match self {
            Node::Catalog(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_listing(&self) -> Option<&Listing> {
        match self {
            Node::Listing(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_side_table(&self) -> Option<&SideTable> {
        match self {
            Node::SideTable(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&TaggedUnion> {
        match self {
            Node::Union(u) => Some(u),
            _ => None,
        }
    }

    /// Ids of the entries of a container node, in container order
    pub fn entry_ids(&self) -> Option<Vec<Identifier>> {
        match self {
            Node::Catalog(c) => Some(c.ids().cloned().collect()),
            Node::Listing(l) => Some(l.ids().cloned().collect()),
            Node::SideTable(t) => Some(t.ids().cloned().collect()),
            _ => None,
        }
    }
}

/// `ptr_eq` lifted to optional slots
pub(crate) fn opt_ptr_eq(a: Option<&Node>, b: Option<&Node>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.ptr_eq(b),
        (None, None) => true,
        _ => false,
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Scalar(s) => write!(f, "{}", s),
            Node::Record(r) => write!(f, "{}", r),
            Node::Catalog(c) => write!(f, "Catalog[{}]", c.len()),
            Node::Listing(l) => write!(f, "Listing[{}]", l.len()),
            Node::SideTable(t) => write!(f, "SideTable[{}]", t.len()),
            Node::Union(u) => write!(f, "{}({})", u.tag(), u.case()),
            Node::ListingEntry => f.write_str("ListingEntry"),
        }
    }
}

impl From<Scalar> for Node {
    fn from(value: Scalar) -> Self {
        Node::Scalar(value)
    }
}

impl From<Record> for Node {
    fn from(value: Record) -> Self {
        Node::Record(value)
    }
}

impl From<Catalog> for Node {
    fn from(value: Catalog) -> Self {
        Node::Catalog(value)
    }
}

impl From<Listing> for Node {
    fn from(value: Listing) -> Self {
        Node::Listing(value)
    }
}

impl From<SideTable> for Node {
    fn from(value: SideTable) -> Self {
        Node::SideTable(value)
    }
}

impl From<TaggedUnion> for Node {
    fn from(value: TaggedUnion) -> Self {
        Node::Union(value)
    }
}
