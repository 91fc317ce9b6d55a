//! Immutable state tree values

mod catalog;
mod identifier;
mod listing;
mod node;
mod record;
mod scalar;
mod side_table;
mod union;

pub use catalog::Catalog;
pub use identifier::Identifier;
pub use listing::Listing;
pub use node::Node;
pub use record::{Record, RecordBuilder};
pub use scalar::{Scalar, ScalarKind};
pub use side_table::SideTable;
pub use union::TaggedUnion;
