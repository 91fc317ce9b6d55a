//! Arbor Core - typed, immutable state tree kernel
//!
//! This crate provides the building blocks of an Arbor state tree:
//! - Immutable node values (records, catalogs, listings, side tables, unions)
//! - Explicit schema tables describing every node type
//! - Paths, binding environments and type-checked references
//! - The dereferencer compiler: cached get/with/without accessors that
//!   rebuild only the spine of the tree on update
//! - Read sessions pinning a consistent snapshot
//! - The error and logging facilities shared with the engine

pub mod binding;
pub mod compiler;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod path;
pub mod reference;
pub mod schema;
pub mod session;

pub use arbor_core_types;

// Re-export commonly used types
pub use binding::BindingEnvironment;
pub use compiler::{Compiler, Dereferencer};
pub use errors::{ArborError, ExError, ExErrorKind, Result};
pub use model::{
    Catalog, Identifier, Listing, Node, Record, Scalar, ScalarKind, SideTable, TaggedUnion,
};
pub use path::{Path, Segment};
pub use reference::Reference;
pub use schema::{RecordType, Schema, TypeExpr, UnionType};
pub use session::ReadSession;
