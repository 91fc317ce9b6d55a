#![allow(dead_code)]

use std::sync::Arc;

use arbor_core::logging_facility::Profile;
use arbor_core::model::{Catalog, Identifier, Listing, Node, Record, ScalarKind};
use arbor_core::schema::{RecordType, Schema, TypeExpr};
use arbor_core::{Compiler, Path, Reference};
use arbor_core_types::DiagnosticAttributes;
use arbor_engine::{DriverStack, EngineConfig, StateTree};
use parking_lot::Mutex;

/// Fixture schema
///
/// ```text
/// Root  { label: Str, owner?: Identifier, children: Catalog<Child>,
///         favorites: Listing<Child> }
/// Child { id, label: Str, children: Catalog<Child>, status?: Str }
/// ```
pub fn schema() -> Arc<Schema> {
    let child = RecordType::builder("Child")
        .id_field()
        .field("label", TypeExpr::scalar(ScalarKind::Str))
        .field("children", TypeExpr::catalog_of("Child"))
        .optional("status", TypeExpr::scalar(ScalarKind::Str))
        .build()
        .unwrap();
    let root = RecordType::builder("Root")
        .field("label", TypeExpr::scalar(ScalarKind::Str))
        .optional("owner", TypeExpr::scalar(ScalarKind::Id))
        .field("children", TypeExpr::catalog_of("Child"))
        .field("favorites", TypeExpr::listing_of("Child"))
        .build()
        .unwrap();
    Schema::builder("Root")
        .record(root)
        .record(child)
        .build()
        .unwrap()
}

pub fn config() -> EngineConfig {
    EngineConfig {
        log_profile: Profile::Test,
        ..EngineConfig::default()
    }
}

pub fn id(s: &str) -> Identifier {
    Identifier::new(s).unwrap()
}

pub fn attrs() -> DiagnosticAttributes {
    DiagnosticAttributes::new()
}

pub fn child(compiler: &Arc<Compiler>, child_id: &str, label: &str) -> Record {
    child_with(compiler, child_id, label, Vec::new())
}

pub fn child_with(
    compiler: &Arc<Compiler>,
    child_id: &str,
    label: &str,
    children: Vec<Record>,
) -> Record {
    let ty = compiler.schema().record_type("Child").unwrap();
    Record::builder(ty)
        .id(id(child_id))
        .set("label", Node::str(label))
        .set("children", Catalog::of(children).unwrap())
        .build()
        .unwrap()
}

pub fn root_with(compiler: &Arc<Compiler>, children: Vec<Record>) -> Node {
    let ty = compiler.schema().record_type("Root").unwrap();
    let domain = compiler
        .parse_reference("/children", &TypeExpr::catalog_of("Child"))
        .unwrap();
    Node::Record(
        Record::builder(ty)
            .set("label", Node::str("root"))
            .set("children", Catalog::of(children).unwrap())
            .set("favorites", Listing::empty(domain).unwrap())
            .build()
            .unwrap(),
    )
}

/// Tree over children `a`, `b` and `c`; `b` has a nested child `b1`
pub fn tree() -> StateTree {
    tree_with_stack(DriverStack::empty())
}

pub fn tree_with_stack(stack: DriverStack) -> StateTree {
    StateTree::builder(schema())
        .config(config())
        .driver_stack(stack)
        .initial_root(|c| {
            Ok(root_with(
                c,
                vec![
                    child(c, "a", "A"),
                    child_with(c, "b", "B", vec![child(c, "b1", "B1")]),
                    child(c, "c", "C"),
                ],
            ))
        })
        .build()
        .unwrap()
}

pub fn reference(tree: &StateTree, text: &str) -> Reference {
    tree.compiler()
        .structural_reference(Path::parse(text).unwrap())
        .unwrap()
}

pub fn label(tree: &StateTree, text: &str) -> Node {
    reference(tree, text).value(&tree.read_session()).unwrap()
}

/// Shared record of hook firings
#[derive(Clone, Default)]
pub struct Firings(Arc<Mutex<Vec<String>>>);

impl Firings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}
