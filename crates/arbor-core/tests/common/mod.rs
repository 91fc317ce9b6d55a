#![allow(dead_code)]

use std::sync::Arc;

use arbor_core::errors::ArborError;
use arbor_core::model::{Catalog, Identifier, Listing, Node, Record, ScalarKind, SideTable};
use arbor_core::schema::{RecordType, Schema, TypeExpr, UnionType};
use arbor_core::{Compiler, Path, Reference};

/// Fixture schema
///
/// ```text
/// Root    { label: Str, children: Catalog<Child>, favorites: Listing<Child>,
///           notes: SideTable<Child, Str>, nickname?: Str, legacy: phantom Str,
///           shape?: Shape, gauge?: Gauge }
/// Child   { id, label: Str, children: Catalog<Child>, note?: Str }
/// Shape   = circle(Circle { radius: Int }) | square(Square { side: Int })
/// Gauge   { reading: Int }   -- getter fails when the stored reading is negative
/// ```
pub fn schema() -> Arc<Schema> {
    let child = RecordType::builder("Child")
        .id_field()
        .field("label", TypeExpr::scalar(ScalarKind::Str))
        .field("children", TypeExpr::catalog_of("Child"))
        .optional("note", TypeExpr::scalar(ScalarKind::Str))
        .build()
        .unwrap();
    let circle = RecordType::builder("Circle")
        .field("radius", TypeExpr::scalar(ScalarKind::Int))
        .build()
        .unwrap();
    let square = RecordType::builder("Square")
        .field("side", TypeExpr::scalar(ScalarKind::Int))
        .build()
        .unwrap();
    let shape = UnionType::builder("Shape")
        .case("circle", TypeExpr::named("Circle"))
        .case("square", TypeExpr::named("Square"))
        .build()
        .unwrap();
    let gauge = RecordType::builder("Gauge")
        .field("reading", TypeExpr::scalar(ScalarKind::Int))
        .getter("reading", |record| {
            let stored = record.stored(0).cloned();
            match stored.as_ref().and_then(|n| n.as_scalar()?.as_int()) {
                Some(n) if n < 0 => Err(ArborError::Accessor {
                    type_name: "Gauge".to_string(),
                    field: "reading".to_string(),
                    message: format!("negative reading {}", n),
                }),
                _ => Ok(stored),
            }
        })
        .build()
        .unwrap();
    let root = RecordType::builder("Root")
        .field("label", TypeExpr::scalar(ScalarKind::Str))
        .field("children", TypeExpr::catalog_of("Child"))
        .field("favorites", TypeExpr::listing_of("Child"))
        .field(
            "notes",
            TypeExpr::side_table("Child", TypeExpr::scalar(ScalarKind::Str)),
        )
        .optional("nickname", TypeExpr::scalar(ScalarKind::Str))
        .phantom("legacy", TypeExpr::scalar(ScalarKind::Str))
        .optional("shape", TypeExpr::named("Shape"))
        .optional("gauge", TypeExpr::named("Gauge"))
        .build()
        .unwrap();

    Schema::builder("Root")
        .record(root)
        .record(child)
        .record(circle)
        .record(square)
        .union(shape)
        .record(gauge)
        .build()
        .unwrap()
}

pub fn compiler() -> Arc<Compiler> {
    Compiler::with_default_capacity(schema())
}

pub fn id(s: &str) -> Identifier {
    Identifier::new(s).unwrap()
}

pub fn path(s: &str) -> Path {
    Path::parse(s).unwrap()
}

pub fn children_ref(compiler: &Arc<Compiler>) -> Reference {
    compiler
        .parse_reference("/children", &TypeExpr::catalog_of("Child"))
        .unwrap()
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

/// Root with the given children, an empty listing and an empty side table
pub fn root_with(compiler: &Arc<Compiler>, children: Vec<Record>) -> Node {
    let ty = compiler.schema().record_type("Root").unwrap();
    let domain = children_ref(compiler);
    Node::Record(
        Record::builder(ty)
            .set("label", Node::str("root"))
            .set("children", Catalog::of(children).unwrap())
            .set("favorites", Listing::empty(domain.clone()).unwrap())
            .set("notes", SideTable::empty(domain).unwrap())
            .build()
            .unwrap(),
    )
}

/// Root with children `a`, `b` and `c`; `b` has a nested child `b1`
pub fn sample_root(compiler: &Arc<Compiler>) -> Node {
    root_with(
        compiler,
        vec![
            child(compiler, "a", "A"),
            child_with(compiler, "b", "B", vec![child(compiler, "b1", "B1")]),
            child(compiler, "c", "C"),
        ],
    )
}

pub fn reference(compiler: &Arc<Compiler>, text: &str) -> Reference {
    compiler.structural_reference(path(text)).unwrap()
}
