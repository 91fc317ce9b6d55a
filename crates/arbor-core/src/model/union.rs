use std::sync::Arc;

use super::node::Node;

/// Exactly one case of a union type, addressed by tag
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedUnion(Arc<(String, Node)>);

impl TaggedUnion {
    pub fn of(tag: impl Into<String>, case: impl Into<Node>) -> Self {
        TaggedUnion(Arc::new((tag.into(), case.into())))
    }

    pub fn tag(&self) -> &str {
        &self.0 .0
    }

    pub fn case(&self) -> &Node {
        &self.0 .1
    }

    pub fn ptr_eq(&self, other: &TaggedUnion) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Copy with the selected case's contents replaced, keeping the tag
    pub(crate) fn with_case(&self, case: Node) -> Self {
        if case.ptr_eq(self.case()) {
            return self.clone();
        }
        TaggedUnion::of(self.tag(), case)
    }
}
