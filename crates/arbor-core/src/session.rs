use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::model::Node;

/// A pinned snapshot of the tree
///
/// The root never changes for the lifetime of the session, whatever updates
/// are installed meanwhile. Sessions opened from a tree are counted there;
/// the count drops when the session (and every clone of it) is dropped.
#[derive(Debug)]
pub struct ReadSession {
    root: Arc<Node>,
    open: Option<Arc<AtomicUsize>>,
}

impl ReadSession {
    /// Session over a root with no owning tree
    pub fn of(root: Arc<Node>) -> Self {
        Self { root, open: None }
    }

    /// Session counted in `open` until dropped
    pub fn tracked(root: Arc<Node>, open: Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::AcqRel);
        Self {
            root,
            open: Some(open),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_arc(&self) -> &Arc<Node> {
        &self.root
    }

    /// Another session pinned to the same root
    pub fn snapshot(&self) -> Self {
        self.clone()
    }
}

impl Clone for ReadSession {
    fn clone(&self) -> Self {
        match &self.open {
            Some(open) => Self::tracked(Arc::clone(&self.root), Arc::clone(open)),
            None => Self::of(Arc::clone(&self.root)),
        }
    }
}

impl Drop for ReadSession {
    fn drop(&mut self) {
        if let Some(open) = &self.open {
            open.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
