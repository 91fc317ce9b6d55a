//! Innermost driver: applies updates to the in-memory tree

use std::sync::Arc;

use arbor_core::errors::{ArborError, Result};
use arbor_core::model::{Identifier, Node, Scalar, ScalarKind};
use arbor_core::schema::TypeExpr;
use arbor_core::{Compiler, Reference};
use arbor_core_types::DiagnosticAttributes;

use super::Driver;
use crate::tree::TreeCore;

/// Produces the root a new tree starts from
pub type RootInitializer = Box<dyn Fn(&Arc<Compiler>) -> Result<Node> + Send + Sync>;

/// Applies each submission synchronously: the new root is installed and its
/// hooks have run (or been queued, when called from a hook) by the time the
/// call returns.
pub struct LocalDriver {
    core: Arc<TreeCore>,
    initializer: RootInitializer,
}

impl LocalDriver {
    pub(crate) fn new(core: Arc<TreeCore>, initializer: RootInitializer) -> Self {
        Self { core, initializer }
    }
}

impl Driver for LocalDriver {
    fn initial_root(&self) -> Result<Node> {
        (self.initializer)(self.core.compiler())
    }

    fn submit_replacement(
        &self,
        target: &Reference,
        value: Node,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        self.core
            .apply("submit_replacement", target, attributes, |root| {
                target.with(root, value).map(Some)
            })
    }

    fn submit_conditional_replacement(
        &self,
        target: &Reference,
        value: Node,
        precondition: &Reference,
        required: &Identifier,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        check_precondition_type(precondition)?;
        self.core
            .apply("submit_conditional_replacement", target, attributes, |root| {
                if precondition_holds(precondition, required, root)? {
                    target.with(root, value).map(Some)
                } else {
                    Ok(None)
                }
            })
    }

    fn submit_conditional_creation(
        &self,
        target: &Reference,
        value: Node,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        self.core
            .apply("submit_conditional_creation", target, attributes, |root| {
                if target.value_if_exists_in(root)?.is_some() {
                    Ok(None)
                } else {
                    target.with(root, value).map(Some)
                }
            })
    }

    fn submit_deletion(&self, target: &Reference, attributes: &DiagnosticAttributes) -> Result<()> {
        self.core
            .apply("submit_deletion", target, attributes, |root| {
                target.without(root).map(Some)
            })
    }

    fn submit_conditional_deletion(
        &self,
        target: &Reference,
        precondition: &Reference,
        required: &Identifier,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        check_precondition_type(precondition)?;
        self.core
            .apply("submit_conditional_deletion", target, attributes, |root| {
                if precondition_holds(precondition, required, root)? {
                    target.without(root).map(Some)
                } else {
                    Ok(None)
                }
            })
    }

    /// Nothing is ever pending here
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

fn check_precondition_type(precondition: &Reference) -> Result<()> {
    let expected = TypeExpr::scalar(ScalarKind::Id);
    if precondition.target_type() == &expected {
        Ok(())
    } else {
        Err(ArborError::type_mismatch(
            precondition.path(),
            expected,
            precondition.target_type(),
        ))
    }
}

/// An absent precondition never holds
fn precondition_holds(
    precondition: &Reference,
    required: &Identifier,
    root: &Node,
) -> Result<bool> {
    let current = precondition.value_if_exists_in(root)?;
    Ok(current
        .as_ref()
        .and_then(Node::as_scalar)
        .and_then(Scalar::as_id)
        == Some(required))
}
