use std::sync::Arc;

use arbor_core::errors::Result;
use arbor_core::model::{Identifier, Node};
use arbor_core::{BindingEnvironment, ReadSession, Reference};
use arbor_core_types::{DiagnosticAttributes, SubmissionId};

use crate::driver::Driver;

/// Everything a hook callback gets to see about one invocation
///
/// The session is pinned to the root installed by the triggering update, so
/// a hook never observes updates submitted by hooks that ran before it.
pub struct HookContext<'a> {
    pub(crate) name: &'a str,
    pub(crate) reference: &'a Reference,
    pub(crate) binding: BindingEnvironment,
    pub(crate) session: ReadSession,
    pub(crate) attributes: &'a DiagnosticAttributes,
    pub(crate) submission_id: &'a SubmissionId,
    pub(crate) driver: Arc<dyn Driver>,
}

impl<'a> HookContext<'a> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// The hook's scope with every parameter bound to the matched entry
    pub fn reference(&self) -> &Reference {
        self.reference
    }

    /// Parameter bindings that turned the scope into [`reference`](Self::reference)
    pub fn binding(&self) -> &BindingEnvironment {
        &self.binding
    }

    pub fn parameter(&self, name: &str) -> Option<&Identifier> {
        self.binding.get(name)
    }

    pub fn session(&self) -> &ReadSession {
        &self.session
    }

    /// Attributes captured when the triggering update was submitted
    pub fn attributes(&self) -> &DiagnosticAttributes {
        self.attributes
    }

    pub fn submission_id(&self) -> &SubmissionId {
        self.submission_id
    }

    /// Outermost driver of the tree
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Value at the bound reference in the triggering snapshot
    ///
    /// # Errors
    ///
    /// `NonexistentEntry` when the hook fired because the entry was removed.
    pub fn value(&self) -> Result<Node> {
        self.reference.value(&self.session)
    }

    /// # Errors
    ///
    /// User accessor failures only; absence is `Ok(None)`.
    pub fn value_if_exists(&self) -> Result<Option<Node>> {
        self.reference.value_if_exists(&self.session)
    }

    /// Submit a replacement carrying this invocation's attributes
    ///
    /// # Errors
    ///
    /// See [`Driver::submit_replacement`].
    pub fn submit_replacement(&self, target: &Reference, value: Node) -> Result<()> {
        self.driver
            .submit_replacement(target, value, self.attributes)
    }

    /// Submit a deletion carrying this invocation's attributes
    ///
    /// # Errors
    ///
    /// See [`Driver::submit_deletion`].
    pub fn submit_deletion(&self, target: &Reference) -> Result<()> {
        self.driver.submit_deletion(target, self.attributes)
    }
}

impl std::fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("name", &self.name)
            .field("reference", &self.reference.path().to_string())
            .field("submission_id", &self.submission_id.as_str())
            .field("attributes", &self.attributes.to_string())
            .finish()
    }
}
