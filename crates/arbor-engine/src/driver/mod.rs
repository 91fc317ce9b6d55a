//! Driver pipeline
//!
//! Every update to a tree passes through a stack of [`Driver`] stages. Each
//! wrapping stage holds its downstream driver; the innermost stage is the
//! [`LocalDriver`] that installs new roots and runs hooks. Callers (and
//! hooks) only ever talk to the outermost stage.

pub mod buffering;
pub mod local;
pub mod trace;

use std::sync::Arc;

use arbor_core::errors::Result;
use arbor_core::model::{Identifier, Node};
use arbor_core::Reference;
use arbor_core_types::DiagnosticAttributes;

pub use buffering::BufferingDriver;
pub use local::LocalDriver;
pub use trace::TracingDriver;

/// One stage of the update pipeline
///
/// Targets must be definite references. Conditional operations compare the
/// `Identifier` found at `precondition` against `required` when the update is
/// applied, not when it is submitted.
pub trait Driver: Send + Sync {
    /// Root the tree starts from
    ///
    /// # Errors
    ///
    /// Whatever the innermost root initializer reports.
    fn initial_root(&self) -> Result<Node>;

    /// # Errors
    ///
    /// Type errors for `value`, `InvalidArgument` for disallowed writes, and
    /// errors raised by hooks run for this update.
    fn submit_replacement(
        &self,
        target: &Reference,
        value: Node,
        attributes: &DiagnosticAttributes,
    ) -> Result<()>;

    /// Replace `target` only if `precondition` currently holds `required`
    ///
    /// # Errors
    ///
    /// As for [`submit_replacement`](Self::submit_replacement).
    fn submit_conditional_replacement(
        &self,
        target: &Reference,
        value: Node,
        precondition: &Reference,
        required: &Identifier,
        attributes: &DiagnosticAttributes,
    ) -> Result<()>;

    /// Set `target` only if nothing is there yet
    ///
    /// # Errors
    ///
    /// As for [`submit_replacement`](Self::submit_replacement).
    fn submit_conditional_creation(
        &self,
        target: &Reference,
        value: Node,
        attributes: &DiagnosticAttributes,
    ) -> Result<()>;

    /// # Errors
    ///
    /// `InvalidArgument` for locations that cannot be deleted, and errors
    /// raised by hooks run for this update.
    fn submit_deletion(&self, target: &Reference, attributes: &DiagnosticAttributes) -> Result<()>;

    /// Delete `target` only if `precondition` currently holds `required`
    ///
    /// # Errors
    ///
    /// As for [`submit_deletion`](Self::submit_deletion).
    fn submit_conditional_deletion(
        &self,
        target: &Reference,
        precondition: &Reference,
        required: &Identifier,
        attributes: &DiagnosticAttributes,
    ) -> Result<()>;

    /// Wait until everything submitted so far has been applied
    ///
    /// # Errors
    ///
    /// `FlushFailed` when a pending update was refused downstream, with the
    /// refusal as its source. An error raised by a hook of a delivered update
    /// is returned unchanged.
    fn flush(&self) -> Result<()>;
}

/// Builds a wrapping stage around its downstream driver
pub type DriverFactory = Box<dyn FnOnce(Arc<dyn Driver>) -> Arc<dyn Driver> + Send>;

/// Ordered driver factories, outermost first
#[derive(Default)]
pub struct DriverStack {
    factories: Vec<DriverFactory>,
}

impl DriverStack {
    /// No wrapping stages: callers talk to the local driver directly
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(factories: impl IntoIterator<Item = DriverFactory>) -> Self {
        Self {
            factories: factories.into_iter().collect(),
        }
    }

    pub fn then(mut self, factory: DriverFactory) -> Self {
        self.factories.push(factory);
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Wrap `innermost`, returning the outermost stage
    pub(crate) fn build(self, innermost: Arc<dyn Driver>) -> Arc<dyn Driver> {
        self.factories
            .into_iter()
            .rev()
            .fold(innermost, |downstream, factory| factory(downstream))
    }
}

impl std::fmt::Debug for DriverStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverStack")
            .field("stages", &self.factories.len())
            .finish()
    }
}
