//! Wrapping stage that holds submissions until `flush`

use std::collections::VecDeque;
use std::sync::Arc;

use arbor_core::errors::{ArborError, Result};
use arbor_core::model::{Identifier, Node};
use arbor_core::Reference;
use arbor_core_types::DiagnosticAttributes;
use parking_lot::Mutex;

use super::{Driver, DriverFactory};
use crate::hooks::scheduler::observe_hook_failure;

enum PendingUpdate {
    Replacement {
        target: Reference,
        value: Node,
    },
    ConditionalReplacement {
        target: Reference,
        value: Node,
        precondition: Reference,
        required: Identifier,
    },
    ConditionalCreation {
        target: Reference,
        value: Node,
    },
    Deletion {
        target: Reference,
    },
    ConditionalDeletion {
        target: Reference,
        precondition: Reference,
        required: Identifier,
    },
}

struct Buffered {
    update: PendingUpdate,
    attributes: DiagnosticAttributes,
}

impl Buffered {
    fn forward(self, downstream: &dyn Driver) -> Result<()> {
        let attributes = &self.attributes;
        match self.update {
            PendingUpdate::Replacement { target, value } => {
                downstream.submit_replacement(&target, value, attributes)
            }
            PendingUpdate::ConditionalReplacement {
                target,
                value,
                precondition,
                required,
            } => downstream.submit_conditional_replacement(
                &target,
                value,
                &precondition,
                &required,
                attributes,
            ),
            PendingUpdate::ConditionalCreation { target, value } => {
                downstream.submit_conditional_creation(&target, value, attributes)
            }
            PendingUpdate::Deletion { target } => downstream.submit_deletion(&target, attributes),
            PendingUpdate::ConditionalDeletion {
                target,
                precondition,
                required,
            } => downstream.submit_conditional_deletion(
                &target,
                &precondition,
                &required,
                attributes,
            ),
        }
    }

    fn target(&self) -> &Reference {
        match &self.update {
            PendingUpdate::Replacement { target, .. }
            | PendingUpdate::ConditionalReplacement { target, .. }
            | PendingUpdate::ConditionalCreation { target, .. }
            | PendingUpdate::Deletion { target }
            | PendingUpdate::ConditionalDeletion { target, .. } => target,
        }
    }
}

/// Queues submissions and forwards them, in order, on [`flush`](Driver::flush)
///
/// An update refused downstream during a flush is dropped; the flush reports
/// `FlushFailed` with the refusal as its source, and the updates behind it
/// stay queued for the next flush. When an update is applied but one of its
/// hooks fails, the flush stops and returns that hook's error unchanged.
/// Conditions are evaluated downstream, at flush time.
pub struct BufferingDriver {
    downstream: Arc<dyn Driver>,
    pending: Mutex<VecDeque<Buffered>>,
}

impl BufferingDriver {
    pub fn new(downstream: Arc<dyn Driver>) -> Self {
        Self {
            downstream,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    pub fn factory() -> DriverFactory {
        Box::new(|downstream| Arc::new(BufferingDriver::new(downstream)) as Arc<dyn Driver>)
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    fn buffer(&self, update: PendingUpdate, attributes: &DiagnosticAttributes) -> Result<()> {
        self.pending.lock().push_back(Buffered {
            update,
            attributes: attributes.clone(),
        });
        Ok(())
    }
}

impl Driver for BufferingDriver {
    fn initial_root(&self) -> Result<Node> {
        self.downstream.initial_root()
    }

    fn submit_replacement(
        &self,
        target: &Reference,
        value: Node,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        self.buffer(
            PendingUpdate::Replacement {
                target: target.clone(),
                value,
            },
            attributes,
        )
    }

    fn submit_conditional_replacement(
        &self,
        target: &Reference,
        value: Node,
        precondition: &Reference,
        required: &Identifier,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        self.buffer(
            PendingUpdate::ConditionalReplacement {
                target: target.clone(),
                value,
                precondition: precondition.clone(),
                required: required.clone(),
            },
            attributes,
        )
    }

    fn submit_conditional_creation(
        &self,
        target: &Reference,
        value: Node,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        self.buffer(
            PendingUpdate::ConditionalCreation {
                target: target.clone(),
                value,
            },
            attributes,
        )
    }

    fn submit_deletion(&self, target: &Reference, attributes: &DiagnosticAttributes) -> Result<()> {
        self.buffer(
            PendingUpdate::Deletion {
                target: target.clone(),
            },
            attributes,
        )
    }

    fn submit_conditional_deletion(
        &self,
        target: &Reference,
        precondition: &Reference,
        required: &Identifier,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        self.buffer(
            PendingUpdate::ConditionalDeletion {
                target: target.clone(),
                precondition: precondition.clone(),
                required: required.clone(),
            },
            attributes,
        )
    }

    fn flush(&self) -> Result<()> {
        // The lock is released before forwarding: hooks run downstream may
        // submit back into this stage, and those updates join this flush.
        loop {
            let next = self.pending.lock().pop_front();
            let Some(buffered) = next else { break };
            let path = buffered.target().path().to_string();
            let (result, hook_failed) =
                observe_hook_failure(|| buffered.forward(self.downstream.as_ref()));
            let Err(err) = result else { continue };
            let pending = self.pending();
            if hook_failed {
                // The update was applied; its hook's error goes out unchanged
                tracing::warn!(path = %path, pending, error = %err, "hook failed during flush");
                return Err(err);
            }
            tracing::warn!(path = %path, pending, error = %err, "buffered update refused");
            return Err(ArborError::FlushFailed {
                path,
                pending,
                source: Box::new(err),
            });
        }
        self.downstream.flush()
    }
}
