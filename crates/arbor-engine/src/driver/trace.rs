//! Wrapping stage that logs every call with the canonical op events

use std::sync::Arc;
use std::time::Instant;

use arbor_core::errors::Result;
use arbor_core::model::{Identifier, Node};
use arbor_core::{log_op_end, log_op_error, log_op_start, Reference};
use arbor_core_types::DiagnosticAttributes;

use super::{Driver, DriverFactory};

pub struct TracingDriver {
    downstream: Arc<dyn Driver>,
}

impl TracingDriver {
    pub fn new(downstream: Arc<dyn Driver>) -> Self {
        Self { downstream }
    }

    pub fn factory() -> DriverFactory {
        Box::new(|downstream| Arc::new(TracingDriver::new(downstream)) as Arc<dyn Driver>)
    }

    fn traced<T>(
        &self,
        op: &'static str,
        target: Option<(&Reference, &DiagnosticAttributes)>,
        forward: impl FnOnce(&dyn Driver) -> Result<T>,
    ) -> Result<T> {
        let started = Instant::now();
        match target {
            Some((target, attributes)) => {
                log_op_start!(op, path = %target.path(), attributes = %attributes);
            }
            None => {
                log_op_start!(op);
            }
        }

        let result = forward(self.downstream.as_ref());

        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => {
                log_op_end!(op, duration_ms = duration_ms);
            }
            Err(err) => {
                log_op_error!(op, *err, duration_ms = duration_ms);
            }
        }
        result
    }
}

impl Driver for TracingDriver {
    fn initial_root(&self) -> Result<Node> {
        self.traced("initial_root", None, |d| d.initial_root())
    }

    fn submit_replacement(
        &self,
        target: &Reference,
        value: Node,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        self.traced("submit_replacement", Some((target, attributes)), |d| {
            d.submit_replacement(target, value, attributes)
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
        self.traced(
            "submit_conditional_replacement",
            Some((target, attributes)),
            |d| d.submit_conditional_replacement(target, value, precondition, required, attributes),
        )
    }

    fn submit_conditional_creation(
        &self,
        target: &Reference,
        value: Node,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        self.traced("submit_conditional_creation", Some((target, attributes)), |d| {
            d.submit_conditional_creation(target, value, attributes)
        })
    }

    fn submit_deletion(&self, target: &Reference, attributes: &DiagnosticAttributes) -> Result<()> {
        self.traced("submit_deletion", Some((target, attributes)), |d| {
            d.submit_deletion(target, attributes)
        })
    }

    fn submit_conditional_deletion(
        &self,
        target: &Reference,
        precondition: &Reference,
        required: &Identifier,
        attributes: &DiagnosticAttributes,
    ) -> Result<()> {
        self.traced("submit_conditional_deletion", Some((target, attributes)), |d| {
            d.submit_conditional_deletion(target, precondition, required, attributes)
        })
    }

    fn flush(&self) -> Result<()> {
        self.traced("flush", None, |d| d.flush())
    }
}
