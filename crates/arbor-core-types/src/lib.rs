//! Core types shared across Arbor facilities
//!
//! This crate provides foundational types used by the error, logging and
//! hook facilities:
//!
//! - **Diagnostic types**: SubmissionId, DiagnosticAttributes
//! - **Schema constants**: Canonical field keys and event names

pub mod diagnostics;
pub mod schema;

pub use diagnostics::{DiagnosticAttributes, SubmissionId};
