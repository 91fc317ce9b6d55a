//! Hooks: callbacks run after every update that touches their scope
//!
//! - [`registry`]: append-only list of registrations
//! - [`scheduler`]: matching, ordering and the drain queue
//! - [`context`]: what a running hook can see and do
//! - [`scan`]: validated registration of receiver objects

pub mod context;
pub mod registry;
pub mod scan;
pub mod scheduler;

pub use context::HookContext;
pub use registry::{HookCallback, HookRegistration, HookRegistry};
pub use scan::{HookArgs, HookMethod, HookParam, HookReceiver};
pub use scheduler::HookScheduler;
