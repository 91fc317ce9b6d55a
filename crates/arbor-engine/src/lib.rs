//! Arbor Engine - state trees, drivers and hooks
//!
//! This crate puts the `arbor-core` kernel to work:
//! - [`StateTree`]: the current root, read sessions and hook registration
//! - [`driver`]: the update pipeline (local, tracing and buffering stages)
//! - [`hooks`]: hook registry, ordering rules and the scanning layer
//! - [`config`]: TOML engine configuration

pub mod config;
pub mod driver;
pub mod hooks;
pub mod tree;

pub use config::EngineConfig;
pub use driver::{BufferingDriver, Driver, DriverFactory, DriverStack, LocalDriver, TracingDriver};
pub use hooks::{HookArgs, HookContext, HookMethod, HookParam, HookReceiver};
pub use tree::{StateTree, StateTreeBuilder};
