//! Append-only hook registry
//!
//! Readers take a lock-free snapshot of the registration list; registration
//! publishes a new list. Order in the list is registration order.

use std::sync::Arc;

use arbor_core::errors::Result;
use arbor_core::Reference;
use arc_swap::ArcSwap;

use super::HookContext;

pub type HookCallback = Arc<dyn Fn(&HookContext<'_>) -> Result<()> + Send + Sync>;

pub struct HookRegistration {
    name: String,
    scope: Reference,
    callback: HookCallback,
}

impl HookRegistration {
    pub fn new(name: impl Into<String>, scope: Reference, callback: HookCallback) -> Self {
        Self {
            name: name.into(),
            scope,
            callback,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Possibly indefinite scope
    pub fn scope(&self) -> &Reference {
        &self.scope
    }

    pub(crate) fn call(&self, ctx: &HookContext<'_>) -> Result<()> {
        (self.callback)(ctx)
    }
}

impl std::fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistration")
            .field("name", &self.name)
            .field("scope", &self.scope.path().to_string())
            .finish()
    }
}

pub struct HookRegistry {
    hooks: ArcSwap<Vec<Arc<HookRegistration>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            hooks: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Append a registration; the same hook may be registered any number of
    /// times and each registration fires independently.
    pub fn register(&self, registration: HookRegistration) -> Arc<HookRegistration> {
        let registration = Arc::new(registration);
        self.hooks.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&registration));
            next
        });
        registration
    }

    /// Registrations in order, as of now
    pub fn snapshot(&self) -> Arc<Vec<Arc<HookRegistration>>> {
        self.hooks.load_full()
    }

    pub fn len(&self) -> usize {
        self.hooks.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
