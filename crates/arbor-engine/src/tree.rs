//! The state tree: current root, hooks and the driver stack around them

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Instant;

use arbor_core::errors::{ArborError, Result};
use arbor_core::model::Node;
use arbor_core::schema::{Schema, TypeExpr};
use arbor_core::{log_op_end, log_op_error, log_op_start};
use arbor_core::{Compiler, ReadSession, Reference};
use arbor_core_types::DiagnosticAttributes;
use arc_swap::ArcSwap;

use crate::config::EngineConfig;
use crate::driver::local::RootInitializer;
use crate::driver::{Driver, DriverStack, LocalDriver};
use crate::hooks::scheduler::{HookInvocation, UpdateOrigin};
use crate::hooks::{HookContext, HookReceiver, HookRegistration, HookRegistry, HookScheduler};

/// Shared state behind a [`StateTree`] and its [`LocalDriver`]
pub(crate) struct TreeCore {
    compiler: Arc<Compiler>,
    root: ArcSwap<Node>,
    sessions: Arc<AtomicUsize>,
    registry: HookRegistry,
    scheduler: HookScheduler,
    outermost: OnceLock<Weak<dyn Driver>>,
}

impl TreeCore {
    fn new(compiler: Arc<Compiler>) -> Self {
        Self {
            compiler,
            // Replaced with the driver stack's initial root before the tree is
            // handed out
            root: ArcSwap::from_pointee(Node::ListingEntry),
            sessions: Arc::new(AtomicUsize::new(0)),
            registry: HookRegistry::new(),
            scheduler: HookScheduler::new(),
            outermost: OnceLock::new(),
        }
    }

    pub(crate) fn compiler(&self) -> &Arc<Compiler> {
        &self.compiler
    }

    fn outermost(&self) -> Result<Arc<dyn Driver>> {
        self.outermost
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| ArborError::Internal {
                message: "the tree's driver stack has been dropped".to_string(),
            })
    }

    /// Apply one update and run the hooks it triggers
    ///
    /// `update` returns `None` when a precondition does not hold. Updates
    /// through a nonexistent enclosing entry are ignored.
    pub(crate) fn apply<F>(
        &self,
        op: &'static str,
        target: &Reference,
        attributes: &DiagnosticAttributes,
        update: F,
    ) -> Result<()>
    where
        F: FnOnce(&Node) -> Result<Option<Node>>,
    {
        self.check_reference(target)?;
        if !target.is_definite() {
            return Err(ArborError::IndefiniteReference {
                path: target.path().to_string(),
            });
        }

        let guard = self.scheduler.lock();
        let prior = self.root.load_full();
        let next = match update(prior.as_ref()) {
            Ok(Some(next)) => next,
            Ok(None) => {
                tracing::debug!(op, path = %target.path(), "precondition not met; update skipped");
                return Ok(());
            }
            Err(err) if err.is_nonexistent() => {
                tracing::debug!(op, path = %target.path(), error = %err, "update ignored");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        if next.ptr_eq(&prior) {
            tracing::trace!(op, path = %target.path(), "tree unchanged");
            return Ok(());
        }

        let next = Arc::new(next);
        self.root.store(Arc::clone(&next));
        let origin = UpdateOrigin::new(attributes.clone());
        let queued = self.scheduler.queue_update(
            &guard,
            &self.registry.snapshot(),
            target.path(),
            &prior,
            &next,
            &origin,
        )?;
        tracing::debug!(
            op,
            path = %target.path(),
            submission_id = %origin.submission_id,
            queued,
            "root installed"
        );
        self.scheduler
            .drain(&guard, |invocation| self.run_hook(invocation))
    }

    fn register(&self, registration: HookRegistration) -> Result<()> {
        self.check_reference(registration.scope())?;
        let guard = self.scheduler.lock();
        let registration = self.registry.register(registration);
        let root = self.root.load_full();
        let origin = UpdateOrigin::new(DiagnosticAttributes::new());
        let queued = self
            .scheduler
            .queue_registration(&guard, &registration, &root, &origin)?;
        tracing::debug!(
            hook = registration.name(),
            scope = %registration.scope().path(),
            queued,
            "hook registered"
        );
        self.scheduler
            .drain(&guard, |invocation| self.run_hook(invocation))
    }

    fn run_hook(&self, invocation: HookInvocation) -> Result<()> {
        let HookInvocation {
            registration,
            scope,
            root,
            origin,
        } = invocation;
        let span = tracing::info_span!(
            "hook",
            hook = registration.name(),
            scope = %scope.path(),
            submission_id = %origin.submission_id,
            attributes = %origin.attributes,
        );
        let _entered = span.enter();

        let ctx = HookContext {
            name: registration.name(),
            reference: &scope,
            binding: registration
                .scope()
                .parameters_from(scope.path())
                .unwrap_or_default(),
            session: ReadSession::tracked(root, Arc::clone(&self.sessions)),
            attributes: &origin.attributes,
            submission_id: &origin.submission_id,
            driver: self.outermost()?,
        };

        let started = Instant::now();
        log_op_start!("run_hook");
        let result = registration.call(&ctx);
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => {
                log_op_end!("run_hook", duration_ms = duration_ms);
            }
            Err(err) => {
                log_op_error!("run_hook", *err, duration_ms = duration_ms);
            }
        }
        result
    }

    /// References must be compiled against this tree's root type
    fn check_reference(&self, reference: &Reference) -> Result<()> {
        let expected = self.compiler.schema().root_name();
        if reference.root_type_name() == expected {
            Ok(())
        } else {
            Err(ArborError::type_mismatch(
                reference.path(),
                expected,
                reference.root_type_name(),
            ))
        }
    }
}

/// A versioned, immutable state tree
///
/// Reads go through [`ReadSession`]s, writes through [`driver`](Self::driver).
/// Cloning is cheap; clones share the same tree.
#[derive(Clone)]
pub struct StateTree {
    core: Arc<TreeCore>,
    driver: Arc<dyn Driver>,
}

impl StateTree {
    pub fn builder(schema: Arc<Schema>) -> StateTreeBuilder {
        StateTreeBuilder::new(schema)
    }

    pub fn compiler(&self) -> &Arc<Compiler> {
        self.core.compiler()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.core.compiler.schema()
    }

    /// Outermost stage of the driver stack
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Pin the current root until the session is dropped
    pub fn read_session(&self) -> ReadSession {
        ReadSession::tracked(self.core.root.load_full(), Arc::clone(&self.core.sessions))
    }

    /// Sessions currently open, including those held by running hooks
    pub fn open_sessions(&self) -> usize {
        self.core.sessions.load(Ordering::Acquire)
    }

    /// Current root without opening a session
    pub fn current_root(&self) -> Arc<Node> {
        self.core.root.load_full()
    }

    /// # Errors
    ///
    /// Path syntax errors, compile errors, or `TypeMismatch` against
    /// `expected`.
    pub fn reference(&self, path: &str, expected: &TypeExpr) -> Result<Reference> {
        self.core.compiler.parse_reference(path, expected)
    }

    /// # Errors
    ///
    /// Only if the root type cannot be compiled.
    pub fn root_reference(&self) -> Result<Reference> {
        self.core.compiler.root_reference()
    }

    /// Register a hook and run it once for every existing match of `scope`
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if `scope` belongs to another root type; otherwise the
    /// first error raised by a hook during the initial run. The registration
    /// is kept either way.
    pub fn register_hook<F>(
        &self,
        name: impl Into<String>,
        scope: &Reference,
        callback: F,
    ) -> Result<()>
    where
        F: Fn(&HookContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.core.register(HookRegistration::new(
            name,
            scope.clone(),
            Arc::new(callback),
        ))
    }

    /// Validate and register every hook method of `receiver`
    ///
    /// # Errors
    ///
    /// `InvalidHookMethod` / `InvalidHookParameter` naming the offending
    /// method; nothing is registered in that case.
    pub fn register_receiver<R>(&self, receiver: Arc<R>) -> Result<()>
    where
        R: HookReceiver,
    {
        crate::hooks::scan::register_receiver(self, receiver)
    }

    pub fn hook_count(&self) -> usize {
        self.core.registry.len()
    }

    /// Hook invocations queued but not yet run
    pub fn pending_hooks(&self) -> usize {
        self.core.scheduler.pending()
    }
}

impl std::fmt::Debug for StateTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTree")
            .field("root_type", &self.schema().root_name())
            .field("hooks", &self.hook_count())
            .field("open_sessions", &self.open_sessions())
            .finish()
    }
}

pub struct StateTreeBuilder {
    schema: Arc<Schema>,
    config: EngineConfig,
    stack: DriverStack,
    initializer: Option<RootInitializer>,
}

impl StateTreeBuilder {
    fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            config: EngineConfig::default(),
            stack: DriverStack::empty(),
            initializer: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn driver_stack(mut self, stack: DriverStack) -> Self {
        self.stack = stack;
        self
    }

    /// Root used when no downstream stage supplies one
    pub fn initial_root<F>(mut self, initializer: F) -> Self
    where
        F: Fn(&Arc<Compiler>) -> Result<Node> + Send + Sync + 'static,
    {
        self.initializer = Some(Box::new(initializer));
        self
    }

    /// # Errors
    ///
    /// `Config` for an invalid configuration or a missing initial root, type
    /// errors if the initial root does not fit the schema, and whatever the
    /// driver stack reports from `initial_root`.
    pub fn build(self) -> Result<StateTree> {
        let capacity = self.config.cache_capacity()?;
        let initializer = self.initializer.ok_or_else(|| ArborError::Config {
            message: "no initial root was supplied".to_string(),
        })?;

        let compiler = Compiler::new(self.schema, capacity);
        let core = Arc::new(TreeCore::new(Arc::clone(&compiler)));
        let local: Arc<dyn Driver> = Arc::new(LocalDriver::new(Arc::clone(&core), initializer));
        let driver = self.stack.build(local);
        // Set exactly once, just after the core is created
        let _ = core.outermost.set(Arc::downgrade(&driver));

        let root = driver.initial_root()?;
        let schema = compiler.schema();
        schema.check_value("/", &schema.root_type(), &root)?;
        core.root.store(Arc::new(root));
        tracing::debug!(root_type = schema.root_name(), "state tree built");

        Ok(StateTree { core, driver })
    }
}
