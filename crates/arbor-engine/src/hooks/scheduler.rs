//! Hook matching, queueing and draining
//!
//! Updates to one tree are applied under a reentrant lock. Applying an update
//! queues one invocation per affected (registration, concrete scope) pair and
//! then drains the queue on the same thread. Updates submitted by a running
//! hook re-enter the lock, install their root and append their invocations
//! to the same queue, so nested updates are handled breadth-first.
//!
//! When a hook fails the drain stops: its error is returned to whoever
//! started the drain, and every invocation still queued is dropped. Roots
//! already installed by nested updates stay installed.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use arbor_core::errors::{ArborError, Result};
use arbor_core::model::{Identifier, Node};
use arbor_core::{BindingEnvironment, Path, Reference, Segment};
use arbor_core_types::{DiagnosticAttributes, SubmissionId};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use super::registry::HookRegistration;

thread_local! {
    /// Set when a drain on this thread stopped because a hook failed
    static HOOK_FAILED: Cell<bool> = const { Cell::new(false) };
}

/// Run `f` and report whether a drain it started ended in a hook failure
///
/// Lets a stage that forwards updates tell a hook's error (the update itself
/// was applied) from a refused update.
pub(crate) fn observe_hook_failure<T>(f: impl FnOnce() -> T) -> (T, bool) {
    let outer = HOOK_FAILED.with(|flag| flag.replace(false));
    let out = f();
    let failed = HOOK_FAILED.with(|flag| flag.replace(outer));
    (out, failed)
}

/// Diagnostic context of one accepted update, shared by all its invocations
#[derive(Debug)]
pub(crate) struct UpdateOrigin {
    pub(crate) submission_id: SubmissionId,
    pub(crate) attributes: DiagnosticAttributes,
}

impl UpdateOrigin {
    pub(crate) fn new(attributes: DiagnosticAttributes) -> Arc<Self> {
        Arc::new(Self {
            submission_id: SubmissionId::new(),
            attributes,
        })
    }
}

/// One pending hook call
pub(crate) struct HookInvocation {
    pub(crate) registration: Arc<HookRegistration>,
    /// Definite scope
    pub(crate) scope: Reference,
    /// Root installed by the triggering update
    pub(crate) root: Arc<Node>,
    pub(crate) origin: Arc<UpdateOrigin>,
}

#[derive(Default)]
pub(crate) struct DrainState {
    queue: VecDeque<HookInvocation>,
    draining: bool,
}

pub(crate) type UpdateGuard<'a> = ReentrantMutexGuard<'a, RefCell<DrainState>>;

#[derive(Default)]
pub struct HookScheduler {
    state: ReentrantMutex<RefCell<DrainState>>,
}

impl HookScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize updates; re-entrant for hooks running on the draining thread
    pub(crate) fn lock(&self) -> UpdateGuard<'_> {
        self.state.lock()
    }

    /// Invocations waiting to run
    ///
    /// Blocks while another thread is applying an update.
    pub fn pending(&self) -> usize {
        let state = self.state.lock();
        let len = state.borrow().queue.len();
        len
    }

    /// Queue every hook whose scope overlaps `target`
    ///
    /// A scope overlaps when it and the target agree on their common prefix
    /// (binding the scope's parameters from the target as they go). The
    /// bound scope is then expanded over `prior` and `current`.
    ///
    /// # Errors
    ///
    /// User accessor failures met while comparing the two roots.
    pub(crate) fn queue_update(
        &self,
        guard: &UpdateGuard<'_>,
        registrations: &[Arc<HookRegistration>],
        target: &Path,
        prior: &Node,
        current: &Arc<Node>,
        origin: &Arc<UpdateOrigin>,
    ) -> Result<usize> {
        let mut found = Vec::new();
        for registration in registrations {
            let scope = registration.scope();
            let shared = scope.path().len().min(target.len());
            let Some(env) = scope
                .path()
                .truncated_to(shared)
                .parameters_from(&target.truncated_to(shared))
            else {
                continue;
            };
            let bound = scope.bound_by(&env)?;
            cascade(registration, bound, Some(prior), current, origin, &mut found)?;
        }
        Ok(enqueue(guard, found))
    }

    /// Queue one invocation per existing match of a new registration
    ///
    /// # Errors
    ///
    /// User accessor failures met while enumerating matches.
    pub(crate) fn queue_registration(
        &self,
        guard: &UpdateGuard<'_>,
        registration: &Arc<HookRegistration>,
        current: &Arc<Node>,
        origin: &Arc<UpdateOrigin>,
    ) -> Result<usize> {
        let mut found = Vec::new();
        cascade(
            registration,
            registration.scope().clone(),
            None,
            current,
            origin,
            &mut found,
        )?;
        Ok(enqueue(guard, found))
    }

    /// Run queued invocations until the queue is empty
    ///
    /// Returns immediately when this thread is already draining; the outer
    /// drain will reach whatever was just queued.
    ///
    /// # Errors
    ///
    /// The first hook error, unchanged. Remaining invocations are abandoned.
    pub(crate) fn drain<F>(&self, guard: &UpdateGuard<'_>, mut run: F) -> Result<()>
    where
        F: FnMut(HookInvocation) -> Result<()>,
    {
        {
            let mut state = guard.borrow_mut();
            if state.draining {
                return Ok(());
            }
            state.draining = true;
        }
        let _reset = DrainReset(guard);

        loop {
            let next = guard.borrow_mut().queue.pop_front();
            let Some(invocation) = next else {
                return Ok(());
            };
            if let Err(err) = run(invocation) {
                HOOK_FAILED.with(|flag| flag.set(true));
                let abandoned = guard.borrow().queue.len();
                if abandoned > 0 {
                    tracing::warn!(abandoned, "hook failed; abandoning queued hooks");
                }
                return Err(err);
            }
        }
    }
}

impl std::fmt::Debug for HookScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookScheduler").finish_non_exhaustive()
    }
}

/// Clears the drain flag and leftover queue on every exit, including unwinds
struct DrainReset<'a>(&'a RefCell<DrainState>);

impl Drop for DrainReset<'_> {
    fn drop(&mut self) {
        let mut state = self.0.borrow_mut();
        state.draining = false;
        state.queue.clear();
    }
}

fn enqueue(guard: &UpdateGuard<'_>, found: Vec<HookInvocation>) -> usize {
    let count = found.len();
    guard.borrow_mut().queue.extend(found);
    count
}

/// Expand `scope` into concrete invocations
///
/// A definite scope fires when its value differs (by identity) between the
/// two roots. An indefinite scope is expanded at its first parameter over the
/// container found there: entries gone from `current` first, latest first,
/// then entries of `current` in order.
fn cascade(
    registration: &Arc<HookRegistration>,
    scope: Reference,
    prior: Option<&Node>,
    current: &Arc<Node>,
    origin: &Arc<UpdateOrigin>,
    found: &mut Vec<HookInvocation>,
) -> Result<()> {
    let Some(index) = scope.path().first_parameter_index() else {
        let before = match prior {
            Some(root) => scope.value_if_exists_in(root)?,
            None => None,
        };
        let after = scope.value_if_exists_in(current)?;
        let changed = match (&before, &after) {
            (Some(b), Some(a)) => !b.ptr_eq(a),
            (None, None) => false,
            _ => true,
        };
        if changed {
            found.push(HookInvocation {
                registration: Arc::clone(registration),
                scope,
                root: Arc::clone(current),
                origin: Arc::clone(origin),
            });
        }
        return Ok(());
    };

    let param = match scope.path().segment(index) {
        Some(Segment::Param(name)) => name.clone(),
        _ => {
            return Err(ArborError::Internal {
                message: format!("no parameter at segment {} of {}", index, scope.path()),
            })
        }
    };
    let container = scope.truncated_to(index)?;
    let before = match prior {
        Some(root) => container.value_if_exists_in(root)?,
        None => None,
    };
    let after = container.value_if_exists_in(current)?;
    if let (Some(b), Some(a)) = (&before, &after) {
        if b.ptr_eq(a) {
            return Ok(());
        }
    }

    let before_ids = before.as_ref().and_then(Node::entry_ids).unwrap_or_default();
    let after_ids = after.as_ref().and_then(Node::entry_ids).unwrap_or_default();
    let present: HashSet<&Identifier> = after_ids.iter().collect();

    let removed = before_ids.iter().rev().filter(|id| !present.contains(id));
    for id in removed.chain(after_ids.iter()) {
        let env = BindingEnvironment::new().with_binding(param.as_str(), id.clone());
        cascade(
            registration,
            scope.bound_by(&env)?,
            prior,
            current,
            origin,
            found,
        )?;
    }
    Ok(())
}
