//! Driver Pipeline Tests
//!
//! ## Scenarios Covered
//!
//! 1. Conditional replacement, creation and deletion
//! 2. Updates through missing entries are ignored; bad targets are errors
//! 3. Buffering stage: nothing applied before flush; flush failures
//! 4. Tracing stage: canonical op events with path and attributes
//! 5. Tree construction errors

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use arbor_core::logging_facility::test_capture::init_test_capture;
use arbor_core::model::{Node, ScalarKind};
use arbor_core::schema::TypeExpr;
use arbor_core::ArborError;
use arbor_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_ERR_CODE};
use arbor_core_types::DiagnosticAttributes;
use arbor_engine::{BufferingDriver, DriverStack, EngineConfig, StateTree, TracingDriver};
use common::*;

#[test]
fn test_conditional_replacement_checks_precondition_at_apply_time() {
    // GIVEN a tree with no owner
    let tree = tree();
    let owner = tree
        .reference("/owner", &TypeExpr::scalar(ScalarKind::Id))
        .unwrap();
    let a_label = reference(&tree, "/children/a/label");

    // WHEN the precondition does not hold (absent)
    tree.driver()
        .submit_conditional_replacement(&a_label, Node::str("A2"), &owner, &id("alice"), &attrs())
        .unwrap();
    // THEN nothing changes
    assert_eq!(label(&tree, "/children/a/label"), Node::str("A"));

    // WHEN it holds a different id
    tree.driver()
        .submit_replacement(&owner, Node::id(id("bob")), &attrs())
        .unwrap();
    tree.driver()
        .submit_conditional_replacement(&a_label, Node::str("A2"), &owner, &id("alice"), &attrs())
        .unwrap();
    assert_eq!(label(&tree, "/children/a/label"), Node::str("A"));

    // WHEN it holds the required id
    tree.driver()
        .submit_conditional_replacement(&a_label, Node::str("A2"), &owner, &id("bob"), &attrs())
        .unwrap();
    // THEN the replacement is applied
    assert_eq!(label(&tree, "/children/a/label"), Node::str("A2"));
}

#[test]
fn test_precondition_must_target_an_identifier() {
    let tree = tree();
    let err = tree
        .driver()
        .submit_conditional_deletion(
            &reference(&tree, "/children/a"),
            &reference(&tree, "/label"),
            &id("root"),
            &attrs(),
        )
        .unwrap_err();
    assert!(err.is_type_error());
    assert!(reference(&tree, "/children/a")
        .exists(&tree.read_session())
        .unwrap());
}

#[test]
fn test_conditional_creation_only_fills_absent_targets() {
    let tree = tree();
    let c = Arc::clone(tree.compiler());

    tree.driver()
        .submit_conditional_creation(
            &reference(&tree, "/children/a"),
            child(&c, "a", "replaced").into(),
            &attrs(),
        )
        .unwrap();
    assert_eq!(label(&tree, "/children/a/label"), Node::str("A"));

    tree.driver()
        .submit_conditional_creation(
            &reference(&tree, "/children/d"),
            child(&c, "d", "D").into(),
            &attrs(),
        )
        .unwrap();
    assert_eq!(label(&tree, "/children/d/label"), Node::str("D"));
}

#[test]
fn test_conditional_deletion() {
    let tree = tree();
    let owner = reference(&tree, "/owner");
    tree.driver()
        .submit_replacement(&owner, Node::id(id("alice")), &attrs())
        .unwrap();

    let c_ref = reference(&tree, "/children/c");
    tree.driver()
        .submit_conditional_deletion(&c_ref, &owner, &id("bob"), &attrs())
        .unwrap();
    assert!(c_ref.exists(&tree.read_session()).unwrap());

    tree.driver()
        .submit_conditional_deletion(&c_ref, &owner, &id("alice"), &attrs())
        .unwrap();
    assert!(!c_ref.exists(&tree.read_session()).unwrap());
}

#[test]
fn test_update_under_missing_entry_is_ignored() {
    let tree = tree();
    let before = tree.current_root();

    tree.driver()
        .submit_replacement(&reference(&tree, "/children/zzz/label"), Node::str("x"), &attrs())
        .unwrap();
    tree.driver()
        .submit_deletion(&reference(&tree, "/children/zzz"), &attrs())
        .unwrap();

    assert!(tree.current_root().ptr_eq(&before));
}

#[test]
fn test_invalid_targets_are_rejected() {
    let tree = tree();

    let err = tree
        .driver()
        .submit_replacement(&reference(&tree, "/children/-child-/label"), Node::str("x"), &attrs())
        .unwrap_err();
    assert!(matches!(err, ArborError::IndefiniteReference { .. }));

    let err = tree
        .driver()
        .submit_deletion(&reference(&tree, "/label"), &attrs())
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let err = tree
        .driver()
        .submit_replacement(&reference(&tree, "/label"), Node::int(1), &attrs())
        .unwrap_err();
    assert!(err.is_type_error());
}

#[test]
fn test_buffered_updates_apply_on_flush() {
    // GIVEN a buffering stage and a hook on a's label
    let tree = tree_with_stack(DriverStack::of([BufferingDriver::factory()]));
    let firings = Firings::new();
    let a_label = reference(&tree, "/children/a/label");
    let f = firings.clone();
    tree.register_hook("a-label", &a_label, move |ctx| {
        f.push(ctx.submission_id().to_string());
        Ok(())
    })
    .unwrap();
    firings.take();

    // WHEN two updates are submitted
    tree.driver()
        .submit_replacement(&a_label, Node::str("A2"), &attrs())
        .unwrap();
    tree.driver()
        .submit_deletion(&reference(&tree, "/children/c"), &attrs())
        .unwrap();

    // THEN nothing is visible yet
    assert_eq!(label(&tree, "/children/a/label"), Node::str("A"));
    assert!(firings.snapshot().is_empty());

    // WHEN flushed
    tree.driver().flush().unwrap();

    // THEN both are applied in order and the hook ran once
    assert_eq!(label(&tree, "/children/a/label"), Node::str("A2"));
    assert!(!reference(&tree, "/children/c")
        .exists(&tree.read_session())
        .unwrap());
    assert_eq!(firings.take().len(), 1);
}

#[test]
fn test_flush_failure_is_structured_and_keeps_the_rest() {
    let tree = tree_with_stack(DriverStack::of([BufferingDriver::factory()]));

    tree.driver()
        .submit_replacement(&reference(&tree, "/label"), Node::int(7), &attrs())
        .unwrap();
    tree.driver()
        .submit_replacement(&reference(&tree, "/label"), Node::str("renamed"), &attrs())
        .unwrap();

    let err = tree.driver().flush().unwrap_err();
    match err {
        ArborError::FlushFailed {
            ref path,
            pending,
            ref source,
        } => {
            assert_eq!(path, "/label");
            assert_eq!(pending, 1);
            assert!(source.is_type_error());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(label(&tree, "/label"), Node::str("root"));

    tree.driver().flush().unwrap();
    assert_eq!(label(&tree, "/label"), Node::str("renamed"));
}

#[test]
fn test_hook_error_passes_through_flush_unchanged() {
    // GIVEN a buffering stack and a hook that refuses "A2"
    let tree = tree_with_stack(DriverStack::of([
        TracingDriver::factory(),
        BufferingDriver::factory(),
    ]));
    let a_label = reference(&tree, "/children/a/label");
    tree.register_hook("A", &a_label, |ctx| {
        if ctx.value()? == Node::str("A2") {
            return Err(ArborError::HookFailed {
                hook: "A".to_string(),
                message: "refused".to_string(),
            });
        }
        Ok(())
    })
    .unwrap();

    // WHEN the update is buffered, followed by another one
    tree.driver()
        .submit_replacement(&a_label, Node::str("A2"), &attrs())
        .unwrap();
    tree.driver()
        .submit_replacement(&reference(&tree, "/label"), Node::str("later"), &attrs())
        .unwrap();
    let err = tree.driver().flush().unwrap_err();

    // THEN the hook's own error comes out of flush
    assert_eq!(
        err,
        ArborError::HookFailed {
            hook: "A".to_string(),
            message: "refused".to_string(),
        }
    );
    // AND the update itself was applied; the next one waits for another flush
    assert_eq!(label(&tree, "/children/a/label"), Node::str("A2"));
    assert_eq!(label(&tree, "/label"), Node::str("root"));

    tree.driver().flush().unwrap();
    assert_eq!(label(&tree, "/label"), Node::str("later"));
}

#[test]
fn test_hook_submissions_join_the_current_flush() {
    // GIVEN a buffering stack and a hook that copies a's label into b's
    let tree = tree_with_stack(DriverStack::of([BufferingDriver::factory()]));
    let b_label = reference(&tree, "/children/b/label");
    tree.register_hook("copy", &reference(&tree, "/children/a/label"), move |ctx| {
        let value = ctx.value()?;
        if value != Node::str("A") {
            ctx.submit_replacement(&b_label, value)?;
        }
        Ok(())
    })
    .unwrap();

    tree.driver()
        .submit_replacement(&reference(&tree, "/children/a/label"), Node::str("copied"), &attrs())
        .unwrap();
    tree.driver().flush().unwrap();

    assert_eq!(label(&tree, "/children/b/label"), Node::str("copied"));
}

#[test]
fn test_tracing_stage_logs_canonical_events() {
    let capture = init_test_capture();
    let tree = tree_with_stack(DriverStack::of([TracingDriver::factory()]));
    let target = reference(&tree, "/children/tracing-unique-1");
    let attributes = DiagnosticAttributes::new().with_attribute("tenant", "t-trace");

    tree.driver().submit_deletion(&target, &attributes).unwrap();
    let _ = tree
        .driver()
        .submit_deletion(&reference(&tree, "/children/tracing-unique-1/label"), &attributes)
        .unwrap_err();

    let events: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|e| e.op.as_deref() == Some("submit_deletion"))
        .collect();
    let start = events
        .iter()
        .find(|e| {
            e.event.as_deref() == Some(EVENT_START)
                && e.fields.get("path").map(String::as_str) == Some("/children/tracing-unique-1")
        })
        .expect("start event");
    assert_eq!(
        start.fields.get("attributes").map(String::as_str),
        Some("tenant=t-trace")
    );
    assert!(events.iter().any(|e| e.event.as_deref() == Some(EVENT_END)));
    assert!(events.iter().any(|e| {
        e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.fields.get(FIELD_ERR_CODE).map(String::as_str) == Some("ERR_INVALID_ARGUMENT")
    }));
}

#[test]
fn test_stack_order_is_outermost_first() {
    // Tracing outside buffering: the submission is logged before it is buffered
    let capture = init_test_capture();
    let tree = tree_with_stack(DriverStack::of([
        TracingDriver::factory(),
        BufferingDriver::factory(),
    ]));
    let target = reference(&tree, "/children/stack-order-unique");

    tree.driver().submit_deletion(&target, &attrs()).unwrap();

    let logged = |capture: &arbor_core::logging_facility::TestCapture| {
        capture.count_events(|e| {
            e.op.as_deref() == Some("submit_deletion")
                && e.event.as_deref() == Some(EVENT_START)
                && e.fields.get("path").map(String::as_str) == Some("/children/stack-order-unique")
        })
    };
    assert_eq!(logged(&capture), 1);

    // Flushing goes through the tracing stage too, but replays nothing there
    tree.driver().flush().unwrap();
    assert_eq!(logged(&capture), 1);
    capture.assert_event_exists("flush", EVENT_END);
}

#[test]
fn test_build_errors() {
    let err = StateTree::builder(schema()).config(config()).build().unwrap_err();
    assert!(matches!(err, ArborError::Config { .. }));

    let err = StateTree::builder(schema())
        .config(EngineConfig {
            accessor_cache_capacity: 0,
            ..config()
        })
        .initial_root(|c| Ok(root_with(c, Vec::new())))
        .build()
        .unwrap_err();
    assert!(matches!(err, ArborError::Config { .. }));

    let err = StateTree::builder(schema())
        .config(config())
        .initial_root(|_| Ok(Node::str("not a root")))
        .build()
        .unwrap_err();
    assert!(err.is_type_error());
}
