//! Diagnostic Attribute Tests
//!
//! Attributes given at submission reach every hook the update causes,
//! including hooks of nested updates, and are attached to the hook span.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use arbor_core::logging_facility::test_capture::init_test_capture;
use arbor_core::model::Node;
use arbor_core_types::schema::{EVENT_END_ERROR, EVENT_START, FIELD_ERR_CODE};
use arbor_core_types::DiagnosticAttributes;
use common::*;

#[test]
fn test_attributes_reach_nested_hooks() {
    // GIVEN A on a's label relaying to b's label, and C on b's label
    let tree = tree();
    let seen = Firings::new();
    let b_label = reference(&tree, "/children/b/label");

    let s = seen.clone();
    tree.register_hook("A", &reference(&tree, "/children/a/label"), move |ctx| {
        if ctx.value()? == Node::str("A2") {
            s.push(format!("A {} {}", ctx.attributes(), ctx.submission_id()));
            ctx.submit_replacement(&b_label, Node::str("B2"))?;
        }
        Ok(())
    })
    .unwrap();
    let s = seen.clone();
    tree.register_hook("C", &reference(&tree, "/children/b/label"), move |ctx| {
        if ctx.value()? == Node::str("B2") {
            s.push(format!("C {} {}", ctx.attributes(), ctx.submission_id()));
        }
        Ok(())
    })
    .unwrap();

    // WHEN submitting with attributes
    let attributes = DiagnosticAttributes::new()
        .with_attribute("tenant", "t1")
        .with_attribute("request", "r-9");
    tree.driver()
        .submit_replacement(&reference(&tree, "/children/a/label"), Node::str("A2"), &attributes)
        .unwrap();

    // THEN both hooks see them, under distinct submission ids
    let seen = seen.take();
    assert_eq!(seen.len(), 2);
    let a: Vec<&str> = seen[0].split(' ').collect();
    let c: Vec<&str> = seen[1].split(' ').collect();
    assert_eq!(a[..2], ["A", "request=r-9,tenant=t1"]);
    assert_eq!(c[..2], ["C", "request=r-9,tenant=t1"]);
    assert_ne!(a[2], c[2]);
}

#[test]
fn test_registration_runs_without_attributes() {
    let tree = tree();
    let seen = Firings::new();
    let s = seen.clone();
    tree.register_hook("plain", &reference(&tree, "/label"), move |ctx| {
        s.push(format!("[{}]", ctx.attributes()));
        Ok(())
    })
    .unwrap();
    assert_eq!(seen.take(), ["[]"]);
}

#[test]
fn test_hook_span_carries_attributes() {
    let capture = init_test_capture();
    let tree = tree();
    tree.register_hook("span-attrs-unique", &reference(&tree, "/children/a/label"), |ctx| {
        if ctx.value()? == Node::str("fail") {
            return Err(arbor_core::ArborError::HookFailed {
                hook: ctx.name().to_string(),
                message: "refused".to_string(),
            });
        }
        Ok(())
    })
    .unwrap();

    let attributes = DiagnosticAttributes::new().with_attribute("tenant", "t-span");
    tree.driver()
        .submit_replacement(&reference(&tree, "/children/a/label"), Node::str("A2"), &attributes)
        .unwrap();
    let _ = tree
        .driver()
        .submit_replacement(&reference(&tree, "/children/a/label"), Node::str("fail"), &attributes)
        .unwrap_err();

    let events: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|e| {
            e.op.as_deref() == Some("run_hook")
                && e.span_fields.get("hook").map(String::as_str) == Some("span-attrs-unique")
                && e.span_fields.get("attributes").map(String::as_str) == Some("tenant=t-span")
        })
        .collect();

    let start = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_START))
        .expect("hook start event inside the span");
    assert_eq!(
        start.span_fields.get("scope").map(String::as_str),
        Some("/children/a/label")
    );
    assert!(start.span_fields.contains_key("submission_id"));

    let failed = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("hook error event inside the span");
    assert_eq!(
        failed.fields.get(FIELD_ERR_CODE).map(String::as_str),
        Some("ERR_HOOK_FAILED")
    );
}
