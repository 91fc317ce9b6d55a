#![allow(clippy::unwrap_used, clippy::expect_used)]

use arbor_core::errors::{ArborError, ExErrorKind};
use arbor_core::logging_facility::test_capture::init_test_capture;
use arbor_core::{log_op_end, log_op_error, log_op_start};
use arbor_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_DURATION_MS, FIELD_ERR_CODE, FIELD_ERR_KIND,
};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, path = "/children/a");

    let events = capture.events();
    let start = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START))
        .expect("start event captured");
    assert_eq!(start.fields.get("path"), Some(&"/children/a".to_string()));
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let end_events: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .collect();

    assert_eq!(end_events.len(), 1, "Should have exactly one end event");
    assert_eq!(
        end_events[0].fields.get(FIELD_DURATION_MS),
        Some(&"42".to_string())
    );
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = ArborError::nonexistent("/children/a");
    log_op_error!(op_name, err, duration_ms = 10);

    // The macro borrows, so the error is still usable
    assert_eq!(err.kind(), ExErrorKind::NotFound);

    let error_events: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|e| {
            e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR)
        })
        .collect();

    assert_eq!(error_events.len(), 1, "Should have exactly one error event");
    assert_eq!(
        error_events[0].fields.get(FIELD_ERR_CODE),
        Some(&"ERR_NONEXISTENT_ENTRY".to_string())
    );
    assert_eq!(
        error_events[0].fields.get(FIELD_ERR_KIND),
        Some(&"NotFound".to_string())
    );
}

#[test]
fn test_span_fields_are_attached_to_events() {
    let capture = init_test_capture();
    let op_name = "test_span_fields_unique_4";

    let span = tracing::info_span!("hook", hook = "audit", attributes = "tenant=t1");
    span.in_scope(|| {
        log_op_start!(op_name);
    });

    let event = capture
        .events()
        .into_iter()
        .find(|e| e.op.as_deref() == Some(op_name))
        .expect("event captured");
    assert_eq!(event.span_fields.get("hook"), Some(&"audit".to_string()));
    assert_eq!(
        event.span_fields.get("attributes"),
        Some(&"tenant=t1".to_string())
    );
}
