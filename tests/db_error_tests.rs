//! Repository error type behavior: display, context, retryability.

use calendary_rust::db::repository::{ErrorContext, RepositoryError};

#[test]
fn test_error_context_display() {
    let context = ErrorContext::new("create_session")
        .with_entity("session")
        .with_entity_id(7)
        .with_details("blocking_session_id=3");
    let rendered = context.to_string();
    assert!(rendered.contains("operation=create_session"));
    assert!(rendered.contains("entity=session"));
    assert!(rendered.contains("id=7"));
    assert!(rendered.contains("details=blocking_session_id=3"));
}

#[test]
fn test_connection_errors_are_retryable() {
    assert!(RepositoryError::connection("pool exhausted").is_retryable());
    assert!(RepositoryError::timeout("query timed out").is_retryable());
    assert!(!RepositoryError::not_found("missing").is_retryable());
    assert!(!RepositoryError::conflict("duplicate").is_retryable());
    assert!(!RepositoryError::validation("bad window").is_retryable());
}

#[test]
fn test_with_operation_updates_context() {
    let err = RepositoryError::not_found("Session 9 not found").with_operation("get_session");
    assert_eq!(err.context().operation.as_deref(), Some("get_session"));
}

#[test]
fn test_error_display_includes_message_and_context() {
    let err = RepositoryError::conflict_with_context(
        "Teacher 1 already has a session",
        ErrorContext::new("create_session").with_entity("session"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("Conflict:"));
    assert!(rendered.contains("Teacher 1 already has a session"));
    assert!(rendered.contains("operation=create_session"));
}

#[test]
fn test_string_conversions() {
    let err: RepositoryError = "boom".into();
    assert!(matches!(err, RepositoryError::InternalError { .. }));

    let err: RepositoryError = String::from("boom").into();
    assert!(matches!(err, RepositoryError::InternalError { .. }));
}
