//! Error responses under a production configuration.
//!
//! Kept in its own test binary: the production flag is fixed once per process.
//!
//! Run with: `cargo test -p docket-api --test production_errors_test`

mod helpers;

use helpers::{api_path, setup_test_app_with, test_config, TEST_USER_ID};
use serde_json::{json, Value};

/// Test that a production config hides error details, whatever the process
/// environment says
#[tokio::test]
async fn test_production_config_hides_error_details() {
    let app = setup_test_app_with(test_config("production"));
    assert!(app.state.is_production);

    let response = app
        .client()
        .get(&api_path("/documents/batch/tasks/does-not-exist"))
        .add_header("X-User-Id", TEST_USER_ID.to_string())
        .await;

    assert_eq!(response.status_code(), 404);
    let data: Value = response.json();
    assert_eq!(data["code"], "NOT_FOUND");
    assert_eq!(data["error"], "Task not found");
    assert!(data.get("details").is_none());
    assert!(data.get("error_type").is_none());

    let response = app
        .client()
        .post(&api_path("/documents/batch/metadata"))
        .json(&json!({ "document_ids": [1], "metadata": { "author": "Joana Prado" } }))
        .await;
    assert_eq!(response.status_code(), 401);
    assert!(response.json::<Value>().get("details").is_none());
}
