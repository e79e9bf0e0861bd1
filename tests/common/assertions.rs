//! Custom assertions for integration tests

use serde_json::Value;

use gitops_engine::{ErrorKind, GitOpsError};

/// Assert that output is valid JSON and return parsed value
pub fn assert_valid_json(output: &str, context: &str) -> Value {
    serde_json::from_str(output).unwrap_or_else(|e| {
        panic!(
            "Expected valid JSON ({}): {}\nOutput:\n{}",
            context, e, output
        )
    })
}

/// Assert that a result failed with the given error kind
pub fn assert_error_kind<T: std::fmt::Debug>(
    result: Result<T, GitOpsError>,
    expected: ErrorKind,
) -> GitOpsError {
    match result {
        Ok(value) => panic!("Expected {:?} error, got Ok({:?})", expected, value),
        Err(error) => {
            assert_eq!(
                error.kind(),
                expected,
                "Expected {:?} but got {:?}: {}",
                expected,
                error.kind(),
                error
            );
            error
        }
    }
}

/// Assert that `needle` appears in `paths`
pub fn assert_has_path(paths: &[String], needle: &str) {
    assert!(
        paths.iter().any(|p| p == needle),
        "Expected '{}' in {:?}",
        needle,
        paths
    );
}
