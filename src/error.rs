//! Error types and exit codes for gitops-engine

use std::process::ExitCode;

use serde::Serialize;
use thiserror::Error;

use crate::capabilities::Operation;

/// Coarse classification of a failure, stable across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    UnsupportedCapability,
    Timeout,
    Cancelled,
    SigningFailed,
    PermissionDenied,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::UnsupportedCapability => "unsupported_capability",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::SigningFailed => "signing_failed",
            Self::PermissionDenied => "permission_denied",
            Self::Internal => "internal",
        }
    }

    /// Failures a caller can fix and retry (credentials, signing setup).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SigningFailed | Self::PermissionDenied)
    }
}

/// Raw context kept on every classified error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Arguments passed to git (without the engine's global prefix)
    pub args: Vec<String>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Opaque request trace id supplied by the caller
    pub trace: Option<String>,
}

impl Diagnostics {
    pub fn with_args(args: &[String], trace: Option<String>) -> Self {
        Self {
            args: args.to_vec(),
            trace,
            ..Self::default()
        }
    }

    /// stderr followed by stdout, for messages that need the full picture.
    pub fn combined_output(&self) -> String {
        match (self.stderr.trim(), self.stdout.trim()) {
            ("", out) => out.to_string(),
            (err, "") => err.to_string(),
            (err, out) => format!("{}\n{}", err, out),
        }
    }
}

/// Main error type for gitops-engine operations
#[derive(Error, Debug)]
pub enum GitOpsError {
    #[error("{operation}: not found: {message}")]
    NotFound {
        operation: Operation,
        message: String,
        diagnostics: Box<Diagnostics>,
    },

    #[error("{operation}: invalid request: {message}")]
    Validation {
        operation: Operation,
        message: String,
        diagnostics: Box<Diagnostics>,
    },

    #[error("{operation}: conflict: {message}")]
    Conflict {
        operation: Operation,
        message: String,
        /// Conflicting paths reported by git, if any
        paths: Vec<String>,
        diagnostics: Box<Diagnostics>,
    },

    #[error("{operation} is not supported by the {provider} provider")]
    UnsupportedCapability {
        operation: Operation,
        provider: &'static str,
    },

    #[error("{operation}: timed out after {timeout_ms} ms")]
    Timeout {
        operation: Operation,
        timeout_ms: u64,
        diagnostics: Box<Diagnostics>,
    },

    #[error("{operation}: cancelled")]
    Cancelled {
        operation: Operation,
        diagnostics: Box<Diagnostics>,
    },

    #[error("{operation}: signing failed: {message}")]
    SigningFailed {
        operation: Operation,
        message: String,
        diagnostics: Box<Diagnostics>,
    },

    #[error("{operation}: permission denied: {message}")]
    PermissionDenied {
        operation: Operation,
        message: String,
        diagnostics: Box<Diagnostics>,
    },

    #[error("{operation}: {message}")]
    Internal {
        operation: Operation,
        message: String,
        diagnostics: Box<Diagnostics>,
    },
}

impl GitOpsError {
    /// Validation failure raised before anything was spawned.
    pub fn validation(operation: Operation, message: impl Into<String>) -> Self {
        Self::Validation {
            operation,
            message: message.into(),
            diagnostics: Box::default(),
        }
    }

    pub fn internal(operation: Operation, message: impl Into<String>) -> Self {
        Self::Internal {
            operation,
            message: message.into(),
            diagnostics: Box::default(),
        }
    }

    pub fn cancelled(operation: Operation) -> Self {
        Self::Cancelled {
            operation,
            diagnostics: Box::default(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::UnsupportedCapability { .. } => ErrorKind::UnsupportedCapability,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::SigningFailed { .. } => ErrorKind::SigningFailed,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::NotFound { operation, .. }
            | Self::Validation { operation, .. }
            | Self::Conflict { operation, .. }
            | Self::UnsupportedCapability { operation, .. }
            | Self::Timeout { operation, .. }
            | Self::Cancelled { operation, .. }
            | Self::SigningFailed { operation, .. }
            | Self::PermissionDenied { operation, .. }
            | Self::Internal { operation, .. } => *operation,
        }
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Self::UnsupportedCapability { .. } => None,
            Self::NotFound { diagnostics, .. }
            | Self::Validation { diagnostics, .. }
            | Self::Conflict { diagnostics, .. }
            | Self::Timeout { diagnostics, .. }
            | Self::Cancelled { diagnostics, .. }
            | Self::SigningFailed { diagnostics, .. }
            | Self::PermissionDenied { diagnostics, .. }
            | Self::Internal { diagnostics, .. } => Some(diagnostics),
        }
    }

    /// Convert error to an exit code for the CLI:
    /// - 2: Validation
    /// - 3: Not found
    /// - 4: Conflict
    /// - 5: Unsupported capability
    /// - 6: Timeout / cancelled
    /// - 7: Signing or permission failure
    /// - 1: Anything else
    pub fn exit_code(&self) -> ExitCode {
        match self.kind() {
            ErrorKind::Validation => ExitCode::from(2),
            ErrorKind::NotFound => ExitCode::from(3),
            ErrorKind::Conflict => ExitCode::from(4),
            ErrorKind::UnsupportedCapability => ExitCode::from(5),
            ErrorKind::Timeout | ErrorKind::Cancelled => ExitCode::from(6),
            ErrorKind::SigningFailed | ErrorKind::PermissionDenied => ExitCode::from(7),
            ErrorKind::Internal => ExitCode::from(1),
        }
    }

    /// Structured form used by the dispatch layer and the CLI.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "kind": self.kind(),
            "operation": self.operation(),
            "message": self.to_string(),
            "recoverable": self.kind().is_recoverable(),
        });
        if let Self::Conflict { paths, .. } = self {
            value["paths"] = serde_json::json!(paths);
        }
        if let Some(diagnostics) = self.diagnostics() {
            value["diagnostics"] = serde_json::to_value(diagnostics).unwrap_or_default();
        }
        value
    }
}

/// Result type alias for gitops-engine operations
pub type Result<T> = std::result::Result<T, GitOpsError>;
