//! Translation of raw process and libgit2 failures into [`GitOpsError`]
//!
//! This is the only place git's message text is interpreted. Rules are tried
//! in order against stderr first, then against stdout; the first match wins.
//! Matching is case-insensitive on substrings, which holds because the engine
//! forces a C.UTF-8 locale on every child.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::capabilities::Operation;
use crate::context::TraceId;
use crate::error::{Diagnostics, ErrorKind, GitOpsError};
use crate::exec::ProcessError;

/// What was being attempted when a process failed.
#[derive(Debug, Clone, Copy)]
pub struct Failure<'a> {
    pub operation: Operation,
    pub args: &'a [String],
    pub trace: &'a TraceId,
    pub cwd: &'a Path,
}

struct Rule {
    kind: ErrorKind,
    needles: &'static [&'static str],
}

/// Ordered classification table.
static RULES: &[Rule] = &[
    Rule {
        kind: ErrorKind::NotFound,
        needles: &["not a git repository"],
    },
    Rule {
        kind: ErrorKind::Conflict,
        needles: &["already exists"],
    },
    Rule {
        kind: ErrorKind::NotFound,
        needles: &[
            "unknown revision",
            "bad revision",
            "not found",
            "did not match any",
            "does not exist",
            "no such ref",
            "no such remote",
            "no such path",
            "couldn't find remote ref",
            "does not have any commits yet",
            "invalid reference",
            "not a valid object name",
            "needed a single revision",
            "no stash entries found",
            "is not a valid reference",
            "is not a working tree",
        ],
    },
    Rule {
        kind: ErrorKind::Conflict,
        needles: &[
            "unmerged paths",
            "you have unmerged",
            "merge conflict",
            "conflict (",
            "needs merge",
            "could not apply",
            "fix conflicts",
            "would be overwritten",
            "not fully merged",
            "[rejected]",
            "non-fast-forward",
            "not possible to fast-forward",
        ],
    },
    Rule {
        kind: ErrorKind::SigningFailed,
        needles: &[
            "gpg failed to sign",
            "failed to sign",
            "signing failed",
            "cannot run gpg",
        ],
    },
    Rule {
        kind: ErrorKind::PermissionDenied,
        needles: &[
            "permission denied",
            "authentication failed",
            "could not read username",
            "could not read password",
            "terminal prompts disabled",
            "access denied",
        ],
    },
    Rule {
        kind: ErrorKind::Validation,
        needles: &[
            "is not a valid",
            "unknown option",
            "unknown switch",
            "nothing to commit",
            "nothing added to commit",
            "no changes added to commit",
            "usage: git",
        ],
    },
];

static MERGE_CONFLICT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^CONFLICT \([^)]*\): Merge conflict in (.+?)\s*$").unwrap());
static DELETE_CONFLICT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^CONFLICT \((?:modify/delete|delete/modify|rename/delete|file/directory|directory/file)\): (\S+)")
        .unwrap()
});

/// Classify free-form git output.
///
/// Returns the matched kind and the line that triggered it, with git's
/// `fatal:`/`error:` prefix removed.
pub fn classify(stdout: &str, stderr: &str) -> Option<(ErrorKind, String)> {
    for text in [stderr, stdout] {
        let lowered = text.to_lowercase();
        for rule in RULES {
            if let Some(needle) = rule.needles.iter().find(|n| lowered.contains(*n)) {
                return Some((rule.kind, matching_line(text, needle)));
            }
        }
    }
    None
}

fn matching_line(text: &str, needle: &str) -> String {
    let line = text
        .lines()
        .find(|l| l.to_lowercase().contains(needle))
        .unwrap_or(text)
        .trim();
    strip_git_prefix(line).to_string()
}

fn strip_git_prefix(line: &str) -> &str {
    for prefix in ["fatal: ", "error: ", "hint: ", "warning: "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return rest;
        }
    }
    line
}

/// Paths named in `CONFLICT (...)` lines.
pub fn conflict_paths(text: &str) -> Vec<String> {
    let mut paths: Vec<String> = MERGE_CONFLICT_RE
        .captures_iter(text)
        .chain(DELETE_CONFLICT_RE.captures_iter(text))
        .map(|c| c[1].to_string())
        .collect();
    paths.dedup();
    paths
}

/// Turn a process failure into a domain error.
pub fn map_process_error(err: ProcessError, failure: &Failure<'_>) -> GitOpsError {
    let operation = failure.operation;
    let mut diagnostics = Diagnostics::with_args(failure.args, Some(failure.trace.to_string()));

    match err {
        ProcessError::Exited {
            exit_code,
            stdout,
            stderr,
        } => {
            diagnostics.exit_code = exit_code;
            diagnostics.stdout = stdout;
            diagnostics.stderr = stderr;
            from_output(operation, diagnostics)
        }
        ProcessError::Timeout {
            timeout,
            stdout,
            stderr,
        } => {
            diagnostics.stdout = stdout;
            diagnostics.stderr = stderr;
            GitOpsError::Timeout {
                operation,
                timeout_ms: timeout.as_millis() as u64,
                diagnostics: Box::new(diagnostics),
            }
        }
        ProcessError::Cancelled => GitOpsError::Cancelled {
            operation,
            diagnostics: Box::new(diagnostics),
        },
        ProcessError::Spawn { program, source } => {
            let missing_cwd = !failure.cwd.is_dir();
            diagnostics.stderr = source.to_string();
            if missing_cwd {
                GitOpsError::NotFound {
                    operation,
                    message: format!(
                        "working directory does not exist: {}",
                        failure.cwd.display()
                    ),
                    diagnostics: Box::new(diagnostics),
                }
            } else {
                GitOpsError::Internal {
                    operation,
                    message: format!("failed to execute {}: {}", program.display(), source),
                    diagnostics: Box::new(diagnostics),
                }
            }
        }
    }
}

/// A quiet query that found nothing: exit code 1 and an empty stderr.
/// `rev-parse --verify -q` and `symbolic-ref -q` answer a missing ref this way;
/// any real failure prints a diagnostic.
pub fn is_quiet_miss(err: &GitOpsError) -> bool {
    matches!(
        err,
        GitOpsError::Internal { diagnostics, .. }
            if diagnostics.exit_code == Some(1) && diagnostics.stderr.trim().is_empty()
    )
}

/// Classify already-captured output of a failed run.
pub fn from_output(operation: Operation, diagnostics: Diagnostics) -> GitOpsError {
    let classified = classify(&diagnostics.stdout, &diagnostics.stderr);
    let diagnostics = Box::new(diagnostics);

    let Some((kind, message)) = classified else {
        let output = diagnostics.combined_output();
        let message = if output.is_empty() {
            format!(
                "git exited with code {}",
                diagnostics
                    .exit_code
                    .map_or_else(|| "none".to_string(), |c| c.to_string())
            )
        } else {
            output
        };
        return GitOpsError::Internal {
            operation,
            message,
            diagnostics,
        };
    };

    match kind {
        ErrorKind::NotFound => GitOpsError::NotFound {
            operation,
            message,
            diagnostics,
        },
        ErrorKind::Conflict => {
            let mut paths = conflict_paths(&diagnostics.stdout);
            paths.extend(conflict_paths(&diagnostics.stderr));
            GitOpsError::Conflict {
                operation,
                message,
                paths,
                diagnostics,
            }
        }
        ErrorKind::SigningFailed => GitOpsError::SigningFailed {
            operation,
            message,
            diagnostics,
        },
        ErrorKind::PermissionDenied => GitOpsError::PermissionDenied {
            operation,
            message,
            diagnostics,
        },
        ErrorKind::Validation => GitOpsError::Validation {
            operation,
            message,
            diagnostics,
        },
        _ => GitOpsError::Internal {
            operation,
            message,
            diagnostics,
        },
    }
}

/// Map a libgit2 error from the embedded engine onto the same taxonomy.
pub fn map_git2_error(err: git2::Error, operation: Operation) -> GitOpsError {
    let message = err.message().to_string();
    let diagnostics = Box::new(Diagnostics {
        stderr: message.clone(),
        ..Diagnostics::default()
    });

    match err.code() {
        git2::ErrorCode::NotFound | git2::ErrorCode::UnbornBranch => GitOpsError::NotFound {
            operation,
            message,
            diagnostics,
        },
        git2::ErrorCode::Exists => GitOpsError::Conflict {
            operation,
            message,
            paths: Vec::new(),
            diagnostics,
        },
        git2::ErrorCode::Conflict
        | git2::ErrorCode::MergeConflict
        | git2::ErrorCode::Unmerged
        | git2::ErrorCode::NotFastForward => GitOpsError::Conflict {
            operation,
            message,
            paths: Vec::new(),
            diagnostics,
        },
        git2::ErrorCode::InvalidSpec | git2::ErrorCode::Invalid | git2::ErrorCode::Ambiguous => {
            GitOpsError::Validation {
                operation,
                message,
                diagnostics,
            }
        }
        git2::ErrorCode::Auth | git2::ErrorCode::Certificate => GitOpsError::PermissionDenied {
            operation,
            message,
            diagnostics,
        },
        _ if err.class() == git2::ErrorClass::Repository => GitOpsError::NotFound {
            operation,
            message,
            diagnostics,
        },
        _ => GitOpsError::Internal {
            operation,
            message,
            diagnostics,
        },
    }
}
