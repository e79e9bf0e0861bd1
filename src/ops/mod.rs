//! One module per group of git verbs
//!
//! Each operation is a pure async function of its options and the call
//! context: it builds an argument vector, runs it through the [`GitRunner`]
//! and normalizes the output with a parser. Options deserialize from JSON with
//! every field defaulted, results serialize to plain records.

pub mod branch;
pub mod commit;
pub mod diff;
pub mod history;
pub mod integrate;
pub mod remote;
pub mod repo;
pub mod stage;
pub mod stash;
pub mod status;
pub mod tag;
pub mod worktree;

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::error_map::is_quiet_miss;
use crate::exec::{ArgBuilder, GitRunner, ProcessOutput};

/// Reject an empty or blank required string field.
pub(crate) fn require(operation: Operation, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GitOpsError::validation(
            operation,
            format!("{} must not be empty", field),
        ));
    }
    Ok(())
}

/// stderr then stdout; many porcelain commands report on stderr.
pub(crate) fn combined(output: &ProcessOutput) -> String {
    format!("{}\n{}", output.stderr, output.stdout)
}

/// Full hash of `HEAD`, or `None` in a repository without commits.
pub(crate) async fn head_hash(
    runner: &GitRunner,
    operation: Operation,
    ctx: &OperationContext,
) -> Result<Option<String>> {
    let args = ArgBuilder::new("rev-parse")
        .flag("--verify")
        .flag("-q")
        .positional("HEAD");
    match runner.run(operation, args, ctx).await {
        Ok(output) => Ok(Some(output.stdout.trim().to_string()).filter(|h| !h.is_empty())),
        Err(err) if is_quiet_miss(&err) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Current branch name, `None` when detached or unborn.
pub(crate) async fn current_branch(
    runner: &GitRunner,
    operation: Operation,
    ctx: &OperationContext,
) -> Result<Option<String>> {
    let args = ArgBuilder::new("symbolic-ref")
        .flag("--short")
        .flag("-q")
        .positional("HEAD");
    match runner.run(operation, args, ctx).await {
        Ok(output) => Ok(Some(output.stdout.trim().to_string()).filter(|b| !b.is_empty())),
        Err(err) if is_quiet_miss(&err) => Ok(None),
        Err(err) => Err(err),
    }
}
