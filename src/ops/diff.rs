//! Diff between trees

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::diffstat::{parse_diff_stat, DiffStat};

use super::history::split_stat_and_patch;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    /// Compare the index against `base` (or HEAD) instead of the working tree
    pub staged: bool,
    pub base: Option<String>,
    pub target: Option<String>,
    pub paths: Vec<String>,
    /// Skip the patch text and return statistics only
    pub stat_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub stats: DiffStat,
    pub patch: String,
}

pub async fn diff(runner: &GitRunner, opts: &DiffOptions, ctx: &OperationContext) -> Result<DiffResult> {
    if opts.target.is_some() && opts.base.is_none() {
        return Err(GitOpsError::validation(Operation::Diff, "target requires base"));
    }
    if opts.staged && opts.target.is_some() {
        return Err(GitOpsError::validation(
            Operation::Diff,
            "staged diffs compare the index with base; target is not allowed",
        ));
    }

    let args = ArgBuilder::new("diff")
        .flag_if(opts.staged, "--cached")
        .flag(if opts.stat_only { "--stat" } else { "--patch-with-stat" })
        .positional_opt(opts.base.as_deref())
        .positional_opt(opts.target.as_deref())
        .paths(opts.paths.iter().cloned());
    let output = runner.run(Operation::Diff, args, ctx).await?;

    let (stat_text, patch_text) = split_stat_and_patch(&output.stdout);
    Ok(DiffResult {
        stats: parse_diff_stat(stat_text),
        patch: patch_text.to_string(),
    })
}
