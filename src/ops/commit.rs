//! Commit creation, with optional signing

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::diffstat::{parse_diff_stat, DiffStat};
use crate::parse::messages::parse_commit_header;

use super::{current_branch, head_hash, require};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitOptions {
    pub message: String,
    pub amend: bool,
    pub allow_empty: bool,
    /// Stage tracked modifications first (`commit -a`)
    pub all: bool,
    /// `Name <email>` override
    pub author: Option<String>,
    pub no_verify: bool,
    /// Request a signed commit
    pub sign: bool,
    /// Retry once unsigned if signing fails
    pub unsigned_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    pub hash: String,
    pub short_hash: String,
    pub branch: Option<String>,
    pub subject: String,
    pub signed: bool,
    pub root_commit: bool,
    pub stats: DiffStat,
}

fn commit_args(opts: &CommitOptions, sign: bool) -> ArgBuilder {
    ArgBuilder::new("commit")
        .option("-m", opts.message.as_str())
        .flag_if(opts.amend, "--amend")
        .flag_if(opts.allow_empty, "--allow-empty")
        .flag_if(opts.all, "--all")
        .flag_if(opts.no_verify, "--no-verify")
        .option_eq_opt("--author", opts.author.as_deref())
        .flag(if sign { "-S" } else { "--no-gpg-sign" })
}

pub async fn commit(runner: &GitRunner, opts: &CommitOptions, ctx: &OperationContext) -> Result<CommitResult> {
    require(Operation::Commit, "message", &opts.message)?;

    let (output, signed) = match runner.run(Operation::Commit, commit_args(opts, opts.sign), ctx).await {
        Ok(output) => (output, opts.sign),
        Err(GitOpsError::SigningFailed { message, .. }) if opts.sign && opts.unsigned_fallback => {
            tracing::warn!(trace = %ctx.trace, "commit signing failed, retrying unsigned: {}", message);
            let output = runner
                .run(Operation::Commit, commit_args(opts, false), ctx)
                .await?;
            (output, false)
        }
        Err(err) => return Err(err),
    };

    let header = parse_commit_header(&output.stdout);
    let hash = head_hash(runner, Operation::Commit, ctx)
        .await?
        .unwrap_or_default();
    let branch = match &header {
        Some(h) if h.branch != "detached HEAD" => Some(h.branch.clone()),
        Some(_) => None,
        None => current_branch(runner, Operation::Commit, ctx).await?,
    };

    Ok(CommitResult {
        short_hash: header
            .as_ref()
            .map(|h| h.short_hash.clone())
            .unwrap_or_else(|| hash.chars().take(7).collect()),
        subject: header
            .as_ref()
            .map(|h| h.subject.clone())
            .unwrap_or_else(|| opts.message.lines().next().unwrap_or("").to_string()),
        root_commit: header.as_ref().is_some_and(|h| h.root_commit),
        stats: parse_diff_stat(&output.stdout),
        hash,
        branch,
        signed,
    })
}
