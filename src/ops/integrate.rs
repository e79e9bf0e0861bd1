//! History integration: merge, rebase, cherry-pick

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::diffstat::{parse_diff_stat, DiffStat};
use crate::parse::messages::{self, parse_commit_header, CommitHeader};

use super::{combined, head_hash, require};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub branch: String,
    pub message: Option<String>,
    pub no_ff: bool,
    pub ff_only: bool,
    pub squash: bool,
    /// Abort an in-progress merge; other fields are ignored
    pub abort: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub fast_forward: bool,
    pub up_to_date: bool,
    pub aborted: bool,
    pub head: Option<String>,
    pub stats: DiffStat,
}

pub async fn merge(runner: &GitRunner, opts: &MergeOptions, ctx: &OperationContext) -> Result<MergeResult> {
    const OP: Operation = Operation::Merge;

    if opts.abort {
        runner.run(OP, ArgBuilder::new("merge").flag("--abort"), ctx).await?;
        return Ok(MergeResult {
            aborted: true,
            head: head_hash(runner, OP, ctx).await?,
            ..MergeResult::default()
        });
    }

    require(OP, "branch", &opts.branch)?;
    if opts.no_ff && opts.ff_only {
        return Err(GitOpsError::validation(OP, "no_ff and ff_only are mutually exclusive"));
    }

    let args = ArgBuilder::new("merge")
        .flag("--no-edit")
        .flag("--stat")
        .flag_if(opts.no_ff, "--no-ff")
        .flag_if(opts.ff_only, "--ff-only")
        .flag_if(opts.squash, "--squash")
        .option_opt("-m", opts.message.as_deref())
        .positional(opts.branch.as_str());
    let output = runner.run(OP, args, ctx).await?;
    let text = combined(&output);

    Ok(MergeResult {
        fast_forward: messages::is_fast_forward(&text),
        up_to_date: messages::is_up_to_date(&text),
        aborted: false,
        head: head_hash(runner, OP, ctx).await?,
        stats: parse_diff_stat(&output.stdout),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RebaseAction {
    Start {
        upstream: String,
        #[serde(default)]
        onto: Option<String>,
    },
    Continue,
    Skip,
    Abort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseResult {
    pub up_to_date: bool,
    pub head: Option<String>,
}

pub async fn rebase(runner: &GitRunner, action: &RebaseAction, ctx: &OperationContext) -> Result<RebaseResult> {
    const OP: Operation = Operation::Rebase;

    let args = match action {
        RebaseAction::Start { upstream, onto } => {
            require(OP, "upstream", upstream)?;
            ArgBuilder::new("rebase")
                .option_opt("--onto", onto.as_deref())
                .positional(upstream.as_str())
        }
        RebaseAction::Continue => ArgBuilder::new("rebase").flag("--continue"),
        RebaseAction::Skip => ArgBuilder::new("rebase").flag("--skip"),
        RebaseAction::Abort => ArgBuilder::new("rebase").flag("--abort"),
    };
    let output = runner.run(OP, args, ctx).await?;
    let text = combined(&output);

    Ok(RebaseResult {
        up_to_date: text.contains("is up to date"),
        head: head_hash(runner, OP, ctx).await?,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CherryPickOptions {
    pub commits: Vec<String>,
    /// Apply to the index and working tree without committing
    pub no_commit: bool,
    /// Parent number when picking a merge commit
    pub mainline: Option<u32>,
    pub abort: bool,
    #[serde(rename = "continue")]
    pub continue_: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CherryPickResult {
    /// Commits created, in order, as reported by git
    pub created: Vec<CommitHeader>,
    pub head: Option<String>,
}

pub async fn cherry_pick(
    runner: &GitRunner,
    opts: &CherryPickOptions,
    ctx: &OperationContext,
) -> Result<CherryPickResult> {
    const OP: Operation = Operation::CherryPick;

    let args = if opts.abort {
        ArgBuilder::new("cherry-pick").flag("--abort")
    } else if opts.continue_ {
        ArgBuilder::new("cherry-pick").flag("--continue")
    } else {
        if opts.commits.is_empty() {
            return Err(GitOpsError::validation(OP, "commits must not be empty"));
        }
        for commit in &opts.commits {
            require(OP, "commit", commit)?;
        }
        let mut args = ArgBuilder::new("cherry-pick")
            .flag_if(opts.no_commit, "--no-commit")
            .option_eq_opt("--mainline", opts.mainline);
        for commit in &opts.commits {
            args = args.positional(commit.as_str());
        }
        args
    };
    let output = runner.run(OP, args, ctx).await?;

    let created = output
        .stdout
        .lines()
        .filter_map(parse_commit_header)
        .collect();
    Ok(CherryPickResult {
        created,
        head: head_hash(runner, OP, ctx).await?,
    })
}
