//! Branch management and checkout

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::messages::parse_checkout;
use crate::parse::refs::{parse_branch_verbose, parse_for_each_ref, BranchInfo, BRANCH_FORMAT};

use super::{combined, current_branch, head_hash, require};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BranchAction {
    List {
        /// Include remote-tracking branches
        #[serde(default)]
        all: bool,
    },
    Create {
        name: String,
        #[serde(default)]
        start_point: Option<String>,
        #[serde(default)]
        force: bool,
    },
    Delete {
        name: String,
        /// Delete even if not merged
        #[serde(default)]
        force: bool,
    },
    Rename {
        from: String,
        to: String,
    },
    SetUpstream {
        name: String,
        upstream: String,
    },
}

impl Default for BranchAction {
    fn default() -> Self {
        Self::List { all: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BranchOutcome {
    Listed { branches: Vec<BranchInfo> },
    Created { name: String, commit_hash: Option<String> },
    Deleted { name: String },
    Renamed { from: String, to: String },
    UpstreamSet { name: String, upstream: String },
}

pub async fn branch(runner: &GitRunner, action: &BranchAction, ctx: &OperationContext) -> Result<BranchOutcome> {
    const OP: Operation = Operation::Branch;

    match action {
        BranchAction::List { all } => list(runner, *all, ctx).await,
        BranchAction::Create {
            name,
            start_point,
            force,
        } => {
            require(OP, "name", name)?;
            let args = ArgBuilder::new("branch")
                .flag_if(*force, "--force")
                .positional(name.as_str())
                .positional_opt(start_point.as_deref());
            runner.run(OP, args, ctx).await?;
            let tip = ArgBuilder::new("rev-parse").positional(format!("refs/heads/{}", name));
            let commit_hash = Some(runner.run(OP, tip, ctx).await?.stdout.trim().to_string());
            Ok(BranchOutcome::Created {
                name: name.clone(),
                commit_hash,
            })
        }
        BranchAction::Delete { name, force } => {
            require(OP, "name", name)?;
            let args = ArgBuilder::new("branch")
                .flag(if *force { "-D" } else { "-d" })
                .positional(name.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(BranchOutcome::Deleted { name: name.clone() })
        }
        BranchAction::Rename { from, to } => {
            require(OP, "from", from)?;
            require(OP, "to", to)?;
            let args = ArgBuilder::new("branch")
                .flag("-m")
                .positional(from.as_str())
                .positional(to.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(BranchOutcome::Renamed {
                from: from.clone(),
                to: to.clone(),
            })
        }
        BranchAction::SetUpstream { name, upstream } => {
            require(OP, "name", name)?;
            require(OP, "upstream", upstream)?;
            let args = ArgBuilder::new("branch")
                .option_eq("--set-upstream-to", upstream)
                .positional(name.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(BranchOutcome::UpstreamSet {
                name: name.clone(),
                upstream: upstream.clone(),
            })
        }
    }
}

async fn list(runner: &GitRunner, all: bool, ctx: &OperationContext) -> Result<BranchOutcome> {
    let mut args = ArgBuilder::new("for-each-ref")
        .option_eq("--format", BRANCH_FORMAT)
        .positional("refs/heads");
    if all {
        args = args.positional("refs/remotes");
    }
    let output = runner.run(Operation::Branch, args, ctx).await?;
    let mut branches = parse_for_each_ref(&output.stdout);

    if branches.is_empty() && !output.stdout.trim().is_empty() {
        // Structured output that did not parse: fall back to the listing.
        let legacy = ArgBuilder::new("branch").flag("-vv").flag_if(all, "--all");
        let output = runner.run(Operation::Branch, legacy, ctx).await?;
        branches = parse_branch_verbose(&output.stdout);
    }

    Ok(BranchOutcome::Listed { branches })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutOptions {
    /// Branch, tag or commit; with `paths`, the source to restore from
    pub target: String,
    /// Create `target` as a new branch
    pub create: bool,
    pub start_point: Option<String>,
    pub force: bool,
    /// Restore these paths instead of switching branches
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub branch: Option<String>,
    pub created: bool,
    pub head: Option<String>,
    pub restored_paths: Vec<String>,
}

pub async fn checkout(runner: &GitRunner, opts: &CheckoutOptions, ctx: &OperationContext) -> Result<CheckoutResult> {
    const OP: Operation = Operation::Checkout;

    if opts.paths.is_empty() {
        require(OP, "target", &opts.target)?;
    }
    if opts.create && !opts.paths.is_empty() {
        return Err(GitOpsError::validation(OP, "create cannot be combined with paths"));
    }
    if opts.start_point.is_some() && !opts.create {
        return Err(GitOpsError::validation(OP, "start_point requires create"));
    }

    let mut args = ArgBuilder::new("checkout").flag_if(opts.force, "--force");
    args = if opts.create {
        args.flag("-b").positional(opts.target.as_str())
    } else if opts.target.is_empty() {
        args
    } else {
        args.positional(opts.target.as_str())
    };
    let args = args
        .positional_opt(opts.start_point.as_deref())
        .paths(opts.paths.iter().cloned());
    let output = runner.run(OP, args, ctx).await?;

    let message = parse_checkout(&combined(&output));
    let branch = match message.branch {
        Some(branch) => Some(branch),
        None => current_branch(runner, OP, ctx).await?,
    };

    Ok(CheckoutResult {
        branch,
        created: opts.create,
        head: head_hash(runner, OP, ctx).await?,
        restored_paths: opts.paths.clone(),
    })
}
