//! Linked worktrees

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::worktree::{parse_worktrees, WorktreeInfo};

use super::require;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorktreeAction {
    #[default]
    List,
    Add {
        path: String,
        /// Existing branch or commit to check out
        #[serde(default)]
        commit_ish: Option<String>,
        /// Create this branch for the new worktree
        #[serde(default)]
        new_branch: Option<String>,
        #[serde(default)]
        detach: bool,
        #[serde(default)]
        force: bool,
    },
    Remove {
        path: String,
        #[serde(default)]
        force: bool,
    },
    Lock {
        path: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Unlock {
        path: String,
    },
    Prune,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WorktreeOutcome {
    Listed { worktrees: Vec<WorktreeInfo> },
    Added { worktree: Option<WorktreeInfo> },
    Removed { path: String },
    Locked { path: String },
    Unlocked { path: String },
    Pruned,
}

async fn list(runner: &GitRunner, ctx: &OperationContext) -> Result<Vec<WorktreeInfo>> {
    let args = ArgBuilder::new("worktree").word("list").flag("--porcelain");
    let output = runner.run(Operation::Worktree, args, ctx).await?;
    Ok(parse_worktrees(&output.stdout))
}

pub async fn worktree(runner: &GitRunner, action: &WorktreeAction, ctx: &OperationContext) -> Result<WorktreeOutcome> {
    const OP: Operation = Operation::Worktree;

    match action {
        WorktreeAction::List => Ok(WorktreeOutcome::Listed {
            worktrees: list(runner, ctx).await?,
        }),
        WorktreeAction::Add {
            path,
            commit_ish,
            new_branch,
            detach,
            force,
        } => {
            require(OP, "path", path)?;
            if *detach && new_branch.is_some() {
                return Err(GitOpsError::validation(OP, "detach cannot be combined with new_branch"));
            }
            let args = ArgBuilder::new("worktree")
                .word("add")
                .flag_if(*force, "--force")
                .flag_if(*detach, "--detach")
                .option_opt("-b", new_branch.as_deref())
                .positional(path.as_str())
                .positional_opt(commit_ish.as_deref());
            runner.run(OP, args, ctx).await?;

            let wanted = ctx.working_directory.join(path);
            let wanted = wanted.canonicalize().unwrap_or(wanted);
            let worktree = list(runner, ctx).await?.into_iter().find(|w| {
                let listed: PathBuf = w.path.canonicalize().unwrap_or_else(|_| w.path.clone());
                listed == wanted
            });
            Ok(WorktreeOutcome::Added { worktree })
        }
        WorktreeAction::Remove { path, force } => {
            require(OP, "path", path)?;
            let args = ArgBuilder::new("worktree")
                .word("remove")
                .flag_if(*force, "--force")
                .positional(path.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(WorktreeOutcome::Removed { path: path.clone() })
        }
        WorktreeAction::Lock { path, reason } => {
            require(OP, "path", path)?;
            let args = ArgBuilder::new("worktree")
                .word("lock")
                .option_opt("--reason", reason.as_deref())
                .positional(path.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(WorktreeOutcome::Locked { path: path.clone() })
        }
        WorktreeAction::Unlock { path } => {
            require(OP, "path", path)?;
            let args = ArgBuilder::new("worktree").word("unlock").positional(path.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(WorktreeOutcome::Unlocked { path: path.clone() })
        }
        WorktreeAction::Prune => {
            runner.run(OP, ArgBuilder::new("worktree").word("prune"), ctx).await?;
            Ok(WorktreeOutcome::Pruned)
        }
    }
}
