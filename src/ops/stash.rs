//! Stash stack

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::Result;
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::messages::stash_had_no_changes;
use crate::parse::stash::{parse_stash_list, StashEntry, STASH_FORMAT};

use super::combined;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StashAction {
    Push {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        include_untracked: bool,
        #[serde(default)]
        keep_index: bool,
        #[serde(default)]
        paths: Vec<String>,
    },
    Pop {
        #[serde(default)]
        index: Option<u32>,
    },
    Apply {
        #[serde(default)]
        index: Option<u32>,
    },
    Drop {
        #[serde(default)]
        index: Option<u32>,
    },
    #[default]
    List,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StashOutcome {
    /// `created` is false when there was nothing to stash
    Saved { created: bool, entry: Option<StashEntry> },
    Popped { reference: String },
    Applied { reference: String },
    Dropped { reference: String },
    Listed { entries: Vec<StashEntry> },
    Cleared,
}

fn reference(index: Option<u32>) -> String {
    format!("stash@{{{}}}", index.unwrap_or(0))
}

async fn list(runner: &GitRunner, ctx: &OperationContext) -> Result<Vec<StashEntry>> {
    let args = ArgBuilder::new("stash")
        .word("list")
        .option_eq("--format", STASH_FORMAT);
    let output = runner.run(Operation::Stash, args, ctx).await?;
    Ok(parse_stash_list(&output.stdout))
}

pub async fn stash(runner: &GitRunner, action: &StashAction, ctx: &OperationContext) -> Result<StashOutcome> {
    const OP: Operation = Operation::Stash;

    match action {
        StashAction::Push {
            message,
            include_untracked,
            keep_index,
            paths,
        } => {
            let args = ArgBuilder::new("stash")
                .word("push")
                .flag_if(*include_untracked, "--include-untracked")
                .flag_if(*keep_index, "--keep-index")
                .option_opt("-m", message.as_deref())
                .paths(paths.iter().cloned());
            let output = runner.run(OP, args, ctx).await?;
            if stash_had_no_changes(&combined(&output)) {
                return Ok(StashOutcome::Saved {
                    created: false,
                    entry: None,
                });
            }
            let entry = list(runner, ctx).await?.into_iter().next();
            Ok(StashOutcome::Saved { created: true, entry })
        }
        StashAction::Pop { index } => {
            let reference = reference(*index);
            let args = ArgBuilder::new("stash").word("pop").positional(reference.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(StashOutcome::Popped { reference })
        }
        StashAction::Apply { index } => {
            let reference = reference(*index);
            let args = ArgBuilder::new("stash").word("apply").positional(reference.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(StashOutcome::Applied { reference })
        }
        StashAction::Drop { index } => {
            let reference = reference(*index);
            let args = ArgBuilder::new("stash").word("drop").positional(reference.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(StashOutcome::Dropped { reference })
        }
        StashAction::List => Ok(StashOutcome::Listed {
            entries: list(runner, ctx).await?,
        }),
        StashAction::Clear => {
            runner.run(OP, ArgBuilder::new("stash").word("clear"), ctx).await?;
            Ok(StashOutcome::Cleared)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_defaults_to_top() {
        assert_eq!(reference(None), "stash@{0}");
        assert_eq!(reference(Some(3)), "stash@{3}");
    }
}
