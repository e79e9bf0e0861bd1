//! Tags

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::Result;
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::tag::parse_tags;

use super::require;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TagAction {
    #[default]
    List,
    /// Tags matching a glob pattern
    Search { pattern: String },
    Create {
        name: String,
        #[serde(default)]
        target: Option<String>,
        /// Annotated tag message; lightweight tag when absent
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        force: bool,
    },
    Delete {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TagOutcome {
    Listed { tags: Vec<String> },
    Created { name: String, annotated: bool },
    Deleted { name: String },
}

pub async fn tag(runner: &GitRunner, action: &TagAction, ctx: &OperationContext) -> Result<TagOutcome> {
    const OP: Operation = Operation::Tag;

    match action {
        TagAction::List => {
            let output = runner.run(OP, ArgBuilder::new("tag").flag("--list"), ctx).await?;
            Ok(TagOutcome::Listed {
                tags: parse_tags(&output.stdout),
            })
        }
        TagAction::Search { pattern } => {
            require(OP, "pattern", pattern)?;
            let args = ArgBuilder::new("tag").flag("--list").positional(pattern.as_str());
            let output = runner.run(OP, args, ctx).await?;
            Ok(TagOutcome::Listed {
                tags: parse_tags(&output.stdout),
            })
        }
        TagAction::Create {
            name,
            target,
            message,
            force,
        } => {
            require(OP, "name", name)?;
            let args = ArgBuilder::new("tag")
                .flag_if(*force, "--force")
                .flag_if(message.is_some(), "--annotate")
                .option_opt("-m", message.as_deref())
                .positional(name.as_str())
                .positional_opt(target.as_deref());
            runner.run(OP, args, ctx).await?;
            Ok(TagOutcome::Created {
                name: name.clone(),
                annotated: message.is_some(),
            })
        }
        TagAction::Delete { name } => {
            require(OP, "name", name)?;
            let args = ArgBuilder::new("tag").flag("--delete").positional(name.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(TagOutcome::Deleted { name: name.clone() })
        }
    }
}
