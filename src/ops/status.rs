//! Working tree status

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::Result;
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::status::{parse_status, StatusResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusOptions {
    /// Limit the report to these pathspecs
    pub paths: Vec<String>,
    /// List every file inside untracked directories instead of the directory
    pub untracked_all: bool,
}

pub async fn status(runner: &GitRunner, opts: &StatusOptions, ctx: &OperationContext) -> Result<StatusResult> {
    let args = ArgBuilder::new("status")
        .option_eq("--porcelain", "v2")
        .flag("--branch")
        .option_eq("--untracked-files", if opts.untracked_all { "all" } else { "normal" })
        .paths(opts.paths.iter().cloned());
    let output = runner.run(Operation::Status, args, ctx).await?;
    Ok(parse_status(&output.stdout))
}
