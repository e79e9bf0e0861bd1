//! Repository creation: init and clone

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::messages;

use super::{combined, require};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitOptions {
    /// Subdirectory to create, relative to the working directory
    pub directory: Option<String>,
    pub bare: bool,
    pub initial_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResult {
    /// Repository directory (`.git` for non-bare repositories)
    pub git_dir: PathBuf,
    pub bare: bool,
    pub reinitialized: bool,
}

pub async fn init(runner: &GitRunner, opts: &InitOptions, ctx: &OperationContext) -> Result<InitResult> {
    let args = ArgBuilder::new("init")
        .flag_if(opts.bare, "--bare")
        .option_eq_opt("--initial-branch", opts.initial_branch.as_deref())
        .positional_opt(opts.directory.as_deref());
    let output = runner.run(Operation::Init, args, ctx).await?;

    let target = match &opts.directory {
        Some(dir) => ctx.working_directory.join(dir),
        None => ctx.working_directory.clone(),
    };
    let (reinitialized, git_dir) = match messages::parse_init(&combined(&output)) {
        Some((reinitialized, dir)) => (reinitialized, PathBuf::from(dir)),
        None if opts.bare => (false, target),
        None => (false, target.join(".git")),
    };

    Ok(InitResult {
        git_dir,
        bare: opts.bare,
        reinitialized,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneOptions {
    pub url: String,
    /// Target directory; git derives one from the URL when absent
    pub directory: Option<String>,
    pub branch: Option<String>,
    pub depth: Option<u32>,
    pub bare: bool,
    pub single_branch: bool,
    pub recurse_submodules: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneResult {
    pub path: PathBuf,
    pub bare: bool,
}

pub async fn clone(runner: &GitRunner, opts: &CloneOptions, ctx: &OperationContext) -> Result<CloneResult> {
    require(Operation::Clone, "url", &opts.url)?;
    if opts.depth == Some(0) {
        return Err(GitOpsError::validation(
            Operation::Clone,
            "depth must be at least 1",
        ));
    }

    let args = ArgBuilder::new("clone")
        .flag("--progress")
        .flag_if(opts.bare, "--bare")
        .flag_if(opts.single_branch, "--single-branch")
        .flag_if(opts.recurse_submodules, "--recurse-submodules")
        .option_opt("--branch", opts.branch.as_deref())
        .option_eq_opt("--depth", opts.depth)
        .positional(opts.url.as_str())
        .positional_opt(opts.directory.as_deref());
    let output = runner.run(Operation::Clone, args, ctx).await?;

    let dir = opts
        .directory
        .clone()
        .or_else(|| messages::parse_clone_target(&combined(&output)))
        .unwrap_or_default();

    Ok(CloneResult {
        path: ctx.working_directory.join(dir),
        bare: opts.bare,
    })
}
