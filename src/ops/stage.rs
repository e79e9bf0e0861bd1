//! Index manipulation: add and reset

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::exec::{ArgBuilder, GitRunner};

use super::head_hash;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddOptions {
    pub paths: Vec<String>,
    /// Stage every change in the working tree, including deletions
    pub all: bool,
    /// Stage modifications and deletions of tracked files only
    pub update: bool,
    /// Add ignored files too
    pub force: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddResult {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// `add 'path'` / `remove 'path'` lines printed by `git add --verbose`.
fn parse_add_verbose(output: &str) -> AddResult {
    let mut result = AddResult::default();
    for line in output.lines() {
        let (bucket, rest) = if let Some(rest) = line.strip_prefix("add '") {
            (&mut result.added, rest)
        } else if let Some(rest) = line.strip_prefix("remove '") {
            (&mut result.removed, rest)
        } else {
            continue;
        };
        if let Some(path) = rest.strip_suffix('\'') {
            bucket.push(path.to_string());
        }
    }
    result
}

pub async fn add(runner: &GitRunner, opts: &AddOptions, ctx: &OperationContext) -> Result<AddResult> {
    if opts.paths.is_empty() && !opts.all && !opts.update {
        return Err(GitOpsError::validation(
            Operation::Add,
            "nothing to add: give paths, all or update",
        ));
    }

    let args = ArgBuilder::new("add")
        .flag("--verbose")
        .flag_if(opts.all, "--all")
        .flag_if(opts.update && !opts.all, "--update")
        .flag_if(opts.force, "--force")
        .paths(opts.paths.iter().cloned());
    let output = runner.run(Operation::Add, args, ctx).await?;
    Ok(parse_add_verbose(&output.stdout))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetMode {
    Soft,
    #[default]
    Mixed,
    Hard,
}

impl ResetMode {
    fn flag(&self) -> &'static str {
        match self {
            Self::Soft => "--soft",
            Self::Mixed => "--mixed",
            Self::Hard => "--hard",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetOptions {
    pub mode: ResetMode,
    /// Commit to reset to; `HEAD` when absent
    pub target: Option<String>,
    /// Unstage these paths instead of moving HEAD
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResult {
    pub mode: ResetMode,
    pub head: Option<String>,
    pub unstaged_paths: Vec<String>,
}

pub async fn reset(runner: &GitRunner, opts: &ResetOptions, ctx: &OperationContext) -> Result<ResetResult> {
    let path_reset = !opts.paths.is_empty();
    if path_reset && opts.mode != ResetMode::Mixed {
        return Err(GitOpsError::validation(
            Operation::Reset,
            "soft and hard resets cannot be limited to paths",
        ));
    }

    let mut args = ArgBuilder::new("reset").flag("--quiet");
    if !path_reset {
        args = args.flag(opts.mode.flag());
    }
    let args = args
        .positional_opt(opts.target.as_deref())
        .paths(opts.paths.iter().cloned());
    runner.run(Operation::Reset, args, ctx).await?;

    Ok(ResetResult {
        mode: opts.mode,
        head: head_hash(runner, Operation::Reset, ctx).await?,
        unstaged_paths: opts.paths.clone(),
    })
}
