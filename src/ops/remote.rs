//! Remote configuration and transfer: remote, fetch, push, pull

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::diffstat::{parse_diff_stat, DiffStat};
use crate::parse::messages;
use crate::parse::remote::{parse_remotes, RemoteInfo};
use crate::parse::transfer::{parse_fetch_updates, parse_push_porcelain, RefUpdate, RefUpdateKind};

use super::{combined, head_hash, require};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemoteAction {
    #[default]
    List,
    Add {
        name: String,
        url: String,
    },
    Remove {
        name: String,
    },
    Rename {
        from: String,
        to: String,
    },
    SetUrl {
        name: String,
        url: String,
        /// Change the push URL only
        #[serde(default)]
        push: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RemoteOutcome {
    Listed { remotes: Vec<RemoteInfo> },
    Added { name: String, url: String },
    Removed { name: String },
    Renamed { from: String, to: String },
    UrlSet { name: String, url: String, push: bool },
}

pub async fn remote(runner: &GitRunner, action: &RemoteAction, ctx: &OperationContext) -> Result<RemoteOutcome> {
    const OP: Operation = Operation::Remote;

    match action {
        RemoteAction::List => {
            let output = runner
                .run(OP, ArgBuilder::new("remote").flag("-v"), ctx)
                .await?;
            Ok(RemoteOutcome::Listed {
                remotes: parse_remotes(&output.stdout),
            })
        }
        RemoteAction::Add { name, url } => {
            require(OP, "name", name)?;
            require(OP, "url", url)?;
            let args = ArgBuilder::new("remote")
                .word("add")
                .positional(name.as_str())
                .positional(url.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(RemoteOutcome::Added {
                name: name.clone(),
                url: url.clone(),
            })
        }
        RemoteAction::Remove { name } => {
            require(OP, "name", name)?;
            let args = ArgBuilder::new("remote").word("remove").positional(name.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(RemoteOutcome::Removed { name: name.clone() })
        }
        RemoteAction::Rename { from, to } => {
            require(OP, "from", from)?;
            require(OP, "to", to)?;
            let args = ArgBuilder::new("remote")
                .word("rename")
                .positional(from.as_str())
                .positional(to.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(RemoteOutcome::Renamed {
                from: from.clone(),
                to: to.clone(),
            })
        }
        RemoteAction::SetUrl { name, url, push } => {
            require(OP, "name", name)?;
            require(OP, "url", url)?;
            let args = ArgBuilder::new("remote")
                .word("set-url")
                .flag_if(*push, "--push")
                .positional(name.as_str())
                .positional(url.as_str());
            runner.run(OP, args, ctx).await?;
            Ok(RemoteOutcome::UrlSet {
                name: name.clone(),
                url: url.clone(),
                push: *push,
            })
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub remote: Option<String>,
    pub refspec: Option<String>,
    /// Fetch every configured remote
    pub all: bool,
    pub prune: bool,
    pub tags: bool,
    pub depth: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub updates: Vec<RefUpdate>,
}

pub async fn fetch(runner: &GitRunner, opts: &FetchOptions, ctx: &OperationContext) -> Result<FetchResult> {
    const OP: Operation = Operation::Fetch;

    if opts.all && opts.remote.is_some() {
        return Err(GitOpsError::validation(OP, "all cannot be combined with remote"));
    }
    if opts.refspec.is_some() && opts.remote.is_none() {
        return Err(GitOpsError::validation(OP, "refspec requires remote"));
    }

    let args = ArgBuilder::new("fetch")
        .flag_if(opts.all, "--all")
        .flag_if(opts.prune, "--prune")
        .flag_if(opts.tags, "--tags")
        .option_eq_opt("--depth", opts.depth)
        .positional_opt(opts.remote.as_deref())
        .positional_opt(opts.refspec.as_deref());
    let output = runner.run(OP, args, ctx).await?;

    Ok(FetchResult {
        updates: parse_fetch_updates(&combined(&output)),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PushOptions {
    pub remote: Option<String>,
    /// Branch or `src:dst` refspec
    pub refspec: Option<String>,
    pub set_upstream: bool,
    pub force: bool,
    pub force_with_lease: bool,
    pub tags: bool,
    /// Delete `refspec` on the remote
    pub delete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResult {
    pub updates: Vec<RefUpdate>,
    pub up_to_date: bool,
}

pub async fn push(runner: &GitRunner, opts: &PushOptions, ctx: &OperationContext) -> Result<PushResult> {
    const OP: Operation = Operation::Push;

    if opts.force && opts.force_with_lease {
        return Err(GitOpsError::validation(OP, "force and force_with_lease are mutually exclusive"));
    }
    if (opts.delete || opts.set_upstream) && opts.refspec.is_none() {
        return Err(GitOpsError::validation(OP, "delete and set_upstream require refspec"));
    }
    if opts.refspec.is_some() && opts.remote.is_none() {
        return Err(GitOpsError::validation(OP, "refspec requires remote"));
    }

    let args = ArgBuilder::new("push")
        .flag("--porcelain")
        .flag_if(opts.set_upstream, "--set-upstream")
        .flag_if(opts.force, "--force")
        .flag_if(opts.force_with_lease, "--force-with-lease")
        .flag_if(opts.tags, "--tags")
        .flag_if(opts.delete, "--delete")
        .positional_opt(opts.remote.as_deref())
        .positional_opt(opts.refspec.as_deref());
    let output = runner.run(OP, args, ctx).await?;

    let updates = parse_push_porcelain(&output.stdout);
    let up_to_date = (!updates.is_empty() && updates.iter().all(|u| u.kind == RefUpdateKind::UpToDate))
        || combined(&output).contains("Everything up-to-date");
    Ok(PushResult { updates, up_to_date })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PullOptions {
    pub remote: Option<String>,
    pub branch: Option<String>,
    /// Rebase instead of merging
    pub rebase: bool,
    pub ff_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResult {
    pub fast_forward: bool,
    pub up_to_date: bool,
    pub updates: Vec<RefUpdate>,
    pub head: Option<String>,
    pub stats: DiffStat,
}

pub async fn pull(runner: &GitRunner, opts: &PullOptions, ctx: &OperationContext) -> Result<PullResult> {
    const OP: Operation = Operation::Pull;

    if opts.branch.is_some() && opts.remote.is_none() {
        return Err(GitOpsError::validation(OP, "branch requires remote"));
    }
    if opts.rebase && opts.ff_only {
        return Err(GitOpsError::validation(OP, "rebase and ff_only are mutually exclusive"));
    }

    let args = ArgBuilder::new("pull")
        .flag("--no-edit")
        .flag("--stat")
        .flag(if opts.rebase { "--rebase" } else { "--no-rebase" })
        .flag_if(opts.ff_only, "--ff-only")
        .positional_opt(opts.remote.as_deref())
        .positional_opt(opts.branch.as_deref());
    let output = runner.run(OP, args, ctx).await?;
    let text = combined(&output);

    Ok(PullResult {
        fast_forward: messages::is_fast_forward(&text),
        up_to_date: messages::is_up_to_date(&text),
        updates: parse_fetch_updates(&output.stderr),
        head: head_hash(runner, OP, ctx).await?,
        stats: parse_diff_stat(&output.stdout),
    })
}
