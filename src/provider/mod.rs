//! Backing engines behind one facade
//!
//! [`Provider`] is a closed set: the git CLI and the embedded libgit2 engine.
//! Every verb checks the provider's capability table first, so an
//! unsupported request fails with `UnsupportedCapability` before anything is
//! spawned or opened.

pub mod cli;
pub mod embedded;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use cli::GitCliProvider;
pub use embedded::EmbeddedProvider;

use crate::capabilities::{Capabilities, Operation};
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::ops;
use crate::ops::branch::{BranchAction, BranchOutcome, CheckoutOptions, CheckoutResult};
use crate::ops::commit::{CommitOptions, CommitResult};
use crate::ops::diff::{DiffOptions, DiffResult};
use crate::ops::history::{
    BlameOptions, BlameResult, LogOptions, LogResult, ReflogOptions, ReflogResult, ShowOptions, ShowResult,
};
use crate::ops::integrate::{
    CherryPickOptions, CherryPickResult, MergeOptions, MergeResult, RebaseAction, RebaseResult,
};
use crate::ops::remote::{
    FetchOptions, FetchResult, PullOptions, PullResult, PushOptions, PushResult, RemoteAction, RemoteOutcome,
};
use crate::ops::repo::{CloneOptions, CloneResult, InitOptions, InitResult};
use crate::ops::stage::{AddOptions, AddResult, ResetOptions, ResetResult};
use crate::ops::stash::{StashAction, StashOutcome};
use crate::ops::status::StatusOptions;
use crate::ops::tag::{TagAction, TagOutcome};
use crate::ops::worktree::{WorktreeAction, WorktreeOutcome};
use crate::parse::status::StatusResult;

/// Which engine to construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Cli,
    Embedded,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cli => GitCliProvider::NAME,
            Self::Embedded => EmbeddedProvider::NAME,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" | "git" => Ok(Self::Cli),
            "embedded" | "libgit2" => Ok(Self::Embedded),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Provider {
    Cli(GitCliProvider),
    Embedded(EmbeddedProvider),
}

/// Gate, start the call's budget, then run the CLI op or the embedded
/// method. Verbs the embedded engine lacks never reach its arm because gating
/// rejects them first.
macro_rules! dispatch_verb {
    ($self:ident, $ctx:ident, $op:expr, |$p:ident| cli => $cli:expr, embedded => $emb:expr) => {{
        $self.gate($op)?;
        let $ctx = &$ctx.start($self.default_timeout());
        match $self {
            Provider::Cli($p) => $cli.await,
            Provider::Embedded($p) => $emb.await,
        }
    }};
    ($self:ident, $ctx:ident, $op:expr, |$p:ident| cli => $cli:expr) => {{
        $self.gate($op)?;
        let $ctx = &$ctx.start($self.default_timeout());
        match $self {
            Provider::Cli($p) => $cli.await,
            Provider::Embedded(_) => Err($self.unsupported($op)),
        }
    }};
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Cli(_) => ProviderKind::Cli,
            Self::Embedded(_) => ProviderKind::Embedded,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn capabilities(&self) -> &'static Capabilities {
        match self {
            Self::Cli(provider) => provider.capabilities(),
            Self::Embedded(provider) => provider.capabilities(),
        }
    }

    /// Budget for a call whose context sets no timeout.
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Cli(provider) => provider.runner().default_timeout(),
            Self::Embedded(provider) => provider.default_timeout(),
        }
    }

    /// Cheap liveness probe. Never writes to a repository.
    pub async fn health_check(&self, ctx: &OperationContext) -> bool {
        match self {
            Self::Cli(provider) => provider.health_check(ctx).await,
            Self::Embedded(provider) => provider.health_check(),
        }
    }

    fn unsupported(&self, operation: Operation) -> GitOpsError {
        GitOpsError::UnsupportedCapability {
            operation,
            provider: self.name(),
        }
    }

    /// Capability gate. Baseline verbs always pass.
    pub fn gate(&self, operation: Operation) -> Result<()> {
        if operation.is_baseline() || self.capabilities().supports(operation) {
            Ok(())
        } else {
            Err(self.unsupported(operation))
        }
    }

    pub async fn init(&self, opts: &InitOptions, ctx: &OperationContext) -> Result<InitResult> {
        dispatch_verb!(self, ctx, Operation::Init, |p|
            cli => ops::repo::init(p.runner(), opts, ctx),
            embedded => p.init(opts, ctx))
    }

    pub async fn clone_repo(&self, opts: &CloneOptions, ctx: &OperationContext) -> Result<CloneResult> {
        dispatch_verb!(self, ctx, Operation::Clone, |p|
            cli => ops::repo::clone(p.runner(), opts, ctx))
    }

    pub async fn status(&self, opts: &StatusOptions, ctx: &OperationContext) -> Result<StatusResult> {
        dispatch_verb!(self, ctx, Operation::Status, |p|
            cli => ops::status::status(p.runner(), opts, ctx),
            embedded => p.status(opts, ctx))
    }

    pub async fn add(&self, opts: &AddOptions, ctx: &OperationContext) -> Result<AddResult> {
        dispatch_verb!(self, ctx, Operation::Add, |p|
            cli => ops::stage::add(p.runner(), opts, ctx),
            embedded => p.add(opts, ctx))
    }

    /// Commit. A signing request on a provider without signing support is
    /// downgraded when `unsigned_fallback` is set (on the options or the CLI
    /// provider), otherwise refused.
    pub async fn commit(&self, opts: &CommitOptions, ctx: &OperationContext) -> Result<CommitResult> {
        self.gate(Operation::Commit)?;
        let ctx = &ctx.start(self.default_timeout());
        let mut opts = opts.clone();
        if let Self::Cli(provider) = self {
            opts.unsigned_fallback |= provider.unsigned_fallback();
        }
        if opts.sign && !self.capabilities().sign_commits {
            if !opts.unsigned_fallback {
                return Err(self.unsupported(Operation::Commit));
            }
            tracing::warn!(trace = %ctx.trace, provider = self.name(), "signing unsupported, committing unsigned");
            opts.sign = false;
        }
        match self {
            Self::Cli(provider) => ops::commit::commit(provider.runner(), &opts, ctx).await,
            Self::Embedded(provider) => provider.commit(&opts, ctx).await,
        }
    }

    pub async fn log(&self, opts: &LogOptions, ctx: &OperationContext) -> Result<LogResult> {
        dispatch_verb!(self, ctx, Operation::Log, |p|
            cli => ops::history::log(p.runner(), opts, ctx),
            embedded => p.log(opts, ctx))
    }

    pub async fn show(&self, opts: &ShowOptions, ctx: &OperationContext) -> Result<ShowResult> {
        dispatch_verb!(self, ctx, Operation::Show, |p|
            cli => ops::history::show(p.runner(), opts, ctx))
    }

    pub async fn diff(&self, opts: &DiffOptions, ctx: &OperationContext) -> Result<DiffResult> {
        dispatch_verb!(self, ctx, Operation::Diff, |p|
            cli => ops::diff::diff(p.runner(), opts, ctx))
    }

    pub async fn branch(&self, action: &BranchAction, ctx: &OperationContext) -> Result<BranchOutcome> {
        dispatch_verb!(self, ctx, Operation::Branch, |p|
            cli => ops::branch::branch(p.runner(), action, ctx),
            embedded => p.branch(action, ctx))
    }

    pub async fn checkout(&self, opts: &CheckoutOptions, ctx: &OperationContext) -> Result<CheckoutResult> {
        dispatch_verb!(self, ctx, Operation::Checkout, |p|
            cli => ops::branch::checkout(p.runner(), opts, ctx))
    }

    pub async fn merge(&self, opts: &MergeOptions, ctx: &OperationContext) -> Result<MergeResult> {
        dispatch_verb!(self, ctx, Operation::Merge, |p|
            cli => ops::integrate::merge(p.runner(), opts, ctx))
    }

    pub async fn rebase(&self, action: &RebaseAction, ctx: &OperationContext) -> Result<RebaseResult> {
        dispatch_verb!(self, ctx, Operation::Rebase, |p|
            cli => ops::integrate::rebase(p.runner(), action, ctx))
    }

    pub async fn cherry_pick(&self, opts: &CherryPickOptions, ctx: &OperationContext) -> Result<CherryPickResult> {
        dispatch_verb!(self, ctx, Operation::CherryPick, |p|
            cli => ops::integrate::cherry_pick(p.runner(), opts, ctx))
    }

    pub async fn remote(&self, action: &RemoteAction, ctx: &OperationContext) -> Result<RemoteOutcome> {
        dispatch_verb!(self, ctx, Operation::Remote, |p|
            cli => ops::remote::remote(p.runner(), action, ctx),
            embedded => p.remote(action, ctx))
    }

    pub async fn fetch(&self, opts: &FetchOptions, ctx: &OperationContext) -> Result<FetchResult> {
        dispatch_verb!(self, ctx, Operation::Fetch, |p|
            cli => ops::remote::fetch(p.runner(), opts, ctx))
    }

    pub async fn push(&self, opts: &PushOptions, ctx: &OperationContext) -> Result<PushResult> {
        dispatch_verb!(self, ctx, Operation::Push, |p|
            cli => ops::remote::push(p.runner(), opts, ctx))
    }

    pub async fn pull(&self, opts: &PullOptions, ctx: &OperationContext) -> Result<PullResult> {
        dispatch_verb!(self, ctx, Operation::Pull, |p|
            cli => ops::remote::pull(p.runner(), opts, ctx))
    }

    pub async fn tag(&self, action: &TagAction, ctx: &OperationContext) -> Result<TagOutcome> {
        dispatch_verb!(self, ctx, Operation::Tag, |p|
            cli => ops::tag::tag(p.runner(), action, ctx),
            embedded => p.tag(action, ctx))
    }

    pub async fn stash(&self, action: &StashAction, ctx: &OperationContext) -> Result<StashOutcome> {
        dispatch_verb!(self, ctx, Operation::Stash, |p|
            cli => ops::stash::stash(p.runner(), action, ctx))
    }

    pub async fn worktree(&self, action: &WorktreeAction, ctx: &OperationContext) -> Result<WorktreeOutcome> {
        dispatch_verb!(self, ctx, Operation::Worktree, |p|
            cli => ops::worktree::worktree(p.runner(), action, ctx))
    }

    pub async fn reset(&self, opts: &ResetOptions, ctx: &OperationContext) -> Result<ResetResult> {
        dispatch_verb!(self, ctx, Operation::Reset, |p|
            cli => ops::stage::reset(p.runner(), opts, ctx))
    }

    pub async fn blame(&self, opts: &BlameOptions, ctx: &OperationContext) -> Result<BlameResult> {
        dispatch_verb!(self, ctx, Operation::Blame, |p|
            cli => ops::history::blame(p.runner(), opts, ctx))
    }

    pub async fn reflog(&self, opts: &ReflogOptions, ctx: &OperationContext) -> Result<ReflogResult> {
        dispatch_verb!(self, ctx, Operation::Reflog, |p|
            cli => ops::history::reflog(p.runner(), opts, ctx))
    }
}
