//! Operation names and per-provider capability tables

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every logical verb the engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Init,
    Clone,
    Status,
    Add,
    Commit,
    Log,
    Show,
    Diff,
    Branch,
    Checkout,
    Merge,
    Rebase,
    CherryPick,
    Remote,
    Fetch,
    Push,
    Pull,
    Tag,
    Stash,
    Worktree,
    Reset,
    Blame,
    Reflog,
}

impl Operation {
    pub const ALL: [Operation; 23] = [
        Operation::Init,
        Operation::Clone,
        Operation::Status,
        Operation::Add,
        Operation::Commit,
        Operation::Log,
        Operation::Show,
        Operation::Diff,
        Operation::Branch,
        Operation::Checkout,
        Operation::Merge,
        Operation::Rebase,
        Operation::CherryPick,
        Operation::Remote,
        Operation::Fetch,
        Operation::Push,
        Operation::Pull,
        Operation::Tag,
        Operation::Stash,
        Operation::Worktree,
        Operation::Reset,
        Operation::Blame,
        Operation::Reflog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Clone => "clone",
            Self::Status => "status",
            Self::Add => "add",
            Self::Commit => "commit",
            Self::Log => "log",
            Self::Show => "show",
            Self::Diff => "diff",
            Self::Branch => "branch",
            Self::Checkout => "checkout",
            Self::Merge => "merge",
            Self::Rebase => "rebase",
            Self::CherryPick => "cherry_pick",
            Self::Remote => "remote",
            Self::Fetch => "fetch",
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Tag => "tag",
            Self::Stash => "stash",
            Self::Worktree => "worktree",
            Self::Reset => "reset",
            Self::Blame => "blame",
            Self::Reflog => "reflog",
        }
    }

    /// Operations every provider must implement; these skip capability gating.
    pub fn is_baseline(&self) -> bool {
        matches!(self, Self::Init | Self::Status | Self::Log)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| format!("unknown operation: {}", s))
    }
}

/// Static capability table attached to a provider at construction.
///
/// One flag per operation plus transport and signing support. Serializes as a
/// flat map so callers can inspect it without knowing the provider variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub init: bool,
    pub clone: bool,
    pub status: bool,
    pub add: bool,
    pub commit: bool,
    pub log: bool,
    pub show: bool,
    pub diff: bool,
    pub branch: bool,
    pub checkout: bool,
    pub merge: bool,
    pub rebase: bool,
    pub cherry_pick: bool,
    pub remote: bool,
    pub fetch: bool,
    pub push: bool,
    pub pull: bool,
    pub tag: bool,
    pub stash: bool,
    pub worktree: bool,
    pub reset: bool,
    pub blame: bool,
    pub reflog: bool,
    pub sign_commits: bool,
    pub ssh_auth: bool,
    pub http_auth: bool,
    /// Advisory upper bound on repository size; `None` means unlimited.
    pub max_repo_size_mb: Option<u64>,
}

impl Capabilities {
    /// Everything enabled, no size limit.
    pub const fn full() -> Self {
        Self {
            init: true,
            clone: true,
            status: true,
            add: true,
            commit: true,
            log: true,
            show: true,
            diff: true,
            branch: true,
            checkout: true,
            merge: true,
            rebase: true,
            cherry_pick: true,
            remote: true,
            fetch: true,
            push: true,
            pull: true,
            tag: true,
            stash: true,
            worktree: true,
            reset: true,
            blame: true,
            reflog: true,
            sign_commits: true,
            ssh_auth: true,
            http_auth: true,
            max_repo_size_mb: None,
        }
    }

    /// Only the baseline verbs.
    pub const fn baseline() -> Self {
        Self {
            init: true,
            clone: false,
            status: true,
            add: false,
            commit: false,
            log: true,
            show: false,
            diff: false,
            branch: false,
            checkout: false,
            merge: false,
            rebase: false,
            cherry_pick: false,
            remote: false,
            fetch: false,
            push: false,
            pull: false,
            tag: false,
            stash: false,
            worktree: false,
            reset: false,
            blame: false,
            reflog: false,
            sign_commits: false,
            ssh_auth: false,
            http_auth: false,
            max_repo_size_mb: None,
        }
    }

    /// The libgit2-backed engine: local repository verbs only, no transport
    /// or signing.
    pub const fn embedded() -> Self {
        Self {
            add: true,
            commit: true,
            branch: true,
            tag: true,
            remote: true,
            max_repo_size_mb: Some(512),
            ..Self::baseline()
        }
    }

    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Init => self.init,
            Operation::Clone => self.clone,
            Operation::Status => self.status,
            Operation::Add => self.add,
            Operation::Commit => self.commit,
            Operation::Log => self.log,
            Operation::Show => self.show,
            Operation::Diff => self.diff,
            Operation::Branch => self.branch,
            Operation::Checkout => self.checkout,
            Operation::Merge => self.merge,
            Operation::Rebase => self.rebase,
            Operation::CherryPick => self.cherry_pick,
            Operation::Remote => self.remote,
            Operation::Fetch => self.fetch,
            Operation::Push => self.push,
            Operation::Pull => self.pull,
            Operation::Tag => self.tag,
            Operation::Stash => self.stash,
            Operation::Worktree => self.worktree,
            Operation::Reset => self.reset,
            Operation::Blame => self.blame,
            Operation::Reflog => self.reflog,
        }
    }

    /// Names of the supported operations, in declaration order.
    pub fn supported_operations(&self) -> Vec<Operation> {
        Operation::ALL
            .iter()
            .copied()
            .filter(|op| self.supports(*op))
            .collect()
    }
}
