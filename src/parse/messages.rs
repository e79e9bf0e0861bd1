//! Human-readable status lines that carry data git prints nowhere else

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static COMMIT_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\[(?P<branch>.+?)(?P<root> \(root-commit\))? (?P<hash>[0-9a-f]{4,})\] (?P<subject>.*)$")
        .unwrap()
});
static SWITCHED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Switched to (?P<new>a new )?branch '(?P<branch>[^']+)'").unwrap());
static ALREADY_ON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Already on '(?P<branch>[^']+)'").unwrap());
static HEAD_NOW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^HEAD is now at (?P<hash>[0-9a-f]{4,})").unwrap());
static INIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?P<re>Reinitialized existing|Initialized empty)(?: shared)? Git repository in (?P<dir>.+?)/?$")
        .unwrap()
});
static CLONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Cloning into (?:bare repository )?'(?P<dir>[^']+)'").unwrap());

/// `[branch hash] subject` printed by commit, cherry-pick and revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitHeader {
    /// Branch name, or `detached HEAD`
    pub branch: String,
    pub short_hash: String,
    pub subject: String,
    pub root_commit: bool,
}

pub fn parse_commit_header(output: &str) -> Option<CommitHeader> {
    let caps = COMMIT_HEADER_RE.captures(output)?;
    Some(CommitHeader {
        branch: caps["branch"].to_string(),
        short_hash: caps["hash"].to_string(),
        subject: caps["subject"].to_string(),
        root_commit: caps.name("root").is_some(),
    })
}

/// What `git checkout` / `git switch` reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutMessage {
    pub branch: Option<String>,
    pub created: bool,
    pub detached_at: Option<String>,
}

/// Checkout prints its summary on stderr; pass stderr and stdout together.
pub fn parse_checkout(output: &str) -> CheckoutMessage {
    if let Some(caps) = SWITCHED_RE.captures(output) {
        return CheckoutMessage {
            branch: Some(caps["branch"].to_string()),
            created: caps.name("new").is_some(),
            detached_at: None,
        };
    }
    if let Some(caps) = ALREADY_ON_RE.captures(output) {
        return CheckoutMessage {
            branch: Some(caps["branch"].to_string()),
            ..CheckoutMessage::default()
        };
    }
    CheckoutMessage {
        detached_at: HEAD_NOW_RE.captures(output).map(|c| c["hash"].to_string()),
        ..CheckoutMessage::default()
    }
}

pub fn is_fast_forward(output: &str) -> bool {
    output.contains("Fast-forward") || output.contains("Fast forward")
}

pub fn is_up_to_date(output: &str) -> bool {
    output.contains("Already up to date") || output.contains("Already up-to-date")
}

/// `(reinitialized, git_dir)` from `git init` output.
pub fn parse_init(output: &str) -> Option<(bool, String)> {
    let caps = INIT_RE.captures(output)?;
    Some((caps["re"].starts_with("Reinitialized"), caps["dir"].to_string()))
}

/// Target directory named by `Cloning into '...'`.
pub fn parse_clone_target(output: &str) -> Option<String> {
    CLONE_RE.captures(output).map(|c| c["dir"].to_string())
}

pub fn stash_had_no_changes(output: &str) -> bool {
    output.contains("No local changes to save")
}
