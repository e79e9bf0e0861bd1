//! Read-only history queries: log, show, blame, reflog

use serde::{Deserialize, Serialize};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{GitOpsError, Result};
use crate::exec::{ArgBuilder, GitRunner};
use crate::parse::blame::{parse_blame, BlameLine};
use crate::parse::diffstat::{parse_diff_stat, DiffStat};
use crate::parse::log::{parse_log, parse_show_header, CommitRecord, LOG_FORMAT, SHOW_FORMAT};
use crate::parse::reflog::{parse_reflog, ReflogEntry, REFLOG_FORMAT};

use super::{head_hash, require};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogOptions {
    pub max_count: Option<u32>,
    /// Revision or range; `HEAD` when absent
    pub revision: Option<String>,
    pub author: Option<String>,
    pub grep: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogResult {
    pub commits: Vec<CommitRecord>,
}

pub async fn log(runner: &GitRunner, opts: &LogOptions, ctx: &OperationContext) -> Result<LogResult> {
    let args = ArgBuilder::new("log")
        .option_eq("--format", LOG_FORMAT)
        .option_eq_opt("--max-count", opts.max_count)
        .option_eq_opt("--author", opts.author.as_deref())
        .option_eq_opt("--grep", opts.grep.as_deref())
        .option_eq_opt("--since", opts.since.as_deref())
        .option_eq_opt("--until", opts.until.as_deref())
        .positional_opt(opts.revision.as_deref())
        .paths(opts.paths.iter().cloned());

    match runner.run(Operation::Log, args, ctx).await {
        Ok(output) => Ok(LogResult {
            commits: parse_log(&output.stdout),
        }),
        // An unborn branch has an empty history, not a missing one.
        Err(err @ GitOpsError::NotFound { .. }) if opts.revision.is_none() => {
            match head_hash(runner, Operation::Log, ctx).await? {
                None => Ok(LogResult::default()),
                Some(_) => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowOptions {
    /// Commit to show; `HEAD` when absent
    pub revision: Option<String>,
    /// Include the full patch text
    pub patch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowResult {
    pub commit: CommitRecord,
    pub parents: Vec<String>,
    pub body: String,
    pub stats: DiffStat,
    pub patch: Option<String>,
}

/// Split `--patch-with-stat` text into the stat block and the patch.
pub(crate) fn split_stat_and_patch(text: &str) -> (&str, &str) {
    match text.find("diff --git ") {
        Some(index) => (&text[..index], &text[index..]),
        None => (text, ""),
    }
}

pub async fn show(runner: &GitRunner, opts: &ShowOptions, ctx: &OperationContext) -> Result<ShowResult> {
    let revision = opts.revision.as_deref().unwrap_or("HEAD");
    let args = ArgBuilder::new("show")
        .option_eq("--format", SHOW_FORMAT)
        .flag(if opts.patch { "--patch-with-stat" } else { "--stat" })
        .positional(revision);
    let output = runner.run(Operation::Show, args, ctx).await?;

    let (header, rest) = parse_show_header(&output.stdout).ok_or_else(|| {
        GitOpsError::internal(Operation::Show, format!("unexpected show output for {}", revision))
    })?;
    let (stat_text, patch_text) = split_stat_and_patch(rest);

    Ok(ShowResult {
        commit: header.commit,
        parents: header.parents,
        body: header.body,
        stats: parse_diff_stat(stat_text),
        patch: opts.patch.then(|| patch_text.to_string()),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlameOptions {
    pub path: String,
    pub revision: Option<String>,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameResult {
    pub path: String,
    pub lines: Vec<BlameLine>,
}

pub async fn blame(runner: &GitRunner, opts: &BlameOptions, ctx: &OperationContext) -> Result<BlameResult> {
    require(Operation::Blame, "path", &opts.path)?;
    let range = match (opts.start_line, opts.end_line) {
        (None, None) => None,
        (Some(0), _) | (_, Some(0)) => {
            return Err(GitOpsError::validation(Operation::Blame, "line numbers start at 1"));
        }
        (Some(start), Some(end)) if end < start => {
            return Err(GitOpsError::validation(
                Operation::Blame,
                format!("end_line {} is before start_line {}", end, start),
            ));
        }
        (start, end) => Some(format!(
            "{},{}",
            start.unwrap_or(1),
            end.map(|e| e.to_string()).unwrap_or_default()
        )),
    };

    let args = ArgBuilder::new("blame")
        .flag("--porcelain")
        .option_opt("-L", range.as_deref())
        .positional_opt(opts.revision.as_deref())
        .paths([opts.path.as_str()]);
    let output = runner.run(Operation::Blame, args, ctx).await?;

    Ok(BlameResult {
        path: opts.path.clone(),
        lines: parse_blame(&output.stdout),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflogOptions {
    /// Ref whose log to read; `HEAD` when absent
    pub reference: Option<String>,
    pub max_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflogResult {
    pub entries: Vec<ReflogEntry>,
}

pub async fn reflog(runner: &GitRunner, opts: &ReflogOptions, ctx: &OperationContext) -> Result<ReflogResult> {
    let args = ArgBuilder::new("reflog")
        .word("show")
        .option_eq("--format", REFLOG_FORMAT)
        .option_eq_opt("--max-count", opts.max_count)
        .positional(opts.reference.as_deref().unwrap_or("HEAD"));
    let output = runner.run(Operation::Reflog, args, ctx).await?;
    Ok(ReflogResult {
        entries: parse_reflog(&output.stdout),
    })
}
