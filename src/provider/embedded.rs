//! libgit2-backed provider
//!
//! Covers the local repository verbs only. Every call opens the repository
//! fresh on a blocking worker thread, so nothing is shared between calls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use git2::{BranchType, IndexAddOption, Repository, RepositoryInitOptions, Sort, Status};

use crate::capabilities::{Capabilities, Operation};
use crate::context::OperationContext;
use crate::error::{Diagnostics, GitOpsError, Result};
use crate::error_map::map_git2_error;
use crate::exec::args::ensure_no_nul;
use crate::exec::DEFAULT_TIMEOUT;
use crate::ops::branch::{BranchAction, BranchOutcome};
use crate::ops::commit::{CommitOptions, CommitResult};
use crate::ops::history::{LogOptions, LogResult};
use crate::ops::remote::{RemoteAction, RemoteOutcome};
use crate::ops::repo::{InitOptions, InitResult};
use crate::ops::stage::{AddOptions, AddResult};
use crate::ops::status::StatusOptions;
use crate::ops::tag::{TagAction, TagOutcome};
use crate::parse::diffstat::{DiffStat, FileStat};
use crate::parse::log::CommitRecord;
use crate::parse::refs::BranchInfo;
use crate::parse::remote::RemoteInfo;
use crate::parse::status::StatusResult;

const CAPABILITIES: Capabilities = Capabilities::embedded();

trait Git2ResultExt<T> {
    fn during(self, operation: Operation) -> Result<T>;
}

impl<T> Git2ResultExt<T> for std::result::Result<T, git2::Error> {
    fn during(self, operation: Operation) -> Result<T> {
        self.map_err(|err| map_git2_error(err, operation))
    }
}

/// Same rules the argument builder applies to refs and names.
fn check_name(operation: Operation, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GitOpsError::validation(operation, format!("{} must not be empty", field)));
    }
    if value.starts_with('-') {
        return Err(GitOpsError::validation(
            operation,
            format!("{} may not start with '-': {}", field, value),
        ));
    }
    ensure_no_nul(value).map_err(|e| GitOpsError::validation(operation, e.to_string()))
}

fn open(operation: Operation, dir: &Path) -> Result<Repository> {
    Repository::discover(dir).during(operation)
}

fn format_time(time: git2::Time) -> String {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).or_else(|| FixedOffset::east_opt(0));
    match (DateTime::from_timestamp(time.seconds(), 0), offset) {
        (Some(utc), Some(offset)) => utc.with_timezone(&offset).to_rfc3339(),
        _ => String::new(),
    }
}

fn commit_record(commit: &git2::Commit<'_>) -> CommitRecord {
    let author = commit.author();
    CommitRecord {
        hash: commit.id().to_string(),
        author_name: author.name().unwrap_or_default().to_string(),
        author_email: author.email().unwrap_or_default().to_string(),
        date: format_time(author.when()),
        subject: commit.summary().unwrap_or_default().to_string(),
    }
}

/// Libgit2 engine. Stateless apart from its default budget.
#[derive(Debug, Clone)]
pub struct EmbeddedProvider {
    default_timeout: Duration,
}

impl Default for EmbeddedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedProvider {
    pub const NAME: &'static str = "embedded";

    pub fn new() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn capabilities(&self) -> &'static Capabilities {
        &CAPABILITIES
    }

    /// libgit2 answers a version query; nothing on disk is touched.
    pub fn health_check(&self) -> bool {
        let (major, minor, _) = git2::Version::get().libgit2_version();
        tracing::debug!("libgit2 {}.{}", major, minor);
        major >= 1
    }

    /// Run `work` on the blocking pool, raced against the call's remaining
    /// budget and its cancellation token.
    ///
    /// A worker that loses the race is abandoned: its result is dropped when
    /// it finishes.
    async fn blocking<T, F>(&self, operation: Operation, ctx: &OperationContext, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
    {
        if ctx.is_cancelled() {
            return Err(GitOpsError::cancelled(operation));
        }
        let budget = ctx.budget(self.default_timeout);
        let remaining = ctx.remaining(self.default_timeout);
        let diagnostics = || {
            Box::new(Diagnostics {
                trace: Some(ctx.trace.to_string()),
                ..Diagnostics::default()
            })
        };
        if remaining.is_zero() {
            return Err(GitOpsError::Timeout {
                operation,
                timeout_ms: budget.as_millis() as u64,
                diagnostics: diagnostics(),
            });
        }

        let dir = ctx.working_directory.clone();
        tracing::debug!(operation = %operation, trace = %ctx.trace, cwd = %dir.display(), "libgit2");
        let worker = tokio::task::spawn_blocking(move || work(dir.as_path()));
        let cancelled = async {
            match &ctx.cancellation {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => {
                tracing::debug!(operation = %operation, trace = %ctx.trace, "cancelled, abandoning libgit2 worker");
                Err(GitOpsError::Cancelled {
                    operation,
                    diagnostics: diagnostics(),
                })
            }
            _ = tokio::time::sleep(remaining) => {
                tracing::warn!(
                    operation = %operation,
                    trace = %ctx.trace,
                    "timed out after {} ms, abandoning libgit2 worker",
                    budget.as_millis()
                );
                Err(GitOpsError::Timeout {
                    operation,
                    timeout_ms: budget.as_millis() as u64,
                    diagnostics: diagnostics(),
                })
            }
            joined = worker => match joined {
                Ok(result) => result,
                Err(e) => Err(GitOpsError::internal(operation, format!("embedded worker failed: {}", e))),
            },
        }
    }

    pub async fn init(&self, opts: &InitOptions, ctx: &OperationContext) -> Result<InitResult> {
        const OP: Operation = Operation::Init;
        let opts = opts.clone();
        if let Some(branch) = &opts.initial_branch {
            check_name(OP, "initial_branch", branch)?;
        }
        self.blocking(OP, ctx, move |dir| {
            let target = match &opts.directory {
                Some(sub) => dir.join(sub),
                None => dir.to_path_buf(),
            };
            let reinitialized = Repository::open(&target).is_ok();

            let mut init = RepositoryInitOptions::new();
            init.bare(opts.bare).mkpath(true);
            if let Some(branch) = &opts.initial_branch {
                init.initial_head(branch);
            }
            let repo = Repository::init_opts(&target, &init).during(OP)?;

            let git_dir = repo.path();
            Ok(InitResult {
                git_dir: PathBuf::from(git_dir.to_string_lossy().trim_end_matches('/')),
                bare: repo.is_bare(),
                reinitialized,
            })
        })
        .await
    }

    pub async fn status(&self, opts: &StatusOptions, ctx: &OperationContext) -> Result<StatusResult> {
        const OP: Operation = Operation::Status;
        let opts = opts.clone();
        self.blocking(OP, ctx, move |dir| {
            let repo = open(OP, dir)?;
            status(&repo, &opts)
        })
        .await
    }

    pub async fn add(&self, opts: &AddOptions, ctx: &OperationContext) -> Result<AddResult> {
        const OP: Operation = Operation::Add;
        if opts.paths.is_empty() && !opts.all && !opts.update {
            return Err(GitOpsError::validation(OP, "nothing to add: give paths, all or update"));
        }
        let opts = opts.clone();
        self.blocking(OP, ctx, move |dir| {
            let repo = open(OP, dir)?;
            add(&repo, &opts)
        })
        .await
    }

    pub async fn commit(&self, opts: &CommitOptions, ctx: &OperationContext) -> Result<CommitResult> {
        const OP: Operation = Operation::Commit;
        if opts.message.trim().is_empty() {
            return Err(GitOpsError::validation(OP, "message must not be empty"));
        }
        if opts.sign {
            return Err(GitOpsError::UnsupportedCapability {
                operation: OP,
                provider: Self::NAME,
            });
        }
        let opts = opts.clone();
        self.blocking(OP, ctx, move |dir| {
            let repo = open(OP, dir)?;
            commit(&repo, &opts)
        })
        .await
    }

    pub async fn log(&self, opts: &LogOptions, ctx: &OperationContext) -> Result<LogResult> {
        const OP: Operation = Operation::Log;
        if opts.since.is_some() || opts.until.is_some() || !opts.paths.is_empty() {
            return Err(GitOpsError::validation(
                OP,
                "since, until and paths filters need the git CLI provider",
            ));
        }
        if let Some(revision) = &opts.revision {
            check_name(OP, "revision", revision)?;
        }
        let opts = opts.clone();
        self.blocking(OP, ctx, move |dir| {
            let repo = open(OP, dir)?;
            log(&repo, &opts)
        })
        .await
    }

    pub async fn branch(&self, action: &BranchAction, ctx: &OperationContext) -> Result<BranchOutcome> {
        const OP: Operation = Operation::Branch;
        let action = action.clone();
        self.blocking(OP, ctx, move |dir| {
            let repo = open(OP, dir)?;
            branch(&repo, &action)
        })
        .await
    }

    pub async fn tag(&self, action: &TagAction, ctx: &OperationContext) -> Result<TagOutcome> {
        const OP: Operation = Operation::Tag;
        let action = action.clone();
        self.blocking(OP, ctx, move |dir| {
            let repo = open(OP, dir)?;
            tag(&repo, &action)
        })
        .await
    }

    pub async fn remote(&self, action: &RemoteAction, ctx: &OperationContext) -> Result<RemoteOutcome> {
        const OP: Operation = Operation::Remote;
        let action = action.clone();
        self.blocking(OP, ctx, move |dir| {
            let repo = open(OP, dir)?;
            remote(&repo, &action)
        })
        .await
    }
}

fn status(repo: &Repository, opts: &StatusOptions) -> Result<StatusResult> {
    const OP: Operation = Operation::Status;
    let mut result = StatusResult::default();

    match repo.head() {
        Ok(head) => {
            result.head_commit = head.target().map(|oid| oid.to_string());
            if head.is_branch() {
                result.current_branch = head.shorthand().map(str::to_string);
            }
        }
        Err(err) if err.code() == git2::ErrorCode::UnbornBranch => {
            let head = repo.find_reference("HEAD").during(OP)?;
            result.current_branch = head
                .symbolic_target()
                .map(|t| t.strip_prefix("refs/heads/").unwrap_or(t).to_string());
        }
        Err(err) => return Err(map_git2_error(err, OP)),
    }

    if let (Some(name), Some(local)) = (&result.current_branch, &result.head_commit) {
        if let Ok(upstream) = repo.find_branch(name, BranchType::Local).and_then(|b| b.upstream()) {
            result.upstream = upstream.name().ok().flatten().map(str::to_string);
            if let (Ok(local), Some(remote)) = (git2::Oid::from_str(local), upstream.get().target()) {
                let (ahead, behind) = repo.graph_ahead_behind(local, remote).during(OP)?;
                result.ahead = ahead as u32;
                result.behind = behind as u32;
            }
        }
    }

    let mut options = git2::StatusOptions::new();
    options
        .include_untracked(true)
        .recurse_untracked_dirs(opts.untracked_all)
        .include_ignored(false)
        .renames_head_to_index(true);
    for path in &opts.paths {
        options.pathspec(path);
    }
    let statuses = repo.statuses(Some(&mut options)).during(OP)?;

    for entry in statuses.iter() {
        let flags = entry.status();
        let Some(path) = entry.path() else {
            continue;
        };

        if flags.contains(Status::CONFLICTED) {
            result.conflicted_files.push(path.to_string());
            continue;
        }
        if flags.contains(Status::WT_NEW) && !flags.intersects(Status::INDEX_NEW) {
            result.untracked_files.push(path.to_string());
            continue;
        }

        let staged_path = if flags.contains(Status::INDEX_RENAMED) {
            entry
                .head_to_index()
                .and_then(|delta| {
                    let old = delta.old_file().path()?.to_string_lossy().into_owned();
                    let new = delta.new_file().path()?.to_string_lossy().into_owned();
                    Some(format!("{} -> {}", old, new))
                })
                .unwrap_or_else(|| path.to_string())
        } else {
            path.to_string()
        };

        let staged = [
            (Status::INDEX_NEW, 'A'),
            (Status::INDEX_MODIFIED, 'M'),
            (Status::INDEX_DELETED, 'D'),
            (Status::INDEX_RENAMED, 'R'),
            (Status::INDEX_TYPECHANGE, 'T'),
        ];
        let unstaged = [
            (Status::WT_MODIFIED, 'M'),
            (Status::WT_DELETED, 'D'),
            (Status::WT_RENAMED, 'R'),
            (Status::WT_TYPECHANGE, 'T'),
        ];
        if let Some((_, code)) = staged.iter().find(|(flag, _)| flags.contains(*flag)) {
            result.staged_changes.record(*code, &staged_path);
        }
        if let Some((_, code)) = unstaged.iter().find(|(flag, _)| flags.contains(*flag)) {
            result.unstaged_changes.record(*code, path);
        }
    }

    result.is_clean = result.staged_changes.is_empty()
        && result.unstaged_changes.is_empty()
        && result.untracked_files.is_empty()
        && result.conflicted_files.is_empty();
    Ok(result)
}

fn add(repo: &Repository, opts: &AddOptions) -> Result<AddResult> {
    const OP: Operation = Operation::Add;
    for path in &opts.paths {
        ensure_no_nul(path).map_err(|e| GitOpsError::validation(OP, e.to_string()))?;
    }

    let specs: Vec<String> = if opts.paths.is_empty() {
        vec!["*".to_string()]
    } else {
        opts.paths.clone()
    };
    let mut index = repo.index().during(OP)?;
    let mut result = AddResult::default();

    if !opts.update || opts.all {
        let flags = if opts.force {
            IndexAddOption::FORCE
        } else {
            IndexAddOption::DEFAULT
        };
        let mut on_add = |path: &Path, _spec: &[u8]| -> i32 {
            if let Ok(status) = repo.status_file(path) {
                if status.intersects(Status::WT_NEW | Status::WT_MODIFIED | Status::WT_TYPECHANGE) {
                    result.added.push(path.to_string_lossy().into_owned());
                }
            }
            0
        };
        index
            .add_all(specs.iter().map(String::as_str), flags, Some(&mut on_add as &mut git2::IndexMatchedPath))
            .during(OP)?;
    }

    if opts.update || opts.all {
        let mut on_update = |path: &Path, _spec: &[u8]| -> i32 {
            if let Ok(status) = repo.status_file(path) {
                if status.contains(Status::WT_DELETED) {
                    result.removed.push(path.to_string_lossy().into_owned());
                } else if opts.update
                    && !opts.all
                    && status.intersects(Status::WT_MODIFIED | Status::WT_TYPECHANGE)
                {
                    result.added.push(path.to_string_lossy().into_owned());
                }
            }
            0
        };
        index
            .update_all(specs.iter().map(String::as_str), Some(&mut on_update as &mut git2::IndexMatchedPath))
            .during(OP)?;
    }

    index.write().during(OP)?;
    Ok(result)
}

/// `Name <email>` to its parts.
fn parse_author(value: &str) -> Option<(&str, &str)> {
    let (name, rest) = value.split_once('<')?;
    let email = rest.strip_suffix('>')?;
    Some((name.trim(), email.trim()))
}

fn commit(repo: &Repository, opts: &CommitOptions) -> Result<CommitResult> {
    const OP: Operation = Operation::Commit;

    let committer = repo.signature().during(OP)?;
    let author = match &opts.author {
        Some(value) => {
            let (name, email) = parse_author(value).ok_or_else(|| {
                GitOpsError::validation(OP, format!("author must look like 'Name <email>': {}", value))
            })?;
            git2::Signature::now(name, email).during(OP)?
        }
        None => committer.clone(),
    };

    let mut index = repo.index().during(OP)?;
    if opts.all {
        index.update_all(["*"], None).during(OP)?;
        index.write().during(OP)?;
    }
    let tree = repo.find_tree(index.write_tree().during(OP)?).during(OP)?;

    let head_commit = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().during(OP)?),
        Err(err) if err.code() == git2::ErrorCode::UnbornBranch => None,
        Err(err) => return Err(map_git2_error(err, OP)),
    };
    if opts.amend && head_commit.is_none() {
        return Err(GitOpsError::validation(OP, "nothing to amend: no commits yet"));
    }

    let base_tree = if opts.amend {
        head_commit
            .as_ref()
            .and_then(|c| c.parent(0).ok())
            .map(|p| p.tree())
            .transpose()
            .during(OP)?
    } else {
        head_commit.as_ref().map(|c| c.tree()).transpose().during(OP)?
    };

    let unchanged = match &base_tree {
        Some(base) => base.id() == tree.id(),
        None => index.len() == 0,
    };
    if unchanged && !opts.allow_empty && !opts.amend {
        return Err(GitOpsError::validation(OP, "nothing to commit, working tree clean"));
    }

    let oid = match (&head_commit, opts.amend) {
        (Some(head), true) => head
            .amend(Some("HEAD"), Some(&author), Some(&committer), None, Some(opts.message.as_str()), Some(&tree))
            .during(OP)?,
        (head, _) => {
            let parents: Vec<&git2::Commit<'_>> = head.iter().collect();
            repo.commit(Some("HEAD"), &author, &committer, &opts.message, &tree, &parents)
                .during(OP)?
        }
    };

    let created = repo.find_commit(oid).during(OP)?;
    let branch = repo
        .head()
        .ok()
        .filter(|h| h.is_branch())
        .and_then(|h| h.shorthand().map(str::to_string));
    let hash = oid.to_string();

    Ok(CommitResult {
        short_hash: hash.chars().take(7).collect(),
        subject: created.summary().unwrap_or_default().to_string(),
        root_commit: created.parent_count() == 0,
        stats: tree_stats(repo, base_tree.as_ref(), &tree)?,
        hash,
        branch,
        signed: false,
    })
}

fn tree_stats(repo: &Repository, old: Option<&git2::Tree<'_>>, new: &git2::Tree<'_>) -> Result<DiffStat> {
    const OP: Operation = Operation::Commit;
    let diff = repo.diff_tree_to_tree(old, Some(new), None).during(OP)?;
    let mut files = Vec::new();
    for index in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(index) else {
            continue;
        };
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let binary = delta.flags().is_binary();
        let (additions, deletions) = match git2::Patch::from_diff(&diff, index).during(OP)? {
            Some(patch) if !binary => {
                let (_, additions, deletions) = patch.line_stats().during(OP)?;
                (additions as u32, deletions as u32)
            }
            _ => (0, 0),
        };
        files.push(FileStat {
            path,
            additions,
            deletions,
            binary,
        });
    }
    let stats = diff.stats().during(OP)?;
    Ok(DiffStat {
        files,
        files_changed: stats.files_changed() as u32,
        additions: stats.insertions() as u32,
        deletions: stats.deletions() as u32,
    })
}

fn log(repo: &Repository, opts: &LogOptions) -> Result<LogResult> {
    const OP: Operation = Operation::Log;
    let mut walk = repo.revwalk().during(OP)?;
    walk.set_sorting(Sort::TIME).during(OP)?;

    match opts.revision.as_deref() {
        Some(range) if range.contains("..") => walk.push_range(range).during(OP)?,
        Some(revision) => {
            let commit = repo
                .revparse_single(revision)
                .and_then(|o| o.peel_to_commit())
                .during(OP)?;
            walk.push(commit.id()).during(OP)?;
        }
        None => match walk.push_head() {
            Ok(()) => {}
            Err(err) if matches!(err.code(), git2::ErrorCode::UnbornBranch | git2::ErrorCode::NotFound) => {
                return Ok(LogResult::default())
            }
            Err(err) => return Err(map_git2_error(err, OP)),
        },
    }

    let limit = opts.max_count.map_or(usize::MAX, |n| n as usize);
    let mut commits = Vec::new();
    for oid in walk {
        if commits.len() >= limit {
            break;
        }
        let commit = repo.find_commit(oid.during(OP)?).during(OP)?;
        let record = commit_record(&commit);
        if let Some(author) = &opts.author {
            if !record.author_name.contains(author.as_str()) && !record.author_email.contains(author.as_str()) {
                continue;
            }
        }
        if let Some(grep) = &opts.grep {
            if !commit.message().unwrap_or_default().contains(grep.as_str()) {
                continue;
            }
        }
        commits.push(record);
    }
    Ok(LogResult { commits })
}

fn branch_info(repo: &Repository, branch: &git2::Branch<'_>, kind: BranchType) -> Option<BranchInfo> {
    let name = branch.name().ok().flatten()?.to_string();
    if kind == BranchType::Remote && name.ends_with("/HEAD") {
        return None;
    }
    let tip = branch.get().target();
    let mut info = BranchInfo {
        commit_hash: tip.map(|oid| oid.to_string()).unwrap_or_default(),
        current: branch.is_head(),
        remote: kind == BranchType::Remote,
        name,
        ..BranchInfo::default()
    };
    if kind == BranchType::Local {
        if let Ok(upstream) = branch.upstream() {
            info.upstream = upstream.name().ok().flatten().map(str::to_string);
            if let (Some(local), Some(remote)) = (tip, upstream.get().target()) {
                if let Ok((ahead, behind)) = repo.graph_ahead_behind(local, remote) {
                    info.ahead = ahead as u32;
                    info.behind = behind as u32;
                }
            }
        } else if let Ok(config) = repo.config() {
            // Configured upstream whose remote branch no longer exists.
            let key = format!("branch.{}.merge", info.name);
            info.upstream_gone = config.get_string(&key).is_ok();
        }
    }
    Some(info)
}

fn branch(repo: &Repository, action: &BranchAction) -> Result<BranchOutcome> {
    const OP: Operation = Operation::Branch;

    match action {
        BranchAction::List { all } => {
            let filter = if *all { None } else { Some(BranchType::Local) };
            let mut branches = Vec::new();
            for item in repo.branches(filter).during(OP)? {
                let (branch, kind) = item.during(OP)?;
                if let Some(info) = branch_info(repo, &branch, kind) {
                    branches.push(info);
                }
            }
            Ok(BranchOutcome::Listed { branches })
        }
        BranchAction::Create {
            name,
            start_point,
            force,
        } => {
            check_name(OP, "name", name)?;
            let start = start_point.as_deref().unwrap_or("HEAD");
            check_name(OP, "start_point", start)?;
            let commit = repo
                .revparse_single(start)
                .and_then(|o| o.peel_to_commit())
                .during(OP)?;
            let created = repo.branch(name, &commit, *force).during(OP)?;
            Ok(BranchOutcome::Created {
                name: name.clone(),
                commit_hash: created.get().target().map(|oid| oid.to_string()),
            })
        }
        BranchAction::Delete { name, force } => {
            check_name(OP, "name", name)?;
            let mut branch = repo.find_branch(name, BranchType::Local).during(OP)?;
            if branch.is_head() {
                return Err(GitOpsError::Conflict {
                    operation: OP,
                    message: format!("cannot delete branch '{}' checked out", name),
                    paths: Vec::new(),
                    diagnostics: Box::default(),
                });
            }
            if !force {
                let head = repo.head().ok().and_then(|h| h.target());
                if let (Some(head), Some(tip)) = (head, branch.get().target()) {
                    let merged = head == tip || repo.graph_descendant_of(head, tip).during(OP)?;
                    if !merged {
                        return Err(GitOpsError::Conflict {
                            operation: OP,
                            message: format!("the branch '{}' is not fully merged", name),
                            paths: Vec::new(),
                            diagnostics: Box::default(),
                        });
                    }
                }
            }
            branch.delete().during(OP)?;
            Ok(BranchOutcome::Deleted { name: name.clone() })
        }
        BranchAction::Rename { from, to } => {
            check_name(OP, "from", from)?;
            check_name(OP, "to", to)?;
            let mut branch = repo.find_branch(from, BranchType::Local).during(OP)?;
            branch.rename(to, false).during(OP)?;
            Ok(BranchOutcome::Renamed {
                from: from.clone(),
                to: to.clone(),
            })
        }
        BranchAction::SetUpstream { name, upstream } => {
            check_name(OP, "name", name)?;
            check_name(OP, "upstream", upstream)?;
            let mut branch = repo.find_branch(name, BranchType::Local).during(OP)?;
            branch.set_upstream(Some(upstream.as_str())).during(OP)?;
            Ok(BranchOutcome::UpstreamSet {
                name: name.clone(),
                upstream: upstream.clone(),
            })
        }
    }
}

fn tag(repo: &Repository, action: &TagAction) -> Result<TagOutcome> {
    const OP: Operation = Operation::Tag;

    let names = |pattern: Option<&str>| -> Result<Vec<String>> {
        let mut tags: Vec<String> = repo
            .tag_names(pattern)
            .during(OP)?
            .iter()
            .flatten()
            .map(str::to_string)
            .collect();
        tags.sort();
        Ok(tags)
    };

    match action {
        TagAction::List => Ok(TagOutcome::Listed { tags: names(None)? }),
        TagAction::Search { pattern } => {
            check_name(OP, "pattern", pattern)?;
            Ok(TagOutcome::Listed {
                tags: names(Some(pattern.as_str()))?,
            })
        }
        TagAction::Create {
            name,
            target,
            message,
            force,
        } => {
            check_name(OP, "name", name)?;
            let target = target.as_deref().unwrap_or("HEAD");
            check_name(OP, "target", target)?;
            let object = repo.revparse_single(target).during(OP)?;
            match message {
                Some(message) => {
                    let tagger = repo.signature().during(OP)?;
                    repo.tag(name, &object, &tagger, message, *force).during(OP)?;
                }
                None => {
                    repo.tag_lightweight(name, &object, *force).during(OP)?;
                }
            }
            Ok(TagOutcome::Created {
                name: name.clone(),
                annotated: message.is_some(),
            })
        }
        TagAction::Delete { name } => {
            check_name(OP, "name", name)?;
            repo.tag_delete(name).during(OP)?;
            Ok(TagOutcome::Deleted { name: name.clone() })
        }
    }
}

fn remote(repo: &Repository, action: &RemoteAction) -> Result<RemoteOutcome> {
    const OP: Operation = Operation::Remote;

    match action {
        RemoteAction::List => {
            let mut remotes = Vec::new();
            for name in repo.remotes().during(OP)?.iter().flatten() {
                let remote = repo.find_remote(name).during(OP)?;
                let fetch_url = remote.url().map(str::to_string);
                remotes.push(RemoteInfo {
                    name: name.to_string(),
                    push_url: remote.pushurl().map(str::to_string).or_else(|| fetch_url.clone()),
                    fetch_url,
                });
            }
            Ok(RemoteOutcome::Listed { remotes })
        }
        RemoteAction::Add { name, url } => {
            check_name(OP, "name", name)?;
            check_name(OP, "url", url)?;
            repo.remote(name, url).during(OP)?;
            Ok(RemoteOutcome::Added {
                name: name.clone(),
                url: url.clone(),
            })
        }
        RemoteAction::Remove { name } => {
            check_name(OP, "name", name)?;
            repo.remote_delete(name).during(OP)?;
            Ok(RemoteOutcome::Removed { name: name.clone() })
        }
        RemoteAction::Rename { from, to } => {
            check_name(OP, "from", from)?;
            check_name(OP, "to", to)?;
            let problems = repo.remote_rename(from, to).during(OP)?;
            for problem in problems.iter().flatten() {
                tracing::warn!("remote rename left refspec unchanged: {}", problem);
            }
            Ok(RemoteOutcome::Renamed {
                from: from.clone(),
                to: to.clone(),
            })
        }
        RemoteAction::SetUrl { name, url, push } => {
            check_name(OP, "name", name)?;
            check_name(OP, "url", url)?;
            // Fails with NotFound for an unknown remote, like the CLI.
            repo.find_remote(name).during(OP)?;
            if *push {
                repo.remote_set_pushurl(name, Some(url.as_str())).during(OP)?;
            } else {
                repo.remote_set_url(name, url).during(OP)?;
            }
            Ok(RemoteOutcome::UrlSet {
                name: name.clone(),
                url: url.clone(),
                push: *push,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_author() {
        assert_eq!(parse_author("Ada Lovelace <ada@example.com>"), Some(("Ada Lovelace", "ada@example.com")));
        assert_eq!(parse_author("no email"), None);
    }

    #[test]
    fn test_check_name_rejects_option_like() {
        let err = check_name(Operation::Branch, "name", "--force").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(check_name(Operation::Branch, "name", "feature/x").is_ok());
        assert!(check_name(Operation::Branch, "name", " ").is_err());
    }

    #[test]
    fn test_format_time_keeps_offset() {
        let time = git2::Time::new(1_700_000_000, 60);
        assert_eq!(format_time(time), "2023-11-14T23:13:20+01:00");
    }

    #[tokio::test]
    async fn test_slow_work_times_out() {
        let provider = EmbeddedProvider::new();
        let ctx = OperationContext::new("/tmp")
            .with_timeout(Duration::from_millis(100))
            .with_trace(crate::context::TraceId::new("t-1"));
        let started = std::time::Instant::now();
        let result = provider
            .blocking(Operation::Log, &ctx, |_| {
                std::thread::sleep(Duration::from_millis(800));
                Ok(())
            })
            .await;
        assert!(started.elapsed() < Duration::from_millis(600));
        match result {
            Err(GitOpsError::Timeout { timeout_ms, diagnostics, .. }) => {
                assert_eq!(timeout_ms, 100);
                assert_eq!(diagnostics.trace.as_deref(), Some("t-1"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_work_is_cancellable() {
        let provider = EmbeddedProvider::new();
        let token = crate::context::CancelToken::new();
        let ctx = OperationContext::new("/tmp").with_cancellation(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });
        let started = std::time::Instant::now();
        let result = provider
            .blocking(Operation::Status, &ctx, |_| {
                std::thread::sleep(Duration::from_millis(800));
                Ok(())
            })
            .await;
        assert!(started.elapsed() < Duration::from_millis(600));
        assert!(matches!(result, Err(GitOpsError::Cancelled { .. })));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn test_fast_work_settles_normally() {
        let provider = EmbeddedProvider::new().with_default_timeout(Duration::from_secs(5));
        let ctx = OperationContext::new("/tmp");
        let value = provider.blocking(Operation::Status, &ctx, |_| Ok(7)).await.unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_health_check_is_pure() {
        let provider = EmbeddedProvider::new();
        assert!(provider.health_check());
        assert!(provider.health_check());
    }
}
