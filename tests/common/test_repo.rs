//! TestRepo builder for git-backed integration tests
//!
//! Wraps a temporary directory that can be turned into a repository, filled
//! with files and commits, and paired with a bare "remote". Fixture setup uses
//! the `git` binary directly so the code under test never builds its own
//! fixtures.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

use tempfile::TempDir;

use gitops_engine::{
    EmbeddedProvider, GitCliProvider, GitRunner, OperationContext, Provider, SpawnStrategy,
};

/// True when a `git` executable is on PATH.
pub fn git_available() -> bool {
    which::which("git").is_ok()
}

/// Return early from a test when git is not installed.
#[macro_export]
macro_rules! require_git {
    () => {
        if !$crate::common::git_available() {
            eprintln!("git not found in PATH; skipping");
            return;
        }
    };
}

pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Empty directory, not yet a repository.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Repository on branch `main` with a local identity and signing off.
    pub fn init() -> Self {
        let repo = Self::new();
        repo.init_git();
        repo
    }

    /// Repository with one commit containing `README.md`.
    pub fn with_initial_commit() -> Self {
        let repo = Self::init();
        repo.add_file("README.md", "# fixture\n").commit("initial");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write a file, creating parent directories.
    pub fn add_file(&self, relative_path: &str, content: &str) -> &Self {
        let full_path = self.join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        self
    }

    pub fn read_file(&self, relative_path: &str) -> String {
        fs::read_to_string(self.join(relative_path)).expect("Failed to read file")
    }

    /// Run git in the repository and return its output unchecked.
    pub fn git_output(&self, args: &[&str]) -> Output {
        Command::new("git")
            .current_dir(self.path())
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_EDITOR", "true")
            .output()
            .expect("Failed to run git")
    }

    /// Run git and expect success, return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = self.git_output(args);
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn init_git(&self) -> &Self {
        self.git(&["init", "--quiet"]);
        self.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        self.configure_identity()
    }

    fn configure_identity(&self) -> &Self {
        self.git(&["config", "user.email", "test@test.com"]);
        self.git(&["config", "user.name", "Test User"]);
        self.git(&["config", "commit.gpgsign", "false"]);
        self.git(&["config", "tag.gpgsign", "false"]);
        self
    }

    /// Stage everything and commit.
    pub fn commit(&self, message: &str) -> &Self {
        self.git(&["add", "-A"]);
        self.git(&["commit", "--quiet", "-m", message]);
        self
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn branch(&self) -> String {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// Create a bare repository, register it as `origin` and push `main`.
    /// Returns the bare repository so it outlives the test body.
    pub fn with_origin(&self) -> TestRepo {
        let remote = TestRepo::new();
        remote.git(&["init", "--bare", "--quiet"]);
        remote.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        let url = remote.path().to_string_lossy().to_string();
        self.git(&["remote", "add", "origin", &url]);
        self.git(&["push", "--quiet", "-u", "origin", "main"]);
        remote
    }

    /// Clone `remote` into a fresh directory with the test identity.
    pub fn clone_of(remote: &TestRepo) -> TestRepo {
        let clone = TestRepo::new();
        let url = remote.path().to_string_lossy().to_string();
        clone.git(&["clone", "--quiet", &url, "."]);
        clone.configure_identity();
        clone
    }

    pub fn ctx(&self) -> OperationContext {
        OperationContext::new(self.path())
    }

    pub fn ctx_with_timeout(&self, timeout: Duration) -> OperationContext {
        self.ctx().with_timeout(timeout)
    }

    pub fn runner() -> GitRunner {
        GitRunner::default()
    }

    pub fn threaded_runner() -> GitRunner {
        GitRunner::default().with_strategy(SpawnStrategy::Threaded)
    }

    pub fn cli_provider() -> Provider {
        Provider::Cli(GitCliProvider::new(Self::runner()))
    }

    pub fn embedded_provider() -> Provider {
        Provider::Embedded(EmbeddedProvider::new())
    }

    /// Run the gitops-engine binary inside the repository.
    pub fn run_cli(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_gitops-engine"))
            .current_dir(self.path())
            .args(args)
            .env_remove("GITOPS_PROVIDER")
            .output()
            .expect("Failed to run gitops-engine")
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
