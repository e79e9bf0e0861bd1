//! Process adapter: one contract, two spawn strategies
//!
//! [`run`] spawns a program, captures stdout/stderr and races three outcomes:
//! normal exit, timeout and cancellation. Exactly one of them settles the call.
//!
//! # Strategies
//!
//! - [`SpawnStrategy::Async`]: `tokio::process`, pipes drained with
//!   `read_to_end`, outcomes raced with `tokio::select!`. Requires a tokio
//!   runtime with I/O and time drivers.
//! - [`SpawnStrategy::Threaded`]: `std::process` with reader threads that
//!   append chunks as they arrive and a supervisor thread that polls the child.
//!   The result is delivered through a oneshot channel, so the returned future
//!   can be driven by any executor.
//!
//! Detection happens once per process and is cached.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{spawn_async, spawn_threaded};
use crate::context::CancelToken;

/// Environment variable that forces a strategy, bypassing detection.
pub const STRATEGY_ENV: &str = "GITOPS_SPAWN_STRATEGY";

static DETECTED: OnceLock<SpawnStrategy> = OnceLock::new();

/// How child processes are spawned and supervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnStrategy {
    Async,
    Threaded,
}

impl SpawnStrategy {
    /// Detected strategy for this process. Probed on first call only.
    pub fn detect() -> Self {
        *DETECTED.get_or_init(Self::probe)
    }

    fn probe() -> Self {
        if let Some(forced) = std::env::var(STRATEGY_ENV)
            .ok()
            .and_then(|v| v.parse::<SpawnStrategy>().ok())
        {
            tracing::debug!("spawn strategy forced to {} via {}", forced, STRATEGY_ENV);
            return forced;
        }

        let strategy = if tokio::runtime::Handle::try_current().is_ok() {
            SpawnStrategy::Async
        } else {
            SpawnStrategy::Threaded
        };
        tracing::debug!("detected spawn strategy: {}", strategy);
        strategy
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Async => "async",
            Self::Threaded => "threaded",
        }
    }
}

impl fmt::Display for SpawnStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpawnStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "async" | "tokio" => Ok(Self::Async),
            "threaded" | "thread" | "std" => Ok(Self::Threaded),
            other => Err(format!("unknown spawn strategy: {}", other)),
        }
    }
}

/// Fully resolved description of one child process.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Complete environment; the child does not inherit anything else
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
    pub cancel: Option<CancelToken>,
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Process-level failures. Translated into domain errors by `error_map`.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Non-zero exit (or death by signal, where `exit_code` is `None`).
    #[error("process exited with {}", describe_exit(*exit_code))]
    Exited {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("process timed out after {} ms", timeout.as_millis())]
    Timeout {
        timeout: Duration,
        /// Output captured before the child was killed
        stdout: String,
        stderr: String,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

/// Run an invocation to completion using `strategy`.
///
/// A token that already fired fails fast with [`ProcessError::Cancelled`]
/// without spawning anything.
pub async fn run(invocation: &Invocation, strategy: SpawnStrategy) -> Result<ProcessOutput, ProcessError> {
    if invocation
        .cancel
        .as_ref()
        .is_some_and(CancelToken::is_cancelled)
    {
        return Err(ProcessError::Cancelled);
    }

    match strategy {
        SpawnStrategy::Async => spawn_async::run(invocation).await,
        SpawnStrategy::Threaded => spawn_threaded::run(invocation).await,
    }
}

pub(crate) fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
