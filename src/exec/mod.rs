//! Git command execution
//!
//! This module turns an [`ArgBuilder`] plus an [`OperationContext`] into a
//! supervised git process. It owns no state beyond immutable configuration,
//! so one [`GitRunner`] can serve any number of concurrent calls.

pub mod args;
pub mod env;
pub mod process;
mod spawn_async;
mod spawn_threaded;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use args::{ArgBuilder, ArgError};
pub use process::{Invocation, ProcessError, ProcessOutput, SpawnStrategy};

use crate::capabilities::Operation;
use crate::context::OperationContext;
use crate::error::{Diagnostics, GitOpsError, Result};
use crate::error_map::{self, Failure};

/// Default per-call timeout when neither the context nor the config sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments placed before every subcommand: no pager, no colors, and
/// unquoted non-ASCII paths so parsers see real file names.
pub const GLOBAL_ARGS: &[&str] = &[
    "--no-pager",
    "-c",
    "color.ui=false",
    "-c",
    "core.quotepath=false",
];

/// Immutable git invocation settings shared by all operations.
#[derive(Debug, Clone)]
pub struct GitRunner {
    binary: PathBuf,
    default_timeout: Duration,
    env_overrides: BTreeMap<String, String>,
    strategy: SpawnStrategy,
}

impl GitRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            default_timeout: DEFAULT_TIMEOUT,
            env_overrides: BTreeMap::new(),
            strategy: SpawnStrategy::detect(),
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_strategy(mut self, strategy: SpawnStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_env_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.env_overrides.extend(overrides);
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn strategy(&self) -> SpawnStrategy {
        self.strategy
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Build, validate and run one git command.
    ///
    /// Validation failures become [`GitOpsError::Validation`] and nothing is
    /// spawned. The refused tokens are kept in the diagnostics.
    pub async fn run(
        &self,
        operation: Operation,
        builder: ArgBuilder,
        ctx: &OperationContext,
    ) -> Result<ProcessOutput> {
        let attempted = builder.raw_args();
        let args = builder.build().map_err(|e| GitOpsError::Validation {
            operation,
            message: e.to_string(),
            diagnostics: Box::new(Diagnostics::with_args(&attempted, Some(ctx.trace.to_string()))),
        })?;
        self.run_args(operation, args, ctx).await
    }

    /// Run an already validated argument vector.
    ///
    /// The child gets whatever is left of the call's budget. A started context
    /// whose budget is spent times out without spawning.
    pub async fn run_args(
        &self,
        operation: Operation,
        args: Vec<String>,
        ctx: &OperationContext,
    ) -> Result<ProcessOutput> {
        let failure = Failure {
            operation,
            args: &args,
            trace: &ctx.trace,
            cwd: &ctx.working_directory,
        };
        let budget = ctx.budget(self.default_timeout);
        let remaining = ctx.remaining(self.default_timeout);
        if remaining.is_zero() {
            let spent = ProcessError::Timeout {
                timeout: budget,
                stdout: String::new(),
                stderr: String::new(),
            };
            return Err(error_map::map_process_error(spent, &failure));
        }

        let mut full_args: Vec<String> = GLOBAL_ARGS.iter().map(|s| s.to_string()).collect();
        full_args.extend(args.iter().cloned());

        let invocation = Invocation {
            program: self.binary.clone(),
            args: full_args,
            cwd: ctx.working_directory.clone(),
            env: env::build_env(&self.env_overrides),
            timeout: remaining,
            cancel: ctx.cancellation.clone(),
        };

        tracing::debug!(
            operation = %operation,
            trace = %ctx.trace,
            cwd = %ctx.working_directory.display(),
            strategy = %self.strategy,
            "git {}",
            args.join(" ")
        );

        process::run(&invocation, self.strategy)
            .await
            .map_err(|err| {
                // Report the call's budget, not the slice this spawn got.
                let err = match err {
                    ProcessError::Timeout { stdout, stderr, .. } => ProcessError::Timeout {
                        timeout: budget,
                        stdout,
                        stderr,
                    },
                    other => other,
                };
                error_map::map_process_error(err, &failure)
            })
    }

    /// `git version`, trimmed. Cheapest possible round-trip.
    pub async fn version(&self, ctx: &OperationContext) -> Result<String> {
        let output = self
            .run(Operation::Status, ArgBuilder::new("version"), ctx)
            .await?;
        Ok(output.stdout.trim().to_string())
    }
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new("git")
    }
}
