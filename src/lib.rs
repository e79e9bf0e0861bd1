//! gitops-engine: git command execution and result normalization
//!
//! Runs git operations inside a caller-supplied working directory and turns
//! git's text output into typed records. Two providers sit behind one
//! dispatch surface: the `git` CLI (every operation) and an embedded libgit2
//! engine (a smaller capability table, no git binary needed).
//!
//! Every call takes an [`OperationContext`] carrying the working directory, a
//! trace id, an optional timeout and an optional [`CancelToken`]. Failures are
//! a single [`GitOpsError`] whose kind tells the caller whether retrying makes
//! sense.
//!
//! # Example
//!
//! ```ignore
//! use gitops_engine::{EngineConfig, OperationContext};
//! use gitops_engine::ops::status::StatusOptions;
//!
//! let provider = EngineConfig::load()?.build_provider()?;
//! let ctx = OperationContext::new("/srv/checkouts/app");
//! let status = provider.status(&StatusOptions::default(), &ctx).await?;
//! println!("{} staged", status.staged_changes.len());
//! ```

pub mod capabilities;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod error_map;
pub mod exec;
pub mod ops;
pub mod parse;
pub mod provider;

// Re-export commonly used types
pub use capabilities::{Capabilities, Operation};
pub use config::{ConfigError, EngineConfig};
pub use context::{CancelToken, OperationContext, TraceId};
pub use dispatch::dispatch;
pub use error::{Diagnostics, ErrorKind, GitOpsError, Result};
pub use exec::{ArgBuilder, GitRunner, ProcessOutput, SpawnStrategy};
pub use provider::{EmbeddedProvider, GitCliProvider, Provider, ProviderKind};
