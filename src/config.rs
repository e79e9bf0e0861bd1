//! Engine configuration
//!
//! Read from `config.toml` in the platform config directory:
//! - Linux: ~/.config/gitops-engine/config.toml
//! - macOS: ~/Library/Application Support/gitops-engine/config.toml
//! - Windows: %APPDATA%\gitops-engine\config.toml
//!
//! A missing file means defaults. Environment variables override the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exec::process::STRATEGY_ENV;
use crate::exec::{GitRunner, SpawnStrategy, DEFAULT_TIMEOUT};
use crate::provider::{EmbeddedProvider, GitCliProvider, Provider, ProviderKind};

pub const GIT_BINARY_ENV: &str = "GITOPS_GIT_BINARY";
pub const TIMEOUT_ENV: &str = "GITOPS_TIMEOUT_MS";
pub const PROVIDER_ENV: &str = "GITOPS_PROVIDER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("git executable '{name}' not found in PATH")]
    GitNotFound { name: String },
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `git` executable, by name (looked up in PATH) or path
    pub git_binary: String,
    /// Per-call timeout when the caller sets none
    pub default_timeout_ms: u64,
    pub provider: ProviderKind,
    /// `None` means detect from the calling context
    pub spawn_strategy: Option<SpawnStrategy>,
    /// Retry a commit unsigned when signing fails or is unsupported
    pub unsigned_fallback: bool,
    /// Extra environment for every git process
    pub env: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            git_binary: "git".to_string(),
            default_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            provider: ProviderKind::Cli,
            spawn_strategy: None,
            unsigned_fallback: false,
            env: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// `<config dir>/gitops-engine/config.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gitops-engine").join("config.toml"))
    }

    /// Default file plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env_from(std::env::vars())?;
        Ok(config)
    }

    /// Load configuration from a specific path. No environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply `GITOPS_*` overrides from `vars`.
    pub fn apply_env_from<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                GIT_BINARY_ENV | TIMEOUT_ENV | PROVIDER_ENV | STRATEGY_ENV => self.set(key, value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Set one value by its environment name or config key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        match key {
            GIT_BINARY_ENV | "git_binary" => {
                if value.trim().is_empty() {
                    return Err(invalid("must not be empty".to_string()));
                }
                self.git_binary = value.to_string();
            }
            TIMEOUT_ENV | "default_timeout_ms" => {
                let ms: u64 = value.trim().parse().map_err(|e| invalid(format!("{}", e)))?;
                if ms == 0 {
                    return Err(invalid("must be greater than zero".to_string()));
                }
                self.default_timeout_ms = ms;
            }
            PROVIDER_ENV | "provider" => self.provider = value.parse().map_err(invalid)?,
            STRATEGY_ENV | "spawn_strategy" => self.spawn_strategy = Some(value.parse().map_err(invalid)?),
            "unsigned_fallback" => {
                self.unsigned_fallback = value.trim().parse().map_err(|e| invalid(format!("{}", e)))?
            }
            _ => return Err(invalid("unknown configuration key".to_string())),
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Absolute path of the configured git executable.
    pub fn resolve_git_binary(&self) -> Result<PathBuf, ConfigError> {
        which::which(&self.git_binary).map_err(|_| ConfigError::GitNotFound {
            name: self.git_binary.clone(),
        })
    }

    /// Runner for the CLI provider. The binary is resolved up front so a
    /// missing git fails at start-up rather than on the first call.
    pub fn runner(&self) -> Result<GitRunner, ConfigError> {
        let mut runner = GitRunner::new(self.resolve_git_binary()?)
            .with_default_timeout(self.default_timeout())
            .with_env_overrides(self.env.clone());
        if let Some(strategy) = self.spawn_strategy {
            runner = runner.with_strategy(strategy);
        }
        Ok(runner)
    }

    pub fn build_provider(&self) -> Result<Provider, ConfigError> {
        Ok(match self.provider {
            ProviderKind::Cli => Provider::Cli(
                GitCliProvider::new(self.runner()?).with_unsigned_fallback(self.unsigned_fallback),
            ),
            ProviderKind::Embedded => {
                Provider::Embedded(EmbeddedProvider::new().with_default_timeout(self.default_timeout()))
            }
        })
    }
}
