//! Provider that drives the `git` executable

use std::time::Duration;

use crate::capabilities::Capabilities;
use crate::context::OperationContext;
use crate::exec::GitRunner;

const CAPABILITIES: Capabilities = Capabilities::full();

/// Upper bound for the `git version` probe.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
pub struct GitCliProvider {
    runner: GitRunner,
    unsigned_fallback: bool,
}

impl GitCliProvider {
    pub const NAME: &'static str = "cli";

    pub fn new(runner: GitRunner) -> Self {
        Self {
            runner,
            unsigned_fallback: false,
        }
    }

    /// Retry a commit unsigned when signing fails.
    pub fn with_unsigned_fallback(mut self, enabled: bool) -> Self {
        self.unsigned_fallback = enabled;
        self
    }

    pub fn runner(&self) -> &GitRunner {
        &self.runner
    }

    pub fn unsigned_fallback(&self) -> bool {
        self.unsigned_fallback
    }

    pub fn capabilities(&self) -> &'static Capabilities {
        &CAPABILITIES
    }

    /// `git version` with a short timeout. Read-only.
    pub async fn health_check(&self, ctx: &OperationContext) -> bool {
        let probe = ctx.clone().with_timeout(HEALTH_TIMEOUT);
        match self.runner.version(&probe).await {
            Ok(version) => {
                tracing::debug!(trace = %ctx.trace, "{}", version);
                version.starts_with("git version")
            }
            Err(err) => {
                tracing::warn!(trace = %ctx.trace, "git health check failed: {}", err);
                false
            }
        }
    }
}
