//! Per-call operation context and the one-shot cancellation token

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

/// Opaque request trace id. Propagated into logs and error diagnostics, never
/// interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id for callers that have none.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self("-".to_string())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-shot cancellation signal.
///
/// Clones share the same state. Once fired a token stays fired; firing it again
/// (or after the call it guards has settled) does nothing. The token does not
/// depend on a running tokio runtime, so both spawn strategies can observe it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the token.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the token has fired (immediately if it already has).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything an operation needs besides its options.
///
/// Built by the caller for one call and dropped afterwards; the engine never
/// stores it.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Absolute, already sanitized working directory
    pub working_directory: PathBuf,
    pub tenant_id: Option<String>,
    pub trace: TraceId,
    pub cancellation: Option<CancelToken>,
    /// Per-call timeout; falls back to the engine default
    pub timeout: Option<Duration>,
    /// Fixed when the operation starts; every spawn draws on what is left
    deadline: Option<Instant>,
}

impl OperationContext {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            tenant_id: None,
            trace: TraceId::default(),
            cancellation: None,
            timeout: None,
            deadline: None,
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_trace(mut self, trace: TraceId) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_cancellation(mut self, token: CancelToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Total budget for the call.
    pub fn budget(&self, default_timeout: Duration) -> Duration {
        self.timeout.unwrap_or(default_timeout)
    }

    /// Start the call's clock. The first start fixes the deadline; starting an
    /// already started context keeps it.
    pub fn start(&self, default_timeout: Duration) -> Self {
        let mut started = self.clone();
        if started.deadline.is_none() {
            started.deadline = Some(Instant::now() + self.budget(default_timeout));
        }
        started
    }

    /// Budget left for the next step. The full budget when the clock was
    /// never started.
    pub fn remaining(&self, default_timeout: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => self.budget(default_timeout),
        }
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancelToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_unfired() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_is_shared_between_clones_and_sticky() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_for_prefired_token() {
        let token = CancelToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("pre-fired token should resolve immediately");
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[test]
    fn test_context_builders() {
        let token = CancelToken::new();
        let ctx = OperationContext::new("/tmp/repo")
            .with_tenant("acme")
            .with_trace(TraceId::new("req-1"))
            .with_cancellation(token.clone())
            .with_timeout(Duration::from_secs(5));
        assert_eq!(ctx.working_directory(), Path::new("/tmp/repo"));
        assert_eq!(ctx.trace.as_str(), "req-1");
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_unstarted_context_has_full_budget() {
        let ctx = OperationContext::new("/tmp/repo").with_timeout(Duration::from_secs(5));
        assert_eq!(ctx.remaining(Duration::from_secs(30)), Duration::from_secs(5));
        let ctx = OperationContext::new("/tmp/repo");
        assert_eq!(ctx.remaining(Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[test]
    fn test_started_budget_shrinks_and_is_fixed_once() {
        let ctx = OperationContext::new("/tmp/repo")
            .with_timeout(Duration::from_millis(200))
            .start(Duration::from_secs(30));
        std::thread::sleep(Duration::from_millis(50));
        let left = ctx.remaining(Duration::from_secs(30));
        assert!(left <= Duration::from_millis(150), "{:?}", left);

        // Restarting keeps the original deadline.
        let restarted = ctx.start(Duration::from_secs(30));
        assert!(restarted.remaining(Duration::from_secs(30)) <= left);

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(ctx.remaining(Duration::from_secs(30)), Duration::ZERO);
    }
}
