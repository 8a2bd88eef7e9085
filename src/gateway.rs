//! Capability gateway for mutating actions: every state-changing submit is
//! wrapped in bounded-retry acquisition of a one-time attestation token,
//! with a single-flight guard against double submits.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::error::GatewayError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(1000);

/// External bot-mitigation provider. `execute` may reject or resolve with an
/// empty string; readiness is checked per attempt rather than assumed.
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    async fn execute(&self, action: &str) -> anyhow::Result<String>;

    fn is_ready(&self) -> bool {
        true
    }
}

pub struct AttestationGateway {
    provider: Arc<dyn AttestationProvider>,
    max_attempts: u32,
    backoff: Duration,
    in_flight: AtomicBool,
}

impl AttestationGateway {
    pub fn new(provider: Arc<dyn AttestationProvider>) -> Self {
        Self::with_limits(provider, DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }

    pub fn with_limits(
        provider: Arc<dyn AttestationProvider>,
        max_attempts: u32,
        backoff: Duration,
    ) -> Self {
        Self { provider, max_attempts, backoff, in_flight: AtomicBool::new(false) }
    }

    pub fn from_config(provider: Arc<dyn AttestationProvider>, cfg: &CoreConfig) -> Self {
        Self::with_limits(provider, cfg.attest_max_attempts, cfg.attest_backoff)
    }

    /// Run one gated mutation.
    ///
    /// A concurrent call while another run is in flight is rejected
    /// synchronously with `DuplicateSubmission` and touches nothing. With the
    /// guard held, a token is acquired with bounded retries; only then does
    /// `submit` run, exactly once, and its error comes back verbatim.
    /// Acquisition is never retried after submit has been invoked.
    pub async fn run<T, F, Fut>(&self, action: &str, submit: F) -> Result<T, GatewayError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(action, "duplicate submission rejected");
            return Err(GatewayError::DuplicateSubmission);
        }
        let _guard = FlightGuard(&self.in_flight);

        let Some(token) = self.acquire(action).await else {
            warn!(action, attempts = self.max_attempts, "attestation exhausted, mutation not attempted");
            return Err(GatewayError::AttestationFailed { attempts: self.max_attempts });
        };
        submit(token).await.map_err(GatewayError::Submit)
    }

    async fn acquire(&self, action: &str) -> Option<String> {
        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.backoff).await;
            }
            if !self.provider.is_ready() {
                warn!(action, attempt, "attestation provider not ready");
                continue;
            }
            match self.provider.execute(action).await {
                Ok(token) if !token.trim().is_empty() => {
                    debug!(action, attempt, "attestation token acquired");
                    return Some(token);
                }
                Ok(_) => warn!(action, attempt, "attestation provider returned a blank token"),
                Err(e) => warn!(action, attempt, error = %e, "attestation attempt failed"),
            }
        }
        None
    }
}

// Releases the single-flight flag on every exit path, including panics in
// the wrapped future's drop.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
