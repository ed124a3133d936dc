//! Retry policy and cancellation-aware backoff
//!
//! Two delay curves are configured independently: one for retryable upstream
//! statuses (429/5xx) and one for retryable transport failures. Defaults are
//! linear `attempt * 2s` for the former and exponential `2^attempt s` for the
//! latter.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Delay curve as a function of the 1-based retry index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "kebab-case")]
pub enum BackoffCurve {
    /// Retry immediately
    None,
    /// `attempt * step`
    Linear {
        #[serde(rename = "step-ms")]
        step_ms: u64,
    },
    /// `base * 2^attempt`
    Exponential {
        #[serde(rename = "base-ms")]
        base_ms: u64,
    },
}

impl BackoffCurve {
    /// Delay before retry number `attempt` (1 = first retry)
    pub fn delay(&self, attempt: u32) -> Duration {
        let ms = match self {
            Self::None => 0,
            Self::Linear { step_ms } => step_ms.saturating_mul(u64::from(attempt)),
            Self::Exponential { base_ms } => base_ms.saturating_mul(2u64.saturating_pow(attempt)),
        };
        Duration::from_millis(ms)
    }
}

/// Which curve applies to a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Server,
    Transport,
}

/// Bounded retry policy for the request executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Additional attempts after the first
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Curve for 429/5xx responses
    #[serde(rename = "server-backoff")]
    pub server_backoff: BackoffCurve,

    /// Curve for retryable transport failures
    #[serde(rename = "transport-backoff")]
    pub transport_backoff: BackoffCurve,

    /// Cap applied to an upstream Retry-After hint
    #[serde(rename = "max-retry-after-ms")]
    pub max_retry_after_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            server_backoff: BackoffCurve::Linear { step_ms: 2000 },
            transport_backoff: BackoffCurve::Exponential { base_ms: 1000 },
            max_retry_after_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Same retry budget, no waiting between attempts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            server_backoff: BackoffCurve::None,
            transport_backoff: BackoffCurve::None,
            max_retry_after_ms: 0,
        }
    }

    /// Delay before retry number `attempt`
    ///
    /// A Retry-After hint replaces the server curve, capped at
    /// `max_retry_after_ms`.
    pub fn delay(&self, class: RetryClass, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match class {
            RetryClass::Server => match retry_after {
                Some(hint) => hint.min(Duration::from_millis(self.max_retry_after_ms)),
                None => self.server_backoff.delay(attempt),
            },
            RetryClass::Transport => self.transport_backoff.delay(attempt),
        }
    }
}

/// Sleep for `delay` unless `cancel` fires first
///
/// Returns false when cancelled.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    debug!(?delay, "sleep_or_cancel: called");
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = cancel.cancelled() => {
            debug!("sleep_or_cancel: cancelled");
            false
        }
    }
}
