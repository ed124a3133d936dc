//! LLM integration: completion types, retry policy and the request executor

pub mod client;
mod error;
mod executor;
mod retry;
mod transport;
mod types;

pub use client::LlmClient;
pub use error::{RequestError, TransportError, TransportErrorKind, is_retryable_status};
pub use executor::RequestExecutor;
pub use retry::{BackoffCurve, RetryClass, RetryPolicy, sleep_or_cancel};
pub use transport::{HttpReply, HttpTransport, Transport};
pub use types::{CompletionRequest, CompletionResult, ModelTier, TokenUsage};
