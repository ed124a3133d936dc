//! Request executor: one completion call with bounded retry
//!
//! Builds the chat-completions body, performs the POST through a `Transport`
//! under a hard per-attempt timeout and retries the fixed set of transient
//! failures. Malformed successes and non-retryable statuses surface at once.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::LlmClient;
use super::error::{RequestError, is_retryable_status};
use super::retry::{RetryClass, RetryPolicy, sleep_or_cancel};
use super::transport::{HttpReply, HttpTransport, Transport};
use super::types::{ChatResponse, CompletionRequest, CompletionResult};
use crate::config::{Config, LlmConfig};

/// Executes completion requests against an OpenAI-compatible endpoint
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    llm: LlmConfig,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("llm", &self.llm)
            .field("policy", &self.policy)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, llm: LlmConfig, policy: RetryPolicy) -> Self {
        debug!(max_retries = policy.max_retries, "RequestExecutor::new: called");
        Self {
            transport,
            llm,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Build an executor backed by `HttpTransport`
    ///
    /// A missing API key is reported as `InvalidInput`.
    pub fn from_config(config: &Config) -> Result<Self, RequestError> {
        debug!(base_url = %config.llm.base_url, "RequestExecutor::from_config: called");
        let api_key = config
            .llm
            .api_key()
            .map_err(|e| RequestError::InvalidInput(e.to_string()))?;
        let transport = HttpTransport::new(
            &config.llm.endpoint(),
            api_key,
            Duration::from_millis(config.llm.connect_timeout_ms),
            Duration::from_millis(config.llm.timeout_ms),
        )?;
        Ok(Self::new(Arc::new(transport), config.llm.clone(), config.retry.clone()))
    }

    /// Use a caller-owned shutdown token
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Shutdown switch shared by every call
    ///
    /// Once cancelled, the executor answers every call, current and later,
    /// with `Cancelled`. To abort a single call use `call_token` instead.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Token for aborting one call through `execute_with_cancel`
    ///
    /// Child of the shutdown token, so shutdown still reaches the call.
    pub fn call_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Build the chat-completions request body
    pub fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let model = self.llm.model_for(request.model_tier);
        let max_tokens = request
            .max_tokens
            .unwrap_or(self.llm.max_tokens)
            .min(self.llm.max_tokens);
        debug!(%model, %max_tokens, "build_request_body: called");

        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(serde_json::json!({
                "role": "system",
                "content": request.system_prompt,
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": request.user_prompt,
        }));

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": max_tokens,
        });

        if request.require_structured_output {
            debug!("build_request_body: structured output requested");
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        if !request.tools.is_empty() {
            debug!(tool_count = request.tools.len(), "build_request_body: adding tools");
            body["tools"] = serde_json::json!(request.tools);
        }

        body
    }

    /// Perform one completion with bounded retry
    ///
    /// At most `max_retries` additional attempts are made. 429/5xx and
    /// retryable transport failures are retried; everything else is final.
    pub async fn execute(&self, request: &CompletionRequest) -> Result<CompletionResult, RequestError> {
        self.execute_with_cancel(request, &self.cancel).await
    }

    /// `execute`, observing `cancel` instead of the shutdown token
    ///
    /// Pass a token from `call_token` so shutdown still applies.
    pub async fn execute_with_cancel(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResult, RequestError> {
        debug!(tier = ?request.model_tier, "execute: called");
        if request.user_prompt.trim().is_empty() {
            return Err(RequestError::InvalidInput("user prompt is empty".to_string()));
        }

        let body = self.build_request_body(request);
        let timeout = Duration::from_millis(self.llm.timeout_ms);
        let mut retries = 0u32;

        loop {
            if cancel.is_cancelled() {
                debug!("execute: cancelled before attempt");
                return Err(RequestError::Cancelled);
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("execute: cancelled in flight");
                    return Err(RequestError::Cancelled);
                }
                outcome = tokio::time::timeout(timeout, self.transport.post(&body)) => outcome,
            };

            let (err, class, retry_after) = match outcome {
                Err(_) => {
                    debug!(attempt = retries, "execute: attempt timed out");
                    (RequestError::Timeout(timeout), RetryClass::Transport, None)
                }
                Ok(Err(e)) if !e.is_retryable() => {
                    debug!(kind = ?e.kind, "execute: non-retryable transport failure");
                    return Err(RequestError::TransportFailure(e));
                }
                Ok(Err(e)) => {
                    debug!(kind = ?e.kind, "execute: retryable transport failure");
                    (RequestError::from_transport(e, timeout), RetryClass::Transport, None)
                }
                Ok(Ok(reply)) if (200..300).contains(&reply.status) => {
                    debug!(status = reply.status, "execute: success status");
                    return parse_reply(&reply);
                }
                Ok(Ok(reply)) if !is_retryable_status(reply.status) => {
                    debug!(status = reply.status, "execute: non-retryable status");
                    return Err(RequestError::UpstreamError {
                        status: reply.status,
                        body: reply.body,
                    });
                }
                Ok(Ok(reply)) => {
                    debug!(status = reply.status, "execute: retryable status");
                    let retry_after = reply.retry_after;
                    (
                        RequestError::UpstreamError {
                            status: reply.status,
                            body: reply.body,
                        },
                        RetryClass::Server,
                        retry_after,
                    )
                }
            };

            if retries >= self.policy.max_retries {
                warn!(retries, error = %err, "execute: retries exhausted");
                return Err(err);
            }

            retries += 1;
            let delay = self.policy.delay(class, retries, retry_after);
            info!(retry = retries, max = self.policy.max_retries, ?delay, error = %err, "execute: retrying");
            if !sleep_or_cancel(delay, cancel).await {
                return Err(RequestError::Cancelled);
            }
        }
    }
}

/// Extract the first choice's text from a 2xx body
fn parse_reply(reply: &HttpReply) -> Result<CompletionResult, RequestError> {
    let response: ChatResponse = serde_json::from_str(&reply.body)
        .map_err(|e| RequestError::MalformedResponse(format!("invalid response body: {}", e)))?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| RequestError::MalformedResponse("response has no content".to_string()))?;

    debug!(text_len = text.len(), "parse_reply: extracted content");
    Ok(CompletionResult {
        text,
        usage: response.usage.unwrap_or_default(),
        model: response.model,
    })
}

#[async_trait]
impl LlmClient for RequestExecutor {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult, RequestError> {
        self.execute(&request).await
    }
}
