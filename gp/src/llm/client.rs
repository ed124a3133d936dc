//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResult, RequestError};

/// Stateless completion client - each call is independent
///
/// Every component above the executor (classifier, research pipeline,
/// planner, work queue) talks to the model through this trait so it can be
/// driven by a scripted double in tests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and return the raw text
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult, RequestError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Scripted LLM client for unit tests
    ///
    /// Replies are consumed in order; an exhausted script answers with
    /// `MalformedResponse`.
    pub struct MockLlmClient {
        responses: Mutex<VecDeque<Result<CompletionResult, RequestError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<Result<CompletionResult, RequestError>>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Script of successful text replies
        pub fn texts<I, S>(texts: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self::new(texts.into_iter().map(|t| Ok(CompletionResult::text(t))).collect())
        }

        pub fn push_text(&self, text: impl Into<String>) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(CompletionResult::text(text)));
        }

        pub fn push_error(&self, err: RequestError) {
            self.responses.lock().unwrap().push_back(Err(err));
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Requests received so far, in call order
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult, RequestError> {
            debug!("MockLlmClient::complete: called");
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockLlmClient::complete: fetching response");
            self.requests.lock().unwrap().push(request);
            self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
                debug!("MockLlmClient::complete: no more mock responses");
                Err(RequestError::MalformedResponse("No more mock responses".to_string()))
            })
        }
    }

    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses_in_order() {
            let client = MockLlmClient::texts(["Response 1", "Response 2"]);
            let req = CompletionRequest::new("Test", "hello");

            let resp1 = client.complete(req.clone()).await.unwrap();
            assert_eq!(resp1.text, "Response 1");
            let resp2 = client.complete(req).await.unwrap();
            assert_eq!(resp2.text, "Response 2");

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests()[0].user_prompt, "hello");
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            client.push_error(RequestError::Cancelled);

            let req = CompletionRequest::new("Test", "hello");
            assert!(matches!(client.complete(req.clone()).await, Err(RequestError::Cancelled)));
            assert!(matches!(
                client.complete(req).await,
                Err(RequestError::MalformedResponse(_))
            ));
        }
    }
}
