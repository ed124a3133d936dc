//! Errors surfaced by the orchestration layers

use thiserror::Error;

use crate::decode::DecodeError;
use crate::llm::RequestError;

/// Failure of an orchestrator, research, queue or planner operation
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Request failed: {0}")]
    Request(#[from] RequestError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid model output: {0}")]
    InvalidOutput(String),

    #[error("Knowledge store error: {0}")]
    Knowledge(String),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl PipelineError {
    /// Wrap a template load/render failure
    pub(crate) fn prompt(err: eyre::Report) -> Self {
        Self::Prompt(err.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_converts() {
        let err: PipelineError = RequestError::Cancelled.into();
        assert!(matches!(err, PipelineError::Request(RequestError::Cancelled)));
        assert_eq!(err.to_string(), "Request failed: Request cancelled");
    }

    #[test]
    fn test_decode_error_converts() {
        let decode = crate::decode::decode::<Vec<u32>>("not json").unwrap_err();
        let err: PipelineError = decode.into();
        match err {
            PipelineError::Decode(e) => assert_eq!(e.raw, "not json"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
