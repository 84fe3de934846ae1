use thiserror::Error;

/// Failure of a single completion attempt against one backend instance.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The backend rejected the request itself (HTTP 400). Retrying the same
    /// prompt against the same backend type will not help.
    #[error("request rejected with status {status}: {body}")]
    InputRejected { status: u16, body: String },
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("backend returned no candidates")]
    EmptyResponse,
    #[error("failed to serialize request payload: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl CompletionError {
    pub fn is_input_rejected(&self) -> bool {
        matches!(self, Self::InputRejected { .. })
    }

    /// Errors that must abort the whole call instead of being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }
}

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("tokenizer failed to load: {0}")]
    Tokenizer(String),
    #[error("http client unavailable: {0}")]
    Transport(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to serialize backend payload")]
    Serialization(#[source] serde_json::Error),
    #[error("all retries have failed")]
    BackendExhausted {
        attempts: usize,
        rejected_pools: Vec<String>,
        #[source]
        last_error: Option<CompletionError>,
    },
    #[error("summary did not converge after {depth} passes")]
    RecursionLimit { depth: usize },
}

#[cfg(test)]
mod tests {
    use super::{CompletionError, SummarizeError};
    use std::error::Error;

    #[test]
    fn exhausted_error_keeps_flat_message_and_cause_chain() {
        let err = SummarizeError::BackendExhausted {
            attempts: 3,
            rejected_pools: Vec::new(),
            last_error: Some(CompletionError::EmptyResponse),
        };
        assert_eq!(err.to_string(), "all retries have failed");
        let source = err.source().expect("cause should be attached");
        assert_eq!(source.to_string(), "backend returned no candidates");
    }

    #[test]
    fn only_bad_request_counts_as_input_rejected() {
        let rejected = CompletionError::InputRejected {
            status: 400,
            body: "content filtered".to_string(),
        };
        let transient = CompletionError::Status {
            status: 503,
            body: String::new(),
        };
        assert!(rejected.is_input_rejected());
        assert!(!transient.is_input_rejected());
        assert!(!rejected.is_fatal());
    }
}
