pub mod gemini;
pub mod openai;

use crate::error::{CompletionError, SummarizeError};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use gemini::{GeminiCompleter, GeminiOptions};
pub use openai::OpenAiCompleter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackendType {
    #[serde(rename = "AZURE", alias = "azure")]
    Azure,
    #[serde(rename = "OPEN_AI", alias = "openai", alias = "open_ai")]
    OpenAi,
    #[serde(rename = "GCP_GEMINI", alias = "gemini", alias = "gcp_gemini")]
    GcpGemini,
}

impl BackendType {
    /// Dispatch priority: Azure first, then the direct provider, then Gemini.
    pub const PRIORITY: [BackendType; 3] =
        [BackendType::Azure, BackendType::OpenAi, BackendType::GcpGemini];

    pub fn label(self) -> &'static str {
        match self {
            BackendType::Azure => "azure",
            BackendType::OpenAi => "openai",
            BackendType::GcpGemini => "gemini",
        }
    }
}

/// One configured backend instance able to complete a prompt.
pub trait TextCompleter: Send + Sync {
    fn backend_type(&self) -> BackendType;

    fn complete(&self, prompt: &str, max_output_tokens: usize)
    -> Result<String, CompletionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

pub(crate) fn build_http_client(settings: &HttpSettings) -> Result<Client, SummarizeError> {
    Client::builder()
        .timeout(settings.timeout)
        .connect_timeout(settings.connect_timeout)
        .build()
        .map_err(|err| SummarizeError::Transport(err.to_string()))
}

/// Read the body of a response, mapping non-success statuses to the
/// matching `CompletionError`.
pub(crate) fn read_success_body(response: Response) -> Result<String, CompletionError> {
    let status = response.status();
    let body = response.text()?;
    if status == StatusCode::BAD_REQUEST {
        return Err(CompletionError::InputRejected {
            status: status.as_u16(),
            body,
        });
    }
    if !status.is_success() {
        return Err(CompletionError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
