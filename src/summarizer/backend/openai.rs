use crate::error::{CompletionError, SummarizeError};
use crate::summarizer::backend::{
    BackendType, HttpSettings, TextCompleter, build_http_client, read_success_body,
};
use reqwest::blocking::Client;
use serde_json::Value;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo-16k";
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";

#[derive(Debug, Clone)]
enum Auth {
    Bearer(String),
    AzureKey(String),
}

/// Chat-completions client for both the direct provider and Azure-hosted
/// deployments; they share the payload and differ in URL and auth header.
pub struct OpenAiCompleter {
    backend_type: BackendType,
    url: String,
    auth: Auth,
    model: String,
    client: Client,
}

/// Azure names deployments after the model with `.` and `:` dropped.
pub fn azure_deployment_name(model: &str) -> String {
    model.chars().filter(|ch| *ch != '.' && *ch != ':').collect()
}

impl OpenAiCompleter {
    pub fn direct(
        api_key: &str,
        base_url: Option<&str>,
        model: &str,
        http: &HttpSettings,
    ) -> Result<Self, SummarizeError> {
        let base = base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_OPENAI_BASE_URL);
        Ok(Self {
            backend_type: BackendType::OpenAi,
            url: format!("{}/chat/completions", base.trim_end_matches('/')),
            auth: Auth::Bearer(api_key.to_string()),
            model: model.to_string(),
            client: build_http_client(http)?,
        })
    }

    pub fn azure(
        api_key: &str,
        endpoint: &str,
        model: &str,
        api_version: &str,
        http: &HttpSettings,
    ) -> Result<Self, SummarizeError> {
        if endpoint.trim().is_empty() {
            return Err(SummarizeError::Config(
                "azure access entry requires a base_url endpoint".to_string(),
            ));
        }
        Ok(Self {
            backend_type: BackendType::Azure,
            url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim().trim_end_matches('/'),
                azure_deployment_name(model),
                api_version
            ),
            auth: Auth::AzureKey(api_key.to_string()),
            model: model.to_string(),
            client: build_http_client(http)?,
        })
    }
}

impl TextCompleter for OpenAiCompleter {
    fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    fn complete(&self, prompt: &str, max_output_tokens: usize) -> Result<String, CompletionError> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "max_tokens": max_output_tokens,
            "stream": false
        });
        let body = serde_json::to_vec(&payload).map_err(CompletionError::Serialization)?;

        let request = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .body(body);
        let request = match &self.auth {
            Auth::Bearer(key) => request.bearer_auth(key),
            Auth::AzureKey(key) => request.header("api-key", key),
        };

        let raw = read_success_body(request.send()?)?;
        let json: Value =
            serde_json::from_str(&raw).map_err(|err| CompletionError::Decode(err.to_string()))?;
        extract_chat_completion_text(&json).ok_or(CompletionError::EmptyResponse)
    }
}

fn extract_chat_completion_text(json: &Value) -> Option<String> {
    let choices = json.get("choices").and_then(Value::as_array)?;
    let first = choices.first()?;
    let content = first.get("message")?.get("content")?;
    match content {
        Value::String(s) => Some(s.to_string()),
        Value::Array(parts) => {
            let chunks = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>();
            if chunks.is_empty() {
                None
            } else {
                Some(chunks.join("\n"))
            }
        }
        _ => None,
    }
}
