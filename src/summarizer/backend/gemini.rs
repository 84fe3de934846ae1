//! Gemini `generateContent` REST client.
//!
//! The request and response structs mirror the vendor JSON contract field
//! for field; renaming any of them breaks wire compatibility.

use crate::error::{CompletionError, SummarizeError};
use crate::summarizer::backend::{
    BackendType, HttpSettings, TextCompleter, build_http_client, read_success_body,
};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.0-pro";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Clone, Serialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: usize,
    pub stop_sequences: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeminiSafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    pub generation_config: GeminiGenerationConfig,
    pub safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiResponsePart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiResponseContent {
    #[serde(default)]
    pub parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: GeminiResponseContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

impl GeminiResponse {
    /// Text of the first candidate, its parts concatenated.
    pub fn first_candidate_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        Some(
            candidate
                .content
                .parts
                .iter()
                .map(|part| part.text.as_str())
                .collect(),
        )
    }
}

/// Generation knobs sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiOptions {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: usize,
}

impl Default for GeminiOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            temperature: 0.9,
            top_k: 1,
            top_p: 1.0,
            max_output_tokens: 2048,
        }
    }
}

pub fn build_request(prompt: &str, options: &GeminiOptions, budget: usize) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart {
                text: prompt.to_string(),
            }],
        }],
        generation_config: GeminiGenerationConfig {
            temperature: options.temperature,
            top_k: options.top_k,
            top_p: options.top_p,
            max_output_tokens: options.max_output_tokens.min(budget.max(1)),
            stop_sequences: Vec::new(),
        },
        safety_settings: HARM_CATEGORIES
            .iter()
            .map(|category| GeminiSafetySetting {
                category: (*category).to_string(),
                threshold: "BLOCK_NONE".to_string(),
            })
            .collect(),
    }
}

pub struct GeminiCompleter {
    api_key: String,
    url: String,
    options: GeminiOptions,
    client: Client,
}

impl GeminiCompleter {
    pub fn new(
        api_key: &str,
        base_url: Option<&str>,
        options: GeminiOptions,
        http: &HttpSettings,
    ) -> Result<Self, SummarizeError> {
        let base = base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(options.base_url.as_str())
            .trim()
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            api_key: api_key.to_string(),
            url: format!("{base}/models/{}:generateContent", options.model),
            options,
            client: build_http_client(http)?,
        })
    }
}

impl TextCompleter for GeminiCompleter {
    fn backend_type(&self) -> BackendType {
        BackendType::GcpGemini
    }

    fn complete(&self, prompt: &str, max_output_tokens: usize) -> Result<String, CompletionError> {
        let request = build_request(prompt, &self.options, max_output_tokens);
        let payload = serde_json::to_vec(&request).map_err(CompletionError::Serialization)?;

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .header("content-type", "application/json")
            .body(payload)
            .send()?;
        let raw = read_success_body(response)?;
        let parsed: GeminiResponse =
            serde_json::from_str(&raw).map_err(|err| CompletionError::Decode(err.to_string()))?;
        parsed
            .first_candidate_text()
            .ok_or(CompletionError::EmptyResponse)
    }
}
