use crate::summarizer::backend::gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::summarizer::backend::openai::{DEFAULT_AZURE_API_VERSION, DEFAULT_CHAT_MODEL};
use crate::summarizer::backend::{BackendType, GeminiOptions, HttpSettings};
use crate::summarizer::language::PromptSet;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

include!(concat!(env!("OUT_DIR"), "/chunksum_env_allowlist.rs"));

/// Credential, endpoint and backend type of one backend instance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    pub credential: String,
    #[serde(default)]
    pub base_url: String,
    pub backend_type: BackendType,
}

impl std::fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessConfig")
            .field("credential", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("backend_type", &self.backend_type)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Texts at or below this many tokens are summarized in one call.
    pub single_pass_tokens: usize,
    /// Soft budget of one window in the chunked case.
    pub window_tokens: usize,
    /// Hard context size of the backends.
    pub context_tokens: usize,
    pub max_output_tokens: usize,
    pub max_depth: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            single_pass_tokens: 25_000,
            window_tokens: 24_000,
            context_tokens: 32_768,
            max_output_tokens: 2048,
            max_depth: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_window_tokens: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub azure_api_version: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub gemini_temperature: f32,
    pub gemini_top_k: u32,
    pub gemini_top_p: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            openai_model: DEFAULT_CHAT_MODEL.to_string(),
            openai_base_url: None,
            azure_api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_temperature: 0.9,
            gemini_top_k: 1,
            gemini_top_p: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    pub thresholds: ThresholdConfig,
    pub chunking: ChunkingConfig,
    pub http: HttpConfig,
    pub models: ModelConfig,
    pub tokenizer: String,
    pub prompts: PromptSet,
    pub access: Vec<AccessConfig>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            chunking: ChunkingConfig::default(),
            http: HttpConfig::default(),
            models: ModelConfig::default(),
            tokenizer: "cl100k".to_string(),
            prompts: PromptSet::default(),
            access: Vec::new(),
        }
    }
}

impl SummarizerConfig {
    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.http.timeout_secs),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
        }
    }

    pub fn gemini_options(&self) -> GeminiOptions {
        GeminiOptions {
            model: self.models.gemini_model.clone(),
            base_url: self.models.gemini_base_url.clone(),
            temperature: self.models.gemini_temperature,
            top_k: self.models.gemini_top_k,
            top_p: self.models.gemini_top_p,
            max_output_tokens: self.thresholds.max_output_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialSummarizerConfig {
    thresholds: Option<ThresholdConfig>,
    chunking: Option<ChunkingConfig>,
    http: Option<HttpConfig>,
    models: Option<ModelConfig>,
    tokenizer: Option<String>,
    prompts: Option<PromptSet>,
    #[serde(default)]
    access: Vec<AccessConfig>,
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    env_non_empty(var).unwrap_or_else(|| fallback.to_string())
}

fn env_csv(var: &str) -> Vec<String> {
    env_non_empty(var)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn validate(cfg: &SummarizerConfig) -> Result<()> {
    let t = &cfg.thresholds;
    if t.window_tokens == 0 || t.max_output_tokens == 0 {
        return Err(anyhow!("invalid thresholds: token budgets must be >= 1"));
    }
    if t.window_tokens >= t.single_pass_tokens {
        return Err(anyhow!(
            "invalid thresholds: require window_tokens < single_pass_tokens"
        ));
    }
    if t.single_pass_tokens >= t.context_tokens {
        return Err(anyhow!(
            "invalid thresholds: require single_pass_tokens < context_tokens"
        ));
    }
    if t.max_depth == 0 {
        return Err(anyhow!("invalid max depth: must be >= 1"));
    }
    if cfg.chunking.max_window_tokens.is_some_and(|ceiling| ceiling < t.window_tokens) {
        return Err(anyhow!(
            "invalid chunking ceiling: max_window_tokens must be >= window_tokens"
        ));
    }
    if cfg.http.timeout_secs == 0 || cfg.http.connect_timeout_secs == 0 {
        return Err(anyhow!("invalid http timeouts: must be >= 1 second"));
    }
    for (idx, access) in cfg.access.iter().enumerate() {
        if access.credential.trim().is_empty() {
            return Err(anyhow!("access entry {idx} has an empty credential"));
        }
        if access.backend_type == BackendType::Azure && access.base_url.trim().is_empty() {
            return Err(anyhow!("azure access entry {idx} requires base_url"));
        }
    }
    Ok(())
}

pub(crate) fn merge_file_config(base: &mut SummarizerConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialSummarizerConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(thresholds) = parsed.thresholds {
        base.thresholds = thresholds;
    }
    if let Some(chunking) = parsed.chunking {
        base.chunking = chunking;
    }
    if let Some(http) = parsed.http {
        base.http = http;
    }
    if let Some(models) = parsed.models {
        base.models = models;
    }
    if let Some(tokenizer) = parsed.tokenizer {
        base.tokenizer = tokenizer;
    }
    if let Some(prompts) = parsed.prompts {
        base.prompts = prompts;
    }
    base.access.extend(parsed.access);
    Ok(())
}

fn apply_env_overrides(cfg: &mut SummarizerConfig) {
    let t = &mut cfg.thresholds;
    t.single_pass_tokens = env_or_usize("CHUNKSUM_SINGLE_PASS_TOKENS", t.single_pass_tokens);
    t.window_tokens = env_or_usize("CHUNKSUM_WINDOW_TOKENS", t.window_tokens);
    t.context_tokens = env_or_usize("CHUNKSUM_CONTEXT_TOKENS", t.context_tokens);
    t.max_output_tokens = env_or_usize("CHUNKSUM_MAX_OUTPUT_TOKENS", t.max_output_tokens);
    t.max_depth = env_or_usize("CHUNKSUM_MAX_DEPTH", t.max_depth);

    if let Some(ceiling) =
        env_non_empty("CHUNKSUM_MAX_WINDOW_TOKENS").and_then(|raw| raw.parse::<usize>().ok())
    {
        cfg.chunking.max_window_tokens = Some(ceiling);
    }

    cfg.http.timeout_secs = env_or_u64("CHUNKSUM_HTTP_TIMEOUT_SECS", cfg.http.timeout_secs);
    cfg.http.connect_timeout_secs = env_or_u64(
        "CHUNKSUM_HTTP_CONNECT_TIMEOUT_SECS",
        cfg.http.connect_timeout_secs,
    );

    cfg.models.openai_model = env_or_string("CHUNKSUM_OPENAI_MODEL", &cfg.models.openai_model);
    if let Some(base) = env_non_empty("OPENAI_BASE_URL") {
        cfg.models.openai_base_url = Some(base);
    }
    cfg.models.gemini_model = env_or_string("CHUNKSUM_GEMINI_MODEL", &cfg.models.gemini_model);
    cfg.models.gemini_base_url =
        env_or_string("CHUNKSUM_GEMINI_BASE_URL", &cfg.models.gemini_base_url);
    cfg.tokenizer = env_or_string("CHUNKSUM_TOKENIZER", &cfg.tokenizer);
}

fn access_from_env() -> Vec<AccessConfig> {
    let mut out = Vec::new();
    if let Some(endpoint) = env_non_empty("AZURE_OPENAI_ENDPOINT") {
        for key in env_csv("AZURE_OPENAI_API_KEY") {
            out.push(AccessConfig {
                credential: key,
                base_url: endpoint.clone(),
                backend_type: BackendType::Azure,
            });
        }
    }
    for key in env_csv("OPENAI_API_KEY") {
        out.push(AccessConfig {
            credential: key,
            base_url: String::new(),
            backend_type: BackendType::OpenAi,
        });
    }
    for key in env_csv("GEMINI_API_KEY") {
        out.push(AccessConfig {
            credential: key,
            base_url: String::new(),
            backend_type: BackendType::GcpGemini,
        });
    }
    out
}

pub fn load_config(config_file: &Path) -> Result<SummarizerConfig> {
    let mut cfg = SummarizerConfig::default();
    merge_file_config(&mut cfg, config_file)?;
    apply_env_overrides(&mut cfg);
    cfg.access.extend(access_from_env());

    validate(&cfg)?;
    Ok(cfg)
}

/// `CHUNKSUM_*` variables set in the environment that nothing reads,
/// usually typos.
pub fn unknown_env_keys() -> Vec<String> {
    let mut unknown = env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with("CHUNKSUM_"))
        .filter(|key| !GENERATED_CHUNKSUM_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect::<Vec<_>>();
    unknown.sort();
    unknown
}
