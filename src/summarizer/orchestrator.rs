use crate::error::SummarizeError;
use crate::summarizer::audit::CompletionLogger;
use crate::summarizer::cache::{Cache, cache_key};
use crate::summarizer::chunker::Chunker;
use crate::summarizer::config::{SummarizerConfig, ThresholdConfig};
use crate::summarizer::dispatch::BackendDispatcher;
use crate::summarizer::language::{PromptSet, classify};
use crate::summarizer::sanitize::sanitize;
use crate::summarizer::tokenizer::{Tokenizer, create_tokenizer};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    pub summary: String,
    /// Orchestrator passes, counting every recursive re-entry.
    pub passes: usize,
    pub windows: usize,
    pub cache_hits: usize,
    pub dispatches: usize,
}

/// Recursive map-reduce summarizer: texts that fit one request are briefed
/// directly, longer ones are condensed window by window and the condensed
/// text is summarized again.
pub struct Summarizer {
    tokenizer: Arc<dyn Tokenizer>,
    chunker: Chunker,
    dispatcher: BackendDispatcher,
    cache: Arc<dyn Cache>,
    prompts: PromptSet,
    thresholds: ThresholdConfig,
}

impl Summarizer {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        dispatcher: BackendDispatcher,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            chunker: Chunker::new(Arc::clone(&tokenizer)),
            tokenizer,
            dispatcher,
            cache,
            prompts: PromptSet::default(),
            thresholds: ThresholdConfig::default(),
        }
    }

    pub fn from_config(
        config: &SummarizerConfig,
        cache: Arc<dyn Cache>,
        logger: Arc<dyn CompletionLogger>,
    ) -> Result<Self, SummarizeError> {
        let tokenizer = create_tokenizer(&config.tokenizer)?;
        let dispatcher = BackendDispatcher::from_config(config, logger)?;
        Ok(Self::new(tokenizer, dispatcher, cache)
            .with_prompts(config.prompts.clone())
            .with_thresholds(config.thresholds.clone())
            .with_extension_ceiling(config.chunking.max_window_tokens))
    }

    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdConfig) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_extension_ceiling(mut self, ceiling: Option<usize>) -> Self {
        self.chunker = Chunker::new(Arc::clone(&self.tokenizer)).with_extension_ceiling(ceiling);
        self
    }

    pub fn dispatcher(&self) -> &BackendDispatcher {
        &self.dispatcher
    }

    pub fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        self.summarize_with_report(text).map(|report| report.summary)
    }

    pub fn summarize_with_report(&self, text: &str) -> Result<SummaryReport, SummarizeError> {
        let mut report = SummaryReport::default();
        let summary = self.summarize_pass(text, 1, &mut report)?;
        report.summary = summary;
        Ok(report)
    }

    fn summarize_pass(
        &self,
        text: &str,
        depth: usize,
        report: &mut SummaryReport,
    ) -> Result<String, SummarizeError> {
        let text = sanitize(text);
        if text.is_empty() {
            debug!("empty input, nothing to summarize");
            return Ok(text);
        }
        if depth > self.thresholds.max_depth {
            return Err(SummarizeError::RecursionLimit {
                depth: self.thresholds.max_depth,
            });
        }
        report.passes += 1;
        info!(bytes = text.len(), depth, "summarizing");

        let language = classify(&text);
        let templates = self.prompts.for_language(language);

        let text_tokens = self.tokenizer.count_tokens(&text);
        if text_tokens <= self.thresholds.single_pass_tokens {
            debug!(tokens = text_tokens, language = language.label(), "single pass");
            let prompt = format!("{}{}", templates.final_prompt, text);
            let budget = self.remaining_budget(self.tokenizer.count_tokens(&prompt));
            report.dispatches += 1;
            return self.dispatcher.complete(&prompt, budget).map(|c| c.text);
        }

        let lines = text.split('\n').collect::<Vec<_>>();
        let windows = self
            .chunker
            .chunk(&lines, &templates.merge, self.thresholds.window_tokens);
        debug!(
            tokens = text_tokens,
            windows = windows.len(),
            language = language.label(),
            "chunked pass"
        );

        let mut condensed = String::new();
        for window in &windows {
            report.windows += 1;
            let key = cache_key(&window.text);
            let partial = match self.cache.get(&key) {
                Some(hit) => {
                    info!(
                        prompt_bytes = window.text.len(),
                        result_bytes = hit.len(),
                        "partial result (cached)"
                    );
                    report.cache_hits += 1;
                    hit
                }
                None => {
                    let budget = self.remaining_budget(window.tokens);
                    report.dispatches += 1;
                    let completion = self.dispatcher.complete(&window.text, budget)?;
                    info!(
                        prompt_bytes = window.text.len(),
                        result_bytes = completion.text.len(),
                        backend = completion.backend.label(),
                        "partial result"
                    );
                    self.cache.set(&key, &completion.text);
                    completion.text
                }
            };
            condensed.push_str(&partial);
            condensed.push('\n');
        }

        self.summarize_pass(&condensed, depth + 1, report)
    }

    fn remaining_budget(&self, prompt_tokens: usize) -> usize {
        let room = self
            .thresholds
            .context_tokens
            .saturating_sub(prompt_tokens)
            .max(1);
        self.thresholds.max_output_tokens.min(room)
    }
}
