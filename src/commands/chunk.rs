use anyhow::Result;
use chunksum::sanitize;
use chunksum::summarizer::chunker::Chunker;
use chunksum::summarizer::config::load_config;
use chunksum::summarizer::language::classify;
use chunksum::summarizer::paths::resolve_paths;
use chunksum::summarizer::tokenizer::create_tokenizer;
use chunksum::summarizer::util::truncate_with_ellipsis;
use serde::Serialize;
use std::path::PathBuf;

use crate::commands::{CommandReport, read_input};

const PREVIEW_CHARS: usize = 48;

#[derive(Debug, Clone, Default)]
pub struct ChunkOptions {
    pub input: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowPlan {
    /// 1-based, inclusive.
    pub first_line: usize,
    pub last_line: usize,
    pub tokens: usize,
    pub preview: String,
}

/// What the first summarization pass would send, without calling a backend.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkPlan {
    pub language: String,
    pub tokenizer: String,
    pub tokens: usize,
    pub single_pass: bool,
    pub windows: Vec<WindowPlan>,
}

impl ChunkPlan {
    pub fn to_report(&self) -> CommandReport {
        let mut report = CommandReport::new("chunk");
        report.detail(format!(
            "{} tokens ({}), language={}",
            self.tokens, self.tokenizer, self.language
        ));
        if self.single_pass {
            report.detail("fits a single request; no windows");
            return report;
        }
        for (idx, window) in self.windows.iter().enumerate() {
            report.detail(format!(
                "window {}: lines {}-{} tokens={} {}",
                idx + 1,
                window.first_line,
                window.last_line,
                window.tokens,
                window.preview
            ));
        }
        report
    }
}

pub fn run(opts: &ChunkOptions) -> Result<ChunkPlan> {
    let paths = resolve_paths()?;
    let config = load_config(&paths.config_file)?;
    let text = sanitize(&read_input(opts.input.as_deref())?);

    let tokenizer = create_tokenizer(&config.tokenizer)?;
    let language = classify(&text);
    let templates = config.prompts.for_language(language);
    let tokens = tokenizer.count_tokens(&text);

    let mut plan = ChunkPlan {
        language: language.label().to_string(),
        tokenizer: tokenizer.name().to_string(),
        tokens,
        single_pass: tokens <= config.thresholds.single_pass_tokens,
        windows: Vec::new(),
    };
    if plan.single_pass {
        return Ok(plan);
    }

    let lines = text.split('\n').collect::<Vec<_>>();
    let chunker = Chunker::new(tokenizer).with_extension_ceiling(config.chunking.max_window_tokens);
    plan.windows = chunker
        .chunk(&lines, &templates.merge, config.thresholds.window_tokens)
        .into_iter()
        .map(|window| WindowPlan {
            first_line: window.lines.start + 1,
            last_line: window.lines.end,
            tokens: window.tokens,
            preview: truncate_with_ellipsis(window.body().replace('\n', " ").trim_end(), PREVIEW_CHARS),
        })
        .collect();
    Ok(plan)
}
