use anyhow::{Context, Result};
use chunksum::summarizer::config::load_config;
use chunksum::summarizer::paths::resolve_paths;
use chunksum::summarizer::{AuditLogger, Cache, FileCache, NoCache};
use chunksum::{Summarizer, SummaryReport};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::commands::read_input;

#[derive(Debug, Clone, Default)]
pub struct SummarizeOptions {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub no_cache: bool,
}

pub fn run(opts: &SummarizeOptions) -> Result<SummaryReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths.config_file)?;
    let text = read_input(opts.input.as_deref())?;

    let cache: Arc<dyn Cache> = if opts.no_cache {
        Arc::new(NoCache)
    } else {
        let cache = FileCache::new(&paths.cache_dir);
        debug!(dir = %cache.dir().display(), "window cache enabled");
        Arc::new(cache)
    };
    let logger = Arc::new(AuditLogger::new(&paths.logs_dir));
    let summarizer = Summarizer::from_config(&config, cache, logger)
        .context("failed to initialise summarizer")?;
    if !summarizer.dispatcher().has_backends() {
        warn!("no backend credentials configured; only empty input can succeed");
    }

    let report = summarizer
        .summarize_with_report(&text)
        .context("summarization failed")?;
    info!(
        passes = report.passes,
        windows = report.windows,
        cache_hits = report.cache_hits,
        dispatches = report.dispatches,
        "summary complete"
    );

    if let Some(output) = &opts.output {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(output, &report.summary)
            .with_context(|| format!("failed to write {}", output.display()))?;
    }

    Ok(report)
}
