use anyhow::Result;
use chunksum::summarizer::config::{load_config, unknown_env_keys};
use chunksum::summarizer::paths::resolve_paths;
use chunksum::summarizer::{BackendDispatcher, NoOpLogger};
use std::sync::Arc;

use crate::commands::CommandReport;

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("status");
    let paths = resolve_paths()?;

    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!(
        "config={} ({})",
        paths.config_file.display(),
        if paths.config_file.exists() {
            "present"
        } else {
            "absent, using defaults"
        }
    ));
    report.detail(format!("cache_dir={}", paths.cache_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));

    for key in unknown_env_keys() {
        report.issue(format!("unknown environment variable {key}"));
    }

    let config = match load_config(&paths.config_file) {
        Ok(config) => config,
        Err(err) => {
            report.issue(format!("config invalid: {err:#}"));
            return Ok(report);
        }
    };

    let t = &config.thresholds;
    report.detail(format!(
        "thresholds single_pass={} window={} context={} max_output={} max_depth={}",
        t.single_pass_tokens, t.window_tokens, t.context_tokens, t.max_output_tokens, t.max_depth
    ));
    if let Some(ceiling) = config.chunking.max_window_tokens {
        report.detail(format!("extension ceiling={ceiling}"));
    }
    report.detail(format!("tokenizer={}", config.tokenizer));

    let dispatcher = match BackendDispatcher::from_config(&config, Arc::new(NoOpLogger)) {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            report.issue(format!("backend pools unavailable: {err}"));
            return Ok(report);
        }
    };
    for pool in dispatcher.pools() {
        report.detail(format!("pool {}: {} instance(s)", pool.name(), pool.len()));
    }
    if !dispatcher.has_backends() {
        report.issue(
            "no backend credentials configured; set AZURE_OPENAI_API_KEY, OPENAI_API_KEY or GEMINI_API_KEY",
        );
    }

    Ok(report)
}
