use crate::summarizer::backend::BackendType;
use crate::summarizer::util::now_epoch_secs;
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Sink for every successful completion.
pub trait CompletionLogger: Send + Sync {
    fn log(&self, prompt: &str, completion: &str, backend: BackendType);
}

pub struct NoOpLogger;

impl CompletionLogger for NoOpLogger {
    fn log(&self, _prompt: &str, _completion: &str, _backend: BackendType) {}
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub backend: String,
    pub prompt_sha256: String,
    pub prompt_bytes: usize,
    pub completion_bytes: usize,
    pub completion: String,
}

/// Appends one JSON line per completion to `<logs_dir>/audit.log`.
pub struct AuditLogger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: logs_dir.join("audit.log"),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &AuditEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let line = format!("{}\n", serde_json::to_string(event)?);
        let _guard = self.write_lock.lock().map_err(|_| anyhow::anyhow!("audit lock poisoned"))?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl CompletionLogger for AuditLogger {
    fn log(&self, prompt: &str, completion: &str, backend: BackendType) {
        let event = AuditEvent {
            at_epoch_secs: now_epoch_secs().unwrap_or(0),
            backend: backend.label().to_string(),
            prompt_sha256: format!("{:x}", Sha256::digest(prompt.as_bytes())),
            prompt_bytes: prompt.len(),
            completion_bytes: completion.len(),
            completion: completion.to_string(),
        };
        if let Err(err) = self.append(&event) {
            warn!(path = %self.path.display(), error = %format!("{err:#}"), "audit append failed");
        }
    }
}
