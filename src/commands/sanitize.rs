use anyhow::Result;
use chunksum::sanitize;
use std::path::PathBuf;

use crate::commands::read_input;

#[derive(Debug, Clone, Default)]
pub struct SanitizeOptions {
    pub input: Option<PathBuf>,
}

pub fn run(opts: &SanitizeOptions) -> Result<String> {
    let raw = read_input(opts.input.as_deref())?;
    Ok(sanitize(&raw))
}
