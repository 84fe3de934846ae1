use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SummarizerPaths {
    pub home: PathBuf,
    pub cache_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub config_file: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn default_config_file(home: &std::path::Path) -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("chunksum").join("config.toml"))
        .unwrap_or_else(|| home.join("config.toml"))
}

pub fn resolve_paths() -> Result<SummarizerPaths> {
    let user_home = required_home_dir()?;
    let home = env_or_default_path("CHUNKSUM_HOME", user_home.join(".chunksum"));

    let cache_dir = env_or_default_path("CHUNKSUM_CACHE_DIR", home.join("cache"));
    let logs_dir = env_or_default_path("CHUNKSUM_LOGS_DIR", home.join("logs"));
    let config_file = env_or_default_path("CHUNKSUM_CONFIG_PATH", default_config_file(&home));

    Ok(SummarizerPaths {
        home,
        cache_dir,
        logs_dir,
        config_file,
    })
}
