use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

const KEY_PREFIX: &str = "gpt:";

/// Content-addressed completion store. Values are a pure function of the
/// prompt their key was derived from, so racing writers are harmless.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// Deterministic key for an exact prompt text.
pub fn cache_key(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    format!("{KEY_PREFIX}{:x}", hasher.finalize())
}

pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) {}
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }
}

/// One file per key under a directory, which lets a failed run resume
/// from the windows it already completed.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let name = key
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
            .collect::<String>();
        self.dir.join(format!("{name}.txt"))
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.entry_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) {
        let path = self.entry_path(key);
        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %err, "cache dir unavailable");
            return;
        }
        // Write-then-rename so a concurrent reader never sees half a value.
        let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
        let result = fs::write(&tmp, value).and_then(|_| fs::rename(&tmp, &path));
        if let Err(err) = result {
            let _ = fs::remove_file(&tmp);
            warn!(path = %path.display(), error = %err, "failed to store cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cache, FileCache, MemoryCache, NoCache, cache_key};
    use tempfile::tempdir;

    #[test]
    fn key_is_pure_function_of_prompt() {
        assert_eq!(cache_key("window text"), cache_key("window text"));
        assert_ne!(cache_key("window text"), cache_key("window text "));
        let key = cache_key("");
        assert_eq!(
            key,
            "gpt:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn no_cache_never_returns_values() {
        NoCache.set("k", "v");
        assert!(NoCache.get("k").is_none());
    }

    #[test]
    fn memory_cache_round_trips_and_overwrites() {
        let cache = MemoryCache::new();
        assert!(cache.get("k").is_none());
        cache.set("k", "first");
        cache.set("k", "second");
        assert_eq!(cache.get("k").as_deref(), Some("second"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn file_cache_persists_across_instances() {
        let tmp = tempdir().expect("tempdir");
        let dir = tmp.path().join("cache");
        let key = cache_key("some prompt");

        FileCache::new(&dir).set(&key, "stored completion");
        let reopened = FileCache::new(&dir);
        assert_eq!(reopened.get(&key).as_deref(), Some("stored completion"));
        assert!(reopened.get(&cache_key("other prompt")).is_none());

        let stored = std::fs::read_dir(reopened.dir())
            .expect("cache dir exists")
            .count();
        assert_eq!(stored, 1);
    }
}
