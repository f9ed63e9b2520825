//! File-backed response cache
//!
//! Live responses are written here and replayed in mock mode. Entries are
//! keyed by endpoint and parameters; the credential never takes part.

use crate::utils::error::Result;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Query parameter carrying the credential
pub const CREDENTIAL_PARAM: &str = "key";

/// Cache key for a request: SHA-256 over the endpoint and the sorted
/// parameters, credential excluded
pub fn cache_key(endpoint: &str, params: &BTreeMap<String, String>) -> String {
    let identity: Map<String, Value> = params
        .iter()
        .filter(|(name, _)| name.as_str() != CREDENTIAL_PARAM)
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(endpoint.as_bytes());
    hasher.update(b"_");
    hasher.update(Value::Object(identity).to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Directory of `{key}.json` response files
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// Open the cache, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Cached payload, `None` on a miss or an unreadable entry
    pub async fn load(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache entry");
                None
            }
        }
    }

    /// Persist a payload, replacing any previous entry
    pub async fn store(&self, key: &str, value: &Value) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        let path = self.path_for(key);
        // Each write gets its own temp file; the rename publishes it whole.
        let tmp = self
            .dir
            .join(format!("{}.{}.tmp", key, Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(key = %key, "Cached response");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_credential_does_not_affect_key() {
        let a = cache_key("videos", &params(&[("part", "snippet"), ("id", "x"), ("key", "one")]));
        let b = cache_key("videos", &params(&[("id", "x"), ("part", "snippet"), ("key", "two")]));
        let c = cache_key("videos", &params(&[("part", "snippet"), ("id", "x")]));
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_endpoint_and_params_affect_key() {
        let p = params(&[("id", "x")]);
        assert_ne!(cache_key("videos", &p), cache_key("channels", &p));
        assert_ne!(cache_key("videos", &p), cache_key("videos", &params(&[("id", "y")])));
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().join("nested")).unwrap();
        let payload = json!({"items": [{"id": "a"}]});

        assert!(cache.load("k").await.is_none());
        cache.store("k", &payload).await.unwrap();
        assert_eq!(cache.load("k").await, Some(payload));
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path()).unwrap();
        let payload = json!({"items": [{"id": "a", "snippet": {"description": "x".repeat(4096)}}]});

        for _ in 0..10 {
            let mut tasks = Vec::new();
            for _ in 0..8 {
                let cache = cache.clone();
                let payload = payload.clone();
                tasks.push(tokio::spawn(async move { cache.store("same", &payload).await }));
            }
            for _ in 0..4 {
                let cache = cache.clone();
                tasks.push(tokio::spawn(async move {
                    // Readers see either nothing yet or a whole entry.
                    if let Some(value) = cache.load("same").await {
                        assert_eq!(value["items"][0]["id"], "a");
                    }
                    Ok(())
                }));
            }
            for task in tasks {
                task.await.unwrap().unwrap();
            }
        }

        assert_eq!(cache.load("same").await, Some(payload));
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        assert!(cache.load("bad").await.is_none());
    }
}
