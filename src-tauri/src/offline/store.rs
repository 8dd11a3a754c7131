use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

/// A cached asset body.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAsset {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub cached_at: String,
}

/// SQLite-backed store of offline assets, keyed by cache name and path.
/// All operations are synchronous (rusqlite is blocking).
/// Callers in async contexts should use `tokio::task::spawn_blocking`.
pub struct AssetStore {
    conn: Connection,
}

impl AssetStore {
    /// Open or create the store at the given path.
    pub fn new(db_path: &Path) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create data dir: {}", e))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| format!("Failed to open asset store at {:?}: {}", db_path, e))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS offline_assets (
                cache_name TEXT NOT NULL,
                path TEXT NOT NULL,
                content_type TEXT,
                body BLOB NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (cache_name, path)
            );",
        )
        .map_err(|e| format!("Failed to create asset table: {}", e))?;

        Ok(Self { conn })
    }

    pub fn get(&self, cache_name: &str, path: &str) -> Result<Option<CachedAsset>, String> {
        self.conn
            .query_row(
                "SELECT content_type, body, cached_at FROM offline_assets
                 WHERE cache_name = ?1 AND path = ?2",
                params![cache_name, path],
                |row| {
                    Ok(CachedAsset {
                        content_type: row.get(0)?,
                        body: row.get(1)?,
                        cached_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| format!("Asset lookup failed: {}", e))
    }

    /// Store an asset, replacing any previous copy under the same key.
    pub fn put(
        &self,
        cache_name: &str,
        path: &str,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO offline_assets
                 (cache_name, path, content_type, body, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![cache_name, path, content_type, body, Utc::now().to_rfc3339()],
            )
            .map_err(|e| format!("Failed to store asset {}: {}", path, e))?;
        Ok(())
    }

    /// Distinct cache names present in the store.
    pub fn cache_names(&self) -> Result<Vec<String>, String> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT cache_name FROM offline_assets ORDER BY cache_name")
            .map_err(|e| format!("Failed to prepare cache name query: {}", e))?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| format!("Failed to list cache names: {}", e))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| format!("Failed to read cache name: {}", e))?;
        Ok(names)
    }

    /// Delete every asset stored under a cache name other than `keep`.
    /// Returns the names that were removed.
    pub fn purge_except(&self, keep: &str) -> Result<Vec<String>, String> {
        let stale: Vec<String> = self
            .cache_names()?
            .into_iter()
            .filter(|name| name != keep)
            .collect();

        for name in &stale {
            let count = self
                .conn
                .execute(
                    "DELETE FROM offline_assets WHERE cache_name = ?1",
                    params![name],
                )
                .map_err(|e| format!("Failed to delete cache {}: {}", name, e))?;
            info!("Deleted old cache '{}' ({} assets)", name, count);
        }
        Ok(stale)
    }

    pub fn count(&self, cache_name: &str) -> Result<usize, String> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM offline_assets WHERE cache_name = ?1",
                params![cache_name],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as usize)
            .map_err(|e| format!("Failed to count assets: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> AssetStore {
        AssetStore::new(&dir.path().join("assets.db")).unwrap()
    }

    #[test]
    fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store
            .put("v1", "/index.html", Some("text/html"), b"<html></html>")
            .unwrap();

        let asset = store.get("v1", "/index.html").unwrap().unwrap();
        assert_eq!(asset.body, b"<html></html>");
        assert_eq!(asset.content_type.as_deref(), Some("text/html"));
        assert!(!asset.cached_at.is_empty());
    }

    #[test]
    fn test_miss_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        assert!(store.get("v1", "/nope").unwrap().is_none());
        store.put("v1", "/a", None, b"a").unwrap();
        assert!(store.get("v2", "/a").unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.put("v1", "/a", None, b"old").unwrap();
        store.put("v1", "/a", None, b"new").unwrap();
        assert_eq!(store.get("v1", "/a").unwrap().unwrap().body, b"new");
        assert_eq!(store.count("v1").unwrap(), 1);
    }

    #[test]
    fn test_purge_except_keeps_current_cache() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.put("v0", "/a", None, b"a").unwrap();
        store.put("v1", "/a", None, b"a").unwrap();
        store.put("v1", "/b", None, b"b").unwrap();
        store.put("old-cache", "/c", None, b"c").unwrap();

        let removed = store.purge_except("v1").unwrap();
        assert_eq!(removed, vec!["old-cache".to_string(), "v0".to_string()]);
        assert_eq!(store.cache_names().unwrap(), vec!["v1".to_string()]);
        assert_eq!(store.count("v1").unwrap(), 2);
    }

    #[test]
    fn test_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        open(&dir).put("v1", "/a", None, b"a").unwrap();
        assert!(open(&dir).get("v1", "/a").unwrap().is_some());
    }
}
