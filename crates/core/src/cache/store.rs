//! Path-keyed stores for rewritten pages.
//!
//! Entries hold markup that has already been through the rewriter. They are
//! written once per key and never updated in place.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::hash::compute_cache_key;
use crate::{Error, RequestPath};

/// Key-value store for rewritten pages.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Look up a stored page. Never fetches.
    async fn get(&self, path: &RequestPath) -> Result<Option<String>, Error>;

    /// Store a rewritten page. A no-op if the key already has an entry.
    async fn put(&self, path: &RequestPath, content: &str) -> Result<(), Error>;
}

/// Flat directory of `<sha256>.html` files.
#[derive(Debug)]
pub struct DiskStore {
    dir: PathBuf,
    tmp_seq: AtomicU64,
}

impl DiskStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| Error::CacheWrite { path: dir.clone(), source })?;
        Ok(Self { dir, tmp_seq: AtomicU64::new(0) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the entry for `path`.
    pub fn entry_path(&self, path: &RequestPath) -> PathBuf {
        self.dir.join(format!("{}.html", compute_cache_key(path)))
    }

    /// Number of committed entries.
    pub async fn len(&self) -> Result<usize, Error> {
        let read_err = |source| Error::CacheRead { path: self.dir.clone(), source };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(read_err)?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            if entry.path().extension().is_some_and(|ext| ext == "html") {
                count += 1;
            }
        }
        Ok(count)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }

    fn tmp_path(&self, entry: &Path) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        entry.with_extension(format!("{}.{seq}.tmp", std::process::id()))
    }
}

#[async_trait::async_trait]
impl ContentStore for DiskStore {
    async fn get(&self, path: &RequestPath) -> Result<Option<String>, Error> {
        let entry = self.entry_path(path);
        match tokio::fs::read(&entry).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::CacheRead { path: entry, source }),
        }
    }

    async fn put(&self, path: &RequestPath, content: &str) -> Result<(), Error> {
        let entry = self.entry_path(path);
        if tokio::fs::try_exists(&entry).await.unwrap_or(false) {
            tracing::debug!(path = %path, "cache entry already present, keeping it");
            return Ok(());
        }

        // Atomic write: temp file + rename, so readers never see a partial entry
        let tmp = self.tmp_path(&entry);
        if let Err(source) = tokio::fs::write(&tmp, content).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::CacheWrite { path: tmp, source });
        }

        if let Err(source) = tokio::fs::rename(&tmp, &entry).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::CacheWrite { path: entry, source });
        }

        tracing::debug!(path = %path, bytes = content.len(), "cached page");
        Ok(())
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or_else(|e| e.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ContentStore for MemoryStore {
    async fn get(&self, path: &RequestPath) -> Result<Option<String>, Error> {
        let key = compute_cache_key(path);
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(&key).cloned())
    }

    async fn put(&self, path: &RequestPath, content: &str) -> Result<(), Error> {
        let key = compute_cache_key(path);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(key).or_insert_with(|| content.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn p(raw: &str) -> RequestPath {
        RequestPath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_disk_put_and_get() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::open(temp.path()).await.unwrap();

        store.put(&p("/blog"), "<html>blog</html>").await.unwrap();

        let content = store.get(&p("/blog")).await.unwrap();
        assert_eq!(content.as_deref(), Some("<html>blog</html>"));
    }

    #[tokio::test]
    async fn test_disk_get_missing() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::open(temp.path()).await.unwrap();
        assert!(store.get(&p("/nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disk_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("cache");
        let store = DiskStore::open(&dir).await.unwrap();
        assert!(dir.is_dir());
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_disk_entry_is_hashed_filename() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::open(temp.path()).await.unwrap();
        store.put(&p("/"), "root").await.unwrap();

        let entry = store.entry_path(&p("/"));
        assert_eq!(
            entry.file_name().unwrap().to_str().unwrap(),
            "8a5edab282632443219e051e4ade2d1d5bbc671c781051bf1437897cbdfea0f1.html"
        );
        assert_eq!(std::fs::read_to_string(entry).unwrap(), "root");
    }

    #[tokio::test]
    async fn test_disk_put_is_write_once() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::open(temp.path()).await.unwrap();

        store.put(&p("/blog"), "first").await.unwrap();
        store.put(&p("/blog"), "second").await.unwrap();

        assert_eq!(store.get(&p("/blog")).await.unwrap().as_deref(), Some("first"));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_disk_query_shares_entry() {
        let temp = TempDir::new().unwrap();
        let store = DiskStore::open(temp.path()).await.unwrap();
        store.put(&p("/blog?page=1"), "blog").await.unwrap();
        assert_eq!(store.get(&p("/blog")).await.unwrap().as_deref(), Some("blog"));
    }

    #[tokio::test]
    async fn test_disk_concurrent_writers_leave_one_clean_entry() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(DiskStore::open(temp.path()).await.unwrap());
        let page = "<html>".to_string() + &"x".repeat(64 * 1024) + "</html>";

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let page = page.clone();
            handles.push(tokio::spawn(async move { store.put(&p("/same"), &page).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.get(&p("/same")).await.unwrap().as_deref(), Some(page.as_str()));

        let leftovers: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_put_and_get() {
        let store = MemoryStore::new();
        assert!(store.get(&p("/a")).await.unwrap().is_none());

        store.put(&p("/a"), "a").await.unwrap();
        store.put(&p("/a"), "b").await.unwrap();

        assert_eq!(store.get(&p("/a")).await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.len(), 1);
    }
}
