//! A directory-backed cache for ACME account credentials and issued certificates.
//!
//! Each entry is one file in the cache directory named after its key. Writes go to a
//! temporary file first and are renamed into place, so a crash mid-write never leaves a
//! truncated certificate behind.
use crate::error::Error;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct DirCache {
    dir: PathBuf,
}

impl DirCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the entry stored under `key`, or `None` if there isn't one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the entry exists but can't be read.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        match fs::read(self.dir.join(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(err) => match err.kind() {
                ErrorKind::NotFound => Ok(None),
                _ => Err(Error::IO(err)),
            },
        }
    }

    /// Store `data` under `key`, creating the cache directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IO`] if the directory or entry can't be written.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).await?;
        let tmp_path = self.dir.join(format!(".{key}.tmp"));
        let mut tmp = fs::File::create(&tmp_path).await?;
        tmp.write_all(data).await?;
        tmp.flush().await?;
        tmp.sync_all().await?;
        drop(tmp);
        fs::rename(&tmp_path, self.dir.join(key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirCache::new(dir.path());
        assert_eq!(cache.get("www.example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirCache::new(dir.path().join("certs"));
        cache.put("www.example.com", b"first").await.unwrap();
        cache.put("www.example.com", b"second").await.unwrap();
        assert_eq!(
            cache.get("www.example.com").await.unwrap().as_deref(),
            Some(&b"second"[..])
        );
        assert!(!cache.dir().join(".www.example.com.tmp").exists());
    }
}
