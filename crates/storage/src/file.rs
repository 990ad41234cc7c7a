use crate::{KeyValueStore, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Filesystem backend: one file per key under a root directory.
///
/// Key segments map to path components, so a whole minting day can be
/// inspected (and wiped) as a directory. Writes go through a temp file and
/// rename so a crashed invocation never leaves a torn value behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        if root.as_os_str().is_empty() {
            return Err(StorageError::Backend("storage root is empty".to_string()));
        }
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn validate_key(key: &str) -> Result<(), StorageError> {
        let valid = !key.trim().is_empty()
            && !key.starts_with('/')
            && !key.ends_with('/')
            && !key.contains('\\')
            && key.split('/').all(|segment| {
                !segment.is_empty() && segment != ".." && segment != "." && !segment.ends_with(".tmp")
            });
        if valid {
            Ok(())
        } else {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        path
    }

    async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::validate_key(key)?;
        match tokio::fs::read_to_string(self.key_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::validate_key(key)?;
        let target = self.key_path(key);
        let temp = target.with_extension("tmp");

        Self::ensure_parent(&target).await?;

        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(value.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&temp, &target).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        Self::validate_key(key)?;
        match tokio::fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    continue;
                }
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    let key = relative
                        .components()
                        .map(|component| component.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    keys.push(key);
                }
            }
        }

        Ok(keys)
    }
}
