//! Local-filesystem [`ObjectStore`].

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::errors::StoreError;
use crate::traits::{DirListing, Entry, FileEntry, ObjectStore};

/// [`ObjectStore`] rooted at a local directory.
///
/// All paths are interpreted relative to the root. Absolute paths and `..`
/// components are rejected before touching the filesystem.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Resolve a store path against the root, rejecting escapes.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        if relative.is_absolute() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => return Err(StoreError::InvalidPath(path.to_string())),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn mkdir(&self, path: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        tokio::fs::create_dir_all(&full).await?;
        Ok(())
    }

    async fn read_dir(&self, path: &str) -> Result<DirListing, StoreError> {
        let full = self.resolve(path)?;
        let mut listing = DirListing::default();
        let mut entries = tokio::fs::read_dir(&full)
            .await
            .map_err(|_| StoreError::NotFound(path.to_string()))?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                listing.directories.push(name);
            } else {
                let modified = meta
                    .modified()
                    .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339())
                    .unwrap_or_default();
                listing.files.push(FileEntry { name, size: meta.len(), modified });
            }
        }
        listing.directories.sort();
        listing.files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    async fn read_text(&self, path: &str) -> Result<String, StoreError> {
        let full = self.resolve(path)?;
        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
                _ => StoreError::Io(e),
            })
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        mime_type: &str,
    ) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, content).await?;
        debug!(path, mime_type, bytes = content.len(), "wrote object");
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<Entry, StoreError> {
        let full = self.resolve(path)?;
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => Ok(Entry::Directory),
            Ok(_) => Ok(Entry::File),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entry::Missing),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => {
                tokio::fs::remove_dir_all(&full).await?;
                Ok(())
            }
            Ok(_) => {
                tokio::fs::remove_file(&full).await?;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().join("objects")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn write_creates_parents_and_reads_back() {
        let (_dir, store) = store();
        store
            .write("tasks/t1/artifacts/report.md", "# Report", "text/markdown")
            .await
            .unwrap();
        let text = store.read_text("tasks/t1/artifacts/report.md").await.unwrap();
        assert_eq!(text, "# Report");
        assert_eq!(store.exists("tasks/t1/artifacts").await.unwrap(), Entry::Directory);
        assert_eq!(
            store.exists("tasks/t1/artifacts/report.md").await.unwrap(),
            Entry::File
        );
    }

    #[tokio::test]
    async fn read_dir_splits_dirs_and_files() {
        let (_dir, store) = store();
        store.mkdir("knowledge/topics").await.unwrap();
        store.write("knowledge/index.md", "index", "text/markdown").await.unwrap();
        let listing = store.read_dir("knowledge").await.unwrap();
        assert_eq!(listing.directories, vec!["topics".to_string()]);
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].name, "index.md");
        assert_eq!(listing.files[0].size, 5);
    }

    #[tokio::test]
    async fn missing_paths_are_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.read_text("nope.txt").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.read_dir("nope").await, Err(StoreError::NotFound(_))));
        assert_eq!(store.exists("nope").await.unwrap(), Entry::Missing);
        assert!(matches!(store.delete("nope").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn escaping_paths_are_rejected() {
        let (_dir, store) = store();
        assert!(matches!(
            store.read_text("../outside.txt").await,
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.write("/etc/passwd", "x", "text/plain").await,
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.delete("a/../../b").await,
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_directories_recursively() {
        let (_dir, store) = store();
        store.write("tree/a/b.txt", "x", "text/plain").await.unwrap();
        store.delete("tree").await.unwrap();
        assert_eq!(store.exists("tree").await.unwrap(), Entry::Missing);
    }
}
