//! On-disk artifact store. Files land flat in the output directory under the
//! names the repository published; writes go to a temporary name in the same
//! directory and are renamed into place so a partial download never appears
//! under its final name.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::fs::{create_dir_all, rename, try_exists, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::trace;

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> FsArtifactStore {
        FsArtifactStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub async fn has(&self, file_name: &str) -> bool {
        try_exists(self.file_path(file_name)).await.unwrap_or(false)
    }

    /// Write `data` under `file_name`. Returns false when the file already
    /// exists and `overwrite` is off (the existing file is kept).
    pub async fn write(
        &self,
        file_name: &str,
        data: &[u8],
        overwrite: bool,
    ) -> anyhow::Result<bool> {
        let target = self.file_path(file_name);
        if !overwrite && try_exists(&target).await.unwrap_or(false) {
            trace!("keeping existing file {}", target.display());
            return Ok(false);
        }

        create_dir_all(&self.root)
            .await
            .with_context(|| format!("cannot create output directory {}", self.root.display()))?;

        let temp = self.root.join(format!("{}.part", file_name));
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&temp)
            .await
            .with_context(|| format!("cannot write {}", temp.display()))?;
        file.write_all(data).await?;
        file.flush().await?;
        drop(file);

        rename(&temp, &target)
            .await
            .with_context(|| format!("cannot move {} into place", temp.display()))?;
        trace!("stored {}", target.display());
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_write_and_has() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        assert!(!store.has("a-1.0.jar").await);
        assert!(store.write("a-1.0.jar", b"bytes", false).await.unwrap());
        assert!(store.has("a-1.0.jar").await);
        assert_eq!(std::fs::read(dir.path().join("a-1.0.jar")).unwrap(), b"bytes");
        // no temporary file left behind
        assert!(!dir.path().join("a-1.0.jar.part").exists());
    }

    #[tokio::test]
    async fn test_existing_file_kept_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        store.write("a-1.0.jar", b"original", false).await.unwrap();
        assert!(!store.write("a-1.0.jar", b"changed", false).await.unwrap());
        assert_eq!(
            std::fs::read(dir.path().join("a-1.0.jar")).unwrap(),
            b"original"
        );

        assert!(store.write("a-1.0.jar", b"changed", true).await.unwrap());
        assert_eq!(
            std::fs::read(dir.path().join("a-1.0.jar")).unwrap(),
            b"changed"
        );
    }

    #[tokio::test]
    async fn test_creates_output_directory_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("nested/out"));
        assert!(store.write("a-1.0.pom", b"<project/>", false).await.unwrap());
        assert!(store.has("a-1.0.pom").await);
    }
}
