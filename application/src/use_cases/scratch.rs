//! Per-attempt scratch working directory.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// A uniquely named directory, removed with its contents.
///
/// Call [`remove`](Self::remove) on the normal path; dropping an unremoved
/// directory cleans up synchronously as a fallback for early exits.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    /// Create `<root>/<uuid>`. `root` is created when missing.
    pub async fn create(root: &Path) -> io::Result<Self> {
        tokio::fs::create_dir_all(root).await?;
        let path = root.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir(&path).await?;
        debug!("Created scratch directory {}", path.display());
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory without blocking the runtime.
    pub async fn remove(mut self) {
        self.removed = true;
        let result = tokio::fs::remove_dir_all(&self.path).await;
        report_removal(&self.path, result);
    }
}

fn report_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => debug!("Removed scratch directory {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Failed to remove scratch directory {}: {}",
            path.display(),
            e
        ),
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if !self.removed {
            report_removal(&self.path, std::fs::remove_dir_all(&self.path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unique_names_under_root() {
        let root = tempfile::tempdir().unwrap();
        let a = ScratchDir::create(root.path()).await.unwrap();
        let b = ScratchDir::create(root.path()).await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(a.path().parent(), Some(root.path()));
    }

    #[tokio::test]
    async fn test_remove_deletes_contents() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path()).await.unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::create_dir(path.join(".git")).unwrap();
        std::fs::write(path.join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();
        scratch.remove().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_without_remove_still_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path()).await.unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::write(path.join("partial"), "x").unwrap();
        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_remove_tolerates_already_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path()).await.unwrap();
        std::fs::remove_dir(scratch.path()).unwrap();
        scratch.remove().await;
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_root_is_created() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        let scratch = ScratchDir::create(&nested).await.unwrap();
        assert!(scratch.path().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_creation_failure_is_reported() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("not-a-dir");
        std::fs::write(&file, "").unwrap();
        assert!(ScratchDir::create(&file).await.is_err());
    }
}
