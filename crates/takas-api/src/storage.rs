use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tokio::fs;
use tracing::info;

/// URL prefix under which stored files are served.
pub const FILES_ROUTE: &str = "/files";

/// On-disk storage for user uploads, served back under [`FILES_ROUTE`].
///
/// Files live at `{dir}/{key}` where `key` is a relative path such as
/// `profile_photos/{uid}/{millis}_{name}`.
#[derive(Debug, Clone)]
pub struct PhotoStorage {
    dir: PathBuf,
}

impl PhotoStorage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        &self.dir
    }

    /// Writes `data` under `key`, creating parent directories, and returns
    /// the public URL path of the stored file.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<String> {
        if key.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            bail!("Refusing to store file under unsafe key '{}'", key);
        }

        let path = self.dir.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;

        Ok(format!("{FILES_ROUTE}/{key}"))
    }
}

/// Replaces every character outside `[A-Za-z0-9.-]` so an uploaded file
/// name is safe to use as a path segment.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    match sanitized.trim_start_matches('.') {
        "" => "upload".to_string(),
        rest => rest.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_nested_file_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PhotoStorage::new(dir.path().to_path_buf()).await.unwrap();

        let url = storage
            .put("profile_photos/u1/123_me.png", b"png")
            .await
            .unwrap();
        assert_eq!(url, "/files/profile_photos/u1/123_me.png");

        let stored = std::fs::read(dir.path().join("profile_photos/u1/123_me.png")).unwrap();
        assert_eq!(stored, b"png");
    }

    #[tokio::test]
    async fn put_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PhotoStorage::new(dir.path().to_path_buf()).await.unwrap();
        assert!(storage.put("../escape.png", b"x").await.is_err());
    }

    #[test]
    fn sanitizes_file_names() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name("çay.png"), "_ay.png");
        assert_eq!(sanitize_file_name("..."), "upload");
    }
}
