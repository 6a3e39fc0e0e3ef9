//! File bytes live on disk under the media root, outside the relational store.
//!
//! Every dataset gets its own directory, `datasets/<id>/`, holding exactly
//! one file.

use log::{info, warn};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::utils::hashing;

const DATASETS_DIR: &str = "datasets";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(self.root.join(DATASETS_DIR)).await
    }

    /// Relative reference stored on the dataset row.
    pub fn dataset_path(id: Uuid, file_name: &str) -> String {
        format!("{}/{}/{}", DATASETS_DIR, id, file_name)
    }

    /// Writes the file through a temporary name so a crash never leaves a
    /// half-written file under the final name.
    pub async fn save(&self, relative: &str, data: &[u8]) -> CatalogResult<PathBuf> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut tmp = path.clone().into_os_string();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &path).await?;
        info!("Stored {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }

    /// Absolute path of a stored file, or [`CatalogError::FileMissing`].
    pub async fn existing_path(&self, relative: &str) -> CatalogResult<PathBuf> {
        let path = self.resolve(relative)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(CatalogError::FileMissing(relative.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(CatalogError::FileMissing(relative.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Opens a stored file for streaming; also returns its length.
    pub async fn open(&self, relative: &str) -> CatalogResult<(File, u64)> {
        let path = self.existing_path(relative).await?;
        let file = File::open(&path).await?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// SHA-256 of a stored file, read in fixed-size chunks.
    pub async fn sha256(&self, relative: &str) -> CatalogResult<String> {
        let (file, _) = self.open(relative).await?;
        Ok(hashing::sha256_reader(file).await?)
    }

    pub async fn exists(&self, relative: &str) -> bool {
        match self.resolve(relative) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Best-effort removal of a dataset's directory.
    pub async fn remove_dataset_dir(&self, id: Uuid) {
        let dir = self.root.join(DATASETS_DIR).join(id.to_string());
        if !dir.exists() {
            return;
        }
        match fs::remove_dir_all(&dir).await {
            Ok(_) => info!("Removed orphaned dataset directory {}", dir.display()),
            Err(e) => warn!("Failed to remove dataset directory {}: {}", dir.display(), e),
        }
    }

    /// Maps a stored reference to an absolute path, refusing anything that
    /// would escape the media root.
    fn resolve(&self, relative: &str) -> CatalogResult<PathBuf> {
        let rel = Path::new(relative);
        let mut normalized = PathBuf::new();
        for component in rel.components() {
            match component {
                Component::Normal(name) => normalized.push(name),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(CatalogError::FileMissing(relative.to_string()));
                }
            }
        }
        if normalized.as_os_str().is_empty() {
            return Err(CatalogError::FileMissing(relative.to_string()));
        }
        Ok(self.root.join(normalized))
    }
}

/// Reduces an uploaded file name to a safe base name.
///
/// Directory parts are dropped, spaces become underscores and anything
/// other than letters, digits, `-`, `_` and `.` is removed. Returns `None`
/// if nothing usable is left.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => Some(c),
            _ => None,
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd.csv").as_deref(), Some("passwd.csv"));
        assert_eq!(sanitize_file_name("C:\\data\\my file.xlsx").as_deref(), Some("my_file.xlsx"));
        assert_eq!(sanitize_file_name("résumé (1).pdf").as_deref(), Some("résumé_1.pdf"));
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("   "), None);
    }

    #[tokio::test]
    async fn save_then_read_back() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        store.init().await.unwrap();

        let id = Uuid::new_v4();
        let rel = FileStore::dataset_path(id, "test.csv");
        store.save(&rel, b"col1,col2\nval1,val2").await.unwrap();

        assert!(store.exists(&rel).await);
        let path = store.existing_path(&rel).await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"col1,col2\nval1,val2");
        assert!(!store.exists(&format!("{rel}.part")).await);

        let (_, len) = store.open(&rel).await.unwrap();
        assert_eq!(len, 19);
        assert_eq!(
            store.sha256(&rel).await.unwrap(),
            hashing::sha256_hex(b"col1,col2\nval1,val2")
        );
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        let err = store.open("datasets/nope/missing.csv").await.unwrap_err();
        assert!(matches!(err, CatalogError::FileMissing(_)));
        let err = store.sha256("datasets/nope/missing.csv").await.unwrap_err();
        assert!(matches!(err, CatalogError::FileMissing(_)));
    }

    #[tokio::test]
    async fn traversal_is_refused() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        assert!(store.open("../outside.csv").await.is_err());
        assert!(store.save("/abs/path.csv", b"x").await.is_err());
    }

    #[tokio::test]
    async fn remove_dataset_dir_deletes_the_file() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        let id = Uuid::new_v4();
        let rel = FileStore::dataset_path(id, "a.pdf");
        store.save(&rel, b"%PDF").await.unwrap();

        store.remove_dataset_dir(id).await;
        assert!(!store.exists(&rel).await);
    }
}
