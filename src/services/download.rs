use log::{error, info};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tokio::fs::File;
use uuid::Uuid;

use crate::db::DatasetRepository;
use crate::error::{CatalogError, CatalogResult};
use crate::storage::FileStore;

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A verified stored file, opened and ready to be streamed to the client.
#[derive(Debug)]
pub struct Download {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub file: File,
}

impl Download {
    pub fn content_disposition(&self) -> String {
        content_disposition(&self.file_name)
    }
}

/// Non-ASCII names get an ASCII fallback plus an RFC 5987 `filename*`.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    if fallback == file_name {
        format!("attachment; filename=\"{}\"", fallback)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            utf8_percent_encode(file_name, NON_ALPHANUMERIC)
        )
    }
}

pub fn content_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

pub async fn handle_download(
    repo: &dyn DatasetRepository,
    store: &FileStore,
    id: Uuid,
) -> CatalogResult<Download> {
    let dataset = repo.get_by_id(id).await?.ok_or(CatalogError::NotFound)?;
    if store.sha256(&dataset.file_path).await? != dataset.checksum {
        error!("Checksum mismatch for dataset {} at {}", dataset.id, dataset.file_path);
        return Err(CatalogError::ChecksumMismatch(dataset.file_name().to_string()));
    }

    let (file, size) = store.open(&dataset.file_path).await?;
    let file_name = dataset.file_name().to_string();
    info!("Serving dataset {} as {} ({} bytes)", dataset.id, file_name, size);
    Ok(Download {
        content_type: content_type_for(&file_name),
        file_name,
        size,
        file,
    })
}
