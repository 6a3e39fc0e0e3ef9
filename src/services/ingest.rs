use bytes::Bytes;
use chrono::Utc;
use log::{info, warn};
use std::path::Path;
use uuid::Uuid;

use crate::db::DatasetRepository;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Dataset, FileType};
use crate::storage::{sanitize_file_name, FileStore};
use crate::utils::{doi, hashing};

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// Raw upload form. Every field is optional here because the form may
/// arrive incomplete; [`validate_upload`] decides.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub file: Option<UploadedFile>,
}

#[derive(Debug, Clone)]
pub struct ValidUpload {
    pub title: String,
    pub author: String,
    pub description: String,
    pub file_name: String,
    pub file_type: FileType,
    pub data: Bytes,
}

fn required(field: Option<String>) -> CatalogResult<String> {
    match field.map(|f| f.trim().to_string()) {
        Some(f) if !f.is_empty() => Ok(f),
        _ => Err(CatalogError::MissingFields),
    }
}

/// Column widths of `datasets.title` and `datasets.author`.
pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_AUTHOR_CHARS: usize = 100;

fn check_length(field: &'static str, value: &str, max: usize) -> CatalogResult<()> {
    if value.chars().count() > max {
        return Err(CatalogError::FieldTooLong { field, max });
    }
    Ok(())
}

pub fn check_size(size: u64, limit: u64) -> CatalogResult<()> {
    if size > limit {
        return Err(CatalogError::TooLarge { size, limit });
    }
    Ok(())
}

/// Checks fields, then field lengths, then extension, then size, in that order.
pub fn validate_upload(req: UploadRequest, max_bytes: u64) -> CatalogResult<ValidUpload> {
    let title = required(req.title)?;
    let author = required(req.author)?;
    let description = required(req.description)?;
    let file = match req.file {
        Some(f) if !f.file_name.trim().is_empty() && !f.data.is_empty() => f,
        _ => return Err(CatalogError::MissingFields),
    };
    check_length("Title", &title, MAX_TITLE_CHARS)?;
    check_length("Author", &author, MAX_AUTHOR_CHARS)?;

    let unsupported = || {
        let ext = Path::new(&file.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        CatalogError::UnsupportedType(ext)
    };
    let file_name = sanitize_file_name(&file.file_name).ok_or_else(unsupported)?;
    let file_type = FileType::from_file_name(&file_name).ok_or_else(unsupported)?;

    check_size(file.data.len() as u64, max_bytes)?;

    Ok(ValidUpload {
        title,
        author,
        description,
        file_name,
        file_type,
        data: file.data,
    })
}

/// Validates, stores and persists an upload; returns the new dataset.
pub async fn handle_upload(
    repo: &dyn DatasetRepository,
    store: &FileStore,
    req: UploadRequest,
    max_bytes: u64,
) -> CatalogResult<Dataset> {
    let upload = validate_upload(req, max_bytes)?;
    let identifier = doi::generate_doi(Utc::now());
    store_and_persist(repo, store, upload, identifier).await
}

/// Writes the file, then saves the row. If the save fails the file is
/// removed again so no orphan is left behind.
pub(crate) async fn store_and_persist(
    repo: &dyn DatasetRepository,
    store: &FileStore,
    upload: ValidUpload,
    identifier: String,
) -> CatalogResult<Dataset> {
    let id = Uuid::new_v4();
    let file_path = FileStore::dataset_path(id, &upload.file_name);

    if let Err(e) = store.save(&file_path, &upload.data).await {
        store.remove_dataset_dir(id).await;
        return Err(e);
    }

    let now = Utc::now();
    let dataset = Dataset {
        id,
        title: upload.title,
        author: upload.author,
        description: upload.description,
        file_path,
        file_size: upload.data.len() as i64,
        file_type: upload.file_type.as_str().to_string(),
        doi: identifier,
        checksum: hashing::sha256_hex(&upload.data),
        created_at: now,
        modified_at: now,
    };

    if let Err(e) = repo.create(&dataset).await {
        warn!("Saving dataset {} failed, discarding stored file: {}", dataset.id, e);
        store.remove_dataset_dir(id).await;
        return Err(e);
    }

    info!(
        "Ingested dataset {} ({}, {} bytes) as {}",
        dataset.id, dataset.file_type, dataset.file_size, dataset.doi
    );
    Ok(dataset)
}
