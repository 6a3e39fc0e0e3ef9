use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use log::{info, warn};
use std::io::{Read, Seek};
use std::path::Path;
use uuid::Uuid;

use crate::db::DatasetRepository;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{Dataset, FileType};
use crate::storage::FileStore;

pub const PREVIEW_ROWS: usize = 10;

/// Header plus the leading data rows of a tabular file, in file column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Preview {
    pub dataset: Dataset,
    /// `None` for formats that are not tabular.
    pub table: Option<PreviewTable>,
}

pub async fn handle_preview(
    repo: &dyn DatasetRepository,
    store: &FileStore,
    id: Uuid,
) -> CatalogResult<Preview> {
    let dataset = repo.get_by_id(id).await?.ok_or(CatalogError::NotFound)?;

    let table = match dataset.kind() {
        Some(kind) if kind.is_tabular() => {
            let path = store.existing_path(&dataset.file_path).await?;
            let table = tokio::task::spawn_blocking(move || parse_file(kind, &path, PREVIEW_ROWS))
                .await
                .map_err(|e| CatalogError::Internal(e.into()))?;
            match table {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!("Preview of dataset {} failed: {}", dataset.id, e);
                    return Err(e);
                }
            }
        }
        _ => None,
    };

    info!("Previewed dataset {} ({})", dataset.id, dataset.file_type);
    Ok(Preview { dataset, table })
}

/// Reads the header and at most `max_rows` data rows straight from disk.
pub fn parse_file(kind: FileType, path: &Path, max_rows: usize) -> CatalogResult<PreviewTable> {
    match kind {
        FileType::Csv => {
            let reader = csv_builder()
                .from_path(path)
                .map_err(|e| CatalogError::PreviewFailed(e.to_string()))?;
            read_csv(reader, max_rows)
        }
        FileType::Xlsx => {
            let workbook: Xlsx<_> = open_workbook(path).map_err(workbook_error)?;
            read_xlsx(workbook, max_rows)
        }
        other => Err(CatalogError::PreviewFailed(format!(
            "Unsupported file type for preview: {}",
            other
        ))),
    }
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(true).flexible(true);
    builder
}

/// Short rows are padded with empty cells; rows wider than the header fail.
fn read_csv<R: Read>(mut reader: csv::Reader<R>, max_rows: usize) -> CatalogResult<PreviewTable> {
    let header: Vec<String> = reader
        .headers()
        .map_err(|e| CatalogError::PreviewFailed(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if header.is_empty() {
        return Err(CatalogError::PreviewFailed("No columns to parse from file".to_string()));
    }

    let mut rows = Vec::with_capacity(max_rows);
    for record in reader.records().take(max_rows) {
        let record = record.map_err(|e| CatalogError::PreviewFailed(e.to_string()))?;
        if record.len() > header.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(CatalogError::PreviewFailed(format!(
                "Expected {} fields in line {}, saw {}",
                header.len(),
                line,
                record.len()
            )));
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(header.len(), String::new());
        rows.push(row);
    }

    Ok(PreviewTable { header, rows })
}

fn workbook_error(e: XlsxError) -> CatalogError {
    CatalogError::PreviewFailed(format!("cannot open workbook: {}", e))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn read_xlsx<RS: Read + Seek>(mut workbook: Xlsx<RS>, max_rows: usize) -> CatalogResult<PreviewTable> {
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CatalogError::PreviewFailed("workbook has no sheets".to_string()))?
        .map_err(|e| CatalogError::PreviewFailed(format!("cannot read first sheet: {}", e)))?;

    let mut sheet_rows = range.rows();
    let header: Vec<String> = match sheet_rows.next() {
        Some(row) => row.iter().map(cell_text).collect(),
        None => return Err(CatalogError::PreviewFailed("No columns to parse from file".to_string())),
    };

    let rows = sheet_rows
        .take(max_rows)
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok(PreviewTable { header, rows })
}
