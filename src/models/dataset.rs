use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// File formats the catalog accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Csv,
    Xlsx,
    Pdf,
    Doc,
    Docx,
}

impl FileType {
    pub const ALL: [FileType; 5] = [
        FileType::Csv,
        FileType::Xlsx,
        FileType::Pdf,
        FileType::Doc,
        FileType::Docx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Csv => "csv",
            FileType::Xlsx => "xlsx",
            FileType::Pdf => "pdf",
            FileType::Doc => "doc",
            FileType::Docx => "docx",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.to_ascii_lowercase();
        FileType::ALL.into_iter().find(|t| t.as_str() == code)
    }

    /// Derives the type from a file name's extension, if it is one we accept.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_code)
    }

    pub fn is_tabular(&self) -> bool {
        matches!(self, FileType::Csv | FileType::Xlsx)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Dataset {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    /// Relative to the media root: `datasets/<id>/<file name>`.
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
    pub doi: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Dataset {
    pub fn kind(&self) -> Option<FileType> {
        FileType::from_code(&self.file_type)
    }

    /// Base name of the stored file, used as the download attachment name.
    pub fn file_name(&self) -> &str {
        Path::new(&self.file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.file_path)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.doi)
    }
}
