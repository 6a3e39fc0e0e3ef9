use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Every failure a catalog operation can report.
///
/// Handlers never let one of these escape as a raw fault: each kind is turned
/// into a flash message and a redirect by [`CatalogError::user_message`].
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("All fields are required.")]
    MissingFields,

    #[error("{field} must be at most {max} characters.")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Unsupported file type '{0}'. Allowed types: csv, xlsx, pdf, doc, docx.")]
    UnsupportedType(String),

    #[error("File is too large ({size} bytes). Maximum allowed size is {limit} bytes.")]
    TooLarge { size: u64, limit: u64 },

    #[error("File is too large. Maximum allowed size is {limit} bytes.")]
    BodyTooLarge { limit: u64 },

    #[error("Dataset not found.")]
    NotFound,

    #[error("Stored file is missing: {0}")]
    FileMissing(String),

    #[error("Checksum mismatch for stored file {0}")]
    ChecksumMismatch(String),

    #[error("{0}")]
    PreviewFailed(String),

    #[error("Identifier {0} is already assigned to another dataset")]
    DuplicateIdentifier(String),

    #[error("Invalid username/email or password.")]
    InvalidCredentials,

    #[error("{0}")]
    Registration(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CatalogError {
    /// Message shown to the user when an upload fails.
    pub fn upload_message(&self) -> String {
        match self {
            CatalogError::MissingFields
            | CatalogError::FieldTooLong { .. }
            | CatalogError::UnsupportedType(_)
            | CatalogError::TooLarge { .. }
            | CatalogError::BodyTooLarge { .. } => self.to_string(),
            other => format!("Error uploading dataset: {}", other),
        }
    }

    /// Message shown to the user when a preview fails.
    pub fn preview_message(&self) -> String {
        match self {
            CatalogError::NotFound => self.to_string(),
            other => format!("Error loading dataset preview: {}", other),
        }
    }

    /// Message shown to the user when a download fails.
    pub fn download_message(&self) -> String {
        match self {
            CatalogError::NotFound => self.to_string(),
            other => format!("Error downloading dataset: {}", other),
        }
    }

    /// Generic mapping used by the auth pages.
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::Database(_) | CatalogError::Storage(_) | CatalogError::Internal(_) => {
                format!("Unexpected error: {}", self)
            }
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CatalogError::MissingFields
                | CatalogError::FieldTooLong { .. }
                | CatalogError::UnsupportedType(_)
                | CatalogError::TooLarge { .. }
                | CatalogError::BodyTooLarge { .. }
        )
    }
}
