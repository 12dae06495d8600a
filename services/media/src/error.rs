use thiserror::Error;

use crate::models::MediaKind;

/// Object store failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to upload object {key}: {message}")]
    Upload { key: String, message: String },

    #[error("Failed to delete object {key}: {message}")]
    Delete { key: String, message: String },

    #[error("Failed to sign URL: {0}")]
    Signing(String),

    #[error("Invalid storage configuration: {0}")]
    Config(String),
}

/// Reasons an upload does not complete
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Maximum upload limit reached. You can only upload {limit} files.")]
    QuotaExceeded { limit: i32 },

    #[error(
        "Invalid file type. Only images (JPEG, PNG, GIF, WebP) and videos (MP4, WebM, OGG, AVI, MOV) are allowed."
    )]
    UnsupportedType { content_type: String },

    #[error("{} files must be smaller than {}", kind.label(), format_limit(*limit))]
    FileTooLarge { kind: MediaKind, limit: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to record upload: {0}")]
    MetadataCommit(anyhow::Error),
}

/// Failures while listing published media
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to load media records: {0}")]
    Store(anyhow::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type StorageResult<T> = Result<T, StorageError>;

fn format_limit(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{}KB", bytes.div_ceil(1024))
    }
}
