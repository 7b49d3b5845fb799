use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Could not decode {} with any of: {}", path.display(), tried.join(", "))]
    Decode { path: PathBuf, tried: Vec<String> },

    #[error("Required columns {missing:?} not found in {}", path.display())]
    MissingColumns { path: PathBuf, missing: Vec<String> },

    #[error("No tabular data after the header block in {}", .0.display())]
    EmptyBody(PathBuf),

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IngestError {
    /// Maps an open/read failure to `FileNotFound` when the path is missing.
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound(path.to_path_buf())
        } else {
            IngestError::IoError(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
