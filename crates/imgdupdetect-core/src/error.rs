use std::path::PathBuf;
use thiserror::Error;

use crate::persistence::PersistenceError;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the imgdupdetect library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt or undecodable image data
    #[error("Image decode error: {0}")]
    Decode(image::ImageError),

    /// Unsupported image format
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Content store transaction failure
    #[error("Store error: {0}")]
    Store(PersistenceError),

    /// Missing collection, fingerprint or filename
    #[error("Not found: {0}")]
    NotFound(String),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File name that cannot be stored losslessly as text
    #[error("Path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    /// Scan root is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Invalid glob pattern in a matcher
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A pipeline thread could not be started or panicked
    #[error("Pipeline failure: {0}")]
    Pipeline(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            // Keep I/O failures distinct from corrupt data
            image::ImageError::IoError(e) => Error::Io(e),
            other => Error::Decode(other),
        }
    }
}

impl From<PersistenceError> for Error {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(what) => Error::NotFound(what),
            other => Error::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_io_error_maps_to_io() {
        let err: Error = image::ImageError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ))
        .into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_persistence_not_found_stays_not_found() {
        let err: Error = PersistenceError::NotFound("collection: test".to_string()).into();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
