//! Error handling for Salvo
//!
//! Parameter clamping never produces an error. Library, codec and filesystem
//! failures carry the offending path so callers can report it.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Salvo operations
pub type Result<T> = std::result::Result<T, SalvoError>;

/// Main error type for Salvo operations
#[derive(Error, Debug)]
pub enum SalvoError {
    // Library Errors
    #[error("Sample library is empty")]
    EmptyLibrary,

    #[error("Cannot mix an empty shot sequence")]
    EmptySequence,

    #[error("Sample not found in library: {path}")]
    SampleNotFound { path: PathBuf },

    // Codec Errors
    #[error("Failed to decode audio {path}: {reason}")]
    DecodeFailure { path: PathBuf, reason: String },

    #[error("Failed to encode audio {path}: {reason}")]
    EncodeFailure { path: PathBuf, reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // File Errors
    #[error("Path is occupied by something that is not a directory: {path}")]
    PathConflict { path: PathBuf },

    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory creation failed: {path}: {source}")]
    DirectoryCreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Project Errors
    #[error("Invalid project document: {reason}")]
    InvalidProject { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SalvoError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            SalvoError::EmptyLibrary => "EMPTY_LIBRARY",
            SalvoError::EmptySequence => "EMPTY_SEQUENCE",
            SalvoError::SampleNotFound { .. } => "SAMPLE_NOT_FOUND",
            SalvoError::DecodeFailure { .. } => "DECODE_FAILURE",
            SalvoError::EncodeFailure { .. } => "ENCODE_FAILURE",
            SalvoError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            SalvoError::PathConflict { .. } => "PATH_CONFLICT",
            SalvoError::FileReadError { .. } => "FILE_READ_ERROR",
            SalvoError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            SalvoError::DirectoryCreateError { .. } => "DIRECTORY_CREATE_ERROR",
            SalvoError::InvalidProject { .. } => "INVALID_PROJECT",
            SalvoError::Io(_) => "IO_ERROR",
            SalvoError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// The path this error is about, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            SalvoError::SampleNotFound { path }
            | SalvoError::DecodeFailure { path, .. }
            | SalvoError::EncodeFailure { path, .. }
            | SalvoError::PathConflict { path }
            | SalvoError::FileReadError { path, .. }
            | SalvoError::FileWriteError { path, .. }
            | SalvoError::DirectoryCreateError { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Check if this error is recoverable by fixing input and retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SalvoError::EmptyLibrary
                | SalvoError::SampleNotFound { .. }
                | SalvoError::DecodeFailure { .. }
                | SalvoError::UnsupportedFormat { .. }
                | SalvoError::PathConflict { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SalvoError::EmptyLibrary => vec![
                "Add at least one source sample before rendering",
                "Check that the project's sample paths still exist",
            ],
            SalvoError::DecodeFailure { .. } => vec![
                "Check the file path is correct",
                "Only PCM or float WAV files are supported",
                "Re-export the sample from your editor",
            ],
            SalvoError::UnsupportedFormat { .. } => vec![
                "Convert the sample to mono or stereo WAV",
                "Supported bit depths: 8, 16, 24, 32",
            ],
            SalvoError::PathConflict { .. } => vec![
                "Move or rename the file occupying the output directory",
                "Choose a different target directory or prefix",
            ],
            SalvoError::EncodeFailure { .. } | SalvoError::FileWriteError { .. } => vec![
                "Check that the target directory is writable",
                "Free up disk space",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = SalvoError::DecodeFailure {
            path: PathBuf::from("shot.wav"),
            reason: "bad header".to_string(),
        };
        assert_eq!(err.error_code(), "DECODE_FAILURE");
        assert_eq!(err.path(), Some(&PathBuf::from("shot.wav")));
        assert!(err.to_string().contains("shot.wav"));
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = SalvoError::EmptyLibrary;
        assert!(!err.recovery_suggestions().is_empty());
        assert!(err.is_recoverable());
        assert!(err.path().is_none());
    }
}
