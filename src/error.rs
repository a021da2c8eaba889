//! Error handling for the disperser
//!
//! The real-time core never fails; errors only come from the surfaces around
//! it (configuration, presets, parameter-by-name access, file I/O).

use thiserror::Error;

/// Result type alias for disperser operations
pub type Result<T> = std::result::Result<T, DisperserError>;

/// Main error type for disperser operations
#[derive(Error, Debug)]
pub enum DisperserError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Parameter / configuration errors
    #[error("Invalid value '{value}' for parameter '{param}' (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DisperserError {
    /// Shorthand for building an `InvalidParameter` error
    pub fn invalid_parameter(
        param: impl Into<String>,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        DisperserError::InvalidParameter {
            param: param.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            DisperserError::FileNotFound { .. } => "FILE_NOT_FOUND",
            DisperserError::InvalidAudio { .. } => "INVALID_AUDIO",
            DisperserError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            DisperserError::EmptyAudio => "EMPTY_AUDIO",
            DisperserError::InvalidParameter { .. } => "INVALID_PARAMETER",
            DisperserError::InvalidConfig { .. } => "INVALID_CONFIG",
            DisperserError::Io(_) => "IO_ERROR",
            DisperserError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DisperserError::FileNotFound { .. }
                | DisperserError::InvalidAudio { .. }
                | DisperserError::UnsupportedFormat { .. }
                | DisperserError::InvalidParameter { .. }
                | DisperserError::InvalidConfig { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            DisperserError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            DisperserError::InvalidAudio { .. } => vec![
                "Try converting the file to WAV format first",
                "The file may be corrupted - try re-exporting from source",
            ],
            DisperserError::UnsupportedFormat { .. } => vec![
                "Only mono and stereo WAV files are supported",
                "Export as 16, 24 or 32-bit WAV",
            ],
            DisperserError::InvalidParameter { .. } => vec![
                "Parameters: frequency, intensity, q, mix, enabled",
                "Values outside the documented range are clamped, but must be numbers",
            ],
            DisperserError::InvalidConfig { .. } => vec![
                "Run 'disperser-cli config' to print a valid default configuration",
            ],
            _ => vec![],
        }
    }
}
