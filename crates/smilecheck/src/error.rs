//! Error types for smilecheck.
//!
//! This module defines all error types used throughout the smilecheck crate.
//! "Not found" conditions are never errors: lookups of unknown users surface
//! as `None` from the store.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for smilecheck operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Camera Errors ===
    /// The frame source could not be acquired.
    #[error("unable to access camera '{source_name}': {message}. Check permissions and try again")]
    CameraUnavailable {
        /// Name of the frame source.
        source_name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// A frame could not be captured from an acquired source.
    #[error("failed to capture frame from '{source_name}': {message}")]
    CaptureFailed {
        /// Name of the frame source.
        source_name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === Registration Errors ===
    /// A required registration field was empty.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// Registration was attempted without a captured face image.
    #[error("missing face image: capture a face image before registering")]
    MissingFaceImage,

    /// The email address already belongs to a registered profile.
    #[error("email already registered: {email}")]
    DuplicateEmail {
        /// The conflicting email address.
        email: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for smilecheck operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a camera unavailable error.
    #[must_use]
    pub fn camera_unavailable(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::CameraUnavailable {
            source_name,
            message: message.into(),
        }
    }

    /// Create a frame capture error.
    #[must_use]
    pub fn capture_failed(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::CaptureFailed {
            source_name,
            message: message.into(),
        }
    }

    /// Check if this error is a camera access problem the user can retry.
    #[must_use]
    pub fn is_camera_error(&self) -> bool {
        matches!(
            self,
            Self::CameraUnavailable { .. } | Self::CaptureFailed { .. }
        )
    }

    /// Check if this error was raised by registration validation.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. } | Self::MissingFaceImage | Self::DuplicateEmail { .. }
        )
    }
}
