//! Error types for the camera-to-keyboard library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML resource could not be parsed or serialized
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Perspective transform could not be computed
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Keyboard layout definition is malformed
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Unknown calibration or tracking strategy name
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
