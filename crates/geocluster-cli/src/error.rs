//! Error types for loading trip data and writing reports

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for CLI I/O operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boundary errors: everything that can go wrong around the clustering core
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A trip record could not be turned into a point
    #[error("Invalid record in '{source_name}' at line {line}: {message}")]
    InvalidRecord {
        source_name: String,
        line: u64,
        message: String,
    },

    /// File could not be opened or created
    #[error("Cannot access '{path}': {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Clustering core error
    #[error("Clustering error: {0}")]
    Cluster(#[from] geocluster_core::ClusterError),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid record error
    pub fn invalid_record(source_name: impl Into<String>, line: u64, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }

    /// Attach a path to an IO error
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}
