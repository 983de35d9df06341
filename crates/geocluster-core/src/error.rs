//! Error types for the clustering engine

use thiserror::Error;

/// Result type alias for clustering operations
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Clustering errors
///
/// The algorithm itself is total over finite input; everything here is
/// either a construction-time validation failure or a cancelled run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    /// A clustering parameter is out of range
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// An input point has a NaN or infinite coordinate
    #[error("Point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    /// The run was cancelled between two seed points
    #[error("Clustering cancelled after {processed} points")]
    Cancelled { processed: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClusterError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error came from a cancelled run rather than bad input
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
