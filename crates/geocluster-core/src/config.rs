//! Clustering parameters

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Neighbour search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStrategy {
    /// Full scan per query, O(n)
    Linear,
    /// Uniform grid with eps-sized cells
    Grid,
    /// Grid for large inputs, linear scan otherwise
    #[default]
    Auto,
}

impl std::fmt::Display for IndexStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexStrategy::Linear => write!(f, "linear"),
            IndexStrategy::Grid => write!(f, "grid"),
            IndexStrategy::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for IndexStrategy {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(IndexStrategy::Linear),
            "grid" => Ok(IndexStrategy::Grid),
            "auto" => Ok(IndexStrategy::Auto),
            other => Err(ClusterError::config(format!(
                "unknown index strategy '{}' (expected linear, grid or auto)",
                other
            ))),
        }
    }
}

/// DBSCAN parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Neighbourhood radius, in coordinate units (degrees for GPS input)
    pub eps: f64,
    /// Minimum neighbourhood size (self included) for a core point
    pub min_pts: usize,
    /// Neighbour search backend
    pub index: IndexStrategy,
    /// Input size from which `Auto` switches to the grid
    pub auto_grid_threshold: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            eps: 0.0003, // ~30m at NYC latitude
            min_pts: 5,
            index: IndexStrategy::Auto,
            auto_grid_threshold: 2048,
        }
    }
}

impl ClusterParams {
    pub fn new(eps: f64, min_pts: usize) -> Self {
        Self {
            eps,
            min_pts,
            ..Default::default()
        }
    }

    /// Builder-style index selection
    pub fn with_index(mut self, index: IndexStrategy) -> Self {
        self.index = index;
        self
    }

    /// Check parameter ranges.
    ///
    /// `eps = 0` is accepted (exact-duplicate clustering); negative or
    /// non-finite radii and `min_pts = 0` are rejected.
    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() {
            return Err(ClusterError::invalid_parameter(
                "eps",
                format!("must be finite, got {}", self.eps),
            ));
        }
        if self.eps < 0.0 {
            return Err(ClusterError::invalid_parameter(
                "eps",
                format!("must not be negative, got {}", self.eps),
            ));
        }
        if self.min_pts == 0 {
            return Err(ClusterError::invalid_parameter(
                "min_pts",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
