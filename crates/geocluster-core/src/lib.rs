//! geocluster-core: density-based clustering of 2-D geographic points
//!
//! This crate implements DBSCAN over an in-memory slice of points, with
//! pluggable radius-neighbour search (full scan or uniform grid), per-cluster
//! summaries sorted by size, and a rayon-backed runner for independent jobs.
//!
//! ```
//! use geocluster_core::{cluster_points, summarize, ClusterParams, Point};
//!
//! let points = vec![
//!     Point::new(0.0, 0.0),
//!     Point::new(0.0, 0.0001),
//!     Point::new(0.0, 0.0002),
//!     Point::new(10.0, 10.0),
//! ];
//! let clusters = cluster_points(&points, ClusterParams::new(0.0003, 2)).unwrap();
//! assert_eq!(clusters[0].members, vec![0, 1, 2]);
//!
//! let rows = summarize(&points, &clusters);
//! assert_eq!(rows[0].size, 3);
//! ```

pub mod batch;
pub mod config;
pub mod dbscan;
pub mod error;
pub mod neighbor;
pub mod summary;
pub mod types;

pub use batch::{cluster_batch, ClusterJob, ClusterOutcome};
pub use config::{ClusterParams, IndexStrategy};
pub use dbscan::{cluster_points, CancelToken, ClusterObserver, Dbscan, NoopObserver};
pub use error::{ClusterError, Result};
pub use neighbor::{build_index, GridIndex, LinearScan, NeighborQuery};
pub use summary::{summarize, ClusterSummary, ClusteringStats};
pub use types::{distance, BoundingBox, Cluster, Point};
