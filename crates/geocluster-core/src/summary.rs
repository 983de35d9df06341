//! Cluster summaries and run statistics

use serde::{Deserialize, Serialize};

use crate::types::{Cluster, Point};

/// One report row: where a cluster is and how big it is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// ID of the summarized cluster (engine emission order)
    pub cluster_id: usize,
    /// Arithmetic mean of member coordinates
    pub centroid: Point,
    /// Number of members
    pub size: usize,
}

/// Reduce clusters to (centroid, size), largest first.
///
/// The sort is stable, so equally sized clusters keep the order the engine
/// emitted them in.
pub fn summarize(points: &[Point], clusters: &[Cluster]) -> Vec<ClusterSummary> {
    let mut summaries: Vec<ClusterSummary> = clusters
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| ClusterSummary {
            cluster_id: c.id,
            centroid: centroid(c.points(points)),
            size: c.len(),
        })
        .collect();

    summaries.sort_by(|a, b| b.size.cmp(&a.size));
    summaries
}

/// Mean of a non-empty point sequence
fn centroid(points: impl Iterator<Item = Point>) -> Point {
    let (mut sum_x, mut sum_y, mut n) = (0.0, 0.0, 0usize);
    for p in points {
        sum_x += p.x;
        sum_y += p.y;
        n += 1;
    }
    let n = n.max(1) as f64;
    Point::new(sum_x / n, sum_y / n)
}

/// Clustering statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringStats {
    pub num_clusters: usize,
    pub total_points: usize,
    pub clustered_points: usize,
    pub noise_points: usize,
    pub clustering_ratio: f64,
    pub avg_cluster_size: f64,
    pub max_cluster_size: usize,
    pub min_cluster_size: usize,
}

impl ClusteringStats {
    pub fn from_clusters(total_points: usize, clusters: &[Cluster]) -> Self {
        let sizes: Vec<usize> = clusters.iter().map(Cluster::len).collect();
        let clustered_points: usize = sizes.iter().sum();

        Self {
            num_clusters: clusters.len(),
            total_points,
            clustered_points,
            noise_points: total_points.saturating_sub(clustered_points),
            clustering_ratio: clustered_points as f64 / total_points.max(1) as f64,
            avg_cluster_size: if sizes.is_empty() {
                0.0
            } else {
                clustered_points as f64 / sizes.len() as f64
            },
            max_cluster_size: sizes.iter().copied().max().unwrap_or(0),
            min_cluster_size: sizes.iter().copied().min().unwrap_or(0),
        }
    }
}
