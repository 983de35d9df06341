//! Parallel execution of independent clustering runs
//!
//! Each job is one complete, single-threaded DBSCAN run over its own points.
//! Jobs share nothing but an optional cancel token, so they fan out over the
//! rayon pool without coordination.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info_span, warn};

use crate::config::ClusterParams;
use crate::dbscan::{CancelToken, ClusterObserver, Dbscan, NoopObserver};
use crate::error::Result;
use crate::summary::{summarize, ClusterSummary, ClusteringStats};
use crate::types::{Cluster, Point};

/// Input for one run
#[derive(Debug, Clone)]
pub struct ClusterJob {
    /// Label used in logs and reports (typically the source file)
    pub name: String,
    pub points: Vec<Point>,
    pub params: ClusterParams,
}

/// Everything one run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterOutcome {
    pub name: String,
    pub clusters: Vec<Cluster>,
    /// Summaries sorted by descending size
    pub summaries: Vec<ClusterSummary>,
    pub stats: ClusteringStats,
}

impl ClusterJob {
    pub fn new(name: impl Into<String>, points: Vec<Point>, params: ClusterParams) -> Self {
        Self {
            name: name.into(),
            points,
            params,
        }
    }

    /// Run this job on the current thread
    pub fn run(&self, cancel: &CancelToken) -> Result<ClusterOutcome> {
        self.run_with(cancel, &mut NoopObserver)
    }

    /// Run this job on the current thread, reporting progress to `observer`
    pub fn run_with(
        &self,
        cancel: &CancelToken,
        observer: &mut dyn ClusterObserver,
    ) -> Result<ClusterOutcome> {
        let _span = info_span!("cluster_job", name = %self.name).entered();

        let engine = Dbscan::new(&self.points, self.params.clone())?;
        let clusters = engine.perform_clustering_with(cancel, observer)?;
        let summaries = summarize(&self.points, &clusters);
        let stats = ClusteringStats::from_clusters(self.points.len(), &clusters);

        Ok(ClusterOutcome {
            name: self.name.clone(),
            clusters,
            summaries,
            stats,
        })
    }
}

/// Run every job in parallel; results come back in job order
pub fn cluster_batch(jobs: &[ClusterJob], cancel: &CancelToken) -> Vec<Result<ClusterOutcome>> {
    jobs.par_iter()
        .map(|job| {
            let outcome = job.run(cancel);
            if let Err(err) = &outcome {
                warn!(job = %job.name, error = %err, "Clustering job failed");
            }
            outcome
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;

    fn blob(cx: f64, cy: f64, n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| Point::new(cx + (i % 3) as f64 * 0.1, cy + (i / 3) as f64 * 0.1))
            .collect()
    }

    #[test]
    fn test_batch_preserves_job_order() {
        let mut two = blob(0.0, 0.0, 6);
        two.extend(blob(50.0, 50.0, 9));

        let jobs = vec![
            ClusterJob::new("one", blob(0.0, 0.0, 6), ClusterParams::new(0.15, 3)),
            ClusterJob::new("two", two, ClusterParams::new(0.15, 3)),
            ClusterJob::new("empty", vec![], ClusterParams::new(0.15, 3)),
        ];

        let results = cluster_batch(&jobs, &CancelToken::new());
        assert_eq!(results.len(), 3);

        let one = results[0].as_ref().unwrap();
        assert_eq!(one.name, "one");
        assert_eq!(one.stats.num_clusters, 1);
        assert_eq!(one.summaries[0].size, 6);

        let two = results[1].as_ref().unwrap();
        assert_eq!(two.stats.num_clusters, 2);
        assert_eq!(two.summaries[0].size, 9);
        assert_eq!(two.summaries[0].cluster_id, 1);

        let empty = results[2].as_ref().unwrap();
        assert!(empty.clusters.is_empty());
    }

    #[test]
    fn test_batch_reports_failures_per_job() {
        let jobs = vec![
            ClusterJob::new("ok", blob(0.0, 0.0, 6), ClusterParams::new(0.15, 3)),
            ClusterJob::new("bad", blob(0.0, 0.0, 6), ClusterParams::new(-1.0, 3)),
        ];

        let results = cluster_batch(&jobs, &CancelToken::new());
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ClusterError::InvalidParameter { name: "eps", .. })
        ));
    }

    #[test]
    fn test_cancelled_batch() {
        let token = CancelToken::new();
        token.cancel();

        let jobs = vec![ClusterJob::new(
            "cancelled",
            blob(0.0, 0.0, 6),
            ClusterParams::new(0.15, 3),
        )];
        let results = cluster_batch(&jobs, &token);
        assert!(results[0].as_ref().unwrap_err().is_cancelled());
    }
}
