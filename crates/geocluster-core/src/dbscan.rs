//! DBSCAN cluster engine
//!
//! Seeds are visited in input order. A seed whose eps-neighbourhood holds at
//! least `min_pts` points (itself included) starts a cluster, which then grows
//! breadth-first: every member that is itself a core point pulls its own
//! neighbours in. A seed below the threshold is left as noise; it can still be
//! claimed later as a border point of a cluster that reaches it.
//!
//! Border points reachable from two clusters belong to whichever cluster
//! reached them first. Points are identified by input index throughout.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ClusterParams;
use crate::error::{ClusterError, Result};
use crate::neighbor::{build_index, NeighborQuery};
use crate::types::{validate_points, Cluster, Point};

/// Shared flag for aborting a run from another thread
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress callbacks for a clustering run
pub trait ClusterObserver {
    /// Called before seed `processed` is examined (`processed` of `total` done)
    fn on_seed(&mut self, _processed: usize, _total: usize) {}

    /// Called once per finalized cluster
    fn on_cluster(&mut self, _cluster: &Cluster) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ClusterObserver for NoopObserver {}

/// DBSCAN over a borrowed point slice
pub struct Dbscan<'a> {
    points: &'a [Point],
    params: ClusterParams,
    index: Box<dyn NeighborQuery + 'a>,
}

impl<'a> Dbscan<'a> {
    /// Validate input and parameters, then build the configured index
    pub fn new(points: &'a [Point], params: ClusterParams) -> Result<Self> {
        params.validate()?;
        validate_points(points)?;
        let index = build_index(points, &params)?;
        Ok(Self {
            points,
            params,
            index,
        })
    }

    /// Use a caller-supplied neighbour backend built over `points`
    pub fn with_index<Q>(points: &'a [Point], params: ClusterParams, index: Q) -> Result<Self>
    where
        Q: NeighborQuery + 'a,
    {
        params.validate()?;
        validate_points(points)?;
        if index.len() != points.len() {
            return Err(ClusterError::config(format!(
                "{} index covers {} points but {} were given",
                index.name(),
                index.len(),
                points.len()
            )));
        }
        Ok(Self {
            points,
            params,
            index: Box::new(index),
        })
    }

    /// Run DBSCAN to completion
    pub fn perform_clustering(&self) -> Vec<Cluster> {
        let mut state = RunState::new(self.points.len());
        for seed in 0..self.points.len() {
            self.visit_seed(seed, &mut state, &mut NoopObserver);
        }
        self.finish(state)
    }

    /// Run DBSCAN, checking `cancel` between seeds and reporting to `observer`
    pub fn perform_clustering_with(
        &self,
        cancel: &CancelToken,
        observer: &mut dyn ClusterObserver,
    ) -> Result<Vec<Cluster>> {
        let total = self.points.len();
        let mut state = RunState::new(total);
        for seed in 0..total {
            if cancel.is_cancelled() {
                debug!(processed = seed, total, "Clustering cancelled");
                return Err(ClusterError::Cancelled { processed: seed });
            }
            observer.on_seed(seed, total);
            self.visit_seed(seed, &mut state, observer);
        }
        observer.on_seed(total, total);
        Ok(self.finish(state))
    }

    /// Whether `index` is a core point under the current parameters
    pub fn is_core(&self, index: usize) -> bool {
        self.index.neighbours(index, self.params.eps).len() >= self.params.min_pts
    }

    fn visit_seed(&self, seed: usize, state: &mut RunState, observer: &mut dyn ClusterObserver) {
        if state.visited[seed] {
            return;
        }
        state.visited[seed] = true;

        let neighbours = self.index.neighbours(seed, self.params.eps);
        if neighbours.len() < self.params.min_pts {
            // Noise for now
            return;
        }

        let cluster = self.expand(neighbours, state);
        debug!(
            cluster = cluster.id,
            seed,
            size = cluster.len(),
            "Finalized cluster"
        );
        observer.on_cluster(&cluster);
        state.clusters.push(cluster);
    }

    /// Grow a cluster from a core point's neighbourhood until no member
    /// adds anything new.
    fn expand(&self, neighbours: Vec<usize>, state: &mut RunState) -> Cluster {
        let id = state.clusters.len();
        let mut members = Vec::with_capacity(neighbours.len());
        let mut worklist = VecDeque::with_capacity(neighbours.len());
        state.claim(id, &neighbours, &mut members, &mut worklist);

        while let Some(r) = worklist.pop_front() {
            if state.visited[r] {
                continue;
            }
            state.visited[r] = true;

            let reachable = self.index.neighbours(r, self.params.eps);
            if reachable.len() >= self.params.min_pts {
                state.claim(id, &reachable, &mut members, &mut worklist);
            }
        }

        Cluster { id, members }
    }

    fn finish(&self, state: RunState) -> Vec<Cluster> {
        let clustered: usize = state.clusters.iter().map(Cluster::len).sum();
        info!(
            points = self.points.len(),
            clusters = state.clusters.len(),
            noise = self.points.len() - clustered,
            eps = self.params.eps,
            min_pts = self.params.min_pts,
            backend = self.index.name(),
            "Clustering complete"
        );
        state.clusters
    }
}

/// Per-run bookkeeping, dropped when the run returns
struct RunState {
    visited: Vec<bool>,
    owner: Vec<Option<usize>>,
    clusters: Vec<Cluster>,
}

impl RunState {
    fn new(n: usize) -> Self {
        Self {
            visited: vec![false; n],
            owner: vec![None; n],
            clusters: Vec::new(),
        }
    }

    /// Append every candidate not yet owned by any cluster, keeping candidate order
    fn claim(
        &mut self,
        cluster: usize,
        candidates: &[usize],
        members: &mut Vec<usize>,
        worklist: &mut VecDeque<usize>,
    ) {
        for &q in candidates {
            if self.owner[q].is_none() {
                self.owner[q] = Some(cluster);
                members.push(q);
                worklist.push_back(q);
            }
        }
    }
}

/// One-shot convenience wrapper around [`Dbscan`]
pub fn cluster_points(points: &[Point], params: ClusterParams) -> Result<Vec<Cluster>> {
    Ok(Dbscan::new(points, params)?.perform_clustering())
}
