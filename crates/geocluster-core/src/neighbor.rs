//! Radius neighbour queries
//!
//! Both backends answer the same question: which input indices lie within
//! `eps` of a given point. Results are always in ascending index order
//! (input order), self included, because that order decides cluster member
//! order downstream. Swapping the backend never changes clustering output.

use std::collections::HashMap;

use tracing::debug;

use crate::config::{ClusterParams, IndexStrategy};
use crate::error::{ClusterError, Result};
use crate::types::{distance, Point};

/// Radius neighbour search over a fixed point slice
pub trait NeighborQuery: Send + Sync {
    /// Indices `q` with `distance(points[target], points[q]) <= eps`, ascending
    fn neighbours(&self, target: usize, eps: f64) -> Vec<usize>;

    /// Number of indexed points
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Full scan, O(n) per query
#[derive(Debug, Clone, Copy)]
pub struct LinearScan<'a> {
    points: &'a [Point],
}

impl<'a> LinearScan<'a> {
    pub fn new(points: &'a [Point]) -> Self {
        Self { points }
    }
}

impl NeighborQuery for LinearScan<'_> {
    fn neighbours(&self, target: usize, eps: f64) -> Vec<usize> {
        let origin = &self.points[target];
        self.points
            .iter()
            .enumerate()
            .filter(|(_, candidate)| distance(origin, candidate) <= eps)
            .map(|(i, _)| i)
            .collect()
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}

type CellKey = (i64, i64);

/// Uniform grid of square cells
///
/// A query only scans the cells overlapping the `eps` box around the target.
/// With `cell_size == eps` that is a 3x3 block.
#[derive(Debug, Clone)]
pub struct GridIndex<'a> {
    points: &'a [Point],
    cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl<'a> GridIndex<'a> {
    /// Bucket every point into cells of side `cell_size`
    pub fn build(points: &'a [Point], cell_size: f64) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(ClusterError::invalid_parameter(
                "cell_size",
                format!("must be positive and finite, got {}", cell_size),
            ));
        }

        let mut cells: HashMap<CellKey, Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            cells
                .entry(Self::key(cell_size, p.x, p.y))
                .or_default()
                .push(i);
        }

        debug!(
            points = points.len(),
            cells = cells.len(),
            cell_size,
            "Built grid index"
        );

        Ok(Self {
            points,
            cell_size,
            cells,
        })
    }

    #[inline]
    fn key(cell_size: f64, x: f64, y: f64) -> CellKey {
        // `as` saturates, so far-away coordinates still land in a valid cell
        ((x / cell_size).floor() as i64, (y / cell_size).floor() as i64)
    }
}

impl NeighborQuery for GridIndex<'_> {
    fn neighbours(&self, target: usize, eps: f64) -> Vec<usize> {
        // Nothing is within a negative (or NaN) radius, not even the target
        if eps.is_nan() || eps < 0.0 {
            return Vec::new();
        }
        let origin = &self.points[target];
        // Widen the box slightly so a candidate accepted by the distance test
        // can never sit in a cell outside the scanned range.
        let reach = eps + eps.abs() * 1e-9 + f64::EPSILON;
        let (x0, y0) = Self::key(self.cell_size, origin.x - reach, origin.y - reach);
        let (x1, y1) = Self::key(self.cell_size, origin.x + reach, origin.y + reach);

        let span = (x1.saturating_sub(x0) as u128 + 1) * (y1.saturating_sub(y0) as u128 + 1);
        let mut hits: Vec<usize> = Vec::new();
        let mut collect = |bucket: &Vec<usize>| {
            hits.extend(
                bucket
                    .iter()
                    .copied()
                    .filter(|&i| distance(origin, &self.points[i]) <= eps),
            );
        };

        if span > self.cells.len() as u128 {
            // Radius much larger than the cells: walking the occupied cells is cheaper
            for (&(cx, cy), bucket) in &self.cells {
                if (x0..=x1).contains(&cx) && (y0..=y1).contains(&cy) {
                    collect(bucket);
                }
            }
        } else {
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    if let Some(bucket) = self.cells.get(&(cx, cy)) {
                        collect(bucket);
                    }
                }
            }
        }

        hits.sort_unstable();
        hits
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn name(&self) -> &'static str {
        "grid"
    }
}

/// Pick and build the backend requested by `params`
///
/// A grid needs a positive radius to size its cells; with `eps == 0` every
/// strategy resolves to the linear scan.
pub fn build_index<'a>(
    points: &'a [Point],
    params: &ClusterParams,
) -> Result<Box<dyn NeighborQuery + 'a>> {
    let use_grid = match params.index {
        IndexStrategy::Linear => false,
        IndexStrategy::Grid => params.eps > 0.0,
        IndexStrategy::Auto => params.eps > 0.0 && points.len() >= params.auto_grid_threshold,
    };

    if params.index == IndexStrategy::Grid && !use_grid {
        debug!("Grid index needs eps > 0, falling back to linear scan");
    }

    let index: Box<dyn NeighborQuery + 'a> = if use_grid {
        Box::new(GridIndex::build(points, params.eps)?)
    } else {
        Box::new(LinearScan::new(points))
    };

    debug!(
        backend = index.name(),
        strategy = %params.index,
        points = points.len(),
        "Selected neighbour index"
    );

    Ok(index)
}
