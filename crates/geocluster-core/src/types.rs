//! Core value types: points, bounds and clusters

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// A 2-D coordinate (x = longitude, y = latitude)
///
/// Points carry no identity of their own. Inside the engine a point is
/// identified by its index in the input slice, so two points with equal
/// coordinates are still distinct members.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance_to(&self, other: &Point) -> f64 {
        distance(self, other)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Euclidean distance between two points
///
/// Every neighbour test in the crate goes through this function, so the
/// `<= eps` threshold means the same thing for every index.
#[inline]
pub fn distance(a: &Point, b: &Point) -> f64 {
    let dy = b.y - a.y;
    let dx = b.x - a.x;
    (dy * dy + dx * dx).sqrt()
}

/// Reject input containing NaN or infinite coordinates
pub(crate) fn validate_points(points: &[Point]) -> Result<()> {
    match points.iter().position(|p| !p.is_finite()) {
        Some(index) => Err(ClusterError::NonFiniteCoordinate { index }),
        None => Ok(()),
    }
}

/// Axis-aligned bounds of a point set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// South-west corner
    pub min: Point,
    /// North-east corner
    pub max: Point,
}

impl BoundingBox {
    /// Bounds of `points`, or `None` when empty
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in &points[1..] {
            bounds.extend(p);
        }
        Some(bounds)
    }

    /// Grow the box to include `p`
    pub fn extend(&mut self, p: &Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// A finalized DBSCAN cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster ID (0-based, in emission order)
    pub id: usize,
    /// Member point indices, in expansion order, without duplicates
    pub members: Vec<usize>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Resolve member indices against the input they were computed from
    pub fn points<'a>(&'a self, points: &'a [Point]) -> impl Iterator<Item = Point> + 'a {
        self.members.iter().map(move |&i| points[i])
    }
}
