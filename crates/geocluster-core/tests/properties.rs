//! Property tests for the clustering engine

use std::collections::HashSet;

use geocluster_core::{
    cluster_points, distance, summarize, ClusterParams, Dbscan, GridIndex, IndexStrategy,
    LinearScan, NeighborQuery, Point,
};
use proptest::prelude::*;

/// Points on a half-unit lattice: plenty of exact duplicates and exact-eps pairs
fn lattice_points() -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec((0i32..16, 0i32..16), 0..60).prop_map(|coords| {
        coords
            .into_iter()
            .map(|(x, y)| Point::new(x as f64 * 0.5, y as f64 * 0.5))
            .collect::<Vec<_>>()
    })
}

/// Pickup-like coordinates around midtown Manhattan
fn gps_points() -> impl Strategy<Value = Vec<Point>> {
    prop::collection::vec((-74.0f64..-73.99, 40.75f64..40.76), 0..120)
        .prop_map(|coords| coords.into_iter().map(Point::from).collect::<Vec<_>>())
}

fn params() -> impl Strategy<Value = ClusterParams> {
    (prop::sample::select(vec![0.0, 0.5, 0.75, 1.0, 1.5]), 1usize..6)
        .prop_map(|(eps, min_pts)| ClusterParams::new(eps, min_pts))
}

fn core_flags(points: &[Point], params: &ClusterParams) -> Vec<bool> {
    let scan = LinearScan::new(points);
    (0..points.len())
        .map(|i| scan.neighbours(i, params.eps).len() >= params.min_pts)
        .collect()
}

proptest! {
    #[test]
    fn prop_clusters_partition_points(points in lattice_points(), params in params()) {
        let clusters = cluster_points(&points, params).unwrap();

        let mut seen = HashSet::new();
        for cluster in &clusters {
            prop_assert!(!cluster.is_empty());
            for &m in &cluster.members {
                prop_assert!(m < points.len());
                prop_assert!(seen.insert(m), "point {} appears twice", m);
            }
        }
    }

    #[test]
    fn prop_members_are_density_reachable(points in lattice_points(), params in params()) {
        let clusters = cluster_points(&points, params.clone()).unwrap();
        let core = core_flags(&points, &params);

        for cluster in &clusters {
            let cores: Vec<usize> = cluster.members.iter().copied().filter(|&m| core[m]).collect();
            prop_assert!(!cores.is_empty(), "cluster {} has no core point", cluster.id);

            for &m in &cluster.members {
                let near_core = cores
                    .iter()
                    .any(|&c| distance(&points[m], &points[c]) <= params.eps);
                prop_assert!(near_core, "point {} is not within eps of a core member", m);
            }
        }
    }

    #[test]
    fn prop_noise_has_no_core_neighbour(points in lattice_points(), params in params()) {
        let clusters = cluster_points(&points, params.clone()).unwrap();
        let core = core_flags(&points, &params);
        let clustered: HashSet<usize> = clusters.iter().flat_map(|c| c.members.iter().copied()).collect();
        let scan = LinearScan::new(&points);

        for i in (0..points.len()).filter(|i| !clustered.contains(i)) {
            prop_assert!(!core[i]);
            prop_assert!(scan.neighbours(i, params.eps).iter().all(|&q| !core[q]));
        }
    }

    #[test]
    fn prop_deterministic(points in lattice_points(), params in params()) {
        let engine = Dbscan::new(&points, params).unwrap();
        prop_assert_eq!(engine.perform_clustering(), engine.perform_clustering());
    }

    #[test]
    fn prop_min_pts_one_covers_everything(points in lattice_points(), eps in 0.0f64..2.0) {
        let clusters = cluster_points(&points, ClusterParams::new(eps, 1)).unwrap();
        let total: usize = clusters.iter().map(|c| c.len()).sum();
        prop_assert_eq!(total, points.len());
    }

    #[test]
    fn prop_grid_matches_linear_lattice(points in lattice_points(), params in params()) {
        let linear = cluster_points(&points, params.clone().with_index(IndexStrategy::Linear)).unwrap();
        let grid = cluster_points(&points, params.with_index(IndexStrategy::Grid)).unwrap();
        prop_assert_eq!(linear, grid);
    }

    #[test]
    fn prop_grid_queries_match_linear_gps(
        points in gps_points(),
        eps in 0.0001f64..0.002,
        cell_scale in prop::sample::select(vec![0.5, 1.0, 2.0]),
    ) {
        let scan = LinearScan::new(&points);
        let grid = GridIndex::build(&points, eps * cell_scale).unwrap();
        for target in 0..points.len() {
            prop_assert_eq!(grid.neighbours(target, eps), scan.neighbours(target, eps));
        }
    }

    #[test]
    fn prop_summaries_sorted_by_size(points in lattice_points(), params in params()) {
        let clusters = cluster_points(&points, params).unwrap();
        let summaries = summarize(&points, &clusters);

        prop_assert_eq!(summaries.len(), clusters.len());
        for pair in summaries.windows(2) {
            prop_assert!(pair[0].size >= pair[1].size);
            if pair[0].size == pair[1].size {
                prop_assert!(pair[0].cluster_id < pair[1].cluster_id);
            }
        }
    }
}

#[test]
fn test_two_tight_groups_summarized_in_emission_order() {
    let mut points = Vec::new();
    for i in 0..5 {
        points.push(Point::new(-73.9851 + i as f64 * 0.0001, 40.7589));
    }
    for i in 0..5 {
        points.push(Point::new(-73.7781 + i as f64 * 0.0001, 40.6413));
    }

    let clusters = cluster_points(&points, ClusterParams::new(0.00015, 3)).unwrap();
    assert_eq!(clusters.len(), 2);
    assert!(clusters.iter().all(|c| c.len() == 5));

    let summaries = summarize(&points, &clusters);
    assert_eq!(summaries[0].cluster_id, 0);
    assert_eq!(summaries[1].cluster_id, 1);
    assert!((summaries[0].centroid.x - (-73.9849)).abs() < 1e-9);
    assert!((summaries[1].centroid.y - 40.6413).abs() < 1e-9);
}
