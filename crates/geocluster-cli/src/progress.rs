//! Terminal progress for a clustering run

use geocluster_core::{Cluster, ClusterObserver};
use indicatif::{ProgressBar, ProgressStyle};

/// Drives an indicatif bar from engine callbacks
pub struct ProgressObserver {
    bar: ProgressBar,
    clusters: usize,
    /// Redraw every `stride` seeds
    stride: usize,
}

impl ProgressObserver {
    pub fn new(total: usize, label: &str) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(label.to_string());
        Self {
            bar,
            clusters: 0,
            stride: (total / 200).max(1),
        }
    }

    /// Hidden bar, for `--quiet` and non-terminal runs
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            clusters: 0,
            stride: usize::MAX,
        }
    }

    pub fn clusters(&self) -> usize {
        self.clusters
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ClusterObserver for ProgressObserver {
    fn on_seed(&mut self, processed: usize, total: usize) {
        if processed % self.stride == 0 || processed == total {
            self.bar.set_position(processed as u64);
        }
    }

    fn on_cluster(&mut self, _cluster: &Cluster) {
        self.clusters += 1;
        self.bar.set_message(format!("{} clusters", self.clusters));
    }
}
