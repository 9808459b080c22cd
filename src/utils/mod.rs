//! Utility functions and types

pub mod data_loader;
pub mod logging;
pub mod persistence;

pub use data_loader::{column_names, column_values, columns_to_array2, split_features_target, DataLoader, DataSaver};
pub use persistence::{load_array, load_object, read_yaml, save_array, save_object, write_yaml};

use std::time::{Duration, Instant};

/// Simple timer for stage durations
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}
