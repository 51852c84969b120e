//! Core module for selecting genomic windows around rare variants
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This module contains the main function for clustering rare variants
//! and selecting one fixed-size window per cluster.
//!
//! In short, rare variants (annotated with a population allele frequency)
//! are grouped per chromosome whenever they fall within 1Mb of the first
//! variant of their group. Each group gets a single 1Mb window, centered
//! on its rarest variant as long as the whole group stays covered. Every
//! unfiltered variant inside a window is then reported together with the
//! window it belongs to, ready for per-variant effect prediction.

pub mod cli;
pub mod core;
pub mod utils;

pub use crate::core::{
    cluster::{cluster_chromosome, cluster_rare_variants, Cluster},
    populate::{populate_intervals, populate_window, IntervalVariant, Intervals, WindowRow},
    run_pipeline, select_windows,
    window::{place_window, select_window, Window},
    WindowSelection,
};
pub use utils::{ParallelCounter, WindowDescriptor};

pub fn lib_rv_window(args: Vec<String>) -> anyhow::Result<WindowDescriptor> {
    let args = cli::Args::from(args);
    select_windows(args)
}
