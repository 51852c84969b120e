//! Core module for selecting genomic windows around rare variants
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This binary clusters the rare variants of a VCF, picks a 1Mb
//! window per cluster biased toward its rarest variant, and reports
//! every unfiltered variant inside those windows.

use clap::{self, Parser};
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use rv_window::{cli::Args, select_windows};

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: Args = Args::parse();
    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .unwrap_or_else(|e| {
            error!("Failed to initialize thread pool: {}", e);
            std::process::exit(1);
        });

    let descriptor = select_windows(args).unwrap_or_else(|e| {
        error!("{:#}", e);
        std::process::exit(1);
    });

    info!(
        "Windows: {}, variants in windows: {}",
        descriptor.windows, descriptor.interval_variants
    );

    let elapsed = start.elapsed();
    info!("Elapsed time: {:?}", elapsed);
}
