use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use serde::Serialize;

use config::{
    write_descriptor, write_table, INTERVALS, INTERVALS_HEADER, VARIANTS_WITH_INTERVALS,
    VARIANTS_WITH_INTERVALS_HEADER, WINDOW_DESCRIPTOR,
};

use crate::core::populate::Intervals;

pub struct ParallelCounter {
    pub clusters: AtomicU32,
    pub oversized: AtomicU32,
}

impl ParallelCounter {
    fn new() -> Self {
        Self {
            clusters: AtomicU32::new(0),
            oversized: AtomicU32::new(0),
        }
    }

    pub fn inc_clusters(&self) {
        self.clusters.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_oversized(&self) {
        self.oversized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_counters(&self) -> (u32, u32) {
        (
            self.clusters.load(Ordering::Relaxed),
            self.oversized.load(Ordering::Relaxed),
        )
    }
}

impl Default for ParallelCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a window selection run
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct WindowDescriptor {
    pub af_field: String,
    pub rare_variants: usize,
    pub missing_annotation: usize,
    pub malformed_records: usize,
    pub clusters: usize,
    pub oversized_clusters: usize,
    pub windows: usize,
    pub interval_variants: usize,
}

/// writes both output tables and the run descriptor into `outdir`
pub fn write_results<P: AsRef<Path>>(
    intervals: &Intervals,
    descriptor: &WindowDescriptor,
    outdir: P,
) -> Result<()> {
    let outdir = outdir.as_ref();
    std::fs::create_dir_all(outdir)?;

    write_table(
        &intervals.variants,
        &VARIANTS_WITH_INTERVALS_HEADER,
        outdir.join(VARIANTS_WITH_INTERVALS),
    )?;
    write_table(
        &intervals.windows,
        &INTERVALS_HEADER,
        outdir.join(INTERVALS),
    )?;
    write_descriptor(descriptor, outdir.join(WINDOW_DESCRIPTOR))?;

    Ok(())
}
