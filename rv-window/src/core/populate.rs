use hashbrown::HashSet;
use log::info;
use packvcf::{VariantRecord, VariantSource, VcfError};
use rayon::prelude::*;
use serde::Serialize;

use super::window::Window;
use config::get_progress_bar;

/// Unfiltered variant tagged with the window it falls in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalVariant {
    #[serde(rename = "chr")]
    pub chrom: String,
    pub pos: u64,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "alt")]
    pub alternate: String,
    pub interval: String,
}

impl IntervalVariant {
    pub fn new(record: &VariantRecord, interval: &str) -> Self {
        Self {
            chrom: record.chrom.clone(),
            pos: record.pos,
            reference: record.reference.clone(),
            alternate: record.alternate.clone(),
            interval: interval.to_string(),
        }
    }
}

/// Row of the distinct windows table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WindowRow {
    pub interval: String,
}

/// Both output tables of a population pass
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Intervals {
    pub variants: Vec<IntervalVariant>,
    pub windows: Vec<WindowRow>,
}

/// Emits every unfiltered variant inside a window
///
/// The source is queried one position wider on each side; the exact
/// inclusive `[start, end]` filter is applied here.
pub fn populate_window<S: VariantSource + ?Sized>(
    window: &Window,
    source: &S,
) -> Result<Vec<IntervalVariant>, VcfError> {
    let id = window.id();
    let candidates = source.fetch(&window.chrom, window.start - 1, window.end + 1)?;

    Ok(candidates
        .iter()
        .filter(|record| record.chrom == window.chrom && window.contains(record.pos))
        .map(|record| IntervalVariant::new(record, &id))
        .collect())
}

/// Populates all windows against an unfiltered variant source
///
/// # Arguments
///
/// * `windows` - one window per cluster, in cluster order
/// * `source` - range-queryable unfiltered variants
///
/// # Returns
///
/// * `Result<Intervals, VcfError>` - variants tagged with their window and
///   the distinct window ids, both in cluster order
///
/// # Example
///
/// ```rust, ignore
/// let index = VariantIndex::from_path("unfiltered.vcf").unwrap();
/// let intervals = populate_intervals(&windows, &index).unwrap();
///
/// assert!(intervals.windows.len() <= windows.len());
/// ```
pub fn populate_intervals<S: VariantSource + Sync + ?Sized>(
    windows: &[Window],
    source: &S,
) -> Result<Intervals, VcfError> {
    // INFO: identical windows are populated once
    let mut seen = HashSet::new();
    let distinct = windows
        .iter()
        .filter(|window| seen.insert(window.id()))
        .collect::<Vec<_>>();

    let pb = get_progress_bar(distinct.len() as u64, "Populating windows");
    let variants = distinct
        .par_iter()
        .map(|window| {
            let rows = populate_window(*window, source);
            pb.inc(1);
            rows
        })
        .collect::<Result<Vec<_>, VcfError>>()?
        .concat();

    pb.finish_and_clear();
    info!(
        "Variants across {} windows: {}",
        distinct.len(),
        variants.len()
    );

    let windows = distinct
        .into_iter()
        .map(|window| WindowRow {
            interval: window.id(),
        })
        .collect();

    Ok(Intervals { variants, windows })
}
