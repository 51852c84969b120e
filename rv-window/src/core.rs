//! Core module for clustering rare variants and populating windows
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This module contains the main function for selecting windows around
//! rare variants and the three steps it chains together: cluster, window
//! and populate. Clusters and windows are independent from each other,
//! so every step fans out in parallel and collects results back in
//! cluster order.

pub mod cluster;
pub mod populate;
pub mod window;

use anyhow::{Context, Result};
use log::{info, warn};
use packvcf::{load_rare_variants, RareVariant, UnfilteredSource, VariantSource, VcfError};
use rayon::prelude::*;

use crate::cli::Args;
use crate::utils::{write_results, ParallelCounter, WindowDescriptor};
use cluster::{cluster_rare_variants, Cluster};
use config::WINDOW_SIZE;
use populate::{populate_intervals, Intervals};
use window::{select_window, Window};

/// Everything derived from one pipeline pass
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WindowSelection {
    pub clusters: Vec<Cluster>,
    pub windows: Vec<Window>,
    pub intervals: Intervals,
}

/// Selects windows around rare variants and populates them
///
/// # Arguments
///
/// * `args` - The command line arguments
///
/// # Returns
///
/// * `Result<WindowDescriptor>` - summary of the run
///
/// # Example
///
/// ```rust, ignore
/// let args = Args::from(vec!["-r".into(), "rare.vcf".into(), "-u".into(), "all.vcf".into()]);
/// let descriptor = select_windows(args).unwrap();
/// ```
pub fn select_windows(args: Args) -> Result<WindowDescriptor> {
    info!("Selecting windows around rare variants...");

    let rare = load_rare_variants(&args.rare, &args.af_field)
        .with_context(|| format!("Failed to load rare variants from {:?}", args.rare))?;

    let mut descriptor = WindowDescriptor {
        af_field: args.af_field.clone(),
        rare_variants: rare.len(),
        missing_annotation: rare.missing,
        malformed_records: rare.malformed,
        ..Default::default()
    };

    if rare.is_empty() {
        info!("No rare variants found with the specified AF field.");
        write_results(&Intervals::default(), &descriptor, &args.outdir)?;
        return Ok(descriptor);
    }

    let source = UnfilteredSource::open(&args.unfiltered)
        .with_context(|| format!("Failed to open unfiltered variants from {:?}", args.unfiltered))?;

    let counter = ParallelCounter::default();
    let selection = run_pipeline(rare.variants, &source, &counter)?;

    let (_, oversized) = counter.get_counters();
    descriptor.clusters = selection.clusters.len();
    descriptor.oversized_clusters = oversized as usize;
    descriptor.windows = selection.intervals.windows.len();
    descriptor.interval_variants = selection.intervals.variants.len();

    write_results(&selection.intervals, &descriptor, &args.outdir)?;
    info!(
        "Generated files: {} and {}",
        config::VARIANTS_WITH_INTERVALS,
        config::INTERVALS
    );

    Ok(descriptor)
}

/// Runs cluster -> window -> populate over loaded rare variants
///
/// # Arguments
///
/// * `rare` - rare variants carrying an allele frequency
/// * `source` - range-queryable unfiltered variants
/// * `counter` - shared counters for clusters and oversized clusters
///
/// # Returns
///
/// * `Result<WindowSelection, VcfError>` - clusters, their windows and the
///   populated output tables; all empty for empty input
///
/// # Example
///
/// ```rust, ignore
/// let counter = ParallelCounter::default();
/// let selection = run_pipeline(rare, &source, &counter).unwrap();
///
/// assert_eq!(selection.clusters.len(), selection.windows.len());
/// ```
pub fn run_pipeline<S: VariantSource + Sync + ?Sized>(
    rare: Vec<RareVariant>,
    source: &S,
    counter: &ParallelCounter,
) -> Result<WindowSelection, VcfError> {
    let clusters = cluster_rare_variants(rare);

    let windows = clusters
        .par_iter()
        .map(|cluster| {
            counter.inc_clusters();
            if cluster.span() as i64 > WINDOW_SIZE {
                counter.inc_oversized();
            }

            select_window(cluster)
        })
        .collect::<Vec<_>>();

    let (_, oversized) = counter.get_counters();
    if oversized > 0 {
        warn!("Clusters wider than a window: {}", oversized);
    }

    let intervals = populate_intervals(&windows, source)?;

    Ok(WindowSelection {
        clusters,
        windows,
        intervals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use packvcf::{parse_rare, VariantIndex, VariantRecord};

    const RARE: &str = "##fileformat=VCFv4.3
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
chr1\t1000000\t.\tA\tT\t.\tPASS\tAF=0.01
chr1\t1500000\t.\tG\tC\t.\tPASS\tAF=0.001
chr1\t3000000\t.\tT\tA\t.\tPASS\tAF=0.02
chr1\t4000000\t.\tC\tG\t.\tPASS\tDP=30
";

    fn record(chrom: &str, pos: u64) -> VariantRecord {
        VariantRecord {
            chrom: chrom.to_string(),
            pos,
            reference: "A".to_string(),
            alternate: "G".to_string(),
        }
    }

    fn unfiltered() -> VariantIndex {
        VariantIndex::from_records(vec![
            record("chr1", 999_999),
            record("chr1", 1_000_000),
            record("chr1", 2_000_000),
            record("chr1", 2_000_001),
            record("chr1", 2_500_000),
            record("chr1", 3_500_000),
            record("chr1", 4_000_000),
            record("chr2", 1_500_000),
        ])
    }

    #[test]
    fn test_run_pipeline_scenario() {
        let rare = parse_rare(RARE, "AF").unwrap();
        let counter = ParallelCounter::default();

        let selection = run_pipeline(rare.variants, &unfiltered(), &counter).unwrap();

        assert_eq!(selection.clusters.len(), 2);
        let ids = selection.windows.iter().map(|w| w.id()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["chr1:1000000-2000000", "chr1:2500000-3500000"]);

        let rows = selection
            .intervals
            .variants
            .iter()
            .map(|v| (v.pos, v.interval.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            vec![
                (1_000_000, "chr1:1000000-2000000"),
                (2_000_000, "chr1:1000000-2000000"),
                (2_500_000, "chr1:2500000-3500000"),
                (3_500_000, "chr1:2500000-3500000"),
            ]
        );

        assert_eq!(counter.get_counters(), (2, 0));
    }

    #[test]
    fn test_run_pipeline_missing_annotation_is_not_clustered() {
        // INFO: chr1:4000000 lacks AF -> its window would contain 4000000
        let rare = parse_rare(RARE, "AF").unwrap();
        let counter = ParallelCounter::default();

        let selection = run_pipeline(rare.variants, &unfiltered(), &counter).unwrap();

        assert!(selection
            .clusters
            .iter()
            .flat_map(|c| c.variants())
            .all(|v| v.record.pos != 4_000_000));
        assert!(selection
            .intervals
            .variants
            .iter()
            .all(|v| v.pos != 4_000_000));
    }

    #[test]
    fn test_run_pipeline_empty() {
        let counter = ParallelCounter::default();
        let selection = run_pipeline(vec![], &unfiltered(), &counter).unwrap();

        assert_eq!(selection, WindowSelection::default());
    }

    #[test]
    fn test_run_pipeline_is_idempotent() {
        let first = run_pipeline(
            parse_rare(RARE, "AF").unwrap().variants,
            &unfiltered(),
            &ParallelCounter::default(),
        )
        .unwrap();
        let second = run_pipeline(
            parse_rare(RARE, "AF").unwrap().variants,
            &unfiltered(),
            &ParallelCounter::default(),
        )
        .unwrap();

        assert_eq!(first.intervals, second.intervals);
    }

    #[test]
    fn test_every_row_inside_its_window() {
        let rare = parse_rare(RARE, "AF").unwrap();
        let selection =
            run_pipeline(rare.variants, &unfiltered(), &ParallelCounter::default()).unwrap();

        for row in &selection.intervals.variants {
            let window = selection
                .windows
                .iter()
                .find(|w| w.id() == row.interval)
                .unwrap();

            assert!(window.contains(row.pos));
            assert_eq!(window.chrom, row.chrom);
        }
    }
}
