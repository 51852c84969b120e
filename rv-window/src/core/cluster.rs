//! Proximity clustering of rare variants
//!
//! Variants are swept in position order per chromosome. A variant joins
//! the open cluster while it lies within PROXIMITY_THRESHOLD of the
//! cluster anchor, the first variant admitted to it. The anchor never
//! moves, so chaining through nearby members cannot stretch a cluster.

use config::{get_progress_bar, PROXIMITY_THRESHOLD};
use log::info;
use packvcf::{bucketize, Locus, RareVariant};
use rayon::prelude::*;

/// Non-empty run of rare variants on a single chromosome
///
/// Members are sorted by position and every member lies within
/// PROXIMITY_THRESHOLD of the anchor (first member).
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    chrom: String,
    variants: Vec<RareVariant>,
}

impl Cluster {
    fn new(first: RareVariant) -> Self {
        Self {
            chrom: first.chrom().to_string(),
            variants: vec![first],
        }
    }

    #[inline(always)]
    fn admits(&self, variant: &RareVariant) -> bool {
        variant.pos() - self.anchor() <= PROXIMITY_THRESHOLD
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn variants(&self) -> &[RareVariant] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// position of the first-admitted member
    pub fn anchor(&self) -> u64 {
        self.variants[0].pos()
    }

    pub fn min_pos(&self) -> u64 {
        self.variants
            .iter()
            .map(|v| v.pos())
            .min()
            .unwrap_or_else(|| self.anchor())
    }

    pub fn max_pos(&self) -> u64 {
        self.variants
            .iter()
            .map(|v| v.pos())
            .max()
            .unwrap_or_else(|| self.anchor())
    }

    pub fn span(&self) -> u64 {
        self.max_pos() - self.min_pos()
    }

    /// Member with the lowest allele frequency
    ///
    /// Ties resolve to the first member in cluster (position) order.
    /// Members without a frequency value are passed over; if none has
    /// one, the first member is returned.
    pub fn rarest(&self) -> &RareVariant {
        self.variants
            .iter()
            .filter_map(|v| v.af.map(|af| (af, v)))
            .fold(None, |rarest: Option<(f64, &RareVariant)>, (af, v)| match rarest {
                Some((min, _)) if af >= min => rarest,
                _ => Some((af, v)),
            })
            .map_or(&self.variants[0], |(_, v)| v)
    }
}

/// Clusters rare variants of a single chromosome
///
/// # Arguments
///
/// * `variants` - rare variants sharing one chromosome, in any order
///
/// # Returns
///
/// * `Vec<Cluster>` - clusters in position order; empty for empty input
///
/// # Example
///
/// ```rust, ignore
/// let clusters = cluster_chromosome(variants);
///
/// for cluster in clusters {
///     assert!(cluster.max_pos() - cluster.anchor() <= 1_000_000);
/// }
/// ```
pub fn cluster_chromosome(mut variants: Vec<RareVariant>) -> Vec<Cluster> {
    // INFO: stable sort -> equal positions keep input order
    variants.sort_by_key(|v| v.pos());

    let mut clusters = Vec::new();
    let mut variants = variants.into_iter();

    let Some(first) = variants.next() else {
        return clusters;
    };

    let mut current = Cluster::new(first);
    for variant in variants {
        debug_assert_eq!(variant.chrom(), current.chrom());

        if current.admits(&variant) {
            current.variants.push(variant);
        } else {
            clusters.push(current);
            current = Cluster::new(variant);
        }
    }
    clusters.push(current);

    clusters
}

/// Clusters rare variants across all chromosomes
///
/// Chromosomes are processed in parallel; the output lists clusters
/// chromosome by chromosome, in order of first appearance in `rare`.
pub fn cluster_rare_variants(rare: Vec<RareVariant>) -> Vec<Cluster> {
    let tracks = bucketize(rare);
    let pb = get_progress_bar(tracks.len() as u64, "Clustering rare variants");

    let clusters = tracks
        .into_par_iter()
        .map(|(_, variants)| {
            let clusters = cluster_chromosome(variants);
            pb.inc(1);
            clusters
        })
        .flatten_iter()
        .collect::<Vec<_>>();

    pb.finish_and_clear();
    info!("Clusters found: {}", clusters.len());

    clusters
}
