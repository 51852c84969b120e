use config::{HALF_WINDOW, WINDOW_SIZE};
use log::warn;
use packvcf::Locus;

use super::cluster::Cluster;

/// Fixed-size genomic window chosen for a cluster
///
/// `end - start` is always WINDOW_SIZE. Coordinates are signed because
/// a window centered near the start of a chromosome may begin at or
/// below zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Window {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
}

impl Window {
    pub fn new(chrom: &str, start: i64) -> Self {
        Self {
            chrom: chrom.to_string(),
            start,
            end: start + WINDOW_SIZE,
        }
    }

    /// identifier used as join key: "{chr}:{start}-{end}"
    pub fn id(&self) -> String {
        self.to_string()
    }

    /// inclusive on both ends
    #[inline(always)]
    pub fn contains(&self, pos: u64) -> bool {
        let pos = pos as i64;
        self.start <= pos && pos <= self.end
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

/// Computes the window start for a cluster
///
/// The window is centered on the rarest variant and then clamped to
/// `[max_pos - WINDOW_SIZE, min_pos]` so the whole cluster is covered.
/// When the cluster is wider than a window the bounds invert; the
/// lower bound (`max_pos - WINDOW_SIZE`) wins in that case.
///
/// # Arguments
///
/// * `min_pos` - lowest position in the cluster
/// * `max_pos` - highest position in the cluster
/// * `rarest_pos` - position of the rarest variant
///
/// # Returns
///
/// * `i64` - window start; the end is `start + WINDOW_SIZE`
///
/// # Example
///
/// ```rust, ignore
/// let start = place_window(1_000_000, 1_500_000, 1_500_000);
///
/// assert_eq!(start, 1_000_000);
/// ```
#[inline(always)]
pub fn place_window(min_pos: u64, max_pos: u64, rarest_pos: u64) -> i64 {
    let desired = rarest_pos as i64 - HALF_WINDOW;
    let low = max_pos as i64 - WINDOW_SIZE;
    let high = min_pos as i64;

    // WARN: not i64::clamp -> it panics when low > high
    low.max(high.min(desired))
}

/// Selects the window for a cluster
///
/// Oversized clusters (span > WINDOW_SIZE) cannot be fully covered;
/// they are reported and placed on a best-effort basis.
pub fn select_window(cluster: &Cluster) -> Window {
    let (min_pos, max_pos) = (cluster.min_pos(), cluster.max_pos());
    let span = max_pos - min_pos;

    if span as i64 > WINDOW_SIZE {
        warn!(
            "Cluster on {} spans {} bp > {} bp, but proceeding as is (may need splitting).",
            cluster.chrom(),
            span,
            WINDOW_SIZE
        );
    }

    let rarest = cluster.rarest();
    let start = place_window(min_pos, max_pos, rarest.pos());

    Window::new(cluster.chrom(), start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cluster::cluster_chromosome;
    use packvcf::{RareVariant, VariantRecord};

    fn rare(pos: u64, af: f64) -> RareVariant {
        RareVariant {
            record: VariantRecord {
                chrom: "chr1".to_string(),
                pos,
                reference: "A".to_string(),
                alternate: "T".to_string(),
            },
            af: Some(af),
        }
    }

    #[test]
    fn test_select_window_scenario() {
        let clusters = cluster_chromosome(vec![
            rare(1_000_000, 0.01),
            rare(1_500_000, 0.001),
            rare(3_000_000, 0.02),
        ]);

        let windows = clusters.iter().map(select_window).collect::<Vec<_>>();

        assert_eq!(windows[0].id(), "chr1:1000000-2000000");
        assert_eq!(windows[1].id(), "chr1:2500000-3500000");
    }

    #[test]
    fn test_window_covers_cluster() {
        let cases = [
            (100_000, 600_000, 100_000),
            (100_000, 600_000, 600_000),
            (2_000_000, 3_000_000, 2_500_000),
            (5_000_000, 5_000_000, 5_000_000),
            (1, 1_000_001, 1),
        ];

        for (min_pos, max_pos, rarest) in cases {
            let start = place_window(min_pos, max_pos, rarest);
            let end = start + WINDOW_SIZE;

            assert!(start <= min_pos as i64, "{:?}", (min_pos, max_pos, rarest));
            assert!(end >= max_pos as i64, "{:?}", (min_pos, max_pos, rarest));
        }
    }

    #[test]
    fn test_window_centered_when_possible() {
        // INFO: rarest in the middle of a narrow cluster -> exact centering
        assert_eq!(place_window(2_400_000, 2_600_000, 2_500_000), 2_000_000);
    }

    #[test]
    fn test_window_near_chromosome_start() {
        let start = place_window(1_000, 1_000, 1_000);

        assert_eq!(start, -499_000);
        assert_eq!(Window::new("chr1", start).id(), "chr1:-499000-501000");
    }

    #[test]
    fn test_oversized_cluster_prefers_lower_bound() {
        // INFO: span 1.5Mb -> low = 2.5M - 1M = 1.5M > high = 1.0M
        let start = place_window(1_000_000, 2_500_000, 1_200_000);
        assert_eq!(start, 1_500_000);

        let start = place_window(1_000_000, 2_500_000, 2_500_000);
        assert_eq!(start, 1_500_000);
    }

    #[test]
    fn test_window_size_is_fixed() {
        for start in [-10, 0, 1, 123_456_789] {
            let window = Window::new("chrX", start);
            assert_eq!(window.end - window.start, WINDOW_SIZE);
        }
    }

    #[test]
    fn test_window_contains_inclusive() {
        let window = Window::new("chr1", 1_000_000);

        assert!(window.contains(1_000_000));
        assert!(window.contains(2_000_000));
        assert!(!window.contains(999_999));
        assert!(!window.contains(2_000_001));
    }
}
