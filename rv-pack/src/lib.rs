//! VCF packing for raretools
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This module reads plain or gzip-compressed VCF files through noodles
//! and packs their records per chromosome. Rare variants are loaded
//! together with their allele frequency annotation. Unfiltered variants
//! are served by range: bgzipped files are queried per region through
//! their tabix/CSI index, while plain files are packed into a
//! position-sorted in-memory index.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use config::{get_progress_bar, has_suffix, GZ_EXTENSIONS};
use flate2::read::MultiGzDecoder;
use hashbrown::HashMap;
use log::{debug, info, warn};
use noodles::core::{region::Interval, Position, Region};
use noodles::vcf;
use noodles::vcf::variant::RecordBuf;
use rayon::prelude::*;
use thiserror::Error;

pub mod record;
pub use record::{Locus, RareRead, RareVariant, VariantRecord};

pub type VariantMap = HashMap<String, Vec<VariantRecord>>;

/// error handling for VCF sources
#[derive(Debug, Error)]
pub enum VcfError {
    #[error("Variant source unavailable: {path:?} ({source})")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed VCF: {0}")]
    Malformed(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// opens a plain or gzip-compressed VCF for sequential reading
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<vcf::io::Reader<Box<dyn BufRead>>, VcfError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| VcfError::SourceUnavailable {
        path: path.to_path_buf(),
        source: e,
    })?;

    // INFO: MultiGzDecoder reads both plain gzip and BGZF members
    let inner: Box<dyn BufRead> = if has_suffix(path, &GZ_EXTENSIONS) {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(vcf::io::Reader::new(inner))
}

/// Reads the header and every raw record of a VCF stream
///
/// Records are kept unparsed so their fields can be resolved against
/// the header in parallel.
pub fn read_records<R: BufRead>(
    reader: &mut vcf::io::Reader<R>,
) -> Result<(vcf::Header, Vec<vcf::Record>), VcfError> {
    let header = reader
        .read_header()
        .map_err(|e| VcfError::Malformed(format!("invalid header: {}", e)))?;

    let mut records = Vec::new();
    let mut record = vcf::Record::default();
    loop {
        match reader.read_record(&mut record) {
            Ok(0) => break,
            Ok(_) => records.push(record.clone()),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(VcfError::Malformed(format!(
                    "record #{}: {}",
                    records.len() + 1,
                    e
                )));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok((header, records))
}

#[inline(always)]
fn to_record_buf(header: &vcf::Header, record: &vcf::Record) -> Result<RecordBuf, String> {
    RecordBuf::try_from_variant_record(header, record).map_err(|e| e.to_string())
}

/// Rare variants loaded from a VCF source
///
/// # Fields
///
/// * `variants` - records carrying the allele frequency annotation, in input order
/// * `missing` - records skipped because the annotation was absent
/// * `malformed` - records that could not be parsed
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RareVariants {
    pub variants: Vec<RareVariant>,
    pub missing: usize,
    pub malformed: usize,
}

impl RareVariants {
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }
}

/// Loads rare variants annotated with `af_field` from a VCF file
///
/// # Arguments
///
/// * `path` - Path to a .vcf/.vcf.gz file
/// * `af_field` - INFO key holding the population allele frequency
///
/// # Returns
///
/// * `Result<RareVariants, VcfError>` - the annotated records plus skip counters
///
/// # Example
///
/// ```rust, ignore
/// let rare = load_rare_variants("rare.vcf.gz", "AF").unwrap();
///
/// if rare.is_empty() {
///     println!("Nothing to process");
/// }
/// ```
pub fn load_rare_variants<P: AsRef<Path>>(
    path: P,
    af_field: &str,
) -> Result<RareVariants, VcfError> {
    let mut reader = open_reader(path)?;
    rare_from_reader(&mut reader, af_field)
}

/// Parses rare variants from in-memory VCF contents
pub fn parse_rare(contents: &str, af_field: &str) -> Result<RareVariants, VcfError> {
    let mut reader = vcf::io::Reader::new(contents.as_bytes());
    rare_from_reader(&mut reader, af_field)
}

/// Records are resolved in parallel but the output keeps the input order.
fn rare_from_reader<R: BufRead>(
    reader: &mut vcf::io::Reader<R>,
    af_field: &str,
) -> Result<RareVariants, VcfError> {
    let (header, records) = read_records(reader)?;

    let pb = get_progress_bar(records.len() as u64, "Parsing rare variants");
    let missing = AtomicUsize::new(0);
    let malformed = AtomicUsize::new(0);

    let variants = records
        .par_iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            pb.inc(1);
            let read = to_record_buf(&header, record).and_then(|buf| {
                RareVariant::from_record_buf(&buf, af_field).map_err(String::from)
            });

            match read {
                Ok(RareRead::Rare(rare)) => Some(rare),
                Ok(RareRead::MissingAnnotation) => {
                    missing.fetch_add(1, Ordering::Relaxed);
                    None
                }
                Err(e) => {
                    warn!("{} from record #{}. Skipping...", e, idx + 1);
                    malformed.fetch_add(1, Ordering::Relaxed);
                    None
                }
            }
        })
        .collect::<Vec<_>>();

    pb.finish_and_clear();

    let missing = missing.load(Ordering::Relaxed);
    if missing > 0 {
        debug!("Skipped {} records without {} annotation", missing, af_field);
    }
    info!("Rare variants parsed: {}", variants.len());

    Ok(RareVariants {
        variants,
        missing,
        malformed: malformed.load(Ordering::Relaxed),
    })
}

/// Groups records by chromosome and sorts each group by position
///
/// Chromosomes keep the order of their first appearance in `records`
/// and the sort is stable, so records sharing a position stay in
/// input order.
pub fn bucketize<T: Locus + Send>(records: Vec<T>) -> Vec<(String, Vec<T>)> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<T>> = HashMap::new();

    for record in records {
        if !buckets.contains_key(record.chrom()) {
            order.push(record.chrom().to_string());
        }
        buckets
            .entry(record.chrom().to_string())
            .or_default()
            .push(record);
    }

    let mut tracks = order
        .into_iter()
        .map(|chr| {
            let bucket = buckets.remove(&chr).unwrap_or_default();
            (chr, bucket)
        })
        .collect::<Vec<_>>();

    tracks.par_iter_mut().for_each(|(_, v)| {
        v.sort_by_key(|record| record.pos());
    });

    tracks
}

/// range-queryable source of unfiltered variants
pub trait VariantSource {
    /// Returns every record on `chrom` with `start <= pos <= end`
    ///
    /// Implementations may return a slightly wider candidate range;
    /// callers apply their own exact filter.
    fn fetch(&self, chrom: &str, start: i64, end: i64) -> Result<Vec<VariantRecord>, VcfError>;
}

/// In-memory, position-sorted index of unfiltered variants
#[derive(Debug, Default, Clone)]
pub struct VariantIndex {
    tracks: VariantMap,
}

impl VariantIndex {
    /// Loads and indexes every record of a VCF file
    ///
    /// # Example
    ///
    /// ```rust, ignore
    /// let index = VariantIndex::from_path("unfiltered.vcf").unwrap();
    /// let hits = index.fetch("chr1", 1_000_000, 2_000_000).unwrap();
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, VcfError> {
        let mut reader = open_reader(&path)?;
        Self::from_reader(&mut reader).map_err(|e| match e {
            VcfError::Malformed(msg) => {
                VcfError::Malformed(format!("{}: {}", path.as_ref().display(), msg))
            }
            e => e,
        })
    }

    /// Indexes in-memory VCF contents, skipping malformed records
    pub fn parse(contents: &str) -> Result<Self, VcfError> {
        let mut reader = vcf::io::Reader::new(contents.as_bytes());
        Self::from_reader(&mut reader)
    }

    fn from_reader<R: BufRead>(reader: &mut vcf::io::Reader<R>) -> Result<Self, VcfError> {
        let (header, records) = read_records(reader)?;

        let pb = get_progress_bar(records.len() as u64, "Indexing variants");
        let mut tracks = records
            .par_iter()
            .filter_map(|record| {
                pb.inc(1);
                to_record_buf(&header, record)
                    .and_then(|buf| VariantRecord::from_record_buf(&buf).map_err(String::from))
                    .map_err(|e| warn!("{}. Skipping...", e))
                    .ok()
            })
            .fold(
                || HashMap::new(),
                |mut acc: VariantMap, record| {
                    acc.entry(record.chrom.clone()).or_default().push(record);
                    acc
                },
            )
            .reduce(
                || HashMap::new(),
                |mut acc, map| {
                    for (k, v) in map {
                        let acc_v = acc.entry(k).or_insert(Vec::new());
                        acc_v.extend(v);
                    }
                    acc
                },
            );

        // INFO: fold/reduce keeps relative order within a chromosome
        tracks.par_iter_mut().for_each(|(_, v)| {
            v.sort_by_key(|record| record.pos);
        });

        pb.finish_and_clear();

        let index = Self { tracks };
        if index.is_empty() && !records.is_empty() {
            return Err(VcfError::Malformed(
                "no valid records could be read".to_string(),
            ));
        }

        info!("Unfiltered variants indexed: {}", index.len());
        Ok(index)
    }

    pub fn from_records(records: Vec<VariantRecord>) -> Self {
        Self {
            tracks: bucketize(records).into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VariantSource for VariantIndex {
    fn fetch(&self, chrom: &str, start: i64, end: i64) -> Result<Vec<VariantRecord>, VcfError> {
        let Some(records) = self.tracks.get(chrom) else {
            return Ok(Vec::new());
        };

        if start > end {
            return Ok(Vec::new());
        }

        let lo = records.partition_point(|r| (r.pos as i64) < start);
        let hi = records.partition_point(|r| (r.pos as i64) <= end);

        Ok(records[lo..hi].to_vec())
    }
}

/// Bgzipped VCF queried by region through its tabix/CSI index
///
/// Each query opens its own reader, so queries can run concurrently.
#[derive(Debug, Clone)]
pub struct IndexedVcf {
    path: PathBuf,
}

impl IndexedVcf {
    /// Opens a bgzipped VCF together with its `.tbi`/`.csi` index
    ///
    /// A missing file or a missing index is `SourceUnavailable`.
    ///
    /// # Example
    ///
    /// ```rust, ignore
    /// let source = IndexedVcf::open("unfiltered.vcf.gz").unwrap();
    /// let hits = source.fetch("chr1", 1_000_000, 2_000_000).unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VcfError> {
        let source = Self {
            path: path.as_ref().to_path_buf(),
        };

        let mut reader = vcf::io::indexed_reader::Builder::default()
            .build_from_path(&source.path)
            .map_err(|e| source.unavailable(e))?;
        reader.read_header().map_err(|e| {
            VcfError::Malformed(format!("invalid header in {}: {}", source.path.display(), e))
        })?;

        Ok(source)
    }

    fn unavailable(&self, source: io::Error) -> VcfError {
        VcfError::SourceUnavailable {
            path: self.path.clone(),
            source,
        }
    }
}

impl VariantSource for IndexedVcf {
    fn fetch(&self, chrom: &str, start: i64, end: i64) -> Result<Vec<VariantRecord>, VcfError> {
        if start > end || end < 1 {
            return Ok(Vec::new());
        }

        let (Some(start), Some(end)) = (
            Position::new(start.max(1) as usize),
            Position::new(end as usize),
        ) else {
            return Ok(Vec::new());
        };

        // INFO: IndexedReader owns its stream -> re-read header per query
        let mut reader = vcf::io::indexed_reader::Builder::default()
            .build_from_path(&self.path)
            .map_err(|e| self.unavailable(e))?;
        let header = reader
            .read_header()
            .map_err(|e| VcfError::Malformed(format!("invalid header: {}", e)))?;

        let region = Region::new(chrom, Interval::from(start..=end));
        let query = match reader.query(&header, &region) {
            Ok(query) => query,
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {
                debug!("{} is not indexed in {}: {}", chrom, self.path.display(), e);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for result in query {
            let record = result?;
            let buf = to_record_buf(&header, &record).map_err(VcfError::Malformed)?;

            match VariantRecord::from_record_buf(&buf) {
                Ok(record) => records.push(record),
                Err(e) => warn!("{} in {}. Skipping...", e, region),
            }
        }

        Ok(records)
    }
}

/// Unfiltered variant source picked from the file type
///
/// `.gz`/`.bgz` files must be bgzipped and indexed; plain `.vcf` files
/// are loaded into memory.
#[derive(Debug, Clone)]
pub enum UnfilteredSource {
    Indexed(IndexedVcf),
    InMemory(VariantIndex),
}

impl UnfilteredSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VcfError> {
        let path = path.as_ref();

        if has_suffix(path, &GZ_EXTENSIONS) {
            info!("Querying {} through its index", path.display());
            Ok(Self::Indexed(IndexedVcf::open(path)?))
        } else {
            info!("Loading {} into memory", path.display());
            Ok(Self::InMemory(VariantIndex::from_path(path)?))
        }
    }
}

impl VariantSource for UnfilteredSource {
    fn fetch(&self, chrom: &str, start: i64, end: i64) -> Result<Vec<VariantRecord>, VcfError> {
        match self {
            Self::Indexed(source) => source.fetch(chrom, start, end),
            Self::InMemory(source) => source.fetch(chrom, start, end),
        }
    }
}
