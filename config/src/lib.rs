use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use thiserror::Error;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric values
pub const PROXIMITY_THRESHOLD: u64 = 1_000_000; // 1Mb
pub const WINDOW_SIZE: i64 = 1_000_000; // 1Mb
pub const HALF_WINDOW: i64 = WINDOW_SIZE / 2;
pub const MIN_THREADS: usize = 1;

// vcf
pub const DEFAULT_AF_FIELD: &str = "AF";
pub const VCF_EXTENSIONS: [&str; 3] = [".vcf", ".vcf.gz", ".vcf.bgz"];
pub const GZ_EXTENSIONS: [&str; 2] = [".gz", ".bgz"];

// file names
pub const VARIANTS_WITH_INTERVALS: &str = "variants_with_intervals.csv";
pub const INTERVALS: &str = "intervals.csv";
pub const WINDOW_DESCRIPTOR: &str = "window_descriptor.json";

// headers
pub const VARIANTS_WITH_INTERVALS_HEADER: [&str; 5] = ["chr", "pos", "ref", "alt", "interval"];
pub const INTERVALS_HEADER: [&str; 1] = ["interval"];

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .expect("no template error");

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// write serializable rows as a CSV table
///
/// The header is always written, so an empty collection
/// still produces a valid (header-only) table.
pub fn write_table<T, P>(rows: &[T], header: &[&str], fname: P) -> Result<(), WriteError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    log::info!(
        "Rows in {}: {:?}. Writing...",
        fname.as_ref().display(),
        rows.len()
    );

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(fname.as_ref())?;

    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// write a run descriptor as pretty JSON
pub fn write_descriptor<T, P>(descriptor: &T, fname: P) -> Result<(), WriteError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let f = File::create(fname.as_ref())?;
    let mut writer = BufWriter::new(f);

    serde_json::to_writer_pretty(&mut writer, descriptor)?;
    writeln!(writer)?;
    writer.flush()?;

    log::info!("Descriptor written to: {}", fname.as_ref().display());
    Ok(())
}

/// error handling for output writers
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), CliError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), CliError> {
        self.check_vcfs()?;

        if self.get_af_field().trim().is_empty() {
            let err = "Allele frequency field cannot be empty".to_string();
            return Err(CliError::InvalidInput(err));
        }

        if self.get_threads() < MIN_THREADS {
            return Err(CliError::InvalidInput(format!(
                "Number of threads must be at least {}",
                MIN_THREADS
            )));
        }

        if self.get_af_field() != DEFAULT_AF_FIELD {
            log::warn!(
                "Using custom allele frequency field: {}",
                self.get_af_field()
            );
        }

        Ok(())
    }

    fn check_vcfs(&self) -> Result<(), CliError> {
        validate(self.get_rare())?;
        validate(self.get_unfiltered())?;

        Ok(())
    }

    fn get_rare(&self) -> &PathBuf;
    fn get_unfiltered(&self) -> &PathBuf;
    fn get_af_field(&self) -> &str;
    fn get_threads(&self) -> usize;
}

/// error handling for CLI
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// true if the path ends with any of the given suffixes
pub fn has_suffix<P: AsRef<Path>>(path: P, suffixes: &[&str]) -> bool {
    let name = path
        .as_ref()
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or_default();

    suffixes.iter().any(|suffix| name.ends_with(suffix))
}

/// argument validation
pub fn validate(arg: &PathBuf) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!("{:?} does not exist", arg)));
    }

    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!("{:?} is not a file", arg)));
    }

    if !has_suffix(arg, &VCF_EXTENSIONS) {
        return Err(CliError::InvalidInput(format!(
            "file {:?} is not a VCF file",
            arg
        )));
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => {
            Err(CliError::InvalidInput(format!("file {:?} is empty", arg)))
        }
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::IoError(e)),
    }
}
