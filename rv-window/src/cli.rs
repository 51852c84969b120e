use clap::Parser;
use config::{ArgCheck, DEFAULT_AF_FIELD};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Cluster rare variants and select 1Mb windows around them", long_about = None)]
pub struct Args {
    #[arg(
        short = 'r',
        long = "rare",
        required = true,
        value_name = "PATH",
        help = "Path to rare variants VCF [.vcf, .vcf.gz]"
    )]
    pub rare: PathBuf,

    #[arg(
        short = 'u',
        long = "unfiltered",
        required = true,
        value_name = "PATH",
        help = "Path to unfiltered variants VCF [.vcf, .vcf.gz]"
    )]
    pub unfiltered: PathBuf,

    #[arg(
        short = 'a',
        long = "af-field",
        value_name = "FIELD",
        help = "INFO field holding the population allele frequency",
        default_value = DEFAULT_AF_FIELD
    )]
    pub af_field: String,

    #[arg(
        short = 'o',
        long = "outdir",
        value_name = "PATH",
        help = "Output directory path",
        default_value = "."
    )]
    pub outdir: PathBuf,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,
}

impl Args {
    pub fn from(args: Vec<String>) -> Self {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::parse_from(full_args)
    }
}

impl ArgCheck for Args {
    fn get_rare(&self) -> &PathBuf {
        &self.rare
    }

    fn get_unfiltered(&self) -> &PathBuf {
        &self.unfiltered
    }

    fn get_af_field(&self) -> &str {
        &self.af_field
    }

    fn get_threads(&self) -> usize {
        self.threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::from(vec![
            "--rare".to_string(),
            "rare.vcf".to_string(),
            "-u".to_string(),
            "all.vcf.gz".to_string(),
        ]);

        assert_eq!(args.rare, PathBuf::from("rare.vcf"));
        assert_eq!(args.unfiltered, PathBuf::from("all.vcf.gz"));
        assert_eq!(args.af_field, "AF");
        assert_eq!(args.outdir, PathBuf::from("."));
        assert!(args.threads >= 1);
    }

    #[test]
    fn test_args_check_rejects_missing_inputs() {
        let args = Args::from(vec![
            "-r".to_string(),
            "does/not/exist.vcf".to_string(),
            "-u".to_string(),
            "does/not/exist.vcf".to_string(),
            "-a".to_string(),
            "gnomAD_AF".to_string(),
        ]);

        assert_eq!(args.af_field, "gnomAD_AF");
        assert!(args.check().is_err());
    }
}
