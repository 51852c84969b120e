use noodles::vcf::variant::record::AlternateBases;
use noodles::vcf::variant::record_buf::info::field::value::Array;
use noodles::vcf::variant::record_buf::info::field::Value;
use noodles::vcf::variant::RecordBuf;

/// shared accessors for anything anchored at a single genomic position
pub trait Locus {
    fn chrom(&self) -> &str;
    fn pos(&self) -> u64;
}

#[derive(Debug, PartialEq, Clone)]
pub struct VariantRecord {
    pub chrom: String,
    pub pos: u64,
    pub reference: String,
    pub alternate: String,
}

/// Variant carrying a population allele frequency annotation
///
/// `af` is `None` when the annotation is present but its first
/// per-allele value is missing (e.g. `AF=.,0.01`); such variants still
/// take part in clustering but are never picked as the rarest.
#[derive(Debug, PartialEq, Clone)]
pub struct RareVariant {
    pub record: VariantRecord,
    pub af: Option<f64>,
}

/// outcome of reading a rare variant record
#[derive(Debug, PartialEq, Clone)]
pub enum RareRead {
    Rare(RareVariant),
    MissingAnnotation,
}

impl VariantRecord {
    /// Builds a record from a parsed noodles VCF record
    ///
    /// # Arguments
    ///
    /// * `record` - a header-typed VCF record
    ///
    /// # Returns
    ///
    /// * `Result<VariantRecord, &'static str>` - the record; ALT alleles are
    ///   comma-joined and a missing ALT (`.`) yields an empty string
    ///
    /// # Example
    ///
    /// ```rust, ignore
    /// let record = VariantRecord::from_record_buf(&buf).unwrap();
    ///
    /// assert_eq!(record.alternate, "C,G");
    /// ```
    #[inline(always)]
    pub fn from_record_buf(record: &RecordBuf) -> Result<VariantRecord, &'static str> {
        let chrom = record.reference_sequence_name().to_string();
        if chrom.is_empty() {
            return Err("Cannot parse chrom");
        }

        let pos = record
            .variant_start()
            .map(|p| p.get() as u64)
            .ok_or("Position must be 1-based")?;

        // INFO: multi-allelic sites are kept as a single comma-joined record
        let alternate = record
            .alternate_bases()
            .iter()
            .map(|allele| match allele {
                Ok(allele) => allele.to_string(),
                Err(_) => ".".to_string(),
            })
            .collect::<Vec<_>>()
            .join(",");

        Ok(VariantRecord {
            chrom,
            pos,
            reference: record.reference_bases().to_string(),
            alternate,
        })
    }
}

impl Locus for VariantRecord {
    fn chrom(&self) -> &str {
        self.chrom.as_str()
    }

    fn pos(&self) -> u64 {
        self.pos
    }
}

impl RareVariant {
    /// Keeps a record only if it is annotated with `af_field`
    ///
    /// Multi-valued annotations (one value per ALT allele) are reduced
    /// to their first element. A record without the annotation (absent
    /// key, flag or bare `.`) is reported as `MissingAnnotation`. Values
    /// that are not numbers or fall outside [0, 1] are errors.
    ///
    /// # Example
    ///
    /// ```rust, ignore
    /// // chr1  10  .  A  T,G  .  PASS  DP=3;AF=0.1,0.2
    /// match RareVariant::from_record_buf(&buf, "AF").unwrap() {
    ///     RareRead::Rare(rare) => assert!(rare.af.is_some()),
    ///     RareRead::MissingAnnotation => unreachable!(),
    /// }
    /// ```
    pub fn from_record_buf(record: &RecordBuf, af_field: &str) -> Result<RareRead, &'static str> {
        let record_af = match record.info().as_ref().get(af_field) {
            Some(Some(value)) => first_allele_frequency(value)?,
            _ => return Ok(RareRead::MissingAnnotation),
        };

        let af = match record_af {
            FirstValue::Value(af) if (0.0..=1.0).contains(&af) => Some(af),
            FirstValue::Value(_) => return Err("Allele frequency outside [0, 1]"),
            FirstValue::Missing => None,
            FirstValue::Absent => return Ok(RareRead::MissingAnnotation),
        };

        let record = VariantRecord::from_record_buf(record)?;
        Ok(RareRead::Rare(RareVariant { record, af }))
    }
}

impl Locus for RareVariant {
    fn chrom(&self) -> &str {
        self.record.chrom.as_str()
    }

    fn pos(&self) -> u64 {
        self.record.pos
    }
}

/// first element of an INFO value
#[derive(Debug, PartialEq, Clone, Copy)]
enum FirstValue {
    Value(f64),
    /// array whose first element is `.`
    Missing,
    /// flag or character value
    Absent,
}

#[inline(always)]
fn parse_frequency(value: &str) -> Result<f64, &'static str> {
    match value.trim().parse::<f64>() {
        Ok(af) if af.is_finite() => Ok(af),
        _ => Err("Non-numeric allele frequency"),
    }
}

fn first_allele_frequency(value: &Value) -> Result<FirstValue, &'static str> {
    let first = match value {
        Value::Float(af) => FirstValue::Value(*af as f64),
        Value::Integer(af) => FirstValue::Value(*af as f64),
        Value::String(af) => match af.split(',').next().unwrap_or_default() {
            "." => FirstValue::Missing,
            af => FirstValue::Value(parse_frequency(af)?),
        },
        Value::Array(Array::Float(values)) => match values.first() {
            Some(Some(af)) => FirstValue::Value(*af as f64),
            Some(None) => FirstValue::Missing,
            None => FirstValue::Absent,
        },
        Value::Array(Array::Integer(values)) => match values.first() {
            Some(Some(af)) => FirstValue::Value(*af as f64),
            Some(None) => FirstValue::Missing,
            None => FirstValue::Absent,
        },
        Value::Array(Array::String(values)) => match values.first() {
            Some(Some(af)) => FirstValue::Value(parse_frequency(af)?),
            Some(None) => FirstValue::Missing,
            None => FirstValue::Absent,
        },
        Value::Flag | Value::Character(_) | Value::Array(Array::Character(_)) => FirstValue::Absent,
    };

    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use noodles::vcf;

    const HEADER: &str = "##fileformat=VCFv4.3
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">
##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP\">
##INFO=<ID=gnomAD_AF,Number=A,Type=Float,Description=\"gnomAD Allele Frequency\">
##INFO=<ID=RAW_AF,Number=1,Type=String,Description=\"Unparsed Allele Frequency\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
";

    fn record_buf(line: &str) -> RecordBuf {
        let contents = format!("{}{}\n", HEADER, line);
        let mut reader = vcf::io::Reader::new(contents.as_bytes());
        let header = reader.read_header().unwrap();

        let mut record = RecordBuf::default();
        reader.read_record_buf(&header, &mut record).unwrap();
        record
    }

    fn approx(af: Option<f64>, expected: f64) -> bool {
        af.map_or(false, |af| (af - expected).abs() < 1e-6)
    }

    #[test]
    fn test_variant_record_multiallelic() {
        let buf = record_buf("chr2\t1500\trs1\tA\tC,G\t50\tPASS\tDP=10");
        let record = VariantRecord::from_record_buf(&buf).unwrap();

        assert_eq!(record.chrom, "chr2");
        assert_eq!(record.pos, 1500);
        assert_eq!(record.reference, "A");
        assert_eq!(record.alternate, "C,G");
    }

    #[test]
    fn test_variant_record_missing_alt() {
        let buf = record_buf("chr2\t1500\t.\tA\t.\t.\t.\t.");
        let record = VariantRecord::from_record_buf(&buf).unwrap();

        assert_eq!(record.alternate, "");
    }

    #[test]
    fn test_rare_variant_first_af_value() {
        let buf = record_buf("chr1\t10\t.\tA\tT,G\t.\tPASS\tDP=3;AF=0.001,0.2");

        match RareVariant::from_record_buf(&buf, "AF").unwrap() {
            RareRead::Rare(rare) => {
                assert!(approx(rare.af, 0.001));
                assert_eq!(rare.record.alternate, "T,G");
            }
            RareRead::MissingAnnotation => panic!("AF should be present"),
        }
    }

    #[test]
    fn test_rare_variant_custom_field() {
        let buf = record_buf("chr1\t10\t.\tA\tT\t.\tPASS\tAF=0.5;gnomAD_AF=0.0001");

        match RareVariant::from_record_buf(&buf, "gnomAD_AF").unwrap() {
            RareRead::Rare(rare) => assert!(approx(rare.af, 0.0001)),
            RareRead::MissingAnnotation => panic!("gnomAD_AF should be present"),
        }
    }

    #[test]
    fn test_rare_variant_missing_first_allele_is_kept() {
        let buf = record_buf("chr1\t10\t.\tA\tT,G\t.\tPASS\tAF=.,0.001");

        match RareVariant::from_record_buf(&buf, "AF").unwrap() {
            RareRead::Rare(rare) => {
                assert_eq!(rare.af, None);
                assert_eq!(rare.record.pos, 10);
            }
            RareRead::MissingAnnotation => panic!("AF key is present"),
        }
    }

    #[test]
    fn test_rare_variant_missing_annotation() {
        let missing = [
            "chr1\t10\t.\tA\tT\t.\tPASS\tDP=3",
            "chr1\t10\t.\tA\tT\t.\tPASS\t.",
            "chr1\t10\t.\tA\tT\t.\tPASS\tDB",
        ];

        for line in missing {
            assert_eq!(
                RareVariant::from_record_buf(&record_buf(line), "AF").unwrap(),
                RareRead::MissingAnnotation,
                "{}",
                line
            );
        }
    }

    #[test]
    fn test_rare_variant_out_of_range_af() {
        for line in [
            "chr1\t10\t.\tA\tT\t.\tPASS\tAF=-0.5",
            "chr1\t10\t.\tA\tT\t.\tPASS\tAF=1.5",
        ] {
            assert!(RareVariant::from_record_buf(&record_buf(line), "AF").is_err());
        }

        let buf = record_buf("chr1\t10\t.\tA\tT\t.\tPASS\tAF=1");
        assert!(matches!(
            RareVariant::from_record_buf(&buf, "AF"),
            Ok(RareRead::Rare(_))
        ));
    }

    #[test]
    fn test_rare_variant_string_annotation() {
        let buf = record_buf("chr1\t10\t.\tA\tT\t.\tPASS\tRAW_AF=abc");
        assert!(RareVariant::from_record_buf(&buf, "RAW_AF").is_err());

        let buf = record_buf("chr1\t10\t.\tA\tT\t.\tPASS\tRAW_AF=0.25");
        match RareVariant::from_record_buf(&buf, "RAW_AF").unwrap() {
            RareRead::Rare(rare) => assert!(approx(rare.af, 0.25)),
            RareRead::MissingAnnotation => panic!("RAW_AF should be present"),
        }
    }
}
