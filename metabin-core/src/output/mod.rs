//! Output formatting for binning results.
//!
//! ## Supported Formats
//!
//! - **TSV**: one row per contig with its bin label and the bin's
//!   completeness and purity (blank for unclustered contigs)
//! - **JSON**: the full [`BinningResults`], including bins and pass traces
//!
//! ## Examples
//!
//! ```rust,no_run
//! use metabin_core::config::OutputFormat;
//! use metabin_core::engine::Binner;
//! use metabin_core::io::{read_contig_table, read_marker_table};
//! use metabin_core::output::write_results;
//! use metabin_core::types::Domain;
//! use std::fs::File;
//!
//! let table = read_contig_table("embedding.tsv")?;
//! let markers = read_marker_table("markers.tsv", Domain::Bacteria)?;
//! let results = Binner::new().bin(&table, &markers)?;
//!
//! let mut output = File::create("binning.tsv")?;
//! write_results(&mut output, &results, OutputFormat::Tsv)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::Write;

use crate::benchmark::BenchmarkReport;
use crate::config::OutputFormat;
use crate::results::BinningResults;
use crate::summary::BinSummary;
use crate::types::MetabinError;

mod formats {
    pub mod json;
    pub mod tsv;
}

use formats::{
    json::write_json,
    tsv::{write_benchmark_tsv, write_summary_tsv, write_tsv},
};

/// Writes binning results in the specified format.
///
/// # Errors
///
/// Returns [`MetabinError::IoError`] if writing fails.
pub fn write_results<W: Write>(
    writer: &mut W,
    results: &BinningResults,
    format: OutputFormat,
) -> Result<(), MetabinError> {
    match format {
        OutputFormat::Tsv => write_tsv(writer, results),
        OutputFormat::Json => write_json(writer, results),
    }
}

/// Writes per-bin summaries in the specified format.
///
/// # Errors
///
/// Returns [`MetabinError::IoError`] if writing fails.
pub fn write_bin_summary<W: Write>(
    writer: &mut W,
    summaries: &[BinSummary],
    format: OutputFormat,
) -> Result<(), MetabinError> {
    match format {
        OutputFormat::Tsv => write_summary_tsv(writer, summaries),
        OutputFormat::Json => write_json(writer, &summaries),
    }
}

/// Writes one row of clustering metrics per prediction table.
///
/// # Errors
///
/// Returns [`MetabinError::IoError`] if writing fails.
pub fn write_benchmark<W: Write>(
    writer: &mut W,
    reports: &[BenchmarkReport],
    format: OutputFormat,
) -> Result<(), MetabinError> {
    match format {
        OutputFormat::Tsv => write_benchmark_tsv(writer, reports),
        OutputFormat::Json => write_json(writer, reports),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{BinLabel, BinRecord, ContigAssignment};
    use crate::types::{Domain, Quality, ScanParameter};

    fn create_test_results() -> BinningResults {
        BinningResults {
            domain: Domain::Bacteria,
            method: "density-eps-scan".to_string(),
            assignments: vec![
                ContigAssignment {
                    contig: "k141_1".to_string(),
                    label: BinLabel::numbered(1),
                },
                ContigAssignment {
                    contig: "k141_2".to_string(),
                    label: BinLabel::Unclustered,
                },
            ],
            bins: vec![BinRecord {
                name: "bin_0001".to_string(),
                contigs: vec!["k141_1".to_string()],
                quality: Quality::new(25.5, 100.0),
                parameter: ScanParameter::Eps(0.8),
                rank: None,
                taxon: None,
            }],
            passes: Vec::new(),
        }
    }

    #[test]
    fn test_write_results_tsv_format() {
        let mut buffer = Vec::new();
        write_results(&mut buffer, &create_test_results(), OutputFormat::Tsv).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(
            output,
            "contig\tcluster\tcompleteness\tpurity\n\
             k141_1\tbin_0001\t25.5000\t100.0000\n\
             k141_2\tunclustered\t\t\n"
        );
    }

    #[test]
    fn test_write_results_json_format() {
        let mut buffer = Vec::new();
        write_results(&mut buffer, &create_test_results(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["domain"], "bacteria");
        assert_eq!(value["assignments"][1]["cluster"], "unclustered");
        assert_eq!(value["bins"][0]["parameter"]["kind"], "eps");
        assert_eq!(value["bins"][0]["quality"]["completeness"], 25.5);
    }

    #[test]
    fn test_write_bin_summary_formats() {
        let summaries = vec![BinSummary {
            bin: "bin_0001".to_string(),
            n_contigs: 2,
            total_length: 4000,
            n50: 3000,
            coverage: 15.0,
            gc_content: None,
            completeness: 40.0,
            purity: 95.0,
        }];

        let mut buffer = Vec::new();
        write_bin_summary(&mut buffer, &summaries, OutputFormat::Tsv).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let mut lines = output.lines();
        assert_eq!(
            lines.next(),
            Some("cluster\tn_contigs\ttotal_length\tn50\tcoverage\tgc_content\tcompleteness\tpurity")
        );
        assert_eq!(
            lines.next(),
            Some("bin_0001\t2\t4000\t3000\t15.0000\t\t40.0000\t95.0000")
        );

        let mut buffer = Vec::new();
        write_bin_summary(&mut buffer, &summaries, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value[0]["n50"], 3000);
        assert!(value[0]["gc_content"].is_null());
    }

    #[test]
    fn test_write_benchmark_formats() {
        let reports = vec![BenchmarkReport {
            predictions: "binning.tsv".to_string(),
            metrics: crate::benchmark::clustering_metrics(&[0, 0, 1, 1], &[0, 0, 1, 1]).unwrap(),
        }];

        let mut buffer = Vec::new();
        write_benchmark(&mut buffer, &reports, OutputFormat::Tsv).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("predictions\tadjusted_mutual_info"));
        assert!(lines[1].starts_with("binning.tsv\t1.0000"));

        let mut buffer = Vec::new();
        write_benchmark(&mut buffer, &reports, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value[0]["predictions"], "binning.tsv");
        assert_eq!(value[0]["adjusted_rand"], 1.0);
    }

    #[test]
    fn test_write_results_no_contigs() {
        let results = BinningResults {
            assignments: Vec::new(),
            bins: Vec::new(),
            ..create_test_results()
        };
        let mut buffer = Vec::new();
        write_results(&mut buffer, &results, OutputFormat::Tsv).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "contig\tcluster\tcompleteness\tpurity\n"
        );
    }
}
