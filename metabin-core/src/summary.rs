//! Per-bin assembly statistics.

use serde::Serialize;

use crate::io::Assembly;
use crate::results::BinningResults;
use crate::table::ContigTable;

/// Size, contiguity and composition of one bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinSummary {
    pub bin: String,
    pub n_contigs: usize,
    /// Summed contig length in base pairs
    pub total_length: u64,
    pub n50: u64,
    /// Length-weighted mean coverage
    pub coverage: f64,
    /// Length-weighted GC fraction; present when an assembly was supplied
    pub gc_content: Option<f64>,
    pub completeness: f64,
    pub purity: f64,
}

/// Smallest length `L` such that contigs of length `>= L` hold at least half
/// of the total length. Zero for an empty or zero-length set.
#[must_use]
pub fn n50(lengths: &[u64]) -> u64 {
    let total: u64 = lengths.iter().sum();
    if total == 0 {
        return 0;
    }
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let mut running = 0;
    for length in sorted {
        running += length;
        if running * 2 >= total {
            return length;
        }
    }
    0
}

/// Weighted mean; falls back to the plain mean when all weights are zero.
fn weighted_mean(values: &[(f64, u64)]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total: u64 = values.iter().map(|(_, weight)| weight).sum();
    if total == 0 {
        return values.iter().map(|(value, _)| value).sum::<f64>() / values.len() as f64;
    }
    values
        .iter()
        .map(|(value, weight)| value * *weight as f64)
        .sum::<f64>()
        / total as f64
}

/// Summarizes every bin of `results`, in bin order.
///
/// Contig lengths come from the table; contigs absent from `assembly` are left
/// out of the GC average.
#[must_use]
pub fn summarize(
    results: &BinningResults,
    table: &ContigTable,
    assembly: Option<&Assembly>,
) -> Vec<BinSummary> {
    results
        .bins
        .iter()
        .map(|bin| {
            let records: Vec<_> = bin
                .contigs
                .iter()
                .filter_map(|contig| table.get(contig))
                .collect();
            let lengths: Vec<u64> = records.iter().map(|record| record.length).collect();
            let coverage: Vec<(f64, u64)> = records
                .iter()
                .map(|record| (record.coverage, record.length))
                .collect();
            let gc_content = assembly.map(|assembly| {
                let gc: Vec<(f64, u64)> = bin
                    .contigs
                    .iter()
                    .filter_map(|contig| assembly.get(contig))
                    .map(|stats| (stats.gc_content, stats.length))
                    .collect();
                weighted_mean(&gc)
            });

            BinSummary {
                bin: bin.name.clone(),
                n_contigs: bin.contigs.len(),
                total_length: lengths.iter().sum(),
                n50: n50(&lengths),
                coverage: weighted_mean(&coverage),
                gc_content,
                completeness: bin.quality.completeness,
                purity: bin.quality.purity,
            }
        })
        .collect()
}
