use std::collections::HashMap;
use std::io::Write;

use crate::{
    benchmark::BenchmarkReport, results::BinningResults, summary::BinSummary,
    types::MetabinError, types::Quality,
};

/// Write contig assignments as a tab-separated table
pub fn write_tsv<W: Write>(writer: &mut W, results: &BinningResults) -> Result<(), MetabinError> {
    let quality: HashMap<&str, Quality> = results
        .bins
        .iter()
        .map(|bin| (bin.name.as_str(), bin.quality))
        .collect();

    writeln!(writer, "contig\tcluster\tcompleteness\tpurity")?;
    for assignment in &results.assignments {
        match quality.get(assignment.label.as_str()) {
            Some(q) => writeln!(
                writer,
                "{}\t{}\t{:.4}\t{:.4}",
                assignment.contig, assignment.label, q.completeness, q.purity
            )?,
            None => writeln!(writer, "{}\t{}\t\t", assignment.contig, assignment.label)?,
        }
    }
    Ok(())
}

/// Write bin summaries as a tab-separated table
pub fn write_summary_tsv<W: Write>(
    writer: &mut W,
    summaries: &[BinSummary],
) -> Result<(), MetabinError> {
    writeln!(
        writer,
        "cluster\tn_contigs\ttotal_length\tn50\tcoverage\tgc_content\tcompleteness\tpurity"
    )?;
    for summary in summaries {
        let gc = summary
            .gc_content
            .map(|gc| format!("{gc:.4}"))
            .unwrap_or_default();
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{:.4}\t{}\t{:.4}\t{:.4}",
            summary.bin,
            summary.n_contigs,
            summary.total_length,
            summary.n50,
            summary.coverage,
            gc,
            summary.completeness,
            summary.purity
        )?;
    }
    Ok(())
}

/// Write clustering metrics as a tab-separated table
pub fn write_benchmark_tsv<W: Write>(
    writer: &mut W,
    reports: &[BenchmarkReport],
) -> Result<(), MetabinError> {
    writeln!(
        writer,
        "predictions\tadjusted_mutual_info\tnormalized_mutual_info\tadjusted_rand\t\
         homogeneity\tcompleteness\tv_measure\tfowlkes_mallows"
    )?;
    for report in reports {
        let m = &report.metrics;
        writeln!(
            writer,
            "{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}",
            report.predictions,
            m.adjusted_mutual_info,
            m.normalized_mutual_info,
            m.adjusted_rand,
            m.homogeneity,
            m.completeness,
            m.v_measure,
            m.fowlkes_mallows
        )?;
    }
    Ok(())
}
