//! Reading the tab-separated tables and FASTA assemblies a binning run
//! consumes.
//!
//! Every table starts with a header line and is keyed by a `contig` column.
//! Blank lines are skipped. The path readers are thin wrappers around the
//! `parse_*` functions, which accept any [`BufRead`].
//!
//! | table       | required columns                 | optional columns          |
//! |-------------|----------------------------------|---------------------------|
//! | contigs     | `contig`, one or more embedding  | `coverage`, `length`      |
//! | markers     | `contig`, `marker` or `sacc`     | `domain`                  |
//! | lineages    | `contig`                         | any canonical rank        |
//! | assignments | `contig`, `cluster`              |                           |
//! | reference   | `contig`, `reference_genome`     |                           |

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use bio::io::fasta;
use bio::seq_analysis::gc::gc_content;
use tracing::{debug, info, warn};

use crate::table::{ContigTable, MarkerTable};
use crate::types::{ContigRecord, Domain, Lineage, MetabinError, Rank};

const CONTIG_COLUMN: &str = "contig";
const EMBEDDING_PREFIX: &str = "x_";

/// Length and GC fraction of one assembled sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceStats {
    pub length: u64,
    /// GC fraction in [0, 1]
    pub gc_content: f64,
}

/// Per-contig statistics of an assembly, keyed by FASTA record id
pub type Assembly = HashMap<String, SequenceStats>;

/// Header of a tab-separated table.
struct Header {
    columns: Vec<String>,
}

impl Header {
    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    fn require(&self, name: &str) -> Result<usize, MetabinError> {
        self.position(name).ok_or_else(|| {
            MetabinError::TableFormat(format!("missing required column '{name}'"))
        })
    }
}

/// Header plus data rows with their 1-based line numbers.
fn read_rows<R: BufRead>(reader: R) -> Result<(Header, Vec<(usize, Vec<String>)>), MetabinError> {
    let mut lines = reader.lines().enumerate();
    let header = loop {
        match lines.next() {
            Some((_, line)) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break Header {
                        columns: line.split('\t').map(|c| c.trim().to_string()).collect(),
                    };
                }
            }
            None => return Err(MetabinError::TableFormat("table has no header".to_string())),
        }
    };

    let mut rows = Vec::new();
    for (index, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split('\t').map(|f| f.trim().to_string()).collect();
        if fields.len() != header.columns.len() {
            return Err(MetabinError::TableFormat(format!(
                "line {} has {} fields, header has {}",
                index + 1,
                fields.len(),
                header.columns.len()
            )));
        }
        rows.push((index + 1, fields));
    }
    Ok((header, rows))
}

fn parse_field<T: FromStr>(value: &str, column: &str, line: usize) -> Result<T, MetabinError> {
    value.parse().map_err(|_| {
        MetabinError::ParseError(format!(
            "line {line}: cannot parse '{value}' in column '{column}'"
        ))
    })
}

fn open(path: impl AsRef<Path>) -> Result<BufReader<File>, MetabinError> {
    Ok(BufReader::new(File::open(path)?))
}

/// Parses a contig table.
///
/// Embedding dimensions are the `x_*` columns in header order; any other
/// column besides `contig`, `coverage` and `length` is ignored with a
/// warning. A table without `x_*` columns takes every remaining column as a
/// dimension.
///
/// # Errors
///
/// [`MetabinError::TableFormat`] for a missing `contig` column, no embedding
/// column, ragged rows or invalid records, [`MetabinError::ParseError`] for
/// non-numeric values.
pub fn parse_contig_table<R: BufRead>(reader: R) -> Result<ContigTable, MetabinError> {
    let (header, rows) = read_rows(reader)?;
    let contig = header.require(CONTIG_COLUMN)?;
    let coverage = header.position("coverage");
    let length = header.position("length");
    let candidates: Vec<usize> = (0..header.columns.len())
        .filter(|&i| i != contig && Some(i) != coverage && Some(i) != length)
        .collect();
    let (embedding, ignored): (Vec<usize>, Vec<usize>) = candidates
        .into_iter()
        .partition(|&i| header.columns[i].starts_with(EMBEDDING_PREFIX));
    let embedding = if embedding.is_empty() {
        let names = column_names(&header, &ignored);
        if !names.is_empty() {
            info!(columns = %names, "No x_* columns, using every other column as embedding");
        }
        ignored
    } else {
        if !ignored.is_empty() {
            warn!(
                columns = %column_names(&header, &ignored),
                "Ignoring non-embedding columns in contig table"
            );
        }
        embedding
    };
    if embedding.is_empty() {
        return Err(MetabinError::TableFormat(
            "contig table has no embedding columns".to_string(),
        ));
    }

    let mut records = Vec::with_capacity(rows.len());
    for (line, fields) in rows {
        let values = embedding
            .iter()
            .map(|&i| parse_field::<f64>(&fields[i], &header.columns[i], line))
            .collect::<Result<Vec<_>, _>>()?;
        let mut record = ContigRecord::new(fields[contig].clone(), values);
        if let Some(i) = coverage {
            record.coverage = parse_field(&fields[i], "coverage", line)?;
        }
        if let Some(i) = length {
            record.length = parse_field(&fields[i], "length", line)?;
        }
        records.push(record);
    }

    debug!(
        contigs = records.len(),
        dimensions = embedding.len(),
        "Parsed contig table"
    );
    ContigTable::new(records)
}

fn column_names(header: &Header, columns: &[usize]) -> String {
    columns
        .iter()
        .map(|&i| header.columns[i].as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Reads a contig table from a file.
///
/// # Errors
///
/// I/O failures plus everything [`parse_contig_table`] reports.
pub fn read_contig_table(path: impl AsRef<Path>) -> Result<ContigTable, MetabinError> {
    parse_contig_table(open(path)?)
}

/// Parses a long-form marker table: one row per marker hit.
///
/// The marker id comes from a `marker` column, or `sacc` as written by HMM
/// annotation pipelines. With a `domain` column, rows of other domains are
/// skipped.
///
/// # Errors
///
/// [`MetabinError::TableFormat`] for missing columns or ragged rows.
pub fn parse_marker_table<R: BufRead>(
    reader: R,
    domain: Domain,
) -> Result<MarkerTable, MetabinError> {
    let (header, rows) = read_rows(reader)?;
    let contig = header.require(CONTIG_COLUMN)?;
    let marker = header
        .position("marker")
        .or_else(|| header.position("sacc"))
        .ok_or_else(|| {
            MetabinError::TableFormat("missing marker column ('marker' or 'sacc')".to_string())
        })?;
    let domain_column = header.position("domain");

    let mut markers = MarkerTable::new(domain);
    let mut skipped = 0usize;
    for (line, fields) in rows {
        if let Some(i) = domain_column {
            if Domain::from_str(&fields[i]).map_err(|_| {
                MetabinError::ParseError(format!("line {line}: unknown domain '{}'", fields[i]))
            })? != domain
            {
                skipped += 1;
                continue;
            }
        }
        markers.add_hit(&fields[contig], &fields[marker]);
    }
    if skipped > 0 {
        debug!(rows = skipped, %domain, "Skipped marker hits of other domains");
    }
    Ok(markers)
}

/// Reads a marker table from a file.
///
/// # Errors
///
/// I/O failures plus everything [`parse_marker_table`] reports.
pub fn read_marker_table(
    path: impl AsRef<Path>,
    domain: Domain,
) -> Result<MarkerTable, MetabinError> {
    parse_marker_table(open(path)?, domain)
}

/// Parses a lineage table with one column per canonical rank.
///
/// Columns that are not ranks (such as `taxid`) are ignored.
///
/// # Errors
///
/// [`MetabinError::TableFormat`] for a missing `contig` column or no rank
/// column.
pub fn parse_lineage_table<R: BufRead>(
    reader: R,
) -> Result<Vec<(String, Lineage)>, MetabinError> {
    let (header, rows) = read_rows(reader)?;
    let contig = header.require(CONTIG_COLUMN)?;
    let ranks: Vec<(usize, Rank)> = header
        .columns
        .iter()
        .enumerate()
        .filter_map(|(i, column)| column.parse::<Rank>().ok().map(|rank| (i, rank)))
        .collect();
    if ranks.is_empty() {
        return Err(MetabinError::TableFormat(
            "lineage table has no rank columns".to_string(),
        ));
    }

    Ok(rows
        .into_iter()
        .map(|(_, fields)| {
            let mut lineage = Lineage::new();
            for &(i, rank) in &ranks {
                lineage.set(rank, &fields[i]);
            }
            (fields[contig].clone(), lineage)
        })
        .collect())
}

/// Reads a lineage table and attaches each lineage to its contig.
///
/// Returns the number of contigs that received a lineage; rows for contigs
/// missing from `table` are ignored with a warning.
///
/// # Errors
///
/// I/O failures plus everything [`parse_lineage_table`] reports.
pub fn merge_lineages(
    table: &mut ContigTable,
    path: impl AsRef<Path>,
) -> Result<usize, MetabinError> {
    let lineages = parse_lineage_table(open(path)?)?;
    let total = lineages.len();
    let applied = lineages
        .into_iter()
        .filter(|(contig, lineage)| table.set_lineage(contig, lineage.clone()))
        .count();
    if applied < total {
        warn!(
            rows = total - applied,
            "Ignoring lineages of contigs missing from the contig table"
        );
    }
    Ok(applied)
}

/// Reads an assembly FASTA and computes length and GC fraction per record.
///
/// # Errors
///
/// I/O failures, or [`MetabinError::ParseError`] for malformed FASTA.
pub fn read_assembly(path: impl AsRef<Path>) -> Result<Assembly, MetabinError> {
    let reader = fasta::Reader::new(File::open(path)?);
    let mut assembly = Assembly::new();
    for result in reader.records() {
        let record = result.map_err(|e| MetabinError::ParseError(e.to_string()))?;
        let seq = record.seq();
        let gc = if seq.is_empty() {
            0.0
        } else {
            f64::from(gc_content(seq))
        };
        assembly.insert(
            record.id().to_string(),
            SequenceStats {
                length: seq.len() as u64,
                gc_content: gc,
            },
        );
    }
    debug!(sequences = assembly.len(), "Read assembly");
    Ok(assembly)
}

/// Fills in lengths of contigs whose length is unknown (zero) from the
/// assembly. Returns the number of contigs updated.
pub fn apply_assembly_lengths(table: &mut ContigTable, assembly: &Assembly) -> usize {
    let missing: Vec<String> = table
        .records()
        .iter()
        .filter(|record| record.length == 0)
        .map(|record| record.id.clone())
        .collect();
    missing
        .iter()
        .filter_map(|id| assembly.get(id).map(|stats| (id, stats.length)))
        .filter(|(id, length)| table.set_length(id, *length))
        .count()
}

/// Parses a binning assignment table into `(contig, cluster)` pairs.
///
/// # Errors
///
/// [`MetabinError::TableFormat`] for missing columns or ragged rows.
pub fn parse_assignments<R: BufRead>(reader: R) -> Result<Vec<(String, String)>, MetabinError> {
    let (header, rows) = read_rows(reader)?;
    let contig = header.require(CONTIG_COLUMN)?;
    let cluster = header.require("cluster")?;
    Ok(rows
        .into_iter()
        .map(|(_, fields)| (fields[contig].clone(), fields[cluster].clone()))
        .collect())
}

/// Reads a binning assignment table from a file.
///
/// # Errors
///
/// I/O failures plus everything [`parse_assignments`] reports.
pub fn read_assignments(path: impl AsRef<Path>) -> Result<Vec<(String, String)>, MetabinError> {
    parse_assignments(open(path)?)
}

/// Parses reference genome assignments, `contig -> reference_genome`.
///
/// # Errors
///
/// [`MetabinError::TableFormat`] for missing columns, ragged rows or a contig
/// listed twice.
pub fn parse_reference<R: BufRead>(reader: R) -> Result<HashMap<String, String>, MetabinError> {
    let (header, rows) = read_rows(reader)?;
    let contig = header.require(CONTIG_COLUMN)?;
    let genome = header.require("reference_genome")?;
    let mut reference = HashMap::with_capacity(rows.len());
    for (line, fields) in rows {
        if reference
            .insert(fields[contig].clone(), fields[genome].clone())
            .is_some()
        {
            return Err(MetabinError::TableFormat(format!(
                "line {line}: contig '{}' listed twice",
                fields[contig]
            )));
        }
    }
    Ok(reference)
}

/// Reads reference genome assignments from a file.
///
/// # Errors
///
/// I/O failures plus everything [`parse_reference`] reports.
pub fn read_reference(path: impl AsRef<Path>) -> Result<HashMap<String, String>, MetabinError> {
    parse_reference(open(path)?)
}
