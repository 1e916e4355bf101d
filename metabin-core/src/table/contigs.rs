use std::collections::HashMap;

use crate::types::{ContigRecord, Lineage, MetabinError};

/// Contig embedding table with a unique, stable `contig id -> row` index.
///
/// Rows keep the order in which records were supplied; every component that
/// walks contigs (residual sets, output tables) follows this order, which is
/// what makes binning runs reproducible.
///
/// # Examples
///
/// ```rust
/// use metabin_core::table::ContigTable;
/// use metabin_core::types::ContigRecord;
///
/// let table = ContigTable::new(vec![
///     ContigRecord::new("contig_1", vec![0.0, 1.0]),
///     ContigRecord::new("contig_2", vec![2.5, -1.0]).with_coverage(12.0),
/// ])?;
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.dim(), 2);
/// assert_eq!(table.row_of("contig_2"), Some(1));
/// # Ok::<(), metabin_core::types::MetabinError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContigTable {
    records: Vec<ContigRecord>,
    index: HashMap<String, usize>,
    dim: usize,
}

impl ContigTable {
    /// Builds a table, rejecting duplicate or empty ids and ragged embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`MetabinError::TableFormat`] if:
    /// - a contig id is empty or appears twice
    /// - embeddings differ in width or have zero width
    /// - an embedding value or coverage is not finite, or coverage is negative
    pub fn new(records: Vec<ContigRecord>) -> Result<Self, MetabinError> {
        let dim = records.first().map_or(0, |record| record.embedding.len());
        let mut index = HashMap::with_capacity(records.len());

        for (row, record) in records.iter().enumerate() {
            if record.id.trim().is_empty() {
                return Err(MetabinError::TableFormat(format!(
                    "row {} has an empty contig id",
                    row + 1
                )));
            }
            if record.embedding.is_empty() || record.embedding.len() != dim {
                return Err(MetabinError::TableFormat(format!(
                    "contig '{}' has {} embedding values, expected {}",
                    record.id,
                    record.embedding.len(),
                    dim.max(1)
                )));
            }
            if record.embedding.iter().any(|value| !value.is_finite()) {
                return Err(MetabinError::TableFormat(format!(
                    "contig '{}' has a non-finite embedding value",
                    record.id
                )));
            }
            if !record.coverage.is_finite() || record.coverage < 0.0 {
                return Err(MetabinError::TableFormat(format!(
                    "contig '{}' has invalid coverage {}",
                    record.id, record.coverage
                )));
            }
            if index.insert(record.id.clone(), row).is_some() {
                return Err(MetabinError::TableFormat(format!(
                    "duplicate contig id '{}'",
                    record.id
                )));
            }
        }

        Ok(Self {
            records,
            index,
            dim,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Width of every embedding vector
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn records(&self) -> &[ContigRecord] {
        &self.records
    }

    /// Record at `row`; panics on an out of range row like slice indexing
    #[must_use]
    pub fn record(&self, row: usize) -> &ContigRecord {
        &self.records[row]
    }

    #[must_use]
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ContigRecord> {
        self.row_of(id).map(|row| &self.records[row])
    }

    /// Contig ids in row order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.id.as_str())
    }

    /// All rows, in order
    #[must_use]
    pub fn all_rows(&self) -> Vec<usize> {
        (0..self.records.len()).collect()
    }

    #[must_use]
    pub fn lineage(&self, row: usize) -> Option<&Lineage> {
        self.records[row].lineage.as_ref()
    }

    /// Whether at least one contig carries a non-empty lineage
    #[must_use]
    pub fn has_lineage(&self) -> bool {
        self.records
            .iter()
            .any(|record| record.lineage.as_ref().is_some_and(|l| !l.is_empty()))
    }

    /// Attaches a lineage to a contig; returns `false` for unknown ids
    pub fn set_lineage(&mut self, id: &str, lineage: Lineage) -> bool {
        match self.row_of(id) {
            Some(row) => {
                self.records[row].lineage = Some(lineage);
                true
            }
            None => false,
        }
    }

    /// Sets the length of a contig; returns `false` for unknown ids
    pub fn set_length(&mut self, id: &str, length: u64) -> bool {
        match self.row_of(id) {
            Some(row) => {
                self.records[row].length = length;
                true
            }
            None => false,
        }
    }
}
