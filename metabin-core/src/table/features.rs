use crate::config::CoverageFeature;
use crate::table::ContigTable;

/// Dense row-major clustering input built once from a [`ContigTable`].
///
/// Rows share the table's row numbering. The matrix is never recomputed while
/// binning; recursion only ever selects row subsets of it.
#[derive(Debug, Clone, Default)]
pub struct FeatureMatrix {
    dim: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    /// Embedding columns, followed by `log10(coverage + 1)` when requested
    #[must_use]
    pub fn from_table(table: &ContigTable, coverage: CoverageFeature) -> Self {
        let extra = usize::from(coverage == CoverageFeature::Log10);
        let dim = table.dim() + extra;
        let mut values = Vec::with_capacity(table.len() * dim);
        for record in table.records() {
            values.extend_from_slice(&record.embedding);
            if coverage == CoverageFeature::Log10 {
                values.push((record.coverage + 1.0).log10());
            }
        }
        Self { dim, values }
    }

    /// Builds a matrix from explicit rows; all rows must share one width.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let dim = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|row| row.len() == dim));
        Self {
            dim,
            values: rows.concat(),
        }
    }

    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.values.len() / self.dim
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.dim..(row + 1) * self.dim]
    }

    /// Borrowed views of the selected rows, in the given order
    #[must_use]
    pub fn points(&self, rows: &[usize]) -> Vec<&[f64]> {
        rows.iter().map(|&row| self.row(row)).collect()
    }
}
