//! In-memory tables consumed by the binning engine.
//!
//! - [`ContigTable`]: contig records with a unique `id -> row` index
//! - [`MarkerTable`]: per-contig marker gene multisets for one domain
//! - [`MarkerIndex`]: marker hits interned and aligned to contig rows
//! - [`FeatureMatrix`]: the numeric clustering input derived from a table

mod contigs;
mod features;
mod markers;

pub use contigs::ContigTable;
pub use features::FeatureMatrix;
pub use markers::{MarkerIndex, MarkerTable};
