// =============================================================================
// =============================================================================

/// Version string for metabin
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// =============================================================================

/// Distinct single-copy marker genes expected once per bacterial genome
pub const BACTERIA_MARKER_COUNT: usize = 139;

/// Distinct single-copy marker genes expected once per archaeal genome
pub const ARCHAEA_MARKER_COUNT: usize = 162;

/// Upper bound of completeness and purity scores
pub const MAX_QUALITY_SCORE: f64 = 100.0;

// =============================================================================
// =============================================================================

/// Reserved label for contigs that were not placed in any bin
pub const UNCLUSTERED_LABEL: &str = "unclustered";

/// Prefix of generated bin names (`bin_0001`, `bin_0002`, ...)
pub const BIN_NAME_PREFIX: &str = "bin_";

/// Zero padding width of the numeric part of bin names
pub const BIN_NAME_WIDTH: usize = 4;

/// Default minimum completeness for a cluster to be accepted as a bin
pub const DEFAULT_COMPLETENESS_CUTOFF: f64 = 20.0;

/// Default minimum purity for a cluster to be accepted as a bin
pub const DEFAULT_PURITY_CUTOFF: f64 = 90.0;

// =============================================================================
// =============================================================================

/// First (largest) DBSCAN radius of the default scan
pub const DEFAULT_EPS_START: f64 = 5.0;

/// Geometric shrink factor between successive DBSCAN radii
pub const DEFAULT_EPS_FACTOR: f64 = 0.8;

/// Number of DBSCAN radii in the default scan
pub const DEFAULT_EPS_STEPS: usize = 15;

/// Neighbourhood size (self included) that makes a DBSCAN core point
pub const DEFAULT_DBSCAN_MIN_SAMPLES: usize = 5;

/// Largest HDBSCAN minimum cluster size of the default scan
pub const DEFAULT_MAX_CLUSTER_SIZE: usize = 10;

/// Smallest HDBSCAN minimum cluster size of the default scan
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 2;

/// Taxon subsets smaller than this are not clustered on their own
pub const DEFAULT_MIN_SUBSET_SIZE: usize = 3;

// =============================================================================
// =============================================================================

/// Lineage values treated as "no taxon assigned at this rank"
pub const UNASSIGNED_TAXA: [&str; 4] = ["", "unclassified", "NA", "nan"];

/// Reference label of contigs excluded from clustering benchmarks
pub const MISASSEMBLED_LABEL: &str = "misassembled";
