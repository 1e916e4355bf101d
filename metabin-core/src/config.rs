use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COMPLETENESS_CUTOFF, DEFAULT_DBSCAN_MIN_SAMPLES, DEFAULT_EPS_FACTOR,
    DEFAULT_EPS_START, DEFAULT_EPS_STEPS, DEFAULT_MAX_CLUSTER_SIZE, DEFAULT_MIN_CLUSTER_SIZE,
    DEFAULT_MIN_SUBSET_SIZE, DEFAULT_PURITY_CUTOFF, MAX_QUALITY_SCORE,
};
use crate::types::{Domain, MetabinError, Rank, ScanParameter};

/// Output format options for binning results.
///
/// # Examples
///
/// ```rust
/// use metabin_core::config::OutputFormat;
///
/// let format: OutputFormat = "json".parse()?;
/// assert_eq!(format, OutputFormat::Json);
/// # Ok::<(), metabin_core::types::MetabinError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Tab-separated assignment table (`contig`, `cluster`, `completeness`, `purity`).
    #[default]
    Tsv,

    /// JSON document with assignments, bins and partition traces.
    Json,
}

impl FromStr for OutputFormat {
    type Err = MetabinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tsv" => Ok(Self::Tsv),
            "json" => Ok(Self::Json),
            other => Err(MetabinError::InvalidConfig(format!(
                "unknown output format '{other}' (expected tsv or json)"
            ))),
        }
    }
}

/// How contig coverage enters the clustering features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoverageFeature {
    /// Cluster on the embedding alone.
    Ignore,

    /// Append `log10(coverage + 1)` as an extra dimension.
    #[default]
    Log10,
}

/// Geometrically shrinking DBSCAN radius scan (coarse to fine).
///
/// Produces `start, start * factor, start * factor^2, ...` for `steps` values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsScan {
    /// First and largest radius
    pub start: f64,
    /// Shrink factor in (0, 1)
    pub factor: f64,
    /// Number of radii to try
    pub steps: usize,
    /// Neighbourhood size (self included) that makes a core point
    pub min_samples: usize,
}

impl Default for EpsScan {
    fn default() -> Self {
        Self {
            start: DEFAULT_EPS_START,
            factor: DEFAULT_EPS_FACTOR,
            steps: DEFAULT_EPS_STEPS,
            min_samples: DEFAULT_DBSCAN_MIN_SAMPLES,
        }
    }
}

impl EpsScan {
    /// Radii in scan order
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        std::iter::successors(Some(self.start), |eps| Some(eps * self.factor))
            .take(self.steps)
            .collect()
    }

    fn validate(&self) -> Result<(), MetabinError> {
        if !(self.start.is_finite() && self.start > 0.0) {
            return Err(MetabinError::InvalidMethod(format!(
                "eps scan start must be positive, got {}",
                self.start
            )));
        }
        if !(self.factor > 0.0 && self.factor < 1.0) {
            return Err(MetabinError::InvalidMethod(format!(
                "eps scan factor must be in (0, 1), got {}",
                self.factor
            )));
        }
        if self.steps == 0 {
            return Err(MetabinError::InvalidMethod(
                "eps scan needs at least one step".to_string(),
            ));
        }
        if self.min_samples == 0 {
            return Err(MetabinError::InvalidMethod(
                "DBSCAN min_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// HDBSCAN minimum cluster size scan, from `max_cluster_size` down to
/// `min_cluster_size` in decrements of `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinSizeScan {
    /// First (coarsest) minimum cluster size
    pub max_cluster_size: usize,
    /// Last (finest) minimum cluster size, at least 2
    pub min_cluster_size: usize,
    /// Decrement between successive sizes
    pub step: usize,
    /// Core distance neighbourhood; `None` uses the current cluster size
    pub min_samples: Option<usize>,
}

impl Default for MinSizeScan {
    fn default() -> Self {
        Self {
            max_cluster_size: DEFAULT_MAX_CLUSTER_SIZE,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            step: 1,
            min_samples: None,
        }
    }
}

impl MinSizeScan {
    /// Minimum cluster sizes in scan order
    #[must_use]
    pub fn values(&self) -> Vec<usize> {
        if self.step == 0 || self.max_cluster_size < self.min_cluster_size {
            return Vec::new();
        }
        (self.min_cluster_size..=self.max_cluster_size)
            .rev()
            .step_by(self.step)
            .collect()
    }

    fn validate(&self) -> Result<(), MetabinError> {
        if self.min_cluster_size < 2 {
            return Err(MetabinError::InvalidMethod(format!(
                "HDBSCAN min_cluster_size must be at least 2, got {}",
                self.min_cluster_size
            )));
        }
        if self.step == 0 || self.max_cluster_size < self.min_cluster_size {
            return Err(MetabinError::InvalidMethod(format!(
                "empty min cluster size scan {}..={} step {}",
                self.min_cluster_size, self.max_cluster_size, self.step
            )));
        }
        if self.min_samples == Some(0) {
            return Err(MetabinError::InvalidMethod(
                "HDBSCAN min_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Density-based clustering family and its scanned parameter domain.
///
/// # Examples
///
/// ```rust
/// use metabin_core::config::ClusterMethod;
///
/// let method: ClusterMethod = "hdbscan".parse()?;
/// assert_eq!(method.name(), "density-min-size-scan");
/// assert!("kmeans".parse::<ClusterMethod>().is_err());
/// # Ok::<(), metabin_core::types::MetabinError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterMethod {
    /// DBSCAN over a shrinking radius range
    DensityEpsScan(EpsScan),
    /// HDBSCAN over a shrinking minimum cluster size range
    DensityMinSizeScan(MinSizeScan),
}

impl Default for ClusterMethod {
    fn default() -> Self {
        Self::DensityEpsScan(EpsScan::default())
    }
}

impl ClusterMethod {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DensityEpsScan(_) => "density-eps-scan",
            Self::DensityMinSizeScan(_) => "density-min-size-scan",
        }
    }

    /// Parameter values in scan order
    #[must_use]
    pub fn scan(&self) -> Vec<ScanParameter> {
        match self {
            Self::DensityEpsScan(scan) => scan.values().into_iter().map(ScanParameter::Eps).collect(),
            Self::DensityMinSizeScan(scan) => scan
                .values()
                .into_iter()
                .map(ScanParameter::MinClusterSize)
                .collect(),
        }
    }

    /// Checks that the scan range is usable.
    ///
    /// # Errors
    ///
    /// Returns [`MetabinError::InvalidMethod`] for empty or malformed ranges.
    pub fn validate(&self) -> Result<(), MetabinError> {
        match self {
            Self::DensityEpsScan(scan) => scan.validate(),
            Self::DensityMinSizeScan(scan) => scan.validate(),
        }
    }
}

impl fmt::Display for ClusterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClusterMethod {
    type Err = MetabinError;

    /// Parses a method name into the method with its default scan range
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "density-eps-scan" | "dbscan" => Ok(Self::DensityEpsScan(EpsScan::default())),
            "density-min-size-scan" | "hdbscan" => {
                Ok(Self::DensityMinSizeScan(MinSizeScan::default()))
            }
            other => Err(MetabinError::InvalidMethod(other.to_string())),
        }
    }
}

/// Taxonomic ranks visited by taxonomy-guided binning.
///
/// # Examples
///
/// ```rust
/// use metabin_core::config::RankOrder;
/// use metabin_core::types::Rank;
///
/// let order = RankOrder {
///     reverse: true,
///     starting_rank: Some(Rank::Genus),
///     ..Default::default()
/// };
/// assert_eq!(order.ranks(), vec![Rank::Genus, Rank::Family, Rank::Order,
///     Rank::Class, Rank::Phylum, Rank::Superkingdom]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankOrder {
    /// Ranks to consider, coarse to fine
    pub ranks: Vec<Rank>,
    /// Visit ranks fine to coarse instead
    pub reverse: bool,
    /// Skip every rank visited before this one
    pub starting_rank: Option<Rank>,
}

impl Default for RankOrder {
    fn default() -> Self {
        Self {
            ranks: Rank::CANONICAL.to_vec(),
            reverse: false,
            starting_rank: None,
        }
    }
}

impl RankOrder {
    /// Ranks in visiting order
    #[must_use]
    pub fn ranks(&self) -> Vec<Rank> {
        let mut ranks = self.ranks.clone();
        if self.reverse {
            ranks.reverse();
        }
        match self.starting_rank {
            Some(start) => ranks.into_iter().skip_while(|rank| *rank != start).collect(),
            None => ranks,
        }
    }
}

/// Configuration settings for a binning run.
///
/// # Examples
///
/// ## Default configuration
///
/// ```rust
/// use metabin_core::config::BinningConfig;
///
/// let config = BinningConfig::default();
/// assert_eq!(config.completeness_cutoff, 20.0);
/// assert_eq!(config.purity_cutoff, 90.0);
/// ```
///
/// ## Taxonomy-guided HDBSCAN for archaea
///
/// ```rust
/// use metabin_core::config::{BinningConfig, ClusterMethod, MinSizeScan};
/// use metabin_core::types::Domain;
///
/// let config = BinningConfig {
///     domain: Domain::Archaea,
///     method: ClusterMethod::DensityMinSizeScan(MinSizeScan::default()),
///     use_taxonomy: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinningConfig {
    /// Domain whose marker set scores candidate bins.
    ///
    /// **Default**: [`Domain::Bacteria`]
    pub domain: Domain,

    /// Minimum completeness (0-100) for a cluster to become a bin.
    ///
    /// **Default**: `20.0`
    pub completeness_cutoff: f64,

    /// Minimum purity (0-100) for a cluster to become a bin.
    ///
    /// **Default**: `90.0`
    pub purity_cutoff: f64,

    /// Clustering family and scanned parameter range.
    ///
    /// **Default**: DBSCAN radius scan with [`EpsScan::default`]
    pub method: ClusterMethod,

    /// Partition contigs by taxonomic rank before clustering.
    ///
    /// Requires lineages on the contig table.
    ///
    /// **Default**: `false`
    pub use_taxonomy: bool,

    /// Ranks visited in taxonomy mode.
    ///
    /// **Default**: superkingdom to species
    pub rank_order: RankOrder,

    /// Taxon subsets with fewer contigs are carried forward unclustered.
    ///
    /// **Default**: `3`
    pub min_subset_size: usize,

    /// How coverage contributes to the clustering features.
    ///
    /// **Default**: [`CoverageFeature::Log10`]
    pub coverage: CoverageFeature,

    /// Cap on recursive clustering passes per partition call.
    ///
    /// **Default**: `None` (run until no progress)
    pub max_iterations: Option<usize>,

    /// Evaluate scan values in parallel.
    ///
    /// Results are identical to a sequential scan.
    ///
    /// **Default**: `true`
    pub parallel_scan: bool,

    /// Number of threads for the global Rayon pool.
    ///
    /// **Default**: `None` (use all available cores)
    pub num_threads: Option<usize>,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            domain: Domain::Bacteria,
            completeness_cutoff: DEFAULT_COMPLETENESS_CUTOFF,
            purity_cutoff: DEFAULT_PURITY_CUTOFF,
            method: ClusterMethod::default(),
            use_taxonomy: false,
            rank_order: RankOrder::default(),
            min_subset_size: DEFAULT_MIN_SUBSET_SIZE,
            coverage: CoverageFeature::Log10,
            max_iterations: None,
            parallel_scan: true,
            num_threads: None,
        }
    }
}

impl BinningConfig {
    /// Checks ranges before any clustering starts.
    ///
    /// # Errors
    ///
    /// - [`MetabinError::InvalidConfig`] for cutoffs outside 0-100, a zero
    ///   thread count or iteration cap, or an empty rank order in taxonomy mode
    /// - [`MetabinError::InvalidMethod`] for an unusable scan range
    pub fn validate(&self) -> Result<(), MetabinError> {
        for (name, cutoff) in [
            ("completeness", self.completeness_cutoff),
            ("purity", self.purity_cutoff),
        ] {
            if !(0.0..=MAX_QUALITY_SCORE).contains(&cutoff) {
                return Err(MetabinError::InvalidConfig(format!(
                    "{name} cutoff must be within 0-100, got {cutoff}"
                )));
            }
        }
        if self.num_threads == Some(0) {
            return Err(MetabinError::InvalidConfig(
                "num_threads must be at least 1".to_string(),
            ));
        }
        if self.max_iterations == Some(0) {
            return Err(MetabinError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.use_taxonomy && self.rank_order.ranks().is_empty() {
            return Err(MetabinError::InvalidConfig(
                "taxonomy-guided binning needs at least one rank".to_string(),
            ));
        }
        self.method.validate()
    }
}
