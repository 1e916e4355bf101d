use std::collections::VecDeque;

use tracing::{info, warn};

use crate::config::BinningConfig;
use crate::partition::{PartitionOutcome, PartitionSettings, partition};
use crate::results::{BinLabel, BinRecord, BinningResults, ContigAssignment, PassRecord};
use crate::search::AcceptedCluster;
use crate::table::{ContigTable, FeatureMatrix, MarkerIndex, MarkerTable};
use crate::taxonomy::{TaxonSubset, split};
use crate::types::{MetabinError, Rank};

/// Top-level binning driver.
///
/// Validates the configuration and inputs, builds the feature matrix once and
/// runs the recursive partitioner, either over every contig or, with
/// taxonomy enabled, over the taxon subsets of each rank in turn.
///
/// # Examples
///
/// ```rust
/// use metabin_core::config::{BinningConfig, ClusterMethod, CoverageFeature, EpsScan};
/// use metabin_core::engine::Binner;
/// use metabin_core::table::{ContigTable, MarkerTable};
/// use metabin_core::types::{ContigRecord, Domain};
///
/// let table = ContigTable::new(vec![
///     ContigRecord::new("a", vec![0.0, 0.0]),
///     ContigRecord::new("b", vec![0.1, 0.0]),
///     ContigRecord::new("c", vec![9.0, 9.0]),
/// ])?;
/// let mut markers = MarkerTable::new(Domain::Bacteria).with_expected_markers(2);
/// markers.add_hit("a", "PF00380");
/// markers.add_hit("b", "PF00410");
///
/// let binner = Binner::with_config(BinningConfig {
///     method: ClusterMethod::DensityEpsScan(EpsScan {
///         start: 1.0,
///         factor: 0.5,
///         steps: 3,
///         min_samples: 2,
///     }),
///     coverage: CoverageFeature::Ignore,
///     ..Default::default()
/// })?;
/// let results = binner.bin(&table, &markers)?;
///
/// assert_eq!(results.label_of("a").map(|l| l.as_str()), Some("bin_0001"));
/// assert_eq!(results.label_of("c").map(|l| l.as_str()), Some("unclustered"));
/// # Ok::<(), metabin_core::types::MetabinError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Binner {
    pub config: BinningConfig,
}

/// A bin before it is named, with the taxon subset it came from
struct FoundBin {
    accepted: AcceptedCluster,
    rank: Option<Rank>,
    taxon: Option<String>,
}

impl Binner {
    /// Binner with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a binner after validating `config`.
    ///
    /// When `num_threads` is set the global Rayon pool is sized accordingly;
    /// if the pool was already initialised the existing pool is kept and a
    /// warning is logged.
    ///
    /// # Errors
    ///
    /// Returns [`MetabinError::InvalidConfig`] or
    /// [`MetabinError::InvalidMethod`] for an invalid configuration.
    pub fn with_config(config: BinningConfig) -> Result<Self, MetabinError> {
        config.validate()?;

        if let Some(num_threads) = config.num_threads {
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
            {
                warn!(error = %e, "Keeping the existing thread pool");
            }
        }

        Ok(Self { config })
    }

    /// Bins every contig of `table`.
    ///
    /// # Errors
    ///
    /// All checks run before any clustering:
    /// - [`MetabinError::InvalidConfig`] / [`MetabinError::InvalidMethod`] for
    ///   an invalid configuration, or taxonomy mode without any lineage
    /// - [`MetabinError::TableFormat`] when the marker table is for another
    ///   domain than the configured one
    /// - [`MetabinError::InsufficientMarkerData`] when no contig carries a
    ///   marker hit
    pub fn bin(
        &self,
        table: &ContigTable,
        markers: &MarkerTable,
    ) -> Result<BinningResults, MetabinError> {
        let config = &self.config;
        config.validate()?;
        if markers.domain() != config.domain {
            return Err(MetabinError::TableFormat(format!(
                "marker table is for {} but binning is configured for {}",
                markers.domain(),
                config.domain
            )));
        }
        let index = MarkerIndex::build(markers, table);
        if index.is_empty() {
            return Err(MetabinError::InsufficientMarkerData {
                domain: config.domain,
            });
        }
        if config.use_taxonomy && !table.has_lineage() {
            return Err(MetabinError::InvalidConfig(
                "taxonomy-guided binning needs contig lineages".to_string(),
            ));
        }

        info!(
            contigs = table.len(),
            domain = %config.domain,
            method = %config.method,
            taxonomy = config.use_taxonomy,
            "Binning contigs"
        );

        let features = FeatureMatrix::from_table(table, config.coverage);
        let settings = PartitionSettings::from(config);
        let mut found = Vec::new();
        let mut passes = Vec::new();

        let unresolved = if config.use_taxonomy {
            self.bin_by_taxonomy(table, &features, &index, &settings, &mut found, &mut passes)?
        } else {
            let outcome = partition(&features, &index, &table.all_rows(), &settings)?;
            collect(outcome, None, &mut found, &mut passes)
        };

        let results = assemble(table, config, found, passes);
        info!(
            bins = results.bins.len(),
            unclustered = unresolved.len(),
            "Binning finished"
        );
        Ok(results)
    }

    /// Worklist over ranks: each item is split by its rank, viable subsets are
    /// partitioned and every unresolved row moves on to the next rank as one
    /// item. Returns the rows still unresolved after the last rank.
    fn bin_by_taxonomy(
        &self,
        table: &ContigTable,
        features: &FeatureMatrix,
        index: &MarkerIndex,
        settings: &PartitionSettings,
        found: &mut Vec<FoundBin>,
        passes: &mut Vec<PassRecord>,
    ) -> Result<Vec<usize>, MetabinError> {
        let ranks = self.config.rank_order.ranks();
        let mut worklist = VecDeque::from([(0usize, table.all_rows())]);
        let mut unresolved = Vec::new();

        while let Some((depth, rows)) = worklist.pop_front() {
            let Some(&rank) = ranks.get(depth) else {
                unresolved.extend(rows);
                continue;
            };

            let subsets = split(&rows, table, rank);
            info!(
                %rank,
                contigs = rows.len(),
                subsets = subsets.len(),
                "Splitting by rank"
            );

            let mut carried = Vec::new();
            for TaxonSubset { taxon, rows, .. } in subsets {
                if rows.len() < self.config.min_subset_size {
                    carried.extend(rows);
                    continue;
                }
                let outcome = partition(features, index, &rows, settings)?;
                carried.extend(collect(
                    outcome,
                    Some((rank, taxon)),
                    found,
                    passes,
                ));
            }

            carried.sort_unstable();
            if !carried.is_empty() {
                worklist.push_back((depth + 1, carried));
            }
        }

        unresolved.sort_unstable();
        Ok(unresolved)
    }
}

/// Moves one partition outcome into the run accumulators; returns its
/// unresolved rows.
fn collect(
    outcome: PartitionOutcome,
    subset: Option<(Rank, Option<String>)>,
    found: &mut Vec<FoundBin>,
    passes: &mut Vec<PassRecord>,
) -> Vec<usize> {
    let (rank, taxon) = match subset {
        Some((rank, taxon)) => (Some(rank), taxon),
        None => (None, None),
    };
    passes.extend(outcome.iterations.into_iter().map(|record| PassRecord {
        rank,
        taxon: taxon.clone(),
        iteration: record.iteration,
        parameter: record.parameter,
        bins_accepted: record.bins_accepted,
        residual: record.residual,
    }));
    found.extend(outcome.bins.into_iter().map(|accepted| FoundBin {
        accepted,
        rank,
        taxon: taxon.clone(),
    }));
    outcome.unresolved
}

/// Names bins in acceptance order and labels every contig.
fn assemble(
    table: &ContigTable,
    config: &BinningConfig,
    found: Vec<FoundBin>,
    passes: Vec<PassRecord>,
) -> BinningResults {
    let mut labels = vec![BinLabel::Unclustered; table.len()];
    let mut bins = Vec::with_capacity(found.len());

    for (i, bin) in found.into_iter().enumerate() {
        let label = BinLabel::numbered(i + 1);
        for &row in &bin.accepted.rows {
            labels[row] = label.clone();
        }
        bins.push(BinRecord {
            name: label.as_str().to_string(),
            contigs: bin
                .accepted
                .rows
                .iter()
                .map(|&row| table.record(row).id.clone())
                .collect(),
            quality: bin.accepted.quality,
            parameter: bin.accepted.parameter,
            rank: bin.rank,
            taxon: bin.taxon,
        });
    }

    let assignments = table
        .ids()
        .zip(labels)
        .map(|(contig, label)| ContigAssignment {
            contig: contig.to_string(),
            label,
        })
        .collect();

    BinningResults {
        domain: config.domain,
        method: config.method.name().to_string(),
        assignments,
        bins,
        passes,
    }
}
