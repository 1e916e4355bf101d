//! Recursive clustering of the residual contig set.
//!
//! Each pass runs a cluster search over the rows not yet binned, accepts every
//! passing cluster as a bin and shrinks the residual. The loop ends when the
//! residual is empty, when a pass accepts nothing or when the iteration cap
//! is reached. Features and marker indices are borrowed read-only throughout.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{BinningConfig, ClusterMethod};
use crate::search::{AcceptedCluster, Cutoffs, search};
use crate::table::{FeatureMatrix, MarkerIndex};
use crate::types::{MetabinError, ScanParameter};

/// Everything a partition call needs besides its inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartitionSettings {
    pub method: ClusterMethod,
    pub cutoffs: Cutoffs,
    /// Upper bound on passes; `None` runs until no progress is made
    pub max_iterations: Option<usize>,
    /// Evaluate scan values on the Rayon pool
    pub parallel: bool,
}

impl From<&BinningConfig> for PartitionSettings {
    fn from(config: &BinningConfig) -> Self {
        Self {
            method: config.method,
            cutoffs: Cutoffs {
                completeness: config.completeness_cutoff,
                purity: config.purity_cutoff,
            },
            max_iterations: config.max_iterations,
            parallel: config.parallel_scan,
        }
    }
}

/// Trace of one productive pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    /// Pass number, starting at 1
    pub iteration: usize,
    pub parameter: ScanParameter,
    pub bins_accepted: usize,
    /// Rows left after the pass
    pub residual: usize,
}

/// Bins, leftovers and pass traces of one partition call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartitionOutcome {
    /// Accepted clusters in acceptance order
    pub bins: Vec<AcceptedCluster>,
    /// Rows never binned, ascending
    pub unresolved: Vec<usize>,
    pub iterations: Vec<IterationRecord>,
}

/// Repeatedly clusters `rows` until no further bin can be accepted.
///
/// # Errors
///
/// Propagates [`MetabinError::InvalidMethod`] and
/// [`MetabinError::InsufficientMarkerData`] from the cluster search.
pub fn partition(
    features: &FeatureMatrix,
    markers: &MarkerIndex,
    rows: &[usize],
    settings: &PartitionSettings,
) -> Result<PartitionOutcome, MetabinError> {
    let mut residual = rows.to_vec();
    let mut outcome = PartitionOutcome::default();

    while !residual.is_empty() {
        if settings
            .max_iterations
            .is_some_and(|cap| outcome.iterations.len() >= cap)
        {
            debug!(
                cap = outcome.iterations.len(),
                "Iteration cap reached"
            );
            break;
        }

        let found = search(
            features,
            &residual,
            markers,
            &settings.method,
            settings.cutoffs,
            settings.parallel,
        )?;
        let Some(parameter) = found.parameter else {
            break;
        };

        let record = IterationRecord {
            iteration: outcome.iterations.len() + 1,
            parameter,
            bins_accepted: found.accepted.len(),
            residual: found.residual.len(),
        };
        info!(
            iteration = record.iteration,
            %parameter,
            bins = record.bins_accepted,
            residual = record.residual,
            "Accepted clusters"
        );
        outcome.iterations.push(record);
        outcome.bins.extend(found.accepted);
        residual = found.residual;
    }

    outcome.unresolved = residual;
    Ok(outcome)
}
