//! Density-based clustering algorithms.
//!
//! Both algorithms label each input point with `Some(cluster)` or `None`
//! (noise). Cluster labels are dense, start at zero and are numbered in order
//! of each cluster's first member, so identical input always yields identical
//! labels.
//!
//! ## Modules
//!
//! - [`dbscan`]: fixed-radius density clustering
//! - [`hdbscan`]: hierarchical density clustering with excess-of-mass
//!   cluster selection
//!
//! ## Usage
//!
//! ```rust
//! use metabin_core::algorithms::{Clustering, dbscan::Dbscan, group_labels};
//!
//! let data = [[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]];
//! let points: Vec<&[f64]> = data.iter().map(|p| p.as_slice()).collect();
//!
//! let labels = Dbscan::new(0.5, 2).fit_predict(&points)?;
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! assert_eq!(group_labels(&labels), vec![vec![0, 1], vec![2, 3]]);
//! # Ok::<(), metabin_core::algorithms::ClusterError>(())
//! ```

use thiserror::Error;

pub mod dbscan;
pub mod hdbscan;

/// Per-point cluster label; `None` marks noise.
pub type Labeling = Vec<Option<usize>>;

/// Failure of a single clustering run.
///
/// These are recoverable: the cluster search treats them as "no clusters for
/// this parameter value".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    /// Not enough points for the requested parameters
    #[error("{points} points cannot satisfy a minimum of {required}")]
    TooFewPoints { points: usize, required: usize },
    /// Parameter value the algorithm cannot run with
    #[error("Invalid clustering parameter: {0}")]
    InvalidParameter(String),
}

/// A clustering algorithm over borrowed feature rows.
pub trait Clustering {
    /// Labels every point; the output has one entry per input point.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] when the parameters cannot be applied to
    /// this input.
    fn fit_predict(&self, points: &[&[f64]]) -> Result<Labeling, ClusterError>;
}

/// Euclidean distance between two equally sized rows
#[inline]
#[must_use]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Point positions grouped by cluster label, in label order.
///
/// Noise points are skipped. Positions within a group are ascending.
#[must_use]
pub fn group_labels(labels: &[Option<usize>]) -> Vec<Vec<usize>> {
    let n_clusters = labels.iter().flatten().max().map_or(0, |max| max + 1);
    let mut groups = vec![Vec::new(); n_clusters];
    for (position, label) in labels.iter().enumerate() {
        if let Some(label) = label {
            groups[*label].push(position);
        }
    }
    groups.retain(|group| !group.is_empty());
    groups
}

/// Renumbers labels so clusters are numbered by their first member.
pub(crate) fn relabel_by_first_member(labels: &mut [Option<usize>]) {
    let mut mapping: Vec<Option<usize>> = Vec::new();
    let mut next = 0;
    for label in labels.iter_mut().flatten() {
        if *label >= mapping.len() {
            mapping.resize(*label + 1, None);
        }
        let new = *mapping[*label].get_or_insert_with(|| {
            next += 1;
            next - 1
        });
        *label = new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euclidean_distance() {
        assert_relative_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_relative_eq!(euclidean(&[1.5], &[1.5]), 0.0);
    }

    #[test]
    fn test_group_labels_skips_noise() {
        let labels = vec![Some(1), None, Some(0), Some(1), None];
        assert_eq!(group_labels(&labels), vec![vec![2], vec![0, 3]]);
        assert!(group_labels(&[None, None]).is_empty());
        assert!(group_labels(&[]).is_empty());
    }

    #[test]
    fn test_relabel_by_first_member() {
        let mut labels = vec![Some(7), None, Some(2), Some(7), Some(4)];
        relabel_by_first_member(&mut labels);
        assert_eq!(labels, vec![Some(0), None, Some(1), Some(0), Some(2)]);
    }

    #[test]
    fn test_cluster_error_display() {
        let err = ClusterError::TooFewPoints {
            points: 3,
            required: 5,
        };
        assert_eq!(err.to_string(), "3 points cannot satisfy a minimum of 5");
    }
}
