//! Parameter scan that picks the best clustering of a row subset.
//!
//! For every value of the method's scan range the rows are clustered, each
//! non-noise cluster is scored, and clusters meeting both cutoffs become
//! candidates. The winning parameter value is the one holding the best
//! candidate, ranked by completeness, then purity, then size; on a full tie
//! the value scanned first wins. Scanning stops after the first value that
//! yields a passing cluster with completeness 100.
//!
//! Every passing cluster of the winning value is accepted at once.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::algorithms::{Clustering, dbscan::Dbscan, group_labels, hdbscan::Hdbscan};
use crate::config::ClusterMethod;
use crate::quality::score_rows;
use crate::table::{FeatureMatrix, MarkerIndex};
use crate::types::{MetabinError, Quality, ScanParameter};

/// Completeness and purity thresholds a cluster must meet
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cutoffs {
    pub completeness: f64,
    pub purity: f64,
}

/// A cluster that met both cutoffs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedCluster {
    /// Table rows, ascending
    pub rows: Vec<usize>,
    pub quality: Quality,
    /// Scan value that produced the cluster
    pub parameter: ScanParameter,
}

/// Result of one cluster search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchOutcome {
    /// Accepted clusters in label order; empty when nothing passed
    pub accepted: Vec<AcceptedCluster>,
    /// Searched rows not in an accepted cluster, ascending
    pub residual: Vec<usize>,
    /// Winning scan value
    pub parameter: Option<ScanParameter>,
}

#[derive(Debug, Clone)]
struct Candidate {
    rows: Vec<usize>,
    quality: Quality,
}

impl Candidate {
    fn rank(&self, other: &Self) -> Ordering {
        self.quality
            .completeness
            .total_cmp(&other.quality.completeness)
            .then(self.quality.purity.total_cmp(&other.quality.purity))
            .then(self.rows.len().cmp(&other.rows.len()))
    }
}

/// Clusters `rows` over the scan range of `method` and accepts the best
/// passing clusters.
///
/// With `parallel` set all scan values are evaluated on the Rayon pool before
/// the same in-order selection runs, so the outcome never depends on it.
///
/// # Errors
///
/// - [`MetabinError::InvalidMethod`] for an unusable scan range
/// - [`MetabinError::InsufficientMarkerData`] when no row carries a marker
pub fn search(
    features: &FeatureMatrix,
    rows: &[usize],
    markers: &MarkerIndex,
    method: &ClusterMethod,
    cutoffs: Cutoffs,
    parallel: bool,
) -> Result<SearchOutcome, MetabinError> {
    method.validate()?;
    if markers.is_empty() {
        return Err(MetabinError::InsufficientMarkerData {
            domain: markers.domain(),
        });
    }
    if rows.is_empty() {
        return Ok(SearchOutcome::default());
    }

    let points = features.points(rows);
    let scan = method.scan();
    let run = |parameter: &ScanParameter| {
        (
            *parameter,
            evaluate(method, *parameter, rows, &points, markers, cutoffs),
        )
    };

    let best = if parallel {
        let evaluations: Vec<_> = scan.par_iter().map(run).collect();
        select(evaluations.into_iter())
    } else {
        select(scan.iter().map(run))
    };

    let Some((parameter, candidates)) = best else {
        return Ok(SearchOutcome {
            accepted: Vec::new(),
            residual: rows.to_vec(),
            parameter: None,
        });
    };

    let mut binned = vec![false; features.len()];
    for candidate in &candidates {
        for &row in &candidate.rows {
            binned[row] = true;
        }
    }
    let residual = rows.iter().copied().filter(|&row| !binned[row]).collect();
    let accepted = candidates
        .into_iter()
        .map(|candidate| AcceptedCluster {
            rows: candidate.rows,
            quality: candidate.quality,
            parameter,
        })
        .collect();

    Ok(SearchOutcome {
        accepted,
        residual,
        parameter: Some(parameter),
    })
}

/// Passing clusters of one scan value, in label order.
fn evaluate(
    method: &ClusterMethod,
    parameter: ScanParameter,
    rows: &[usize],
    points: &[&[f64]],
    markers: &MarkerIndex,
    cutoffs: Cutoffs,
) -> Vec<Candidate> {
    let labels = match (method, parameter) {
        (ClusterMethod::DensityEpsScan(scan), ScanParameter::Eps(eps)) => {
            Dbscan::new(eps, scan.min_samples).fit_predict(points)
        }
        (ClusterMethod::DensityMinSizeScan(scan), ScanParameter::MinClusterSize(size)) => {
            Hdbscan::new(size, scan.min_samples).fit_predict(points)
        }
        _ => return Vec::new(),
    };
    let labels = match labels {
        Ok(labels) => labels,
        Err(err) => {
            debug!(%parameter, error = %err, "Skipping scan value");
            return Vec::new();
        }
    };

    let clusters = group_labels(&labels);
    let n_clusters = clusters.len();
    let passing: Vec<Candidate> = clusters
        .into_iter()
        .filter_map(|positions| {
            let mut members: Vec<usize> = positions.into_iter().map(|p| rows[p]).collect();
            members.sort_unstable();
            let quality = score_rows(&members, markers);
            quality
                .passes(cutoffs.completeness, cutoffs.purity)
                .then_some(Candidate {
                    rows: members,
                    quality,
                })
        })
        .collect();

    debug!(
        %parameter,
        clusters = n_clusters,
        passing = passing.len(),
        "Evaluated scan value"
    );
    passing
}

/// Picks the scan value holding the best candidate, honouring the early stop.
fn select(
    evaluations: impl Iterator<Item = (ScanParameter, Vec<Candidate>)>,
) -> Option<(ScanParameter, Vec<Candidate>)> {
    let mut best: Option<(ScanParameter, Vec<Candidate>, Candidate)> = None;

    for (parameter, candidates) in evaluations {
        let Some(top) = candidates
            .iter()
            .reduce(|a, b| if b.rank(a) == Ordering::Greater { b } else { a })
            .cloned()
        else {
            continue;
        };
        let complete = candidates.iter().any(|c| c.quality.is_complete());

        let better = best
            .as_ref()
            .is_none_or(|(_, _, current)| top.rank(current) == Ordering::Greater);
        if better {
            best = Some((parameter, candidates, top));
        }
        if complete {
            break;
        }
    }

    best.map(|(parameter, candidates, _)| (parameter, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EpsScan, MinSizeScan};
    use crate::table::{ContigTable, MarkerTable};
    use crate::types::{ContigRecord, Domain};

    /// Two tight groups of four contigs each, plus one far outlier. The left
    /// group carries four distinct markers, the right group carries a
    /// duplicated marker.
    fn fixture() -> (ContigTable, MarkerIndex) {
        let coords = [
            (0.0, 0.0),
            (0.1, 0.0),
            (0.0, 0.1),
            (0.1, 0.1),
            (5.0, 5.0),
            (5.1, 5.0),
            (5.0, 5.1),
            (5.1, 5.1),
            (40.0, -40.0),
        ];
        let table = ContigTable::new(
            coords
                .iter()
                .enumerate()
                .map(|(i, (x, y))| ContigRecord::new(format!("c{i}"), vec![*x, *y]))
                .collect(),
        )
        .unwrap();
        let mut markers = MarkerTable::new(Domain::Bacteria).with_expected_markers(4);
        for (contig, marker) in [
            ("c0", "m1"),
            ("c1", "m2"),
            ("c2", "m3"),
            ("c3", "m4"),
            ("c4", "m1"),
            ("c5", "m1"),
            ("c6", "m2"),
            ("c8", "m3"),
        ] {
            markers.add_hit(contig, marker);
        }
        let index = MarkerIndex::build(&markers, &table);
        (table, index)
    }

    fn eps_method(start: f64, steps: usize) -> ClusterMethod {
        ClusterMethod::DensityEpsScan(EpsScan {
            start,
            factor: 0.5,
            steps,
            min_samples: 2,
        })
    }

    const LENIENT: Cutoffs = Cutoffs {
        completeness: 20.0,
        purity: 90.0,
    };

    #[test]
    fn test_search_accepts_pure_complete_cluster() {
        let (table, index) = fixture();
        let features = FeatureMatrix::from_rows(
            &table.records().iter().map(|r| r.embedding.clone()).collect::<Vec<_>>(),
        );
        let outcome = search(
            &features,
            &table.all_rows(),
            &index,
            &eps_method(1.0, 3),
            LENIENT,
            false,
        )
        .unwrap();

        assert_eq!(outcome.parameter, Some(ScanParameter::Eps(1.0)));
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].rows, vec![0, 1, 2, 3]);
        assert_eq!(outcome.accepted[0].quality, Quality::new(100.0, 100.0));
        assert_eq!(outcome.residual, vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_search_accepts_every_passing_cluster_of_winning_value() {
        let (table, _) = fixture();
        let mut markers = MarkerTable::new(Domain::Bacteria).with_expected_markers(4);
        for (i, contig) in ["c0", "c1", "c2", "c3", "c4", "c5", "c6", "c7"]
            .into_iter()
            .enumerate()
        {
            markers.add_hit(contig, &format!("m{}", i % 4));
        }
        let index = MarkerIndex::build(&markers, &table);
        let features = FeatureMatrix::from_table(&table, crate::config::CoverageFeature::Ignore);

        let outcome = search(
            &features,
            &table.all_rows(),
            &index,
            &eps_method(1.0, 3),
            LENIENT,
            false,
        )
        .unwrap();

        assert_eq!(outcome.parameter, Some(ScanParameter::Eps(1.0)));
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.accepted[0].rows, vec![0, 1, 2, 3]);
        assert_eq!(outcome.accepted[1].rows, vec![4, 5, 6, 7]);
        assert!(outcome.accepted.iter().all(|c| c.quality.is_complete()));
        assert_eq!(outcome.residual, vec![8]);
    }

    #[test]
    fn test_search_nothing_passes() {
        let (table, index) = fixture();
        let features = FeatureMatrix::from_table(&table, crate::config::CoverageFeature::Ignore);
        let strict = Cutoffs {
            completeness: 100.0,
            purity: 100.0,
        };
        let rows = vec![4, 5, 6, 7, 8];
        let outcome = search(&features, &rows, &index, &eps_method(1.0, 3), strict, false).unwrap();
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.parameter, None);
        assert_eq!(outcome.residual, rows);
    }

    #[test]
    fn test_search_parallel_matches_sequential() {
        let (table, index) = fixture();
        let features = FeatureMatrix::from_table(&table, crate::config::CoverageFeature::Ignore);
        let rows = table.all_rows();
        for method in [
            eps_method(20.0, 8),
            ClusterMethod::DensityMinSizeScan(MinSizeScan {
                max_cluster_size: 5,
                min_cluster_size: 2,
                step: 1,
                min_samples: Some(2),
            }),
        ] {
            let sequential = search(&features, &rows, &index, &method, LENIENT, false).unwrap();
            let parallel = search(&features, &rows, &index, &method, LENIENT, true).unwrap();
            assert_eq!(sequential, parallel);
        }
    }

    #[test]
    fn test_search_requires_markers() {
        let (table, _) = fixture();
        let index = MarkerIndex::build(&MarkerTable::new(Domain::Archaea), &table);
        let features = FeatureMatrix::from_table(&table, crate::config::CoverageFeature::Ignore);
        let result = search(
            &features,
            &table.all_rows(),
            &index,
            &eps_method(1.0, 2),
            LENIENT,
            false,
        );
        assert!(matches!(
            result,
            Err(MetabinError::InsufficientMarkerData {
                domain: Domain::Archaea
            })
        ));
    }

    #[test]
    fn test_search_rejects_empty_scan() {
        let (table, index) = fixture();
        let features = FeatureMatrix::from_table(&table, crate::config::CoverageFeature::Ignore);
        let result = search(
            &features,
            &table.all_rows(),
            &index,
            &eps_method(1.0, 0),
            LENIENT,
            false,
        );
        assert!(matches!(result, Err(MetabinError::InvalidMethod(_))));
    }

    #[test]
    fn test_search_recovers_from_cluster_errors() {
        let (table, index) = fixture();
        let features = FeatureMatrix::from_table(&table, crate::config::CoverageFeature::Ignore);
        let method = ClusterMethod::DensityMinSizeScan(MinSizeScan {
            max_cluster_size: 8,
            min_cluster_size: 6,
            step: 1,
            min_samples: None,
        });
        // Three rows can never hold a cluster of six.
        let outcome = search(&features, &[0, 1, 2], &index, &method, LENIENT, false).unwrap();
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.residual, vec![0, 1, 2]);
    }

    #[test]
    fn test_select_prefers_first_on_tie_and_stops_when_complete() {
        let candidate = |rows: Vec<usize>, completeness: f64| Candidate {
            rows,
            quality: Quality::new(completeness, 100.0),
        };
        let picked = select(
            vec![
                (ScanParameter::Eps(3.0), vec![candidate(vec![0, 1], 50.0)]),
                (ScanParameter::Eps(2.0), vec![candidate(vec![2, 3], 50.0)]),
                (ScanParameter::Eps(1.0), vec![candidate(vec![4, 5, 6], 50.0)]),
            ]
            .into_iter(),
        );
        assert_eq!(picked.map(|(p, _)| p), Some(ScanParameter::Eps(1.0)));

        let picked = select(
            vec![
                (ScanParameter::Eps(3.0), vec![candidate(vec![0, 1], 50.0)]),
                (ScanParameter::Eps(2.0), vec![candidate(vec![2, 3], 50.0)]),
            ]
            .into_iter(),
        );
        assert_eq!(picked.map(|(p, _)| p), Some(ScanParameter::Eps(3.0)));

        let picked = select(
            vec![
                (ScanParameter::Eps(3.0), vec![candidate(vec![0, 1], 100.0)]),
                (ScanParameter::Eps(2.0), Vec::new()),
                (ScanParameter::Eps(1.0), vec![candidate(vec![0, 1, 2, 3], 100.0)]),
            ]
            .into_iter(),
        );
        assert_eq!(picked.map(|(p, _)| p), Some(ScanParameter::Eps(3.0)));
    }
}
