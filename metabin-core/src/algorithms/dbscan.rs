use std::collections::VecDeque;

use super::{ClusterError, Clustering, Labeling, euclidean};

/// DBSCAN with Euclidean distance.
///
/// A point is a core point when at least `min_samples` points (itself
/// included) lie within `eps`. Border points join the first cluster that
/// reaches them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dbscan {
    pub eps: f64,
    pub min_samples: usize,
}

impl Dbscan {
    #[must_use]
    pub const fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    fn neighbours(&self, points: &[&[f64]], index: usize) -> Vec<usize> {
        let query = points[index];
        points
            .iter()
            .enumerate()
            .filter(|(_, point)| euclidean(query, point) <= self.eps)
            .map(|(i, _)| i)
            .collect()
    }
}

impl Clustering for Dbscan {
    fn fit_predict(&self, points: &[&[f64]]) -> Result<Labeling, ClusterError> {
        if !(self.eps.is_finite() && self.eps > 0.0) {
            return Err(ClusterError::InvalidParameter(format!(
                "eps must be positive, got {}",
                self.eps
            )));
        }
        if self.min_samples == 0 {
            return Err(ClusterError::InvalidParameter(
                "min_samples must be at least 1".to_string(),
            ));
        }

        let n = points.len();
        let mut labels: Labeling = vec![None; n];
        let mut visited = vec![false; n];
        let mut next_cluster = 0;

        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let neighbours = self.neighbours(points, start);
            if neighbours.len() < self.min_samples {
                continue;
            }

            let cluster = next_cluster;
            next_cluster += 1;
            labels[start] = Some(cluster);

            let mut seeds: VecDeque<usize> = neighbours.into_iter().collect();
            while let Some(point) = seeds.pop_front() {
                if labels[point].is_none() {
                    labels[point] = Some(cluster);
                }
                if visited[point] {
                    continue;
                }
                visited[point] = true;
                let reachable = self.neighbours(points, point);
                if reachable.len() >= self.min_samples {
                    seeds.extend(reachable.into_iter().filter(|&q| !visited[q]));
                }
            }
        }

        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_points(data: &[[f64; 2]]) -> Vec<&[f64]> {
        data.iter().map(|p| p.as_slice()).collect()
    }

    #[test]
    fn test_dbscan_two_clusters() {
        let data = [
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1],
        ];
        let labels = Dbscan::new(0.3, 2).fit_predict(&as_points(&data)).unwrap();
        assert_eq!(
            labels,
            vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)]
        );
    }

    #[test]
    fn test_dbscan_marks_noise() {
        let data = [[0.0, 0.0], [0.1, 0.1], [0.2, 0.0], [9.0, 9.0]];
        let labels = Dbscan::new(0.5, 3).fit_predict(&as_points(&data)).unwrap();
        assert_eq!(labels[..3], [Some(0), Some(0), Some(0)]);
        assert_eq!(labels[3], None);
    }

    #[test]
    fn test_dbscan_border_point_joins_cluster() {
        // Point 3 only has two neighbours (itself and point 2): a border point.
        let data = [[0.0, 0.0], [0.5, 0.0], [1.0, 0.0], [1.9, 0.0]];
        let labels = Dbscan::new(1.0, 3).fit_predict(&as_points(&data)).unwrap();
        assert_eq!(labels, vec![Some(0), Some(0), Some(0), Some(0)]);
    }

    #[test]
    fn test_dbscan_min_samples_one_labels_everything() {
        let data = [[0.0, 0.0], [10.0, 10.0]];
        let labels = Dbscan::new(0.5, 1).fit_predict(&as_points(&data)).unwrap();
        assert_eq!(labels, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_dbscan_empty_input() {
        let labels = Dbscan::new(0.5, 2).fit_predict(&[]).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn test_dbscan_rejects_bad_parameters() {
        let data = [[0.0, 0.0]];
        assert!(matches!(
            Dbscan::new(0.0, 2).fit_predict(&as_points(&data)),
            Err(ClusterError::InvalidParameter(_))
        ));
        assert!(Dbscan::new(1.0, 0).fit_predict(&as_points(&data)).is_err());
    }
}
