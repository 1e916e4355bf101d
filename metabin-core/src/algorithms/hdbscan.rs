//! HDBSCAN over Euclidean distance.
//!
//! The pipeline follows the usual formulation:
//!
//! 1. core distance of every point: distance to its `min_samples`-th nearest
//!    neighbour, the point itself counting as the first
//! 2. minimum spanning tree of the mutual reachability graph
//!    `max(core(a), core(b), d(a, b))` (Prim, quadratic time, linear memory)
//! 3. single linkage hierarchy from the sorted tree edges
//! 4. condensed tree: splits that leave fewer than `min_cluster_size` points
//!    on a side are treated as points falling out of the parent cluster
//! 5. excess-of-mass selection of the most stable clusters; the root is never
//!    selected, so a single homogeneous blob is reported as noise

use super::{ClusterError, Clustering, Labeling, euclidean, relabel_by_first_member};

/// Merge distances are floored here so that duplicate points get a large but
/// finite lambda.
const MIN_MERGE_DISTANCE: f64 = 1e-12;

/// HDBSCAN with excess-of-mass cluster selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hdbscan {
    pub min_cluster_size: usize,
    pub min_samples: usize,
}

impl Hdbscan {
    /// `min_samples` defaults to `min_cluster_size` when `None`.
    #[must_use]
    pub fn new(min_cluster_size: usize, min_samples: Option<usize>) -> Self {
        Self {
            min_cluster_size,
            min_samples: min_samples.unwrap_or(min_cluster_size),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    child_size: usize,
}

impl Clustering for Hdbscan {
    fn fit_predict(&self, points: &[&[f64]]) -> Result<Labeling, ClusterError> {
        if self.min_cluster_size < 2 {
            return Err(ClusterError::InvalidParameter(format!(
                "min_cluster_size must be at least 2, got {}",
                self.min_cluster_size
            )));
        }
        if self.min_samples == 0 {
            return Err(ClusterError::InvalidParameter(
                "min_samples must be at least 1".to_string(),
            ));
        }
        let n = points.len();
        let required = self.min_cluster_size.max(self.min_samples);
        if n < required {
            return Err(ClusterError::TooFewPoints {
                points: n,
                required,
            });
        }

        let core = core_distances(points, self.min_samples);
        let tree = spanning_tree(points, &core);
        let merges = single_linkage(n, tree);
        let (condensed, n_clusters) = condense(&merges, n, self.min_cluster_size);
        let selected = select_clusters(&condensed, n, n_clusters);
        Ok(label_points(&condensed, &selected, n, n_clusters))
    }
}

/// Distance of every point to its `min_samples`-th nearest neighbour, self
/// included. One scratch row is reused, so memory stays linear.
fn core_distances(points: &[&[f64]], min_samples: usize) -> Vec<f64> {
    let mut row = vec![0.0; points.len()];
    points
        .iter()
        .map(|point| {
            for (slot, other) in row.iter_mut().zip(points) {
                *slot = euclidean(point, other);
            }
            *row.select_nth_unstable_by(min_samples - 1, f64::total_cmp).1
        })
        .collect()
}

/// Prim's algorithm on the implicit mutual reachability graph; distances are
/// computed as each point joins the tree.
fn spanning_tree(points: &[&[f64]], core: &[f64]) -> Vec<(usize, usize, f64)> {
    let n = points.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut nearest = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[current] = true;
    for _ in 1..n {
        for other in 0..n {
            if in_tree[other] {
                continue;
            }
            let reach = euclidean(points[current], points[other])
                .max(core[current])
                .max(core[other]);
            if reach < best[other] {
                best[other] = reach;
                nearest[other] = current;
            }
        }

        let mut next = None;
        for other in 0..n {
            if !in_tree[other] && next.is_none_or(|chosen: usize| best[other] < best[chosen]) {
                next = Some(other);
            }
        }
        let Some(next) = next else { break };
        edges.push((nearest[next], next, best[next]));
        in_tree[next] = true;
        current = next;
    }
    edges
}

/// Union-find over points and merge nodes; merge `k` becomes node `n + k`.
struct LinkageForest {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl LinkageForest {
    fn new(n: usize) -> Self {
        let nodes = 2 * n - 1;
        Self {
            parent: (0..nodes).collect(),
            size: (0..nodes).map(|node| usize::from(node < n)).collect(),
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }
}

fn single_linkage(n: usize, mut tree: Vec<(usize, usize, f64)>) -> Vec<Merge> {
    tree.sort_by(|a, b| a.2.total_cmp(&b.2));
    let mut forest = LinkageForest::new(n);
    let mut merges = Vec::with_capacity(tree.len());
    for (k, (a, b, distance)) in tree.into_iter().enumerate() {
        let left = forest.find(a);
        let right = forest.find(b);
        let node = n + k;
        let size = forest.size[left] + forest.size[right];
        forest.parent[left] = node;
        forest.parent[right] = node;
        forest.size[node] = size;
        merges.push(Merge {
            left,
            right,
            distance,
            size,
        });
    }
    merges
}

fn node_size(merges: &[Merge], n: usize, node: usize) -> usize {
    if node < n { 1 } else { merges[node - n].size }
}

/// Points under `node` in the single linkage hierarchy.
fn leaves(merges: &[Merge], n: usize, node: usize) -> Vec<usize> {
    let mut stack = vec![node];
    let mut points = Vec::new();
    while let Some(node) = stack.pop() {
        if node < n {
            points.push(node);
        } else {
            let merge = merges[node - n];
            stack.push(merge.right);
            stack.push(merge.left);
        }
    }
    points
}

/// Condenses the hierarchy. Cluster ids are numbered from zero (the root)
/// in breadth-first order, so every child id is larger than its parent's.
fn condense(merges: &[Merge], n: usize, min_cluster_size: usize) -> (Vec<CondensedEdge>, usize) {
    let root = 2 * n - 2;
    let mut cluster_of = vec![usize::MAX; 2 * n - 1];
    cluster_of[root] = 0;
    let mut n_clusters = 1;
    let mut edges = Vec::new();

    let mut queue = std::collections::VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        if node < n {
            continue;
        }
        let merge = merges[node - n];
        let parent = cluster_of[node];
        let lambda = 1.0 / merge.distance.max(MIN_MERGE_DISTANCE);
        let left_size = node_size(merges, n, merge.left);
        let right_size = node_size(merges, n, merge.right);
        let left_big = left_size >= min_cluster_size;
        let right_big = right_size >= min_cluster_size;

        for (child, child_size, big) in [
            (merge.left, left_size, left_big),
            (merge.right, right_size, right_big),
        ] {
            if big && left_big && right_big {
                cluster_of[child] = n_clusters;
                edges.push(CondensedEdge {
                    parent,
                    child: n + n_clusters,
                    lambda,
                    child_size,
                });
                n_clusters += 1;
                queue.push_back(child);
            } else if big {
                cluster_of[child] = parent;
                queue.push_back(child);
            } else {
                for point in leaves(merges, n, child) {
                    edges.push(CondensedEdge {
                        parent,
                        child: point,
                        lambda,
                        child_size: 1,
                    });
                }
            }
        }
    }
    (edges, n_clusters)
}

/// Excess-of-mass selection; returns one flag per cluster id.
fn select_clusters(edges: &[CondensedEdge], n: usize, n_clusters: usize) -> Vec<bool> {
    let mut birth = vec![0.0; n_clusters];
    let mut children = vec![Vec::new(); n_clusters];
    for edge in edges.iter().filter(|edge| edge.child >= n) {
        let cluster = edge.child - n;
        birth[cluster] = edge.lambda;
        children[edge.parent].push(cluster);
    }

    let mut stability = vec![0.0; n_clusters];
    for edge in edges {
        stability[edge.parent] += (edge.lambda - birth[edge.parent]) * edge.child_size as f64;
    }

    let mut selected = vec![false; n_clusters];
    for cluster in (1..n_clusters).rev() {
        let subtree: f64 = children[cluster].iter().map(|&c| stability[c]).sum();
        if subtree > stability[cluster] {
            stability[cluster] = subtree;
        } else {
            selected[cluster] = true;
            let mut stack = children[cluster].clone();
            while let Some(descendant) = stack.pop() {
                selected[descendant] = false;
                stack.extend_from_slice(&children[descendant]);
            }
        }
    }
    selected
}

fn label_points(edges: &[CondensedEdge], selected: &[bool], n: usize, n_clusters: usize) -> Labeling {
    let mut parent_cluster = vec![0usize; n_clusters];
    let mut point_cluster = vec![0usize; n];
    for edge in edges {
        if edge.child >= n {
            parent_cluster[edge.child - n] = edge.parent;
        } else {
            point_cluster[edge.child] = edge.parent;
        }
    }

    let mut labels: Labeling = point_cluster
        .into_iter()
        .map(|mut cluster| {
            while cluster != 0 && !selected[cluster] {
                cluster = parent_cluster[cluster];
            }
            (cluster != 0).then_some(cluster)
        })
        .collect();
    relabel_by_first_member(&mut labels);
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::group_labels;

    fn blob(cx: f64, cy: f64) -> Vec<[f64; 2]> {
        vec![
            [cx, cy],
            [cx + 0.1, cy],
            [cx, cy + 0.1],
            [cx + 0.1, cy + 0.1],
            [cx + 0.05, cy + 0.05],
        ]
    }

    fn as_points(data: &[[f64; 2]]) -> Vec<&[f64]> {
        data.iter().map(|p| p.as_slice()).collect()
    }

    #[test]
    fn test_hdbscan_two_blobs() {
        let mut data = blob(0.0, 0.0);
        data.extend(blob(10.0, 10.0));
        let labels = Hdbscan::new(3, None)
            .fit_predict(&as_points(&data))
            .unwrap();
        assert_eq!(
            group_labels(&labels),
            vec![vec![0, 1, 2, 3, 4], vec![5, 6, 7, 8, 9]]
        );
    }

    #[test]
    fn test_hdbscan_outlier_is_noise() {
        let mut data = blob(0.0, 0.0);
        data.extend(blob(10.0, 10.0));
        data.push([50.0, -50.0]);
        let labels = Hdbscan::new(3, Some(2))
            .fit_predict(&as_points(&data))
            .unwrap();
        assert_eq!(labels[10], None);
        assert!(labels[..5].iter().all(|label| *label == Some(0)));
        assert!(labels[5..10].iter().all(|label| *label == Some(1)));
    }

    #[test]
    fn test_hdbscan_single_blob_is_noise() {
        // Five points can never split into two sides of three.
        let data = blob(0.0, 0.0);
        let labels = Hdbscan::new(3, Some(2))
            .fit_predict(&as_points(&data))
            .unwrap();
        assert_eq!(labels, vec![None; 5]);
    }

    #[test]
    fn test_hdbscan_duplicate_points() {
        let mut data = vec![[0.0, 0.0]; 4];
        data.extend(vec![[8.0, 8.0]; 4]);
        let labels = Hdbscan::new(3, Some(3))
            .fit_predict(&as_points(&data))
            .unwrap();
        assert_eq!(
            group_labels(&labels),
            vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]
        );
    }

    #[test]
    fn test_hdbscan_too_few_points() {
        let data = blob(0.0, 0.0);
        assert_eq!(
            Hdbscan::new(6, None).fit_predict(&as_points(&data)),
            Err(ClusterError::TooFewPoints {
                points: 5,
                required: 6
            })
        );
        assert!(matches!(
            Hdbscan::new(2, Some(9)).fit_predict(&as_points(&data)),
            Err(ClusterError::TooFewPoints { .. })
        ));
        assert!(matches!(
            Hdbscan::new(1, None).fit_predict(&as_points(&data)),
            Err(ClusterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_hdbscan_is_deterministic() {
        let mut data = blob(0.0, 0.0);
        data.extend(blob(3.0, 0.0));
        data.extend(blob(0.0, 3.0));
        let points = as_points(&data);
        let model = Hdbscan::new(4, Some(3));
        assert_eq!(
            model.fit_predict(&points).unwrap(),
            model.fit_predict(&points).unwrap()
        );
    }

    #[test]
    fn test_core_distances_match_sorted_rows() {
        let mut data = blob(0.0, 0.0);
        data.extend(blob(2.0, 1.0));
        let points = as_points(&data);
        for min_samples in [1, 3, 7] {
            let expected: Vec<f64> = points
                .iter()
                .map(|a| {
                    let mut row: Vec<f64> = points.iter().map(|b| euclidean(a, b)).collect();
                    row.sort_by(f64::total_cmp);
                    row[min_samples - 1]
                })
                .collect();
            assert_eq!(core_distances(&points, min_samples), expected);
        }
    }

    #[test]
    fn test_hdbscan_three_groups_across_cluster_sizes() {
        let mut data = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)] {
            data.extend((0..30).map(|i| [cx + 0.01 * f64::from(i), cy]));
        }
        let points = as_points(&data);
        for min_cluster_size in [5, 10, 20] {
            let labels = Hdbscan::new(min_cluster_size, None)
                .fit_predict(&points)
                .unwrap();
            let sizes: Vec<usize> = group_labels(&labels).iter().map(Vec::len).collect();
            assert_eq!(sizes, vec![30, 30, 30], "min_cluster_size {min_cluster_size}");
        }
    }
}
