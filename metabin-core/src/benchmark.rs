//! Agreement between predicted bins and reference genome assignments.
//!
//! All information-theoretic scores use natural logarithms. Normalized mutual
//! information uses the geometric mean of the two entropies, adjusted mutual
//! information the arithmetic mean.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{MISASSEMBLED_LABEL, UNCLUSTERED_LABEL};
use crate::types::MetabinError;

/// External clustering scores of one prediction against a reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusteringMetrics {
    pub adjusted_mutual_info: f64,
    pub normalized_mutual_info: f64,
    pub adjusted_rand: f64,
    pub homogeneity: f64,
    pub completeness: f64,
    pub v_measure: f64,
    pub fowlkes_mallows: f64,
}

/// Metrics of one prediction table, labelled by its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub predictions: String,
    #[serde(flatten)]
    pub metrics: ClusteringMetrics,
}

/// Pairs each predicted contig with its reference genome and scores the result.
///
/// Reference rows for contigs that were not predicted are ignored, as are
/// rows labelled `misassembled`. Contigs with no usable reference share one
/// missing-reference label; unclustered contigs share one missing-bin label.
///
/// # Errors
///
/// [`MetabinError::TableFormat`] when a contig is predicted twice or there is
/// nothing to compare.
pub fn compare(
    predictions: &[(String, String)],
    reference: &HashMap<String, String>,
) -> Result<ClusteringMetrics, MetabinError> {
    let mut seen = HashSet::with_capacity(predictions.len());
    let mut truth = LabelEncoder::default();
    let mut pred = LabelEncoder::default();
    let mut truth_labels = Vec::with_capacity(predictions.len());
    let mut pred_labels = Vec::with_capacity(predictions.len());
    let mut missing_reference = 0usize;

    for (contig, cluster) in predictions {
        if !seen.insert(contig.as_str()) {
            return Err(MetabinError::TableFormat(format!(
                "contig {contig} appears more than once in the predictions"
            )));
        }
        let genome = reference
            .get(contig)
            .map(String::as_str)
            .filter(|genome| *genome != MISASSEMBLED_LABEL);
        if genome.is_none() {
            missing_reference += 1;
        }
        let bin = Some(cluster.as_str()).filter(|bin| *bin != UNCLUSTERED_LABEL);
        truth_labels.push(truth.encode(genome));
        pred_labels.push(pred.encode(bin));
    }

    if missing_reference > 0 {
        warn!(
            contigs = missing_reference,
            "Predicted contigs without a reference genome"
        );
    }
    debug!(
        contigs = truth_labels.len(),
        genomes = truth.len(),
        bins = pred.len(),
        "Comparing assignments"
    );
    clustering_metrics(&truth_labels, &pred_labels)
}

/// Scores `pred` against `truth`; both are integer labelings of the same points.
///
/// # Errors
///
/// [`MetabinError::TableFormat`] when the labelings are empty or differ in
/// length.
pub fn clustering_metrics(
    truth: &[usize],
    pred: &[usize],
) -> Result<ClusteringMetrics, MetabinError> {
    if truth.len() != pred.len() {
        return Err(MetabinError::TableFormat(format!(
            "labelings differ in length ({} and {})",
            truth.len(),
            pred.len()
        )));
    }
    if truth.is_empty() {
        return Err(MetabinError::TableFormat(
            "no contigs to compare".to_string(),
        ));
    }

    let table = Contingency::new(truth, pred);
    let (homogeneity, completeness, v_measure) = table.homogeneity_completeness_v();
    Ok(ClusteringMetrics {
        adjusted_mutual_info: table.adjusted_mutual_info(),
        normalized_mutual_info: table.normalized_mutual_info(),
        adjusted_rand: table.adjusted_rand(),
        homogeneity,
        completeness,
        v_measure,
        fowlkes_mallows: table.fowlkes_mallows(),
    })
}

/// Dense ids for labels in first-seen order
#[derive(Default)]
struct LabelEncoder<'a> {
    ids: HashMap<Option<&'a str>, usize>,
}

impl<'a> LabelEncoder<'a> {
    fn encode(&mut self, label: Option<&'a str>) -> usize {
        let next = self.ids.len();
        *self.ids.entry(label).or_insert(next)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Sparse contingency table with its marginals
struct Contingency {
    n: usize,
    /// Non-zero cells as (truth, pred, count)
    cells: Vec<(usize, usize, usize)>,
    truth_sizes: Vec<usize>,
    pred_sizes: Vec<usize>,
}

impl Contingency {
    fn new(truth: &[usize], pred: &[usize]) -> Self {
        let mut truth_ids = HashMap::new();
        let mut pred_ids = HashMap::new();
        let mut truth_sizes = Vec::new();
        let mut pred_sizes = Vec::new();
        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        for (&t, &p) in truth.iter().zip(pred) {
            let t = dense_id(&mut truth_ids, &mut truth_sizes, t);
            let p = dense_id(&mut pred_ids, &mut pred_sizes, p);
            *counts.entry((t, p)).or_insert(0) += 1;
        }
        let mut cells: Vec<_> = counts.into_iter().map(|((t, p), c)| (t, p, c)).collect();
        cells.sort_unstable();
        Self {
            n: truth.len(),
            cells,
            truth_sizes,
            pred_sizes,
        }
    }

    fn single_clusters(&self) -> bool {
        self.truth_sizes.len() == 1 && self.pred_sizes.len() == 1
    }

    fn mutual_info(&self) -> f64 {
        let n = self.n as f64;
        self.cells
            .iter()
            .map(|&(t, p, count)| {
                let count = count as f64;
                let a = self.truth_sizes[t] as f64;
                let b = self.pred_sizes[p] as f64;
                count / n * (n * count / (a * b)).ln()
            })
            .sum::<f64>()
            .max(0.0)
    }

    fn homogeneity_completeness_v(&self) -> (f64, f64, f64) {
        let mi = self.mutual_info();
        let h_truth = entropy(&self.truth_sizes, self.n);
        let h_pred = entropy(&self.pred_sizes, self.n);
        let homogeneity = if h_truth > 0.0 { mi / h_truth } else { 1.0 };
        let completeness = if h_pred > 0.0 { mi / h_pred } else { 1.0 };
        let v_measure = if homogeneity + completeness > 0.0 {
            2.0 * homogeneity * completeness / (homogeneity + completeness)
        } else {
            0.0
        };
        (homogeneity, completeness, v_measure)
    }

    fn normalized_mutual_info(&self) -> f64 {
        if self.single_clusters() {
            return 1.0;
        }
        let mi = self.mutual_info();
        if mi == 0.0 {
            return 0.0;
        }
        let h_truth = entropy(&self.truth_sizes, self.n);
        let h_pred = entropy(&self.pred_sizes, self.n);
        mi / (h_truth * h_pred).sqrt()
    }

    fn adjusted_mutual_info(&self) -> f64 {
        if self.single_clusters() {
            return 1.0;
        }
        let mi = self.mutual_info();
        let emi = self.expected_mutual_info();
        let h_truth = entropy(&self.truth_sizes, self.n);
        let h_pred = entropy(&self.pred_sizes, self.n);
        let mut denominator = (h_truth + h_pred) / 2.0 - emi;
        denominator = if denominator < 0.0 {
            denominator.min(-f64::EPSILON)
        } else {
            denominator.max(f64::EPSILON)
        };
        (mi - emi) / denominator
    }

    /// Mutual information expected between random labelings with the same
    /// marginals (hypergeometric model).
    fn expected_mutual_info(&self) -> f64 {
        if self.truth_sizes.len() == 1 || self.pred_sizes.len() == 1 {
            return 0.0;
        }
        let n = self.n;
        let nf = n as f64;
        let ln_fact = ln_factorials(n);
        let mut emi = 0.0;
        for &a in &self.truth_sizes {
            for &b in &self.pred_sizes {
                let start = (a + b).saturating_sub(n).max(1);
                let end = a.min(b);
                for nij in start..=end {
                    let nij_f = nij as f64;
                    let term1 = nij_f / nf;
                    let term2 = (nf * nij_f).ln() - (a as f64).ln() - (b as f64).ln();
                    let ln_term3 = ln_fact[a] + ln_fact[b] + ln_fact[n - a] + ln_fact[n - b]
                        - ln_fact[n]
                        - ln_fact[nij]
                        - ln_fact[a - nij]
                        - ln_fact[b - nij]
                        - ln_fact[n + nij - a - b];
                    emi += term1 * term2 * ln_term3.exp();
                }
            }
        }
        emi
    }

    fn sum_squares(&self) -> f64 {
        self.cells
            .iter()
            .map(|&(_, _, count)| (count as f64).powi(2))
            .sum()
    }

    /// Adjusted Rand index from the pair confusion matrix
    fn adjusted_rand(&self) -> f64 {
        let n = self.n as f64;
        let sum_squares = self.sum_squares();
        let truth_squares: f64 = self.truth_sizes.iter().map(|&a| (a as f64).powi(2)).sum();
        let pred_squares: f64 = self.pred_sizes.iter().map(|&b| (b as f64).powi(2)).sum();

        let tp = sum_squares - n;
        let fp = pred_squares - sum_squares;
        let fn_ = truth_squares - sum_squares;
        let tn = n * n - fp - fn_ - sum_squares;
        if fn_ == 0.0 && fp == 0.0 {
            return 1.0;
        }
        2.0 * (tp * tn - fn_ * fp) / ((tp + fn_) * (fn_ + tn) + (tp + fp) * (fp + tn))
    }

    fn fowlkes_mallows(&self) -> f64 {
        let n = self.n as f64;
        let tk = self.sum_squares() - n;
        if tk == 0.0 {
            return 0.0;
        }
        let pk = self.pred_sizes.iter().map(|&b| (b as f64).powi(2)).sum::<f64>() - n;
        let qk = self.truth_sizes.iter().map(|&a| (a as f64).powi(2)).sum::<f64>() - n;
        (tk / pk).sqrt() * (tk / qk).sqrt()
    }
}

/// Maps `label` to a dense id and counts it
fn dense_id(ids: &mut HashMap<usize, usize>, sizes: &mut Vec<usize>, label: usize) -> usize {
    let id = *ids.entry(label).or_insert(sizes.len());
    if id == sizes.len() {
        sizes.push(0);
    }
    sizes[id] += 1;
    id
}

fn entropy(sizes: &[usize], n: usize) -> f64 {
    let n = n as f64;
    sizes
        .iter()
        .map(|&size| {
            let p = size as f64 / n;
            -p * p.ln()
        })
        .sum()
}

/// `ln(k!)` for `k` in `0..=n`
fn ln_factorials(n: usize) -> Vec<f64> {
    let mut table = Vec::with_capacity(n + 1);
    table.push(0.0);
    let mut acc = 0.0;
    for k in 1..=n {
        acc += (k as f64).ln();
        table.push(acc);
    }
    table
}
