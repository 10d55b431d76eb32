//! Held-out evaluation metrics

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fraction of predictions equal to the truth
#[must_use]
pub fn accuracy(y_true: &[bool], y_pred: &[bool]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Area under the ROC curve via the Mann-Whitney rank statistic
///
/// Tied scores receive their average rank. Returns `None` when only one
/// class is present.
#[must_use]
pub fn roc_auc(y_true: &[bool], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&t| t).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        start = end;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(t, _)| **t)
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Test-set evaluation of a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    /// `None` when the test set holds a single class
    pub auc: Option<f64>,
    pub test_rows: usize,
    pub test_positives: usize,
    pub train_rows: usize,
}

impl EvaluationReport {
    /// Evaluate probabilities against the truth
    #[must_use]
    pub fn from_predictions(y_true: &[bool], probabilities: &[f64], threshold: f64, train_rows: usize) -> Self {
        let y_pred: Vec<bool> = probabilities.iter().map(|&p| p > threshold).collect();
        Self {
            accuracy: accuracy(y_true, &y_pred),
            auc: roc_auc(y_true, probabilities),
            test_rows: y_true.len(),
            test_positives: y_true.iter().filter(|&&t| t).count(),
            train_rows,
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Evaluation on held-out test set:")?;
        writeln!(f, "  Train Rows: {}", self.train_rows)?;
        writeln!(f, "  Test Rows: {} ({} positive)", self.test_rows, self.test_positives)?;
        writeln!(f, "  Test Accuracy: {:.4}", self.accuracy)?;
        match self.auc {
            Some(auc) => write!(f, "  Test AUC: {auc:.4}"),
            None => write!(f, "  Test AUC: undefined (single class in test set)"),
        }
    }
}
