//! Evaluation metrics for classification models.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Display names of the two diagnosis classes, indexed by label.
pub const CLASS_NAMES: [&str; 2] = ["healthy", "parkinsons"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Tally paired labels; pairs outside `0..n_classes` are ignored.
    pub fn from_labels(n_classes: usize, truth: &[usize], predicted: &[usize]) -> Self {
        let mut cm = Self::new(n_classes);
        for (&t, &p) in truth.iter().zip(predicted) {
            cm.add(t, p);
        }
        cm
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&v| u64::from(v)).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Harmonic mean of precision and recall.
    pub f1: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision, recall and F1 from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f32;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        stats.push(PerClassStats {
            precision,
            recall,
            f1: f1_score(precision, recall),
            support,
        });
    }
    stats
}

fn f1_score(precision: f32, recall: f32) -> f32 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let mut correct = 0u64;
    let mut total = 0u64;
    for truth in 0..cm.n_classes {
        for predicted in 0..cm.n_classes {
            let v = cm.get(truth, predicted) as u64;
            total += v;
            if truth == predicted {
                correct += v;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        (correct as f32) / (total as f32)
    }
}

/// Render a per-class precision/recall/F1 table with accuracy and macro averages.
pub fn classification_report(cm: &ConfusionMatrix, class_names: &[&str]) -> String {
    let stats = precision_recall_by_class(cm);
    let name_width = class_names
        .iter()
        .map(|name| name.len())
        .chain(["macro avg".len()])
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>name_width$} {:>9} {:>9} {:>9} {:>9}",
        "", "precision", "recall", "f1-score", "support"
    );
    for (idx, class) in stats.iter().enumerate() {
        let fallback = idx.to_string();
        let name = class_names.get(idx).copied().unwrap_or(fallback.as_str());
        let _ = writeln!(
            out,
            "{name:>name_width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            class.precision, class.recall, class.f1, class.support
        );
    }
    let total = cm.total();
    let k = stats.len().max(1) as f32;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:>name_width$} {:>9} {:>9} {:>9.2} {:>9}",
        "accuracy",
        "",
        "",
        accuracy(cm),
        total
    );
    let _ = writeln!(
        out,
        "{:>name_width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        "macro avg",
        stats.iter().map(|s| s.precision).sum::<f32>() / k,
        stats.iter().map(|s| s.recall).sum::<f32>() / k,
        stats.iter().map(|s| s.f1).sum::<f32>() / k,
        total
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix() -> ConfusionMatrix {
        // truth 0: 3 right, 1 wrong; truth 1: 5 right, 1 wrong
        ConfusionMatrix::from_labels(
            2,
            &[0, 0, 0, 0, 1, 1, 1, 1, 1, 1],
            &[0, 0, 0, 1, 1, 1, 1, 1, 1, 0],
        )
    }

    #[test]
    fn per_class_stats_include_f1() {
        let stats = precision_recall_by_class(&sample_matrix());
        assert_eq!(stats[0].support, 4);
        assert_eq!(stats[1].support, 6);
        assert!((stats[0].precision - 0.75).abs() < 1e-6);
        assert!((stats[0].recall - 0.75).abs() < 1e-6);
        assert!((stats[0].f1 - 0.75).abs() < 1e-6);
        assert!((stats[1].recall - 5.0 / 6.0).abs() < 1e-6);
        assert!((accuracy(&sample_matrix()) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_labels_are_ignored() {
        let cm = ConfusionMatrix::from_labels(2, &[0, 2], &[0, 0]);
        assert_eq!(cm.total(), 1);
    }

    #[test]
    fn report_lists_classes_and_summary_rows() {
        let report = classification_report(&sample_matrix(), &CLASS_NAMES);
        assert!(report.contains("precision"));
        assert!(report.contains("healthy"));
        assert!(report.contains("parkinsons"));
        assert!(report.contains("accuracy"));
        assert!(report.contains("0.80"));
        assert!(report.contains("macro avg"));
    }
}
