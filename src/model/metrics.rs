//! Holdout evaluation for the binary delay classifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 2x2 confusion matrix; the positive class is "delayed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: u32,
    pub false_positive: u32,
    pub false_negative: u32,
    pub true_positive: u32,
}

impl ConfusionMatrix {
    pub fn from_labels(truth: &[bool], predicted: &[bool]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            cm.add(t, p);
        }
        cm
    }

    pub fn add(&mut self, truth: bool, predicted: bool) {
        let slot = match (truth, predicted) {
            (false, false) => &mut self.true_negative,
            (false, true) => &mut self.false_positive,
            (true, false) => &mut self.false_negative,
            (true, true) => &mut self.true_positive,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u32 {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: u32,
}

impl ClassMetrics {
    fn from_counts(tp: u32, fp: u32, fn_: u32) -> Self {
        let ratio = |num: u32, den: u32| if den == 0 { 0.0 } else { num as f32 / den as f32 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub confusion: ConfusionMatrix,
    /// On-time flights (label 0).
    pub on_time: ClassMetrics,
    /// Delayed flights (label 1).
    pub delayed: ClassMetrics,
    pub accuracy: f32,
}

impl ClassificationReport {
    pub fn new(truth: &[bool], predicted: &[bool]) -> Self {
        let cm = ConfusionMatrix::from_labels(truth, predicted);
        let total = cm.total();
        Self {
            on_time: ClassMetrics::from_counts(cm.true_negative, cm.false_negative, cm.false_positive),
            delayed: ClassMetrics::from_counts(cm.true_positive, cm.false_positive, cm.false_negative),
            accuracy: if total == 0 {
                0.0
            } else {
                (cm.true_negative + cm.true_positive) as f32 / total as f32
            },
            confusion: cm,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for (name, m) in [("0", &self.on_time), ("1", &self.delayed)] {
            writeln!(
                f,
                "{:>10} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f, "{:>10} {:>29.2} {:>9}", "accuracy", self.accuracy, self.confusion.total())?;
        write!(
            f,
            "confusion [[{} {}] [{} {}]]",
            self.confusion.true_negative,
            self.confusion.false_positive,
            self.confusion.false_negative,
            self.confusion.true_positive
        )
    }
}
