//! Classification metrics on held-out predictions.
//!
//! [`evaluate`] computes accuracy plus precision, recall and F1 of the
//! positive class (`1`), the confusion matrix, and a per-class
//! [`ClassificationReport`]. Any ratio with a zero denominator is `0.0`.

use crate::error::{LearningError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label of the positive class.
pub const POSITIVE_CLASS: usize = 1;

/// Binary confusion counts for the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    /// Count outcomes with `positive` as the positive class.
    pub fn from_labels(y_true: &[usize], y_pred: &[usize], positive: usize) -> Self {
        let mut matrix = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == positive, p == positive) {
                (true, true) => matrix.true_positive += 1,
                (false, true) => matrix.false_positive += 1,
                (false, false) => matrix.true_negative += 1,
                (true, false) => matrix.false_negative += 1,
            }
        }
        matrix
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1_score(&self) -> f64 {
        harmonic_mean(self.precision(), self.recall())
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// Headline metrics of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    /// Precision of the positive class.
    pub precision: f64,
    /// Recall of the positive class.
    pub recall: f64,
    /// F1 of the positive class.
    pub f1_score: f64,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
}

/// Precision, recall, F1 and support of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class table with accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    fn from_labels(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Self {
        let total = y_true.len();
        let classes: Vec<ClassScores> = (0..n_classes)
            .map(|class| {
                let cm = ConfusionMatrix::from_labels(y_true, y_pred, class);
                ClassScores {
                    label: class.to_string(),
                    precision: cm.precision(),
                    recall: cm.recall(),
                    f1_score: cm.f1_score(),
                    support: cm.true_positive + cm.false_negative,
                }
            })
            .collect();

        let n = classes.len() as f64;
        let macro_avg = ClassScores {
            label: "macro avg".to_string(),
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / n,
            support: total,
        };

        let weighted = |get: fn(&ClassScores) -> f64| {
            if total == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|c| get(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = ClassScores {
            label: "weighted avg".to_string(),
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
            support: total,
        };

        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();

        Self {
            accuracy: ratio(correct, total),
            classes,
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(std::iter::once(self.weighted_avg.label.len()))
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in &self.classes {
            write_scores(f, class, width)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        write_scores(f, &self.macro_avg, width)?;
        write_scores(f, &self.weighted_avg, width)
    }
}

fn write_scores(f: &mut fmt::Formatter<'_>, scores: &ClassScores, width: usize) -> fmt::Result {
    writeln!(
        f,
        "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        scores.label, scores.precision, scores.recall, scores.f1_score, scores.support
    )
}

/// Evaluate predictions against true labels.
///
/// # Errors
///
/// [`LearningError::InvalidData`] when the slices are empty or differ in length.
pub fn evaluate(y_true: &[usize], y_pred: &[usize]) -> Result<ClassificationMetrics> {
    if y_true.is_empty() {
        return Err(LearningError::InvalidData(
            "cannot evaluate an empty prediction set".to_string(),
        ));
    }
    if y_true.len() != y_pred.len() {
        return Err(LearningError::InvalidData(format!(
            "{} true labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }

    let n_classes = y_true
        .iter()
        .chain(y_pred)
        .copied()
        .max()
        .unwrap_or(0)
        .max(POSITIVE_CLASS)
        + 1;

    let confusion = ConfusionMatrix::from_labels(y_true, y_pred, POSITIVE_CLASS);
    let report = ClassificationReport::from_labels(y_true, y_pred, n_classes);

    Ok(ClassificationMetrics {
        accuracy: report.accuracy,
        precision: confusion.precision(),
        recall: confusion.recall(),
        f1_score: confusion.f1_score(),
        confusion,
        report,
    })
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn harmonic_mean(a: f64, b: f64) -> f64 {
    if a + b == 0.0 { 0.0 } else { 2.0 * a * b / (a + b) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_metrics_on_known_counts() {
        // TP=2, FP=1, TN=2, FN=1
        let y_true = [1, 1, 1, 0, 0, 0];
        let y_pred = [1, 1, 0, 1, 0, 0];
        let metrics = evaluate(&y_true, &y_pred).unwrap();

        assert_eq!(
            metrics.confusion,
            ConfusionMatrix {
                true_positive: 2,
                false_positive: 1,
                true_negative: 2,
                false_negative: 1,
            }
        );
        assert!((metrics.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert!((metrics.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics.f1_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_denominators_are_zero() {
        // the positive class is never predicted nor present
        let metrics = evaluate(&[0, 0, 0], &[0, 0, 0]).unwrap();
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.f1_score, 0.0);
        assert_eq!(metrics.report.classes.len(), 2);
        assert_eq!(metrics.report.classes[1].support, 0);
    }

    #[test]
    fn test_report_averages() {
        let y_true = [0, 0, 0, 1];
        let y_pred = [0, 0, 1, 1];
        let report = evaluate(&y_true, &y_pred).unwrap().report;

        // class 0: p=1, r=2/3; class 1: p=1/2, r=1
        assert!((report.macro_avg.precision - 0.75).abs() < 1e-12);
        assert!((report.weighted_avg.recall - 0.75).abs() < 1e-12);
        assert_eq!(report.macro_avg.support, 4);
    }

    #[test]
    fn test_report_display_layout() {
        let report = evaluate(&[0, 1, 1, 0], &[0, 1, 0, 0]).unwrap().report;
        let text = report.to_string();

        assert!(text.contains("precision"));
        assert!(text.contains("f1-score"));
        assert!(text.contains("accuracy"));
        assert!(text.contains("macro avg"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("0.75"));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(evaluate(&[], &[]).is_err());
        assert!(evaluate(&[0, 1], &[0]).is_err());
    }
}
