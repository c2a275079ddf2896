//! Classification metrics: precision, recall, F1 and the confusion matrix.
//!
//! Undefined ratios (no predictions or no support for a class) count as 0.

/// Per-class scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    /// TP / (TP + FP).
    pub precision: f64,
    /// TP / (TP + FN).
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Number of true instances.
    pub support: usize,
}

/// Held-out evaluation summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    /// Scores indexed by class code.
    pub per_class: Vec<ClassMetrics>,
    /// Support-weighted precision.
    pub precision: f64,
    /// Support-weighted recall.
    pub recall: f64,
    /// Support-weighted F1.
    pub f1: f64,
    /// Fraction of correct predictions.
    pub accuracy: f64,
    /// `confusion[true][predicted]` counts.
    pub confusion: Vec<Vec<usize>>,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Builds the full report.
///
/// Codes `>= n_classes` are ignored.
///
/// # Examples
///
/// ```
/// use dunk_analytics::classify::classification_report;
///
/// let r = classification_report(&[0, 0, 1, 1], &[0, 1, 1, 1], 2);
/// assert!((r.accuracy - 0.75).abs() < 1e-12);
/// assert_eq!(r.confusion, vec![vec![1, 1], vec![0, 2]]);
/// ```
pub fn classification_report(
    y_true: &[usize],
    y_pred: &[usize],
    n_classes: usize,
) -> ClassificationReport {
    let mut confusion = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < n_classes && p < n_classes {
            confusion[t][p] += 1;
        }
    }

    let total: usize = confusion.iter().flatten().sum();
    let correct: usize = (0..n_classes).map(|k| confusion[k][k]).sum();

    let per_class: Vec<ClassMetrics> = (0..n_classes)
        .map(|k| {
            let tp = confusion[k][k];
            let support: usize = confusion[k].iter().sum();
            let predicted: usize = confusion.iter().map(|row| row[k]).sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
        if total == 0 {
            return 0.0;
        }
        per_class
            .iter()
            .map(|m| f(m) * m.support as f64)
            .sum::<f64>()
            / total as f64
    };

    ClassificationReport {
        precision: weighted(|m| m.precision),
        recall: weighted(|m| m.recall),
        f1: weighted(|m| m.f1),
        accuracy: ratio(correct, total),
        per_class,
        confusion,
    }
}

/// Support-weighted F1 score.
pub fn weighted_f1(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> f64 {
    classification_report(y_true, y_pred, n_classes).f1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let y = [0, 1, 2, 2, 1, 0];
        let r = classification_report(&y, &y, 3);
        assert_eq!(r.f1, 1.0);
        assert_eq!(r.precision, 1.0);
        assert_eq!(r.recall, 1.0);
        assert_eq!(r.accuracy, 1.0);
    }

    #[test]
    fn weighted_f1_by_hand() {
        // class 0: tp=1, fp=0, fn=1 → p=1, r=0.5, f1=2/3, support 2
        // class 1: tp=2, fp=1, fn=0 → p=2/3, r=1, f1=0.8, support 2
        let r = classification_report(&[0, 0, 1, 1], &[0, 1, 1, 1], 2);
        let expected = (2.0 / 3.0 * 2.0 + 0.8 * 2.0) / 4.0;
        assert!((r.f1 - expected).abs() < 1e-12, "f1 = {}", r.f1);
        assert!((r.per_class[0].recall - 0.5).abs() < 1e-12);
        assert!((r.per_class[1].precision - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn never_predicted_class_scores_zero() {
        let r = classification_report(&[0, 1], &[0, 0], 2);
        assert_eq!(r.per_class[1].precision, 0.0);
        assert_eq!(r.per_class[1].f1, 0.0);
    }

    #[test]
    fn empty_input() {
        let r = classification_report(&[], &[], 2);
        assert_eq!(r.f1, 0.0);
        assert_eq!(r.accuracy, 0.0);
    }
}
