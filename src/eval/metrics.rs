//! Binary separability metrics over scored lines.
//!
//! ## Metrics Overview
//!
//! | Metric         | What it measures                                        | Range   |
//! |----------------|---------------------------------------------------------|---------|
//! | Sensitivity    | Fraction of anomalous lines scored above the threshold  | 0.0-1.0 |
//! | 1-Specificity  | Fraction of normal lines scored above the threshold     | 0.0-1.0 |
//! | AUC            | P(random anomalous line outscores random normal line)   | 0.0-1.0 |
//!
//! A line is *predicted* anomalous at threshold `t` when `score > t`, so a
//! higher score means "less like self". One label is designated anomalous;
//! every other label counts as normal.
//!
//! Scores are ordered and grouped with `f64::total_cmp`, so a stray NaN
//! sorts after `+inf` and forms its own tie group.

use serde::{Deserialize, Serialize};

/// Confusion counts at one threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confusion {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl Confusion {
    /// Classify `(label, score)` pairs at `threshold`.
    pub fn at_threshold<'a>(
        pairs: impl IntoIterator<Item = (&'a str, f64)>,
        anomalous_label: &str,
        threshold: f64,
    ) -> Self {
        let mut c = Confusion::default();
        for (label, score) in pairs {
            let actual = label == anomalous_label;
            let predicted = score > threshold;
            match (actual, predicted) {
                (true, true) => c.true_positive += 1,
                (true, false) => c.false_negative += 1,
                (false, true) => c.false_positive += 1,
                (false, false) => c.true_negative += 1,
            }
        }
        c
    }

    /// TP / (TP + FN); 0.0 when there are no anomalous lines.
    pub fn sensitivity(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// TN / (TN + FP); 0.0 when there are no normal lines.
    pub fn specificity(&self) -> f64 {
        ratio(self.true_negative, self.true_negative + self.false_positive)
    }
}

/// One point of a ROC curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    /// 1 - specificity.
    pub fpr: f64,
    /// Sensitivity.
    pub tpr: f64,
    /// Score threshold; `None` for the two synthetic end points.
    pub threshold: Option<f64>,
}

/// ROC curve by threshold sweep over the distinct scores, ascending.
///
/// ```text
/// (1, 1)  ──►  one point per distinct score  ──►  (0, 0)
/// ```
pub fn roc_curve(pairs: &[(&str, f64)], anomalous_label: &str) -> Vec<RocPoint> {
    let mut sorted: Vec<(bool, f64)> = pairs
        .iter()
        .map(|(label, score)| (*label == anomalous_label, *score))
        .collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let positives = sorted.iter().filter(|(anomalous, _)| *anomalous).count();
    let negatives = sorted.len() - positives;

    let mut curve = Vec::with_capacity(sorted.len() + 2);
    curve.push(RocPoint {
        fpr: 1.0,
        tpr: 1.0,
        threshold: None,
    });

    // Lines at or below the threshold are predicted normal.
    let mut below_pos = 0;
    let mut below_neg = 0;
    let mut i = 0;
    while i < sorted.len() {
        let threshold = sorted[i].1;
        while i < sorted.len() && sorted[i].1.total_cmp(&threshold).is_eq() {
            if sorted[i].0 {
                below_pos += 1;
            } else {
                below_neg += 1;
            }
            i += 1;
        }

        curve.push(RocPoint {
            fpr: ratio(negatives - below_neg, negatives),
            tpr: ratio(positives - below_pos, positives),
            threshold: Some(threshold),
        });
    }

    curve.push(RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: None,
    });
    curve
}

/// Rank-based area under the ROC curve (Mann–Whitney U), ties averaged.
///
/// `None` when either class is empty.
pub fn auc(pairs: &[(&str, f64)], anomalous_label: &str) -> Option<f64> {
    let mut sorted: Vec<(bool, f64)> = pairs
        .iter()
        .map(|(label, score)| (*label == anomalous_label, *score))
        .collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let positives = sorted.iter().filter(|(anomalous, _)| *anomalous).count();
    let negatives = sorted.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    // Sum of 1-based average ranks of the positives.
    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j].1.total_cmp(&sorted[i].1).is_eq() {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let tied_pos = sorted[i..j].iter().filter(|(anomalous, _)| *anomalous).count();
        rank_sum += avg_rank * tied_pos as f64;
        i = j;
    }

    let p = positives as f64;
    let u = rank_sum - p * (p + 1.0) / 2.0;
    Some(u / (p * negatives as f64))
}

/// Trapezoidal area under an ROC curve.
pub fn curve_area(curve: &[RocPoint]) -> f64 {
    curve
        .windows(2)
        .map(|w| (w[0].fpr - w[1].fpr).abs() * (w[0].tpr + w[1].tpr) / 2.0)
        .sum()
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_separation() {
        let pairs = [("0", 0.1), ("0", 0.2), ("1", 0.8), ("1", 0.9)];
        assert_eq!(auc(&pairs, "1"), Some(1.0));
    }

    #[test]
    fn test_inverted_separation() {
        let pairs = [("1", 0.1), ("0", 0.9)];
        assert_eq!(auc(&pairs, "1"), Some(0.0));
    }

    #[test]
    fn test_ties_count_half() {
        let pairs = [("0", 0.5), ("1", 0.5)];
        assert_eq!(auc(&pairs, "1"), Some(0.5));
    }

    #[test]
    fn test_single_class_has_no_auc() {
        let pairs = [("0", 0.1), ("0", 0.9)];
        assert_eq!(auc(&pairs, "1"), None);
    }

    #[test]
    fn test_auc_mixed() {
        // Positives at 0.4, 0.8; negatives at 0.1, 0.6.
        // Pairs won by positives: (0.4>0.1), (0.8>0.1), (0.8>0.6) = 3 of 4.
        let pairs = [("0", 0.1), ("1", 0.4), ("0", 0.6), ("1", 0.8)];
        assert!((auc(&pairs, "1").unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_curve_endpoints_and_thresholds() {
        let pairs = [("0", 0.1), ("1", 0.4), ("0", 0.6), ("1", 0.8)];
        let curve = roc_curve(&pairs, "1");

        assert_eq!(curve.len(), 6);
        assert_eq!((curve[0].fpr, curve[0].tpr), (1.0, 1.0));
        assert_eq!((curve[5].fpr, curve[5].tpr), (0.0, 0.0));

        // Threshold 0.1: one normal at or below → fpr 0.5, both anomalous above → tpr 1.
        assert_eq!(curve[1].threshold, Some(0.1));
        assert_eq!((curve[1].fpr, curve[1].tpr), (0.5, 1.0));
        // Threshold 0.8: nothing above.
        assert_eq!((curve[4].fpr, curve[4].tpr), (0.0, 0.0));
    }

    #[test]
    fn test_roc_curve_groups_equal_scores() {
        let pairs = [("0", 0.5), ("1", 0.5), ("1", 0.7)];
        let curve = roc_curve(&pairs, "1");
        let thresholds: Vec<_> = curve.iter().filter_map(|p| p.threshold).collect();
        assert_eq!(thresholds, vec![0.5, 0.7]);
    }

    #[test]
    fn test_curve_area_matches_rank_auc() {
        let pairs = [
            ("0", 0.1),
            ("1", 0.4),
            ("0", 0.6),
            ("1", 0.8),
            ("0", 0.8),
            ("1", 0.95),
        ];
        let area = curve_area(&roc_curve(&pairs, "1"));
        let rank = auc(&pairs, "1").unwrap();
        assert!((area - rank).abs() < 1e-12, "{area} vs {rank}");
    }

    #[test]
    fn test_non_finite_scores_terminate() {
        let pairs = [("0", 0.1), ("1", f64::NAN), ("1", f64::INFINITY), ("0", f64::NAN)];

        // NaN sorts above +inf; the two NaNs tie.
        let rank = auc(&pairs, "1").unwrap();
        assert!((rank - 0.625).abs() < 1e-12, "got {rank}");

        let curve = roc_curve(&pairs, "1");
        assert_eq!(curve.len(), 5, "one point per distinct score plus two ends");
        assert_eq!((curve[4].fpr, curve[4].tpr), (0.0, 0.0));
    }

    #[test]
    fn test_confusion_at_threshold() {
        let pairs = [("0", 0.1), ("1", 0.4), ("0", 0.6), ("1", 0.8)];
        let c = Confusion::at_threshold(pairs.iter().copied(), "1", 0.5);
        assert_eq!(
            c,
            Confusion {
                true_positive: 1,
                false_positive: 1,
                true_negative: 1,
                false_negative: 1,
            }
        );
        assert_eq!(c.sensitivity(), 0.5);
        assert_eq!(c.specificity(), 0.5);
    }

    #[test]
    fn test_confusion_empty_classes() {
        let c = Confusion::at_threshold(std::iter::empty(), "1", 0.0);
        assert_eq!(c.sensitivity(), 0.0);
        assert_eq!(c.specificity(), 0.0);
    }
}
