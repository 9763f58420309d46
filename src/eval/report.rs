//! Per-cell evaluation of a finished sweep.

use serde::Serialize;

use super::metrics::{RocPoint, auc, roc_curve};
use crate::sweep::{CellResults, ResultSet, SweepPoint};

/// Separability of one `(n, r)` cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellEvaluation {
    pub n: usize,
    pub r: usize,
    /// `None` when the cell holds only one class.
    pub auc: Option<f64>,
    pub lines: usize,
    pub anomalous: usize,
    pub roc: Vec<RocPoint>,
}

impl CellEvaluation {
    pub fn point(&self) -> SweepPoint {
        SweepPoint {
            n: self.n,
            r: self.r,
        }
    }
}

/// Evaluate a single cell against `anomalous_label`.
pub fn evaluate_cell(point: SweepPoint, cell: &CellResults, anomalous_label: &str) -> CellEvaluation {
    let pairs: Vec<(&str, f64)> = cell.labels_and_scores().collect();
    let anomalous = pairs.iter().filter(|(l, _)| *l == anomalous_label).count();

    CellEvaluation {
        n: point.n,
        r: point.r,
        auc: auc(&pairs, anomalous_label),
        lines: pairs.len(),
        anomalous,
        roc: roc_curve(&pairs, anomalous_label),
    }
}

/// Evaluate every cell, ordered by `(n, r)`.
pub fn evaluate(results: &ResultSet, anomalous_label: &str) -> Vec<CellEvaluation> {
    results
        .cells()
        .map(|(point, cell)| evaluate_cell(point, cell, anomalous_label))
        .collect()
}

/// Highest-AUC cell. On ties the earliest `(n, r)` wins; cells without an
/// AUC are never chosen.
pub fn best_cell(evaluations: &[CellEvaluation]) -> Option<&CellEvaluation> {
    evaluations
        .iter()
        .filter_map(|e| e.auc.map(|a| (a, e)))
        .fold(None, |best: Option<(f64, &CellEvaluation)>, (a, e)| match best {
            Some((b, _)) if b >= a => best,
            _ => Some((a, e)),
        })
        .map(|(_, e)| e)
}

/// Mean AUC over the cells that have one.
pub fn mean_auc(evaluations: &[CellEvaluation]) -> Option<f64> {
    let values: Vec<f64> = evaluations.iter().filter_map(|e| e.auc).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::{CellMerger, MergeKey, ScoredLine};

    fn cell(scores: &[(&str, f64)]) -> CellResults {
        let mut merger = CellMerger::new(MergeKey::Line);
        for (i, (label, score)) in scores.iter().enumerate() {
            merger.insert(ScoredLine {
                line: format!("line{i}"),
                label: label.to_string(),
                score: *score,
                source: "in".into(),
            });
        }
        merger.finish()
    }

    fn results() -> ResultSet {
        let mut set = ResultSet::new();
        set.insert(
            SweepPoint { n: 3, r: 1 },
            cell(&[("0", 0.5), ("1", 0.5)]),
        );
        set.insert(
            SweepPoint { n: 3, r: 2 },
            cell(&[("0", 0.1), ("1", 0.9)]),
        );
        set.insert(SweepPoint { n: 4, r: 1 }, cell(&[("0", 0.1), ("0", 0.2)]));
        set
    }

    #[test]
    fn test_evaluate_counts_and_order() {
        let evals = evaluate(&results(), "1");
        let points: Vec<_> = evals.iter().map(|e| (e.n, e.r)).collect();
        assert_eq!(points, vec![(3, 1), (3, 2), (4, 1)]);

        assert_eq!(evals[0].auc, Some(0.5));
        assert_eq!(evals[1].auc, Some(1.0));
        assert_eq!(evals[2].auc, None, "single-class cell has no AUC");
        assert_eq!(evals[2].anomalous, 0);
        assert_eq!(evals[1].lines, 2);
    }

    #[test]
    fn test_best_cell_skips_undefined() {
        let evals = evaluate(&results(), "1");
        let best = best_cell(&evals).unwrap();
        assert_eq!(best.point(), SweepPoint { n: 3, r: 2 });
    }

    #[test]
    fn test_best_cell_prefers_earliest_on_tie() {
        let mut set = ResultSet::new();
        set.insert(SweepPoint { n: 2, r: 1 }, cell(&[("0", 0.1), ("1", 0.9)]));
        set.insert(SweepPoint { n: 2, r: 2 }, cell(&[("0", 0.2), ("1", 0.8)]));
        let evals = evaluate(&set, "1");
        assert_eq!(best_cell(&evals).unwrap().point(), SweepPoint { n: 2, r: 1 });
    }

    #[test]
    fn test_mean_auc() {
        let evals = evaluate(&results(), "1");
        assert_eq!(mean_auc(&evals), Some(0.75));
        assert_eq!(mean_auc(&[]), None);
    }
}
