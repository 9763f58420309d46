//! Evaluation of sweep output: how well each cell's scores separate the
//! anomalous label from the rest.

pub mod metrics;
pub mod report;

pub use metrics::{Confusion, RocPoint, auc, curve_area, roc_curve};
pub use report::{CellEvaluation, best_cell, evaluate, evaluate_cell, mean_auc};
