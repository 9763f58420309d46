//! negsel-sweep - parameter sweeps for negative-selection anomaly scoring
//!
//! Drives an external negative-selection scorer (`negsel2.jar` by default)
//! across every `(n, r)` combination of a chunk width `n` and a matching
//! threshold `r`, collecting one score-ordered table per combination.
//!
//! # Architecture
//!
//! ```text
//! training file ──► chunk (n, train policy) ──► staging artifact   (once per n)
//!                                                     │
//! labeled inputs ──► chunk (n, chunk policy) ──► scorer session     (once per n, r)
//!                                                     │
//!                                         mean token score per line
//!                                                     ↓
//!                                       CellResults (ascending score)
//!                                                     ↓
//!                                        ResultSet ──► ROC / AUC
//! ```
//!
//! # Modules
//!
//! - [`chunk`]: fixed-width line chunking and remainder policies
//! - [`scorer`]: the scorer capability, the process-backed scorer, an in-memory table
//! - [`sweep`]: sweep parameters, the runner, result collection
//! - [`eval`]: ROC curve and AUC per cell
//! - [`dataset`]: reading and splitting labeled line files
//! - [`config`]: `negsel.toml` experiment files
//! - [`error`]: the crate error type

pub mod chunk;
pub mod config;
pub mod dataset;
pub mod error;
pub mod eval;
pub mod scorer;
pub mod sweep;

pub use chunk::{LineModifier, RemainderPolicy, chunk_line};
pub use config::{ExperimentConfig, InputSpec};
pub use dataset::LabeledInput;
pub use error::{Result, Stage, SweepError};
pub use eval::{CellEvaluation, auc, roc_curve};
pub use scorer::{
    ProcessScorer, Scorer, ScoringSession, SessionParams, TableScorer, score_line,
};
pub use sweep::{
    CancelFlag, CellResults, MergeKey, ParamRange, ResultSet, ScoredLine, SweepConfig,
    SweepPoint, SweepRunner,
};
