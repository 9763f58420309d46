//! The `(n, r)` parameter sweep.
//!
//! - [`params`]: parameter ranges, the cursor-carrying [`SweepConfig`], [`SweepPoint`]
//! - [`runner`]: [`SweepRunner`], which rebuilds the training artifact per `n`
//!   and scores every input per `(n, r)`
//! - [`results`]: the [`ResultSet`] produced by a run
//! - [`cancel`]: cooperative cancellation

pub mod cancel;
pub mod params;
pub mod results;
pub mod runner;

pub use cancel::CancelFlag;
pub use params::{CursorIter, ParamRange, SweepConfig, SweepPoint};
pub use results::{CellMerger, CellResults, MergeKey, ResultSet, ScoredLine};
pub use runner::{SweepRunner, write_training_artifact};
