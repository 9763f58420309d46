//! Scoring oracle capability.
//!
//! The anomaly scorer is an opaque oracle. The sweep only needs three
//! operations from it:
//!
//! ```text
//! Scorer::open(params) ──► Session
//!                           ├── score_one(token) -> f64   (strict request/response)
//!                           └── close()                   (idempotent)
//! ```
//!
//! [`ProcessScorer`] drives an external binary over stdin/stdout (the
//! `negsel2.jar` tool by default). [`TableScorer`] answers from an in-memory
//! table and counts requests, which makes sweeps testable without a JVM.

pub mod line;
pub mod process;
pub mod table;

use std::path::PathBuf;

use crate::error::Result;

pub use line::score_line;
pub use process::{DEFAULT_TIMEOUT, ProcessScorer, ProcessSession};
pub use table::{TableScorer, TableSession};

/// Parameters a session is bound to for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    /// Chunk width the training artifact was built with.
    pub n: usize,
    /// Matching threshold.
    pub r: usize,
    /// Chunked training file the scorer learns "self" from.
    pub training_artifact: PathBuf,
}

/// Factory for scoring sessions.
pub trait Scorer {
    type Session: ScoringSession;

    fn open(&self, params: &SessionParams) -> Result<Self::Session>;
}

/// One live scorer bound to fixed [`SessionParams`].
///
/// Requests are strictly serialized: a caller must read the response to one
/// token before sending the next, which `&mut self` enforces.
pub trait ScoringSession {
    /// Score a single token.
    fn score_one(&mut self, token: &str) -> Result<f64>;

    /// Release the scorer. Safe to call more than once.
    fn close(&mut self);
}
