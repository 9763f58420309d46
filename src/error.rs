//! Error types for the sweep engine.
//!
//! Every variant is fatal to a run: nothing is retried and nothing is
//! swallowed. Errors raised while a `(n, r)` cell is active are wrapped in
//! [`SweepError::InCell`] so callers can tell which cell failed.

use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Chunking,
    Session,
    Artifact,
    Input,
    Cancelled,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Chunking => "chunking",
            Stage::Session => "session",
            Stage::Artifact => "artifact",
            Stage::Input => "input",
            Stage::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SweepError {
    /// Parameter setter called with a value outside its configured bound.
    #[error("{param} = {value} is outside the configured range [{lo}, {hi}]")]
    InvalidRange {
        param: &'static str,
        value: usize,
        lo: usize,
        hi: usize,
    },

    /// Chunk width must be strictly positive.
    #[error("invalid chunk width {0}: must be > 0")]
    InvalidChunkWidth(usize),

    /// The scorer executable could not be started or rejected its arguments.
    #[error("failed to start scorer `{program}`: {reason}")]
    ProcessSpawn { program: String, reason: String },

    /// Malformed, missing or late response line.
    #[error("scorer protocol error: {0}")]
    Protocol(String),

    /// The scorer process is gone.
    #[error("scorer stream closed: {0}")]
    StreamClosed(String),

    /// The staging file for the training artifact could not be written.
    #[error("failed to write training artifact {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input, label or training file could not be read.
    #[error("failed to read {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data and label files do not line up.
    #[error("{data} has {data_lines} lines but {labels} has {label_lines}")]
    LabelMismatch {
        data: PathBuf,
        data_lines: usize,
        labels: PathBuf,
        label_lines: usize,
    },

    /// Experiment file could not be parsed or validated.
    #[error("config error: {0}")]
    Config(String),

    #[error("sweep cancelled")]
    Cancelled,

    /// Failure while the sweep was working on chunk width `n` and, once a
    /// session was involved, threshold `r`.
    #[error("sweep failed at {} ({}): {source}", cell_label(.n, .r), .source.stage())]
    InCell {
        n: usize,
        r: Option<usize>,
        #[source]
        source: Box<SweepError>,
    },
}

impl SweepError {
    /// Stage the failure belongs to. Cell wrappers report their inner stage.
    pub fn stage(&self) -> Stage {
        match self {
            SweepError::InvalidRange { .. } | SweepError::Config(_) => Stage::Config,
            SweepError::InvalidChunkWidth(_) => Stage::Chunking,
            SweepError::ProcessSpawn { .. }
            | SweepError::Protocol(_)
            | SweepError::StreamClosed(_) => Stage::Session,
            SweepError::ArtifactWrite { .. } => Stage::Artifact,
            SweepError::InputRead { .. } | SweepError::LabelMismatch { .. } => Stage::Input,
            SweepError::Cancelled => Stage::Cancelled,
            SweepError::InCell { source, .. } => source.stage(),
        }
    }

    /// The `(n, r)` cell that was active, if any.
    pub fn cell(&self) -> Option<(usize, Option<usize>)> {
        match self {
            SweepError::InCell { n, r, .. } => Some((*n, *r)),
            _ => None,
        }
    }

    /// Innermost error, with cell wrappers peeled off.
    pub fn root(&self) -> &SweepError {
        match self {
            SweepError::InCell { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn in_cell(self, n: usize, r: Option<usize>) -> Self {
        match self {
            already @ SweepError::InCell { .. } => already,
            other => SweepError::InCell {
                n,
                r,
                source: Box::new(other),
            },
        }
    }
}

fn cell_label(n: &usize, r: &Option<usize>) -> String {
    match r {
        Some(r) => format!("n={n}, r={r}"),
        None => format!("n={n}"),
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
