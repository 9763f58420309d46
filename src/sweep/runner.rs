//! Sequential `(n, r)` sweep.
//!
//! ```text
//! for n in n_range:
//!     rebuild training artifact (train lines chunked at n) ──► staging file
//!     for r in r_range:
//!         open session(n, r, staging file)
//!         for input in inputs:          (list order)
//!             for line in input:        (file order)
//!                 score = mean(score_one(chunk) for chunk in line)
//!         close session
//!         results[(n, r)] = merged lines sorted by score
//! ```
//!
//! Exactly one scorer process exists at a time and the staging file is
//! rewritten in full before any session for its `n` opens. Any error ends
//! the run: a partial result set would skew comparisons between cells.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::chunk::LineModifier;
use crate::dataset::{self, LabeledInput};
use crate::error::{Result, SweepError};
use crate::scorer::{Scorer, ScoringSession, SessionParams, score_line};

use super::cancel::CancelFlag;
use super::params::{SweepConfig, SweepPoint};
use super::results::{CellMerger, CellResults, MergeKey, ResultSet, ScoredLine};

/// Drives a [`Scorer`] over every cell of a [`SweepConfig`].
pub struct SweepRunner<S: Scorer> {
    scorer: S,
    staging_path: PathBuf,
    merge_key: MergeKey,
    cancel: CancelFlag,
}

impl<S: Scorer> SweepRunner<S> {
    /// `staging_path` is the single file the training artifact is written to
    /// for every `n`.
    pub fn new(scorer: S, staging_path: impl Into<PathBuf>) -> Self {
        Self {
            scorer,
            staging_path: staging_path.into(),
            merge_key: MergeKey::default(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_merge_key(mut self, merge_key: MergeKey) -> Self {
        self.merge_key = merge_key;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that cancels this runner from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Run the full sweep.
    ///
    /// `chunking` tokenizes input lines; `train_prep` tokenizes the training
    /// file when the artifact is rebuilt. They may differ.
    pub fn run(
        &self,
        config: &SweepConfig,
        inputs: &[LabeledInput],
        chunking: LineModifier,
        train_prep: LineModifier,
    ) -> Result<ResultSet> {
        self.run_with(config, inputs, chunking, train_prep, |_, _| {})
    }

    /// [`SweepRunner::run`], reporting each cell as soon as it completes.
    pub fn run_with<F>(
        &self,
        config: &SweepConfig,
        inputs: &[LabeledInput],
        chunking: LineModifier,
        train_prep: LineModifier,
        mut on_cell: F,
    ) -> Result<ResultSet>
    where
        F: FnMut(SweepPoint, &CellResults),
    {
        let started = Instant::now();
        let training = dataset::read_lines(config.training_input())?;

        info!(
            n = %config.n_range(),
            r = %config.r_range(),
            cells = config.cell_count(),
            inputs = inputs.len(),
            training_lines = training.len(),
            "starting sweep"
        );

        let mut results = ResultSet::new();

        for n in config.n_range().values() {
            self.check_cancelled().map_err(|e| e.in_cell(n, None))?;

            let chunks = write_training_artifact(&training, n, train_prep, &self.staging_path)
                .map_err(|e| e.in_cell(n, None))?;
            debug!(n, chunks, path = %self.staging_path.display(), "training artifact rebuilt");

            for r in config.r_range().values() {
                let point = SweepPoint { n, r };
                let cell = self
                    .run_cell(point, inputs, chunking)
                    .map_err(|e| e.in_cell(n, Some(r)))?;

                on_cell(point, &cell);
                results.insert(point, cell);
            }
        }

        info!(
            cells = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sweep complete"
        );

        Ok(results)
    }

    /// Score every input under one `(n, r)` session.
    fn run_cell(
        &self,
        point: SweepPoint,
        inputs: &[LabeledInput],
        chunking: LineModifier,
    ) -> Result<CellResults> {
        let started = Instant::now();
        let params = SessionParams {
            n: point.n,
            r: point.r,
            training_artifact: self.staging_path.clone(),
        };

        let mut session = SessionGuard(self.scorer.open(&params)?);
        let mut merger = CellMerger::new(self.merge_key);

        for input in inputs {
            debug!(
                %point,
                source = %input.source.display(),
                label = %input.label,
                lines = input.lines.len(),
                "scoring input"
            );

            for line in &input.lines {
                self.check_cancelled()?;
                let score = score_line(line, point.n, chunking, &mut *session)?;
                merger.insert(ScoredLine {
                    line: line.clone(),
                    label: input.label.clone(),
                    score,
                    source: input.source.clone(),
                });
            }
        }

        session.close();

        let overwritten = merger.overwritten();
        let cell = merger.finish();
        info!(
            n = point.n,
            r = point.r,
            lines = cell.len(),
            overwritten,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cell scored"
        );

        Ok(cell)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(SweepError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Closes the wrapped session on every exit path.
struct SessionGuard<T: ScoringSession>(T);

impl<T: ScoringSession> Deref for SessionGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ScoringSession> DerefMut for SessionGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: ScoringSession> Drop for SessionGuard<T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Chunk every training line at width `n` and write one chunk per line to
/// `path`, replacing its previous contents. Returns the number of chunks.
pub fn write_training_artifact(
    training: &[String],
    n: usize,
    modifier: LineModifier,
    path: &Path,
) -> Result<usize> {
    let mut chunks = Vec::new();
    for line in training {
        chunks.extend(modifier.apply(line, n)?);
    }

    let write_error = |source: std::io::Error| SweepError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }

    let file = File::create(path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    for chunk in &chunks {
        writer.write_all(chunk.as_bytes()).map_err(write_error)?;
        writer.write_all(b"\n").map_err(write_error)?;
    }
    writer.flush().map_err(write_error)?;

    Ok(chunks.len())
}
