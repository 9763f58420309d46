//! In-process scorer backed by a lookup table.
//!
//! Answers `token -> score` from a map with a fallback default, and records
//! every request and every opened session. Used for dry runs of a sweep
//! (scores precomputed into a JSON file) and throughout the test suite.
//!
//! # Table file format
//!
//! ```json
//! { "abcd": 0.12, "efg_": 0.9 }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Result, SweepError};

use super::{Scorer, ScoringSession, SessionParams};

#[derive(Debug, Default)]
struct Shared {
    query_count: AtomicUsize,
    closed_count: AtomicUsize,
    opened: Mutex<Vec<SessionParams>>,
}

/// Table-backed [`Scorer`].
#[derive(Debug, Clone)]
pub struct TableScorer {
    table: Arc<HashMap<String, f64>>,
    default: f64,
    /// Tokens that make the session answer with a protocol error.
    poisoned: Arc<Vec<String>>,
    shared: Arc<Shared>,
}

impl TableScorer {
    /// Empty table; every token scores `default`.
    pub fn new(default: f64) -> Self {
        Self {
            table: Arc::new(HashMap::new()),
            default,
            poisoned: Arc::new(Vec::new()),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Load a `token -> score` JSON object.
    pub fn from_json_file(path: &Path, default: f64) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SweepError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;
        let table: HashMap<String, f64> = serde_json::from_str(&content).map_err(|e| {
            SweepError::Config(format!("invalid score table {}: {e}", path.display()))
        })?;

        Ok(Self {
            table: Arc::new(table),
            ..Self::new(default)
        })
    }

    /// Builder-style insert.
    pub fn with(mut self, token: &str, score: f64) -> Self {
        Arc::make_mut(&mut self.table).insert(token.to_string(), score);
        self
    }

    /// Make `token` produce a [`SweepError::Protocol`] instead of a score.
    pub fn failing_on(mut self, token: &str) -> Self {
        Arc::make_mut(&mut self.poisoned).push(token.to_string());
        self
    }

    /// Open a session with placeholder parameters.
    pub fn session(&self) -> TableSession {
        self.start(SessionParams {
            n: 0,
            r: 0,
            training_artifact: Default::default(),
        })
    }

    /// Total tokens scored across all sessions.
    pub fn query_count(&self) -> usize {
        self.shared.query_count.load(Ordering::Relaxed)
    }

    /// Parameters of every session opened so far, in order.
    pub fn opened_sessions(&self) -> Vec<SessionParams> {
        self.shared
            .opened
            .lock()
            .map(|opened| opened.clone())
            .unwrap_or_default()
    }

    /// Number of sessions that have been closed.
    pub fn closed_sessions(&self) -> usize {
        self.shared.closed_count.load(Ordering::Relaxed)
    }

    fn start(&self, params: SessionParams) -> TableSession {
        if let Ok(mut opened) = self.shared.opened.lock() {
            opened.push(params.clone());
        }
        TableSession {
            scorer: self.clone(),
            params,
            requests: Vec::new(),
            closed: false,
        }
    }
}

impl Scorer for TableScorer {
    type Session = TableSession;

    fn open(&self, params: &SessionParams) -> Result<TableSession> {
        Ok(self.start(params.clone()))
    }
}

/// Session of a [`TableScorer`].
#[derive(Debug)]
pub struct TableSession {
    scorer: TableScorer,
    params: SessionParams,
    requests: Vec<String>,
    closed: bool,
}

impl TableSession {
    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Tokens this session has been asked to score, in order.
    pub fn requests(&self) -> Vec<&str> {
        self.requests.iter().map(String::as_str).collect()
    }
}

impl ScoringSession for TableSession {
    fn score_one(&mut self, token: &str) -> Result<f64> {
        if self.closed {
            return Err(SweepError::StreamClosed("table session already closed".into()));
        }

        self.scorer.shared.query_count.fetch_add(1, Ordering::Relaxed);
        self.requests.push(token.to_string());

        if self.scorer.poisoned.iter().any(|t| t == token) {
            return Err(SweepError::Protocol(format!(
                "unparseable response for token {token:?}"
            )));
        }

        Ok(self
            .scorer
            .table
            .get(token)
            .copied()
            .unwrap_or(self.scorer.default))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.scorer.shared.closed_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Drop for TableSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_default() {
        let scorer = TableScorer::new(0.5).with("known", 0.1);
        let mut session = scorer.session();

        assert_eq!(session.score_one("known").unwrap(), 0.1);
        assert_eq!(session.score_one("unknown").unwrap(), 0.5);
        assert_eq!(scorer.query_count(), 2);
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let scorer = TableScorer::new(0.0);
        let mut session = scorer.session();

        session.close();
        session.close();
        assert_eq!(scorer.closed_sessions(), 1);

        let err = session.score_one("x").unwrap_err();
        assert!(matches!(err, SweepError::StreamClosed(_)));

        drop(session);
        assert_eq!(scorer.closed_sessions(), 1);
    }

    #[test]
    fn test_drop_closes() {
        let scorer = TableScorer::new(0.0);
        {
            let _session = scorer.session();
        }
        assert_eq!(scorer.closed_sessions(), 1);
    }

    #[test]
    fn test_poisoned_token() {
        let scorer = TableScorer::new(0.0).failing_on("bad");
        let mut session = scorer.session();
        assert!(matches!(session.score_one("bad"), Err(SweepError::Protocol(_))));
        assert!(session.score_one("good").is_ok());
    }

    #[test]
    fn test_open_records_params() {
        let scorer = TableScorer::new(0.0);
        let params = SessionParams {
            n: 10,
            r: 4,
            training_artifact: "train.chunks".into(),
        };
        let session = scorer.open(&params).unwrap();
        assert_eq!(session.params(), &params);
        assert_eq!(scorer.opened_sessions(), vec![params]);
    }

    #[test]
    fn test_from_json_file() {
        use std::io::Write;
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        temp_file
            .write_all(br#"{ "abcd": 0.25, "efg_": 0.75 }"#)
            .unwrap();
        temp_file.flush().unwrap();

        let scorer = TableScorer::from_json_file(temp_file.path(), 1.0).unwrap();
        let mut session = scorer.session();
        assert_eq!(session.score_one("abcd").unwrap(), 0.25);
        assert_eq!(session.score_one("zzzz").unwrap(), 1.0);
    }

    #[test]
    fn test_from_json_file_rejects_garbage() {
        use std::io::Write;
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        temp_file.write_all(b"not json").unwrap();
        temp_file.flush().unwrap();

        let err = TableScorer::from_json_file(temp_file.path(), 0.0).unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
    }
}
