//! Sweep output: one score-ordered table per `(n, r)` cell.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use super::params::SweepPoint;

/// A scored input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLine {
    pub line: String,
    pub label: String,
    pub score: f64,
    /// Input file the line came from.
    pub source: PathBuf,
}

/// What identifies a line when inputs are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MergeKey {
    /// The line text alone. A later entry overwrites an earlier one holding
    /// the same text; overwrites across inputs are logged as warnings.
    #[default]
    Line,
    /// Input source plus line text. Identical text in different inputs keeps
    /// one entry per input.
    SourceAndLine,
}

/// Scored lines of one cell, ascending by score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CellResults {
    entries: Vec<ScoredLine>,
}

impl CellResults {
    pub fn entries(&self) -> &[ScoredLine] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredLine> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry for `line`.
    pub fn get(&self, line: &str) -> Option<&ScoredLine> {
        self.entries.iter().find(|e| e.line == line)
    }

    /// `(label, score)` pairs in ascending score order.
    pub fn labels_and_scores(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|e| (e.label.as_str(), e.score))
    }
}

impl<'a> IntoIterator for &'a CellResults {
    type Item = &'a ScoredLine;
    type IntoIter = std::slice::Iter<'a, ScoredLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Running merge of one cell's inputs.
///
/// Entries keep first-insertion position; an overwrite replaces the value in
/// place. [`CellMerger::finish`] stable-sorts by score, so equal scores keep
/// merge order.
#[derive(Debug)]
pub struct CellMerger {
    key: MergeKey,
    entries: Vec<ScoredLine>,
    index: HashMap<(Option<PathBuf>, String), usize>,
    overwritten: usize,
}

impl CellMerger {
    pub fn new(key: MergeKey) -> Self {
        Self {
            key,
            entries: Vec::new(),
            index: HashMap::new(),
            overwritten: 0,
        }
    }

    pub fn insert(&mut self, scored: ScoredLine) {
        let source = match self.key {
            MergeKey::Line => None,
            MergeKey::SourceAndLine => Some(scored.source.clone()),
        };
        let key = (source, scored.line.clone());

        if let Some(&idx) = self.index.get(&key) {
            let previous = &self.entries[idx];
            if previous.source != scored.source || previous.label != scored.label {
                warn!(
                    line = %scored.line,
                    kept_label = %scored.label,
                    dropped_label = %previous.label,
                    "duplicate line across inputs; earlier entry overwritten"
                );
            }
            self.overwritten += 1;
            self.entries[idx] = scored;
        } else {
            self.index.insert(key, self.entries.len());
            self.entries.push(scored);
        }
    }

    /// Entries replaced by a later insert with the same key.
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }

    pub fn finish(self) -> CellResults {
        let mut entries = self.entries;
        entries.sort_by(|a, b| a.score.total_cmp(&b.score));
        CellResults { entries }
    }
}

/// Complete output of a sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    cells: BTreeMap<SweepPoint, CellResults>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cell. Cells are write-once: if `point` is already present the
    /// stored cell is left untouched and `cell` is handed back.
    pub fn insert(&mut self, point: SweepPoint, cell: CellResults) -> Option<CellResults> {
        match self.cells.entry(point) {
            std::collections::btree_map::Entry::Occupied(_) => Some(cell),
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(cell);
                None
            }
        }
    }

    pub fn get(&self, point: SweepPoint) -> Option<&CellResults> {
        self.cells.get(&point)
    }

    /// Cells ordered by `(n, r)`.
    pub fn cells(&self) -> impl Iterator<Item = (SweepPoint, &CellResults)> {
        self.cells.iter().map(|(p, c)| (*p, c))
    }

    pub fn points(&self) -> impl Iterator<Item = SweepPoint> + '_ {
        self.cells.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Serialize)]
struct CellRecord<'a> {
    n: usize,
    r: usize,
    entries: &'a CellResults,
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.cells.len()))?;
        for (point, entries) in &self.cells {
            seq.serialize_element(&CellRecord {
                n: point.n,
                r: point.r,
                entries,
            })?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(line: &str, label: &str, score: f64, source: &str) -> ScoredLine {
        ScoredLine {
            line: line.into(),
            label: label.into(),
            score,
            source: source.into(),
        }
    }

    #[test]
    fn test_finish_sorts_ascending_and_is_stable() {
        let mut merger = CellMerger::new(MergeKey::Line);
        merger.insert(scored("c", "0", 0.5, "a"));
        merger.insert(scored("a", "0", 0.1, "a"));
        merger.insert(scored("b", "1", 0.5, "b"));

        let cell = merger.finish();
        let lines: Vec<_> = cell.iter().map(|e| e.line.as_str()).collect();
        assert_eq!(lines, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_line_key_later_input_overwrites() {
        let mut merger = CellMerger::new(MergeKey::Line);
        merger.insert(scored("same", "0", 0.2, "english"));
        merger.insert(scored("other", "0", 0.3, "english"));
        merger.insert(scored("same", "1", 0.9, "tagalog"));
        assert_eq!(merger.overwritten(), 1);

        let cell = merger.finish();
        assert_eq!(cell.len(), 2);
        let same = cell.get("same").unwrap();
        assert_eq!(same.label, "1");
        assert_eq!(same.score, 0.9);
    }

    #[test]
    fn test_source_and_line_key_keeps_both() {
        let mut merger = CellMerger::new(MergeKey::SourceAndLine);
        merger.insert(scored("same", "0", 0.2, "english"));
        merger.insert(scored("same", "1", 0.9, "tagalog"));
        assert_eq!(merger.overwritten(), 0);

        let cell = merger.finish();
        let labels: Vec<_> = cell.labels_and_scores().collect();
        assert_eq!(labels, vec![("0", 0.2), ("1", 0.9)]);
    }

    #[test]
    fn test_result_set_cells_are_write_once() {
        let point = SweepPoint { n: 4, r: 2 };
        let mut first = CellMerger::new(MergeKey::Line);
        first.insert(scored("x", "0", 0.1, "a"));

        let mut results = ResultSet::new();
        assert!(results.insert(point, first.finish()).is_none());
        let rejected = results.insert(point, CellResults::default());
        assert!(rejected.is_some());
        assert_eq!(results.get(point).unwrap().len(), 1);
    }

    #[test]
    fn test_serializes_as_cell_list() {
        let mut merger = CellMerger::new(MergeKey::Line);
        merger.insert(scored("foo", "0", 0.1, "a"));
        let mut results = ResultSet::new();
        results.insert(SweepPoint { n: 3, r: 1 }, merger.finish());

        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json[0]["n"], 3);
        assert_eq!(json[0]["r"], 1);
        assert_eq!(json[0]["entries"][0]["line"], "foo");
        assert_eq!(json[0]["entries"][0]["score"], 0.1);
    }
}
