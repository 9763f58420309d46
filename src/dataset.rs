//! Loading candidate strings and labels from plain-text files.
//!
//! Data files hold one candidate per line. Labeled datasets come as a pair
//! of files with the same line count, where line *i* of the label file
//! labels line *i* of the data file. Before a sweep those pairs are split
//! into one file per label, and each split file becomes a [`LabeledInput`].

use std::path::{Path, PathBuf};

use crate::error::{Result, SweepError};

/// Read `path` as one string per line, trailing whitespace stripped.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|source| SweepError::InputRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().map(|l| l.trim_end().to_string()).collect())
}

/// A set of lines sharing one label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledInput {
    pub source: PathBuf,
    pub label: String,
    pub lines: Vec<String>,
}

impl LabeledInput {
    /// Load `path`, labelling every line with `label`.
    pub fn load(path: &Path, label: impl Into<String>) -> Result<Self> {
        Ok(Self {
            source: path.to_path_buf(),
            label: label.into(),
            lines: read_lines(path)?,
        })
    }

    /// Load `path`, labelling it with its file stem (`english.test` → `english`).
    pub fn load_with_stem_label(path: &Path) -> Result<Self> {
        Self::load(path, stem_label(path))
    }

    /// In-memory input, for callers that already hold the lines.
    pub fn from_lines(
        source: impl Into<PathBuf>,
        label: impl Into<String>,
        lines: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            source: source.into(),
            label: label.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// Default label for a file: its stem.
pub fn stem_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Zip a data file with its label file, line by line.
pub fn read_labeled(data: &Path, labels: &Path) -> Result<Vec<(String, String)>> {
    let strings = read_lines(data)?;
    let label_lines = read_lines(labels)?;

    if strings.len() != label_lines.len() {
        return Err(SweepError::LabelMismatch {
            data: data.to_path_buf(),
            data_lines: strings.len(),
            labels: labels.to_path_buf(),
            label_lines: label_lines.len(),
        });
    }

    Ok(strings.into_iter().zip(label_lines).collect())
}

/// Group strings by label. Labels appear in first-seen order and strings keep
/// their original order within each group.
pub fn split_by_label(pairs: Vec<(String, String)>) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();

    for (string, label) in pairs {
        match groups.iter_mut().find(|(l, _)| *l == label) {
            Some((_, strings)) => strings.push(string),
            None => groups.push((label, vec![string])),
        }
    }

    groups
}

/// Write `lines` joined by `\n`, creating parent directories as needed.
pub fn write_lines(lines: &[String], path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_lines_strips_trailing_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("english.test");
        std::fs::write(&path, "hello world  \n  indented\t\r\nlast").unwrap();

        let lines = read_lines(&path).unwrap();
        assert_eq!(lines, vec!["hello world", "  indented", "last"]);
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = read_lines(Path::new("/nonexistent/input.test")).unwrap_err();
        assert!(matches!(err, SweepError::InputRead { .. }));
    }

    #[test]
    fn test_stem_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagalog.test");
        std::fs::write(&path, "kumusta\n").unwrap();

        let input = LabeledInput::load_with_stem_label(&path).unwrap();
        assert_eq!(input.label, "tagalog");
        assert_eq!(input.lines, vec!["kumusta"]);
    }

    #[test]
    fn test_read_labeled_and_split() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("snd-unm.1.test");
        let labels = dir.path().join("snd-unm.1.labels");
        std::fs::write(&data, "a b c\nd e f\ng h i\n").unwrap();
        std::fs::write(&labels, "0\n1\n0\n").unwrap();

        let pairs = read_labeled(&data, &labels).unwrap();
        let groups = split_by_label(pairs);

        assert_eq!(
            groups,
            vec![
                ("0".to_string(), vec!["a b c".to_string(), "g h i".to_string()]),
                ("1".to_string(), vec!["d e f".to_string()]),
            ]
        );
    }

    #[test]
    fn test_label_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("d.test");
        let labels = dir.path().join("d.labels");
        std::fs::write(&data, "x\ny\n").unwrap();
        std::fs::write(&labels, "0\n").unwrap();

        let err = read_labeled(&data, &labels).unwrap_err();
        assert!(matches!(
            err,
            SweepError::LabelMismatch { data_lines: 2, label_lines: 1, .. }
        ));
    }

    #[test]
    fn test_write_lines_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prepared/nested/out.test");
        write_lines(&["one".into(), "two".into()], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo");
    }
}
