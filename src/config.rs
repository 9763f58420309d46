//! Experiment configuration from `negsel.toml`.
//!
//! Every key is optional; command-line flags fill in or override values
//! before [`ExperimentConfig::sweep_config`] validates the result.
//!
//! ## Example
//!
//! ```toml
//! [scorer]
//! command = ["java", "-jar", "negsel2.jar"]
//! timeout-secs = 30
//!
//! [sweep]
//! n = "9..12"
//! r = "1..9"
//! training = "english.train"
//! staging = "english.train.chunked"
//! chunk-policy = "pad"
//! train-policy = "drop"
//! merge-key = "line"
//! anomalous-label = "tagalog"
//!
//! [[input]]
//! path = "english.test"
//!
//! [[input]]
//! path = "tagalog.test"
//! label = "tagalog"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::chunk::RemainderPolicy;
use crate::dataset::{LabeledInput, stem_label};
use crate::error::{Result, SweepError};
use crate::scorer::{DEFAULT_TIMEOUT, ProcessScorer};
use crate::sweep::{MergeKey, ParamRange, SweepConfig};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "negsel.toml";

/// Staging path used when none is configured.
pub const DEFAULT_STAGING: &str = "training.chunked";

/// Scorer command used when none is configured.
pub const DEFAULT_SCORER: &[&str] = &["java", "-jar", "negsel2.jar"];

/// One labeled input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub path: PathBuf,
    pub label: String,
}

impl InputSpec {
    /// Input labelled with the file stem.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = stem_label(&path);
        Self { path, label }
    }

    pub fn load(&self) -> Result<LabeledInput> {
        LabeledInput::load(&self.path, self.label.clone())
    }
}

impl std::str::FromStr for InputSpec {
    type Err = String;

    /// `PATH` or `PATH:LABEL`. The label is split at the last `:`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("empty input path".into());
        }
        match s.rsplit_once(':') {
            Some((path, label)) if !path.is_empty() && !label.is_empty() => Ok(Self {
                path: PathBuf::from(path),
                label: label.to_string(),
            }),
            Some(_) => Err(format!("malformed input '{s}', expected PATH[:LABEL]")),
            None => Ok(Self::from_path(s)),
        }
    }
}

/// Experiment settings after loading, before validation.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    /// File the settings came from (for display).
    pub source: Option<PathBuf>,
    pub scorer_command: Vec<String>,
    pub timeout: Duration,
    pub n: Option<ParamRange>,
    pub r: Option<ParamRange>,
    pub training: Option<PathBuf>,
    pub staging: PathBuf,
    pub chunk_policy: RemainderPolicy,
    pub train_policy: RemainderPolicy,
    pub merge_key: MergeKey,
    pub anomalous_label: Option<String>,
    pub inputs: Vec<InputSpec>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            source: None,
            scorer_command: DEFAULT_SCORER.iter().map(|s| s.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
            n: None,
            r: None,
            training: None,
            staging: PathBuf::from(DEFAULT_STAGING),
            chunk_policy: RemainderPolicy::default(),
            train_policy: RemainderPolicy::default(),
            merge_key: MergeKey::default(),
            anomalous_label: None,
            inputs: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    scorer: Option<RawScorer>,
    sweep: Option<RawSweep>,
    #[serde(default)]
    input: Vec<RawInput>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawScorer {
    command: Option<Vec<String>>,
    timeout_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawSweep {
    n: Option<String>,
    r: Option<String>,
    training: Option<String>,
    staging: Option<String>,
    chunk_policy: Option<RemainderPolicy>,
    train_policy: Option<RemainderPolicy>,
    merge_key: Option<MergeKey>,
    anomalous_label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawInput {
    path: String,
    label: Option<String>,
}

impl ExperimentConfig {
    /// Load `path`. Relative paths inside the file resolve against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SweepError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let mut config = Self::parse(&content, base)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load `negsel.toml` from `directory` if present, otherwise defaults.
    pub fn discover(directory: &Path) -> Result<Self> {
        let candidate = directory.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse TOML text, resolving relative paths against `base`.
    pub fn parse(content: &str, base: &Path) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| SweepError::Config(e.to_string()))?;
        Self::from_raw(raw, base)
    }

    fn from_raw(raw: RawConfig, base: &Path) -> Result<Self> {
        let defaults = Self::default();
        let scorer = raw.scorer.unwrap_or_default();
        let sweep = raw.sweep.unwrap_or_default();
        let resolve = |p: String| resolve_path(base, p);

        let timeout = match scorer.timeout_secs {
            Some(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
            Some(secs) => {
                return Err(SweepError::Config(format!(
                    "timeout-secs must be positive, got {secs}"
                )));
            }
            None => defaults.timeout,
        };

        let inputs = raw
            .input
            .into_iter()
            .map(|i| {
                let path = resolve(i.path);
                match i.label {
                    Some(label) => InputSpec { path, label },
                    None => InputSpec::from_path(path),
                }
            })
            .collect();

        Ok(Self {
            source: None,
            scorer_command: scorer.command.unwrap_or(defaults.scorer_command),
            timeout,
            n: sweep.n.as_deref().map(str::parse).transpose()?,
            r: sweep.r.as_deref().map(str::parse).transpose()?,
            training: sweep.training.map(resolve),
            staging: sweep.staging.map(resolve).unwrap_or(defaults.staging),
            chunk_policy: sweep.chunk_policy.unwrap_or_default(),
            train_policy: sweep.train_policy.unwrap_or_default(),
            merge_key: sweep.merge_key.unwrap_or_default(),
            anomalous_label: sweep.anomalous_label,
            inputs,
        })
    }

    /// Validated sweep parameters.
    pub fn sweep_config(&self) -> Result<SweepConfig> {
        let n = self.n.ok_or_else(|| missing("sweep.n"))?;
        let r = self.r.ok_or_else(|| missing("sweep.r"))?;
        let training = self.training.clone().ok_or_else(|| missing("sweep.training"))?;
        SweepConfig::new(n, r, training, self.chunk_policy)
    }

    /// Process scorer for the configured command and timeout.
    pub fn scorer(&self) -> Result<ProcessScorer> {
        Ok(ProcessScorer::new(self.scorer_command.clone())?.with_timeout(self.timeout))
    }

    /// Read every configured input file.
    pub fn load_inputs(&self) -> Result<Vec<LabeledInput>> {
        if self.inputs.is_empty() {
            return Err(missing("input"));
        }
        self.inputs.iter().map(InputSpec::load).collect()
    }

    /// Label treated as anomalous during evaluation: the configured one, or
    /// the label of the last input.
    pub fn effective_anomalous_label(&self) -> Option<&str> {
        self.anomalous_label
            .as_deref()
            .or_else(|| self.inputs.last().map(|i| i.label.as_str()))
    }

    /// Format config for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        match self.source {
            Some(ref source) => lines.push(format!("   Config: {}", source.display())),
            None => lines.push("   Config: (defaults)".to_string()),
        }

        lines.push(format!("   Scorer: {}", self.scorer_command.join(" ")));
        let range = |r: &Option<ParamRange>| r.map_or_else(|| "unset".to_string(), |r| r.to_string());
        lines.push(format!("   n: {}  r: {}", range(&self.n), range(&self.r)));

        if let Some(ref training) = self.training {
            lines.push(format!(
                "   Training: {} → {}",
                training.display(),
                self.staging.display()
            ));
        }
        lines.push(format!(
            "   Chunking: {} (training: {}), merge by {:?}",
            self.chunk_policy, self.train_policy, self.merge_key
        ));

        if !self.inputs.is_empty() {
            let inputs: Vec<_> = self
                .inputs
                .iter()
                .map(|i| format!("{}:{}", i.path.display(), i.label))
                .collect();
            lines.push(format!("   Inputs: {}", inputs.join(", ")));
        }

        lines.join("\n")
    }
}

fn missing(key: &str) -> SweepError {
    SweepError::Config(format!("missing required setting '{key}'"))
}

fn resolve_path(base: &Path, p: String) -> PathBuf {
    let path = PathBuf::from(p);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
