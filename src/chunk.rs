//! Splitting input lines into fixed-width chunks.
//!
//! A line of length `L` split at width `w` yields `L / w` full chunks and,
//! when `L % w != 0`, one short trailing chunk. The [`RemainderPolicy`]
//! decides what happens to that trailing chunk:
//!
//! ```text
//! "abcdefg", w = 4
//!   Keep → ["abcd", "efg"]
//!   Drop → ["abcd"]
//!   Pad  → ["abcd", "efg_"]     pad = w - (L % w) = 1
//! ```
//!
//! Widths count characters, not bytes, so multi-byte text never gets split
//! inside a code point.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// Character appended to a short trailing chunk under [`RemainderPolicy::Pad`].
pub const FILLER: char = '_';

/// How to treat a trailing chunk shorter than the target width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RemainderPolicy {
    /// Emit it as-is.
    #[default]
    Keep,
    /// Omit it.
    Drop,
    /// Right-pad it with [`FILLER`] up to the target width.
    Pad,
}

impl std::fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RemainderPolicy::Keep => "keep",
            RemainderPolicy::Drop => "drop",
            RemainderPolicy::Pad => "pad",
        })
    }
}

/// Split `line` into consecutive chunks of `width` characters.
///
/// Chunk order is positional. An empty line yields no chunks under every
/// policy.
pub fn chunk_line(line: &str, width: usize, policy: RemainderPolicy) -> Result<Vec<String>> {
    if width == 0 {
        return Err(SweepError::InvalidChunkWidth(width));
    }

    let chars: Vec<char> = line.chars().collect();
    let mut chunks: Vec<String> = chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect();

    let remainder = chars.len() % width;
    if remainder > 0 {
        match policy {
            RemainderPolicy::Keep => {}
            RemainderPolicy::Drop => {
                chunks.pop();
            }
            RemainderPolicy::Pad => {
                if let Some(last) = chunks.last_mut() {
                    last.extend(std::iter::repeat_n(FILLER, width - remainder));
                }
            }
        }
    }

    Ok(chunks)
}

/// Per-line token strategy, chosen explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineModifier {
    /// The whole line is one token.
    Identity,
    /// Fixed-width chunks under a remainder policy.
    Chunked(RemainderPolicy),
}

impl LineModifier {
    /// Tokens to submit for `line` at chunk width `width`.
    ///
    /// `Identity` ignores the width; an empty line still yields no token.
    pub fn apply(&self, line: &str, width: usize) -> Result<Vec<String>> {
        match self {
            LineModifier::Identity => {
                if line.is_empty() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![line.to_string()])
                }
            }
            LineModifier::Chunked(policy) => chunk_line(line, width, *policy),
        }
    }
}

impl From<RemainderPolicy> for LineModifier {
    fn from(policy: RemainderPolicy) -> Self {
        LineModifier::Chunked(policy)
    }
}
