//! Line-level scoring: the mean of a line's chunk scores.

use crate::chunk::LineModifier;
use crate::error::Result;

use super::ScoringSession;

/// Score `line` by submitting each of its tokens and averaging the responses.
///
/// Tokens are submitted in positional order. A line with no tokens (empty,
/// or shorter than `n` under `Drop`) scores `0.0` without touching the
/// session.
pub fn score_line<S>(line: &str, n: usize, modifier: LineModifier, session: &mut S) -> Result<f64>
where
    S: ScoringSession + ?Sized,
{
    let tokens = modifier.apply(line, n)?;
    if tokens.is_empty() {
        return Ok(0.0);
    }

    let mut total = 0.0;
    for token in &tokens {
        total += session.score_one(token)?;
    }

    Ok(total / tokens.len() as f64)
}
