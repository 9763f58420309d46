//! Parameter space for an `(n, r)` sweep.
//!
//! `n` is the chunk width and `r` the scorer's matching threshold. Both are
//! swept over closed integer ranges. [`SweepConfig`] validates the ranges
//! and carries a cursor (the "current" `n` and `r`) that can only be moved
//! through bounds-checked setters or the cursor iterators.
//!
//! The runner itself does not read the cursor: it threads explicit
//! [`SweepPoint`] values through every call, so a config can be shared with
//! observers without the sweep depending on its mutable state.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chunk::RemainderPolicy;
use crate::error::{Result, SweepError};

/// Closed integer range `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRange {
    pub lo: usize,
    pub hi: usize,
}

impl ParamRange {
    pub fn new(lo: usize, hi: usize) -> Result<Self> {
        if lo > hi {
            return Err(SweepError::Config(format!(
                "empty range: lower bound {lo} is above upper bound {hi}"
            )));
        }
        Ok(Self { lo, hi })
    }

    /// Single-value range.
    pub fn single(value: usize) -> Self {
        Self { lo: value, hi: value }
    }

    pub fn contains(&self, value: usize) -> bool {
        (self.lo..=self.hi).contains(&value)
    }

    pub fn values(&self) -> RangeInclusive<usize> {
        self.lo..=self.hi
    }

    /// Number of values in the range.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.hi - self.lo).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    fn check(&self, param: &'static str, value: usize) -> Result<()> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(SweepError::InvalidRange {
                param,
                value,
                lo: self.lo,
                hi: self.hi,
            })
        }
    }
}

impl std::str::FromStr for ParamRange {
    type Err = SweepError;

    /// Parses `"9..12"`, `"9-12"` or a single value `"10"`.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| SweepError::Config(format!("invalid range bound {part:?}: {e}")))
        };

        let (lo, hi) = if let Some((lo, hi)) = s.split_once("..") {
            (parse(lo)?, parse(hi.trim_start_matches('='))?)
        } else if let Some((lo, hi)) = s.split_once('-') {
            (parse(lo)?, parse(hi)?)
        } else {
            let v = parse(s)?;
            (v, v)
        };

        ParamRange::new(lo, hi)
    }
}

impl std::fmt::Display for ParamRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.lo, self.hi)
    }
}

/// One cell of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Chunk width.
    pub n: usize,
    /// Matching threshold.
    pub r: usize,
}

impl std::fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(n={}, r={})", self.n, self.r)
    }
}

/// Validated sweep parameters plus the active `(n, r)` cursor.
///
/// `Clone` is the independent copy: bounds are shared by value, the cursor
/// and chunk policy of the copy move independently of the original.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    n_range: ParamRange,
    r_range: ParamRange,
    training_input: PathBuf,
    /// Remainder policy applied when scoring input lines.
    pub chunk_policy: RemainderPolicy,
    n: usize,
    r: usize,
}

impl SweepConfig {
    /// Build a config with the cursor at the lower bound of each range.
    ///
    /// `n` is a chunk width, so its range must start at 1 or above.
    pub fn new(
        n_range: ParamRange,
        r_range: ParamRange,
        training_input: impl Into<PathBuf>,
        chunk_policy: RemainderPolicy,
    ) -> Result<Self> {
        if n_range.lo == 0 {
            return Err(SweepError::InvalidChunkWidth(0));
        }
        ParamRange::new(n_range.lo, n_range.hi)?;
        ParamRange::new(r_range.lo, r_range.hi)?;

        Ok(Self {
            n: n_range.lo,
            r: r_range.lo,
            n_range,
            r_range,
            training_input: training_input.into(),
            chunk_policy,
        })
    }

    pub fn n_range(&self) -> ParamRange {
        self.n_range
    }

    pub fn r_range(&self) -> ParamRange {
        self.r_range
    }

    pub fn training_input(&self) -> &Path {
        &self.training_input
    }

    /// Current chunk width.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Current matching threshold.
    pub fn r(&self) -> usize {
        self.r
    }

    /// Current cursor as an immutable value.
    pub fn point(&self) -> SweepPoint {
        SweepPoint { n: self.n, r: self.r }
    }

    pub fn set_n(&mut self, n: usize) -> Result<()> {
        self.n_range.check("n", n)?;
        self.n = n;
        Ok(())
    }

    pub fn set_r(&mut self, r: usize) -> Result<()> {
        self.r_range.check("r", r)?;
        self.r = r;
        Ok(())
    }

    /// Walk `n` over its range, moving the cursor before each value is yielded.
    pub fn iter_n(&mut self) -> CursorIter<'_> {
        let values = self.n_range.values();
        CursorIter {
            slot: &mut self.n,
            values,
        }
    }

    /// Walk `r` over its range, moving the cursor before each value is yielded.
    pub fn iter_r(&mut self) -> CursorIter<'_> {
        let values = self.r_range.values();
        CursorIter {
            slot: &mut self.r,
            values,
        }
    }

    /// Every cell in sweep order: `n` outer, `r` inner, both ascending.
    pub fn points(&self) -> impl Iterator<Item = SweepPoint> + '_ {
        self.n_range
            .values()
            .flat_map(move |n| self.r_range.values().map(move |r| SweepPoint { n, r }))
    }

    /// Number of cells in the sweep.
    pub fn cell_count(&self) -> usize {
        self.n_range.len().saturating_mul(self.r_range.len())
    }
}

/// Cursor-moving iterator returned by [`SweepConfig::iter_n`] / [`SweepConfig::iter_r`].
pub struct CursorIter<'a> {
    slot: &'a mut usize,
    values: RangeInclusive<usize>,
}

impl Iterator for CursorIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let value = self.values.next()?;
        *self.slot = value;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl ExactSizeIterator for CursorIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SweepConfig {
        SweepConfig::new(
            ParamRange::new(9, 12).unwrap(),
            ParamRange::new(1, 9).unwrap(),
            "train.txt",
            RemainderPolicy::Pad,
        )
        .unwrap()
    }

    #[test]
    fn test_iter_n_yields_closed_range_and_moves_cursor() {
        let mut cfg = config();
        let mut seen = Vec::new();
        let mut iter = cfg.iter_n();
        while let Some(n) = iter.next() {
            seen.push(n);
        }
        assert_eq!(seen, vec![9, 10, 11, 12]);
        assert_eq!(cfg.n(), 12);
    }

    #[test]
    fn test_iter_r_restarts_per_call() {
        let mut cfg = config();
        assert_eq!(cfg.iter_r().count(), 9);
        assert_eq!(cfg.r(), 9);
        assert_eq!(cfg.iter_r().next(), Some(1));
        assert_eq!(cfg.r(), 1);
    }

    #[test]
    fn test_cursor_updated_before_value_is_used() {
        let mut cfg = config();
        let mut iter = cfg.iter_n();
        assert_eq!(iter.next(), Some(9));
        assert_eq!(iter.next(), Some(10));
        drop(iter);
        assert_eq!(cfg.n(), 10);
    }

    #[test]
    fn test_setters_are_bounds_checked() {
        let mut cfg = config();
        assert!(cfg.set_n(8).is_err());
        assert!(cfg.set_n(13).is_err());
        assert_eq!(cfg.n(), 9);

        cfg.set_n(11).unwrap();
        assert_eq!(cfg.n(), 11);

        let err = cfg.set_r(10).unwrap_err();
        assert!(matches!(
            err,
            SweepError::InvalidRange { param: "r", value: 10, lo: 1, hi: 9 }
        ));
        cfg.set_r(9).unwrap();
        assert_eq!(cfg.point(), SweepPoint { n: 11, r: 9 });
    }

    #[test]
    fn test_copy_is_independent() {
        let mut original = config();
        let mut copy = original.clone();

        copy.set_n(12).unwrap();
        copy.chunk_policy = RemainderPolicy::Drop;
        original.set_r(5).unwrap();

        assert_eq!(original.n(), 9);
        assert_eq!(original.chunk_policy, RemainderPolicy::Pad);
        assert_eq!(copy.r(), 1);
        assert_eq!(copy.n_range(), original.n_range());
    }

    #[test]
    fn test_zero_width_range_rejected() {
        let err = SweepConfig::new(
            ParamRange::new(0, 3).unwrap(),
            ParamRange::single(1),
            "t",
            RemainderPolicy::Keep,
        )
        .unwrap_err();
        assert!(matches!(err, SweepError::InvalidChunkWidth(0)));
    }

    #[test]
    fn test_points_order() {
        let cfg = SweepConfig::new(
            ParamRange::new(2, 3).unwrap(),
            ParamRange::new(1, 2).unwrap(),
            "t",
            RemainderPolicy::Keep,
        )
        .unwrap();
        let points: Vec<_> = cfg.points().map(|p| (p.n, p.r)).collect();
        assert_eq!(points, vec![(2, 1), (2, 2), (3, 1), (3, 2)]);
        assert_eq!(cfg.cell_count(), 4);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!("9..12".parse::<ParamRange>().unwrap(), ParamRange { lo: 9, hi: 12 });
        assert_eq!("9..=12".parse::<ParamRange>().unwrap(), ParamRange { lo: 9, hi: 12 });
        assert_eq!("1-9".parse::<ParamRange>().unwrap(), ParamRange { lo: 1, hi: 9 });
        assert_eq!("4".parse::<ParamRange>().unwrap(), ParamRange::single(4));
        assert!("5..2".parse::<ParamRange>().is_err());
        assert!("x..2".parse::<ParamRange>().is_err());
    }

    #[test]
    fn test_len_at_usize_max() {
        let full = ParamRange::new(0, usize::MAX).unwrap();
        assert_eq!(full.len(), usize::MAX);
        assert_eq!(ParamRange::single(usize::MAX).len(), 1);
        assert_eq!(ParamRange { lo: 5, hi: 2 }.len(), 0);

        let parsed: ParamRange = format!("0..{}", usize::MAX).parse().unwrap();
        let config =
            SweepConfig::new(ParamRange::single(3), parsed, "train.txt", RemainderPolicy::Keep)
                .unwrap();
        assert_eq!(config.cell_count(), usize::MAX);
    }
}
