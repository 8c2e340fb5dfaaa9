//! TimeSeries: an ordered, validated run of bars for one instrument.
//!
//! Construction enforces strictly increasing timestamps. Because timestamps are
//! `DateTime<Utc>`, every series is timezone-normalized by type. All slicing is
//! done with binary search on the timestamp axis and returns owned sub-series,
//! so callers (and the external evaluator) never see the parent's other bars.

use serde::Serialize;
use thiserror::Error;

use super::bar::{Bar, Timestamp};

/// Errors raised while building or combining series.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("timestamps not strictly increasing at index {index} in '{symbol}'")]
    NotStrictlyIncreasing { symbol: String, index: usize },

    #[error("void bar (NaN OHLC) at index {index} in '{symbol}'")]
    VoidBar { symbol: String, index: usize },

    #[error("series '{symbol}' is not aligned with '{reference}'")]
    Misaligned { symbol: String, reference: String },

    #[error("no series supplied")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl TimeSeries {
    /// Build a series, rejecting unordered timestamps and void bars.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        for (index, bar) in bars.iter().enumerate() {
            if bar.is_void() {
                return Err(SeriesError::VoidBar { symbol, index });
            }
            if index > 0 && bars[index - 1].ts >= bar.ts {
                return Err(SeriesError::NotStrictlyIncreasing { symbol, index });
            }
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_ts(&self) -> Option<Timestamp> {
        self.bars.first().map(|b| b.ts)
    }

    pub fn last_ts(&self) -> Option<Timestamp> {
        self.bars.last().map(|b| b.ts)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.bars.iter().map(|b| b.ts)
    }

    /// Bars with `ts < cut`.
    pub fn before(&self, cut: Timestamp) -> TimeSeries {
        let end = self.bars.partition_point(|b| b.ts < cut);
        self.sub(0, end)
    }

    /// Bars with `ts >= cut`.
    pub fn starting_at(&self, cut: Timestamp) -> TimeSeries {
        let start = self.bars.partition_point(|b| b.ts < cut);
        self.sub(start, self.bars.len())
    }

    /// Bars with `ts <= cut`.
    pub fn up_to(&self, cut: Timestamp) -> TimeSeries {
        let end = self.bars.partition_point(|b| b.ts <= cut);
        self.sub(0, end)
    }

    /// Bars with `ts > cut`.
    pub fn after(&self, cut: Timestamp) -> TimeSeries {
        let start = self.bars.partition_point(|b| b.ts <= cut);
        self.sub(start, self.bars.len())
    }

    /// Bars with `start <= ts <= end` (both inclusive).
    pub fn between(&self, start: Timestamp, end: Timestamp) -> TimeSeries {
        let lo = self.bars.partition_point(|b| b.ts < start);
        let hi = self.bars.partition_point(|b| b.ts <= end).max(lo);
        self.sub(lo, hi)
    }

    /// Concatenate a later series onto this one, keeping this series' symbol.
    /// The result must remain strictly increasing.
    pub fn concat(&self, later: &TimeSeries) -> Result<TimeSeries, SeriesError> {
        let mut bars = self.bars.clone();
        bars.extend(later.bars.iter().cloned());
        TimeSeries::new(self.symbol.clone(), bars)
    }

    fn sub(&self, start: usize, end: usize) -> TimeSeries {
        TimeSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[start..end].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bar_at(ts: Timestamp) -> Bar {
        Bar {
            ts,
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: 100.0,
        }
    }

    fn daily(n: i64) -> TimeSeries {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = (0..n).map(|i| bar_at(t0 + Duration::days(i))).collect();
        TimeSeries::new("QQQ", bars).unwrap()
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let err = TimeSeries::new("QQQ", vec![bar_at(t0), bar_at(t0)]).unwrap_err();
        assert_eq!(
            err,
            SeriesError::NotStrictlyIncreasing {
                symbol: "QQQ".into(),
                index: 1
            }
        );
    }

    #[test]
    fn rejects_void_bar() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut bar = bar_at(t0);
        bar.open = f64::NAN;
        assert!(matches!(
            TimeSeries::new("QQQ", vec![bar]),
            Err(SeriesError::VoidBar { index: 0, .. })
        ));
    }

    #[test]
    fn before_and_starting_at_partition() {
        let s = daily(10);
        let cut = s.bars()[4].ts;
        let left = s.before(cut);
        let right = s.starting_at(cut);
        assert_eq!(left.len(), 4);
        assert_eq!(right.len(), 6);
        assert_eq!(right.first_ts(), Some(cut));
    }

    #[test]
    fn up_to_and_after_partition() {
        let s = daily(10);
        let cut = s.bars()[4].ts;
        assert_eq!(s.up_to(cut).len(), 5);
        assert_eq!(s.after(cut).len(), 5);
    }

    #[test]
    fn between_is_inclusive() {
        let s = daily(10);
        let sub = s.between(s.bars()[2].ts, s.bars()[5].ts);
        assert_eq!(sub.len(), 4);
    }

    #[test]
    fn between_inverted_range_is_empty() {
        let s = daily(10);
        let sub = s.between(s.bars()[5].ts, s.bars()[2].ts);
        assert!(sub.is_empty());
    }

    #[test]
    fn concat_restores_original() {
        let s = daily(10);
        let cut = s.bars()[3].ts;
        let joined = s.before(cut).concat(&s.starting_at(cut)).unwrap();
        assert_eq!(joined, s);
    }
}
