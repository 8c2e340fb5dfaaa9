//! Multi-instrument time alignment.
//!
//! Strategies trading several instruments need every series on one common
//! timeline before evaluation. Unlike a union alignment there is no void-bar
//! padding: a timestamp survives only if every instrument has a real bar there.

use std::collections::BTreeSet;

use crate::domain::{SeriesError, TimeSeries, Timestamp};

/// Reduce several series to the intersection of their timestamps.
pub fn intersect(series: &[TimeSeries]) -> Result<Vec<TimeSeries>, SeriesError> {
    let (first, rest) = series.split_first().ok_or(SeriesError::Empty)?;

    let mut common: BTreeSet<Timestamp> = first.timestamps().collect();
    for s in rest {
        let other: BTreeSet<Timestamp> = s.timestamps().collect();
        common = common.intersection(&other).copied().collect();
    }

    series
        .iter()
        .map(|s| {
            let bars = s
                .bars()
                .iter()
                .filter(|b| common.contains(&b.ts))
                .cloned()
                .collect();
            TimeSeries::new(s.symbol(), bars)
        })
        .collect()
}

/// Verify that every series shares the first series' timestamp axis.
pub fn ensure_aligned(series: &[TimeSeries]) -> Result<(), SeriesError> {
    let (reference, rest) = series.split_first().ok_or(SeriesError::Empty)?;
    for s in rest {
        if s.len() != reference.len() || !s.timestamps().eq(reference.timestamps()) {
            return Err(SeriesError::Misaligned {
                symbol: s.symbol().to_string(),
                reference: reference.symbol().to_string(),
            });
        }
    }
    Ok(())
}
