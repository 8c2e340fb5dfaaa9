//! Rolling walk-forward windows.
//!
//! Fixed-length train window, fixed-length OOS window, both sliding forward by
//! one OOS length per step:
//!
//! ```text
//! |---- train ----|-- oos --|
//!           |---- train ----|-- oos --|
//!                     |---- train ----|-- oos --|
//! ```
//!
//! A window is emitted only when its OOS end fits inside the series. Too little
//! history yields an empty list, not an error; callers must treat that as
//! "cannot evaluate".

use chrono::{Duration, Months};
use serde::{Deserialize, Serialize};

use crate::domain::{TimeSeries, Timestamp};

/// Gap between the end of one segment and the start of the next.
pub const WINDOW_TICK: Duration = Duration::seconds(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub index: usize,
    pub train_start: Timestamp,
    pub train_end: Timestamp,
    pub oos_start: Timestamp,
    pub oos_end: Timestamp,
}

impl Window {
    pub fn train_slice(&self, series: &TimeSeries) -> TimeSeries {
        series.between(self.train_start, self.train_end)
    }

    pub fn oos_slice(&self, series: &TimeSeries) -> TimeSeries {
        series.between(self.oos_start, self.oos_end)
    }
}

/// Generate rolling windows over the span of `series`.
pub fn make_windows(series: &TimeSeries, train_months: u32, oos_months: u32) -> Vec<Window> {
    let (start, end) = match (series.first_ts(), series.last_ts()) {
        (Some(s), Some(e)) => (s, e),
        _ => return Vec::new(),
    };
    if oos_months == 0 {
        return Vec::new();
    }
    let train = Months::new(train_months);
    let oos = Months::new(oos_months);

    let mut windows = Vec::new();
    let mut oos_start = match start.checked_add_months(train) {
        Some(t) => t,
        None => return windows,
    };

    loop {
        let bounds = oos_start.checked_sub_months(train).zip(
            oos_start
                .checked_add_months(oos)
                .map(|t| t - WINDOW_TICK),
        );
        let Some((train_start, oos_end)) = bounds else {
            break;
        };
        if oos_end > end {
            break;
        }

        windows.push(Window {
            index: windows.len(),
            train_start,
            train_end: oos_start - WINDOW_TICK,
            oos_start,
            oos_end,
        });

        oos_start = match oos_start.checked_add_months(oos) {
            Some(t) => t,
            None => break,
        };
    }

    windows
}
