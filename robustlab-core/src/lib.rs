//! RobustLab Core: domain types and search-space construction.
//!
//! This crate contains the pure, deterministic building blocks of the
//! robustness pipeline:
//! - Domain types (bars, validated time series, parameter sets, performance summaries)
//! - Multi-instrument alignment
//! - Train / validation / test splitting with a trailing calendar test window
//! - Rolling walk-forward window generation
//! - Parameter grids from declared spaces, and perturbation basins around a point

pub mod align;
pub mod domain;
pub mod space;
pub mod split;
pub mod windows;

pub use domain::{
    metric, Bar, ParamSetId, ParamValue, ParameterSet, PerformanceSummary, SeriesError,
    TimeSeries, Timestamp,
};
pub use space::{basin, BasinSpec, ParamDim, ParamSpace, ParamValues, SanityRule, SpaceError};
pub use split::{split, split_with, SplitBounds, SplitError, SplitPolicy, SplitResult};
pub use windows::{make_windows, Window, WINDOW_TICK};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: every record handed to worker threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<TimeSeries>();
        require_sync::<TimeSeries>();
        require_send::<ParameterSet>();
        require_sync::<ParameterSet>();
        require_send::<PerformanceSummary>();
        require_sync::<PerformanceSummary>();
        require_send::<Window>();
        require_sync::<Window>();
        require_send::<SplitBounds>();
        require_sync::<SplitBounds>();
        require_send::<BasinSpec>();
        require_sync::<BasinSpec>();
    }
}
