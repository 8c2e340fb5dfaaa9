//! Domain types for robustness evaluation

pub mod bar;
pub mod ids;
pub mod params;
pub mod series;
pub mod summary;

pub use bar::{Bar, Timestamp};
pub use ids::ParamSetId;
pub use params::{ParamValue, ParameterSet};
pub use series::{SeriesError, TimeSeries};
pub use summary::{metric, PerformanceSummary};
