//! Daily boundary-condition files: outflow schedules and catchment inflows.

pub mod met;
mod runoff;
mod series;

pub use met::{MetCsvConfig, parse_precipitation, read_precipitation};
pub use runoff::{RunoffModel, derive_runoff};
pub use series::{CSV_HEADER, FlowSeries, IntoTimestamp, Resolution, SeriesRows, parse_timestamp};
