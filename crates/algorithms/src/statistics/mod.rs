//! Statistical summaries of raster samples
//!
//! - **quantile**: linear-interpolation quantiles and quartile breakpoints

pub mod quantile;

pub use quantile::{quantile, quartile_breakpoints, Breakpoints, IntervalClosure, QUARTILE_PERCENTILES};
