//! Raster classification
//!
//! - **Quantile discretization**: quartile buckets from the raster's own distribution

mod quantile_discretize;

pub use quantile_discretize::{quantile_discretize, QuantileDiscretizer, QuantileParams, OUTPUT_NODATA};
