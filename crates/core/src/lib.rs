//! # GeoProc Core
//!
//! Core types, traits and I/O for the GeoProc geoprocessing tools.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling (pass-through only)
//! - `Feature`, `Schema` and the feature source/sink traits
//! - `Feedback`: cooperative cancellation and progress reporting
//! - Raster I/O and the output format registry

pub mod crs;
pub mod error;
pub mod feedback;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use feedback::{CancellationToken, Feedback};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::feedback::{CancellationToken, Feedback};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::{Feature, FeatureSink, FeatureSource, Schema};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in GeoProc.
///
/// Algorithms are functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
