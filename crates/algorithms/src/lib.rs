//! # GeoProc Algorithms
//!
//! Processing procedures for GeoProc.
//!
//! ## Modules
//!
//! - **statistics**: quantile estimation, quartile breakpoints
//! - **classification**: quantile discretization of rasters
//! - **vector**: feature pass-through
//! - **processing**: file-level procedures (`feature_passthrough`, `discretize_raster`)
//! - **registry**: algorithm descriptors and id-based dispatch for hosts

pub mod classification;
pub mod processing;
pub mod registry;
pub mod statistics;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{quantile_discretize, QuantileDiscretizer, QuantileParams};
    pub use crate::processing::{
        discretize_raster, feature_passthrough, DiscretizeParams, DiscretizeResult,
        PassThroughParams, PassThroughResult,
    };
    pub use crate::registry::{build_registry, run_algorithm, ParamValue, RunContext};
    pub use crate::statistics::{quartile_breakpoints, Breakpoints, IntervalClosure};
    pub use crate::vector::{copy_features, CopyOutcome, FeaturePassThrough};
    pub use geoproc_core::prelude::*;
}
