//! Vector feature operations
//!
//! - Pass-through: copy features from a source to a sink unchanged

mod passthrough;

pub use passthrough::{copy_features, CopyOutcome, FeaturePassThrough};
