//! Feature pass-through
//!
//! Copies features from a source to a sink unchanged and in source order.

use geoproc_core::vector::{FeatureSink, FeatureSource, MemoryLayer};
use geoproc_core::{Algorithm, Error, Feedback, Result};
use tracing::{debug, info};

/// Outcome of a feature copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Features added to the sink
    pub written: usize,
    /// Whether the copy stopped early on a cancellation request
    pub cancelled: bool,
}

/// Copy every feature of `source` into `sink`.
///
/// Cancellation is checked before each feature; when requested the copy
/// stops and the features already written stay in the sink. After each
/// feature, progress is reported as `written / total * 100` if the source
/// knows a non-zero total.
///
/// The sink is not flushed.
pub fn copy_features(
    source: &dyn FeatureSource,
    sink: &mut dyn FeatureSink,
    feedback: &Feedback,
) -> Result<CopyOutcome> {
    let total = source.feature_count().filter(|&n| n > 0);
    let mut written = 0usize;

    for feature in source.features() {
        if feedback.is_canceled() {
            info!(written, sink = sink.id(), "feature copy cancelled");
            return Ok(CopyOutcome {
                written,
                cancelled: true,
            });
        }
        sink.add_feature(feature?)?;
        written += 1;

        if let Some(total) = total {
            feedback.set_progress(written as f64 / total as f64 * 100.0);
        }
    }

    debug!(written, sink = sink.id(), "feature copy complete");
    Ok(CopyOutcome {
        written,
        cancelled: false,
    })
}

/// Pass-through into an in-memory layer
#[derive(Debug, Clone, Default)]
pub struct FeaturePassThrough;

impl Algorithm for FeaturePassThrough {
    type Input = MemoryLayer;
    type Output = MemoryLayer;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Feature Pass-Through"
    }

    fn description(&self) -> &'static str {
        "Copy features from an input layer to an output layer unchanged"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        let mut output = MemoryLayer::new("passthrough", FeatureSource::schema(&input).clone());
        copy_features(&input, &mut output, &Feedback::new())?;
        Ok(output)
    }
}
