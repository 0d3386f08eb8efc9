//! Vector data structures and the feature source/sink contracts.
//!
//! A [`FeatureSource`] yields features in a stable order; a [`FeatureSink`]
//! is append-only and is created by a [`SinkProvider`] from the schema of
//! the source it will receive features from.

mod feature;
mod memory;
mod schema;

pub use feature::{AttributeValue, Feature, FeatureCollection};
pub use memory::{MemoryLayer, MemorySinkProvider};
pub use schema::{FieldDefn, FieldType, GeometryType, Schema};

use crate::error::Result;

/// Readable, ordered sequence of features sharing one schema.
pub trait FeatureSource {
    /// Field list, geometry type and spatial reference of the features
    fn schema(&self) -> &Schema;

    /// Total number of features, if known without iterating
    fn feature_count(&self) -> Option<usize>;

    /// Iterate features in source order. Read failures surface as `Err`
    /// items; iteration may stop after the first one.
    fn features(&self) -> Box<dyn Iterator<Item = Result<Feature>> + '_>;
}

/// Append-only destination for features.
pub trait FeatureSink {
    /// Identifier of the destination (a path, or `memory:<name>`)
    fn id(&self) -> &str;

    /// Schema the sink was created with
    fn schema(&self) -> &Schema;

    fn add_feature(&mut self, feature: Feature) -> Result<()>;

    /// Make everything added so far durable.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Creates sinks for a destination string.
pub trait SinkProvider {
    fn create_sink(&self, destination: &str, schema: &Schema) -> Result<Box<dyn FeatureSink>>;
}
