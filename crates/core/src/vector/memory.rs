//! In-memory feature layer usable as both source and sink.

use super::{Feature, FeatureCollection, FeatureSink, FeatureSource, Schema, SinkProvider};
use crate::error::Result;
use std::sync::{Arc, Mutex};

/// A named layer held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryLayer {
    id: String,
    schema: Schema,
    features: FeatureCollection,
}

impl MemoryLayer {
    pub fn new(name: &str, schema: Schema) -> Self {
        Self {
            id: format!("memory:{}", name),
            schema,
            features: FeatureCollection::new(),
        }
    }

    pub fn from_features(name: &str, schema: Schema, features: Vec<Feature>) -> Self {
        Self {
            features: FeatureCollection { features },
            ..Self::new(name, schema)
        }
    }

    pub fn features_slice(&self) -> &[Feature] {
        &self.features.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FeatureSource for MemoryLayer {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn feature_count(&self) -> Option<usize> {
        Some(self.features.len())
    }

    fn features(&self) -> Box<dyn Iterator<Item = Result<Feature>> + '_> {
        Box::new(self.features.iter().cloned().map(Ok))
    }
}

impl FeatureSink for MemoryLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn add_feature(&mut self, feature: Feature) -> Result<()> {
        self.features.push(feature);
        Ok(())
    }
}

/// Sink provider that keeps every created layer reachable after the sink
/// itself has been dropped.
#[derive(Debug, Clone, Default)]
pub struct MemorySinkProvider {
    layers: Arc<Mutex<Vec<Arc<Mutex<MemoryLayer>>>>>,
}

impl MemorySinkProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the layer created for `id`, if any.
    pub fn layer(&self, id: &str) -> Option<MemoryLayer> {
        let layers = self.layers.lock().ok()?;
        layers
            .iter()
            .filter_map(|l| l.lock().ok().map(|g| g.clone()))
            .find(|l| l.id == id)
    }
}

struct SharedMemorySink {
    id: String,
    schema: Schema,
    layer: Arc<Mutex<MemoryLayer>>,
}

impl FeatureSink for SharedMemorySink {
    fn id(&self) -> &str {
        &self.id
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn add_feature(&mut self, feature: Feature) -> Result<()> {
        let mut layer = self.layer.lock().map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::Other, "memory layer lock poisoned")
        })?;
        layer.features.push(feature);
        Ok(())
    }
}

impl SinkProvider for MemorySinkProvider {
    fn create_sink(&self, destination: &str, schema: &Schema) -> Result<Box<dyn FeatureSink>> {
        let layer = MemoryLayer::new(destination, schema.clone());
        let id = layer.id.clone();
        let shared = Arc::new(Mutex::new(layer));
        self.layers
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "provider lock poisoned"))?
            .push(Arc::clone(&shared));

        Ok(Box::new(SharedMemorySink {
            id,
            schema: schema.clone(),
            layer: shared,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{AttributeValue, GeometryType};

    #[test]
    fn test_memory_layer_source_and_sink() {
        let mut layer = MemoryLayer::new("pts", Schema::default());
        assert_eq!(FeatureSink::id(&layer), "memory:pts");
        layer.add_feature(Feature::empty().with_id("1")).unwrap();
        layer.add_feature(Feature::empty().with_id("2")).unwrap();

        assert_eq!(layer.feature_count(), Some(2));
        let ids: Vec<_> = layer
            .features()
            .map(|f| f.unwrap().id.unwrap())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_provider_keeps_created_layers() {
        let provider = MemorySinkProvider::new();
        let schema = Schema::new(vec![], GeometryType::Point, None);
        let mut sink = provider.create_sink("out", &schema).unwrap();
        sink.add_feature(Feature::empty().with_property("k", AttributeValue::Bool(true)))
            .unwrap();
        let id = sink.id().to_string();
        drop(sink);

        let layer = provider.layer(&id).expect("layer should be retained");
        assert_eq!(layer.len(), 1);
        assert_eq!(FeatureSource::schema(&layer), &schema);
        assert!(provider.layer("memory:other").is_none());
    }
}
