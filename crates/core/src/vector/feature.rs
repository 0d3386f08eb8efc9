use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    /// Feature geometry
    #[serde(default)]
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    #[serde(default)]
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            ..Self::default()
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Ordered collection of features
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::point;

    #[test]
    fn test_feature_builders() {
        let f = Feature::new(Geometry::Point(point!(x: 1.0, y: 2.0)))
            .with_id("a")
            .with_property("name", AttributeValue::String("well".into()));

        assert_eq!(f.id.as_deref(), Some("a"));
        assert_eq!(
            f.get_property("name"),
            Some(&AttributeValue::String("well".into()))
        );
        assert!(Feature::empty().geometry.is_none());
    }

    #[test]
    fn test_collection_preserves_order() {
        let coll: FeatureCollection = (0..3)
            .map(|i| Feature::empty().with_id(i.to_string()))
            .collect();
        let ids: Vec<_> = coll.iter().filter_map(|f| f.id.clone()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_attribute_json_is_plain() {
        let json = serde_json::to_string(&AttributeValue::Int(3)).unwrap();
        assert_eq!(json, "3");
        let back: AttributeValue = serde_json::from_str("null").unwrap();
        assert_eq!(back, AttributeValue::Null);
    }
}
