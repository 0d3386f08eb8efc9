use crate::crs::CRS;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Bool,
    Integer,
    Real,
    String,
}

/// Field definition (name + type)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDefn {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDefn {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Geometry type tag of a layer. `Unknown` accepts any geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GeometryType {
    #[default]
    Unknown,
    /// Attribute-only layer
    None,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryType {
    /// Tag for a concrete geometry. `Line`, `Rect` and `Triangle` map to
    /// the simple-features type they serialize as.
    pub fn of(geometry: &Geometry<f64>) -> Self {
        match geometry {
            Geometry::Point(_) => Self::Point,
            Geometry::Line(_) | Geometry::LineString(_) => Self::LineString,
            Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => Self::Polygon,
            Geometry::MultiPoint(_) => Self::MultiPoint,
            Geometry::MultiLineString(_) => Self::MultiLineString,
            Geometry::MultiPolygon(_) => Self::MultiPolygon,
            Geometry::GeometryCollection(_) => Self::GeometryCollection,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::None => "None",
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
            Self::MultiLineString => "MultiLineString",
            Self::MultiPolygon => "MultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Layer schema: the contract a sink is created with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: Vec<FieldDefn>,
    #[serde(default)]
    pub geometry_type: GeometryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<CRS>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDefn>, geometry_type: GeometryType, crs: Option<CRS>) -> Self {
        Self {
            fields,
            geometry_type,
            crs,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefn> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point};

    #[test]
    fn test_geometry_type_of() {
        assert_eq!(
            GeometryType::of(&Geometry::Point(point!(x: 0.0, y: 0.0))),
            GeometryType::Point
        );
        let ls = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)];
        assert_eq!(GeometryType::of(&Geometry::LineString(ls)), GeometryType::LineString);
    }

    #[test]
    fn test_schema_field_lookup() {
        let schema = Schema::new(
            vec![
                FieldDefn::new("id", FieldType::Integer),
                FieldDefn::new("name", FieldType::String),
            ],
            GeometryType::Point,
            Some(CRS::from_epsg(4326)),
        );
        assert_eq!(schema.field("name").map(|f| f.field_type), Some(FieldType::String));
        assert!(schema.field("missing").is_none());
    }
}
