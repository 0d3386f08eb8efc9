//! Coordinate Reference System handling
//!
//! GeoProc never reprojects. A `CRS` is carried from inputs to outputs
//! verbatim, so equality here is structural: two values compare equal only
//! when every stored representation matches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wkt: Option<String>,
    /// EPSG code if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    epsg: Option<u32>,
    /// PROJ string if available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// Assemble a CRS from whichever representations a reader found.
    /// Returns `None` when all three are absent.
    pub fn from_parts(epsg: Option<u32>, wkt: Option<String>, proj: Option<String>) -> Option<Self> {
        if epsg.is_none() && wkt.is_none() && proj.is_none() {
            return None;
        }
        Some(Self { wkt, epsg, proj })
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Heuristic: EPSG codes in the 4000 range are geographic 2D systems.
    pub fn is_geographic(&self) -> bool {
        match self.epsg {
            Some(code) => (4000..5000).contains(&code),
            None => self
                .wkt
                .as_deref()
                .map(|w| w.trim_start().starts_with("GEOGCS") || w.trim_start().starts_with("GEOGCRS"))
                .unwrap_or(false),
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt.char_indices().nth(50).map(|(i, _)| i).unwrap_or(wkt.len());
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
        assert!(crs.is_geographic());
    }

    #[test]
    fn test_structural_equality() {
        assert_ne!(CRS::from_epsg(4326), CRS::from_wkt("GEOGCS[\"WGS 84\"]"));
        assert!(!CRS::from_epsg(32719).is_geographic());
    }
}
