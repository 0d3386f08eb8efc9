//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Pixel data type of a band, named after the GDAL type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
        }
    }

    /// Size of one sample in bytes
    pub fn size(&self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for types that can be stored in a raster cell.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Band data type matching this Rust type
    const DATA_TYPE: DataType;

    /// Value used when a source sample cannot be represented
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;
}

macro_rules! impl_raster_element_int {
    ($t:ty, $dt:expr) => {
        impl RasterElement for $t {
            const DATA_TYPE: DataType = $dt;

            fn default_nodata() -> Self {
                <$t>::MAX
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty, $dt:expr) => {
        impl RasterElement for $t {
            const DATA_TYPE: DataType = $dt;

            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                // NaN never compares equal, so it is nodata on its own
                self.is_nan() || nodata == Some(*self)
            }
        }
    };
}

impl_raster_element_int!(u8, DataType::Byte);
impl_raster_element_int!(i16, DataType::Int16);
impl_raster_element_int!(u16, DataType::UInt16);
impl_raster_element_int!(i32, DataType::Int32);
impl_raster_element_int!(u32, DataType::UInt32);
impl_raster_element_float!(f32, DataType::Float32);
impl_raster_element_float!(f64, DataType::Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_nan_is_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(!1.0f64.is_nodata(None));
        assert!((-9999.0f64).is_nodata(Some(-9999.0)));
    }

    #[test]
    fn test_int_nodata_exact() {
        assert!(255u8.is_nodata(Some(255)));
        assert!(!254u8.is_nodata(Some(255)));
        assert!(!0u8.is_nodata(None));
        assert_eq!(<u8 as RasterElement>::DATA_TYPE, DataType::Byte);
    }
}
