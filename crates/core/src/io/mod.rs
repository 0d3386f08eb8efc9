//! I/O for raster and vector data, and the output format registry

mod format;
#[cfg(feature = "gdal")]
mod gdal_io;
mod native;
mod vector_json;

pub use format::{
    normalize_extension, Backend, Capabilities, FileRasterProvider, FormatHandler, FormatRegistry,
    OutputRaster, RasterProvider,
};
pub use native::{read_geotiff, write_geotiff, Compression, GeoTiffOptions};
pub use vector_json::{read_layer, write_layer, JsonLayerProvider, JsonLayerSink};

use crate::error::Result;
use crate::raster::Raster;
use std::path::Path;

/// Open band 1 of a raster with the default file provider.
pub fn open_raster(path: impl AsRef<Path>) -> Result<Raster<f64>> {
    FileRasterProvider.open_band(path.as_ref(), 1)
}
