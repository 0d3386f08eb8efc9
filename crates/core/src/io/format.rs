//! Output format registry.
//!
//! Handlers are plain descriptors (name, extensions, capabilities) collected
//! once into a [`FormatRegistry`]. The registry answers one question: which
//! raster-write capable handler owns a given file extension.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::native::{self, GeoTiffOptions};
use crate::raster::{GeoTransform, Raster, RasterElement};
use ndarray::Array2;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Capabilities a handler advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Reads or writes raster data
    pub raster: bool,
    /// Can create new datasets (directly or by copy)
    pub create: bool,
    /// Reads or writes vector data
    pub vector: bool,
}

impl Capabilities {
    pub const RASTER_WRITE: Capabilities = Capabilities {
        raster: true,
        create: true,
        vector: false,
    };
}

/// How a handler actually writes files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Built-in GeoTIFF writer
    NativeGeoTiff(GeoTiffOptions),
    /// GDAL driver, by short name
    #[cfg(feature = "gdal")]
    Gdal(String),
}

/// Descriptor of one output format.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatHandler {
    pub name: String,
    pub long_name: String,
    /// Lowercase extensions without the leading dot
    pub extensions: Vec<String>,
    pub capabilities: Capabilities,
    backend: Backend,
}

impl FormatHandler {
    pub fn new(
        name: impl Into<String>,
        long_name: impl Into<String>,
        extensions: &[&str],
        capabilities: Capabilities,
        backend: Backend,
    ) -> Self {
        Self {
            name: name.into(),
            long_name: long_name.into(),
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            capabilities,
            backend,
        }
    }

    /// Built-in GeoTIFF handler (`tif`, `tiff`)
    pub fn native_geotiff() -> Self {
        Self::new(
            "GTiff",
            "GeoTIFF",
            &["tif", "tiff"],
            Capabilities::RASTER_WRITE,
            Backend::NativeGeoTiff(GeoTiffOptions::default()),
        )
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn can_write_raster(&self) -> bool {
        self.capabilities.raster && self.capabilities.create
    }

    pub fn supports_extension(&self, extension: &str) -> bool {
        let ext = normalize_extension(extension);
        self.extensions.iter().any(|e| *e == ext)
    }

    /// Start a new single-band dataset of `rows x cols` cells of type `T`.
    ///
    /// Nothing touches `path` until [`OutputRaster::flush`] succeeds; a
    /// dropped, unflushed output leaves the destination untouched.
    pub fn create<T: RasterElement>(
        &self,
        path: impl AsRef<Path>,
        rows: usize,
        cols: usize,
    ) -> Result<OutputRaster<'_, T>> {
        if !self.can_write_raster() {
            return Err(Error::UnsupportedFormat(self.name.clone()));
        }
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("output directory does not exist: {}", parent.display()),
                )));
            }
        }
        debug!(handler = %self.name, path = %path.display(), rows, cols, data_type = %T::DATA_TYPE, "creating output raster");
        Ok(OutputRaster {
            handler: self,
            path,
            raster: Raster::new(rows, cols),
            flushed: false,
        })
    }
}

impl fmt::Display for FormatHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.long_name)
    }
}

/// Lowercase and strip one leading dot.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// A single-band output dataset being assembled in memory.
pub struct OutputRaster<'h, T: RasterElement> {
    handler: &'h FormatHandler,
    path: PathBuf,
    raster: Raster<T>,
    flushed: bool,
}

impl<'h, T: RasterElement> OutputRaster<'h, T> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shape(&self) -> (usize, usize) {
        self.raster.shape()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.raster.set_crs(crs);
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.raster.set_transform(transform);
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.raster.set_nodata(nodata);
    }

    /// Replace the whole band. Shape must match the dataset.
    pub fn write_band(&mut self, data: Array2<T>) -> Result<()> {
        self.raster.replace_data(data)
    }

    /// Write the dataset to its destination and return the path.
    pub fn flush(mut self) -> Result<PathBuf> {
        match &self.handler.backend {
            Backend::NativeGeoTiff(options) => {
                native::write_geotiff(&self.raster, &self.path, Some(options.clone()))?
            }
            #[cfg(feature = "gdal")]
            Backend::Gdal(driver) => super::gdal_io::write_with_driver(driver, &self.raster, &self.path)?,
        }
        self.flushed = true;
        Ok(self.path.clone())
    }
}

impl<T: RasterElement> Drop for OutputRaster<'_, T> {
    fn drop(&mut self) {
        if !self.flushed {
            debug!(path = %self.path.display(), "discarding unflushed output raster");
        }
    }
}

/// Extension → handler lookup table.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    handlers: Vec<FormatHandler>,
    by_extension: HashMap<String, usize>,
}

impl FormatRegistry {
    /// Build the table. For each extension the first raster-write capable
    /// handler listing it wins; later duplicates are ignored.
    pub fn new(handlers: Vec<FormatHandler>) -> Self {
        let mut by_extension = HashMap::new();
        for (idx, handler) in handlers.iter().enumerate() {
            if !handler.can_write_raster() {
                continue;
            }
            for ext in &handler.extensions {
                by_extension.entry(ext.clone()).or_insert(idx);
            }
        }
        Self {
            handlers,
            by_extension,
        }
    }

    /// Registry with the built-in writers only
    pub fn native() -> Self {
        Self::new(vec![FormatHandler::native_geotiff()])
    }

    /// Registry built from GDAL's driver list. Falls back to the native
    /// table if GDAL exposes no raster-write capable drivers.
    #[cfg(feature = "gdal")]
    pub fn from_gdal() -> Self {
        let handlers = super::gdal_io::driver_handlers();
        if handlers.iter().any(FormatHandler::can_write_raster) {
            Self::new(handlers)
        } else {
            warn!("GDAL reported no raster-write drivers, using native formats");
            Self::native()
        }
    }

    /// Registry for the enabled backend
    pub fn detect() -> Self {
        #[cfg(feature = "gdal")]
        {
            Self::from_gdal()
        }
        #[cfg(not(feature = "gdal"))]
        {
            Self::native()
        }
    }

    pub fn handlers(&self) -> &[FormatHandler] {
        &self.handlers
    }

    /// Use `options` for every built-in GeoTIFF handler
    pub fn with_geotiff_options(mut self, options: GeoTiffOptions) -> Self {
        for handler in &mut self.handlers {
            if let Backend::NativeGeoTiff(current) = &mut handler.backend {
                *current = options.clone();
            }
        }
        self
    }

    /// Handler for an extension (case-insensitive, leading dot optional)
    pub fn resolve_handler(&self, extension: &str) -> Option<&FormatHandler> {
        self.by_extension
            .get(&normalize_extension(extension))
            .map(|&idx| &self.handlers[idx])
    }

    /// Handler for the extension of `path`
    pub fn resolve_for_path(&self, path: &Path) -> Result<&FormatHandler> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.resolve_handler(ext).ok_or_else(|| {
            warn!(path = %path.display(), "no raster format handler for extension");
            Error::UnsupportedFormat(ext.to_string())
        })
    }
}

/// Opens existing rasters. Reads a single band as `f64`.
pub trait RasterProvider {
    fn open_band(&self, path: &Path, band: usize) -> Result<Raster<f64>>;
}

/// File-based provider: native GeoTIFF reader, or GDAL when enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRasterProvider;

impl RasterProvider for FileRasterProvider {
    fn open_band(&self, path: &Path, band: usize) -> Result<Raster<f64>> {
        #[cfg(feature = "gdal")]
        {
            super::gdal_io::read_band(path, band)
        }
        #[cfg(not(feature = "gdal"))]
        {
            native::read_geotiff(path, Some(band))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::native::Compression;
    use tempfile::tempdir;

    fn read_only(name: &str, exts: &[&str]) -> FormatHandler {
        FormatHandler::new(
            name,
            name,
            exts,
            Capabilities {
                raster: true,
                create: false,
                vector: false,
            },
            Backend::NativeGeoTiff(GeoTiffOptions::default()),
        )
    }

    #[test]
    fn test_resolve_is_case_insensitive_and_strips_dot() {
        let registry = FormatRegistry::native();
        for ext in ["tif", ".tif", "TIF", ".TiFF"] {
            let handler = registry.resolve_handler(ext).expect("tif should resolve");
            assert_eq!(handler.name, "GTiff");
        }
        assert!(registry.resolve_handler("xyz123").is_none());
    }

    #[test]
    fn test_first_writable_handler_wins() {
        let mut second = FormatHandler::native_geotiff();
        second.name = "COG".into();
        let registry = FormatRegistry::new(vec![
            read_only("ReadOnlyTiff", &["tif"]),
            FormatHandler::native_geotiff(),
            second,
        ]);
        assert_eq!(registry.resolve_handler("tif").unwrap().name, "GTiff");
        assert_eq!(registry.handlers().len(), 3);
    }

    #[test]
    fn test_read_only_handler_never_resolves() {
        let registry = FormatRegistry::new(vec![read_only("PNGRead", &["png"])]);
        assert!(registry.resolve_handler("png").is_none());
    }

    #[test]
    fn test_resolve_for_path_unsupported() {
        let registry = FormatRegistry::native();
        let err = registry
            .resolve_for_path(Path::new("/tmp/out.xyz123"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ext) if ext == "xyz123"));
        assert!(matches!(
            registry.resolve_for_path(Path::new("/tmp/no_extension")),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_unflushed_output_leaves_no_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("never.tif");
        let handler = FormatHandler::native_geotiff();
        {
            let mut out = handler.create::<u8>(&path, 2, 2).unwrap();
            out.write_band(Array2::from_elem((2, 2), 1)).unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_flush_writes_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.tif");
        let handler = FormatHandler::native_geotiff();
        let gt = GeoTransform::new(1.0, 2.0, 0.5, -0.5);

        let mut out = handler.create::<u8>(&path, 2, 3).unwrap();
        out.set_crs(Some(CRS::from_epsg(3857)));
        out.set_transform(gt);
        out.write_band(Array2::from_shape_vec((2, 3), vec![0, 1, 2, 3, 4, 4]).unwrap())
            .unwrap();
        assert!(out.write_band(Array2::zeros((3, 2))).is_err());
        let written = out.flush().unwrap();
        assert_eq!(written, path);

        let back: Raster<u8> = native::read_geotiff(&path, None).unwrap();
        assert_eq!(back.to_vec(), vec![0, 1, 2, 3, 4, 4]);
        assert!(back.transform().bit_eq(&gt));
        assert_eq!(back.crs(), Some(&CRS::from_epsg(3857)));
    }

    #[test]
    fn test_geotiff_options_reach_written_file() {
        let dir = tempdir().unwrap();
        let options = GeoTiffOptions { compression: Compression::Deflate };
        let registry = FormatRegistry::native().with_geotiff_options(options.clone());
        let handler = registry.resolve_handler("tif").unwrap();
        assert_eq!(handler.backend(), &Backend::NativeGeoTiff(options));

        let path = dir.path().join("zipped.tif");
        let mut out = handler.create::<u8>(&path, 64, 64).unwrap();
        out.write_band(Array2::zeros((64, 64))).unwrap();
        out.flush().unwrap();

        let plain = dir.path().join("plain.tif");
        let plain_handler = FormatHandler::native_geotiff();
        let mut out = plain_handler.create::<u8>(&plain, 64, 64).unwrap();
        out.write_band(Array2::zeros((64, 64))).unwrap();
        out.flush().unwrap();

        let size = |p: &Path| std::fs::metadata(p).unwrap().len();
        assert!(size(&path) < size(&plain));
        let back: Raster<u8> = native::read_geotiff(&path, None).unwrap();
        assert!(back.to_vec().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_create_in_missing_directory() {
        let handler = FormatHandler::native_geotiff();
        let err = handler
            .create::<u8>("/nonexistent-dir/sub/out.tif", 1, 1)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Io(_)));
    }
}
