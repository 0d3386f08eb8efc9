//! Error types for GeoProc

use thiserror::Error;

/// Main error type for GeoProc operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported format: no raster-write capable handler for extension '{0}'")]
    UnsupportedFormat(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("GDAL error: {0}")]
    #[cfg(feature = "gdal")]
    Gdal(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Error {
    /// Whether this error stems from reading or writing data, as opposed
    /// to bad parameters or degenerate input.
    pub fn is_io(&self) -> bool {
        match self {
            Error::Io(_) | Error::Tiff(_) | Error::Json(_) => true,
            #[cfg(feature = "gdal")]
            Error::Gdal(_) => true,
            _ => false,
        }
    }
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        match e {
            tiff::TiffError::IoError(io) => Error::Io(io),
            other => Error::Tiff(other.to_string()),
        }
    }
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for GeoProc operations
pub type Result<T> = std::result::Result<T, Error>;
