//! File-level processing procedures.
//!
//! Each procedure takes a parameter struct, runs once and returns a result
//! struct whose [`to_outputs`](PassThroughResult::to_outputs) map uses the
//! same `INPUT`/`OUTPUT` keys as the parameters.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use geoproc_core::io::{FileRasterProvider, FormatRegistry, RasterProvider};
use geoproc_core::vector::{FeatureSource, SinkProvider};
use geoproc_core::{Feedback, Result};
use tracing::{debug, info};

use crate::classification::{quantile_discretize, QuantileParams};
use crate::statistics::Breakpoints;
use crate::vector::copy_features;

/// Parameter key of the input layer or raster
pub const INPUT: &str = "INPUT";
/// Parameter key of the output destination
pub const OUTPUT: &str = "OUTPUT";

/// Parameters for [`feature_passthrough`]
pub struct PassThroughParams<'a> {
    /// Features to copy
    pub input: &'a dyn FeatureSource,
    /// Sink destination, interpreted by the [`SinkProvider`]
    pub output: String,
}

/// Result of [`feature_passthrough`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassThroughResult {
    /// Identifier of the created sink
    pub output: String,
    pub written: usize,
    pub cancelled: bool,
}

impl PassThroughResult {
    pub fn to_outputs(&self) -> HashMap<String, String> {
        HashMap::from([(OUTPUT.to_string(), self.output.clone())])
    }
}

/// Copy every feature of `params.input` into a new sink at `params.output`.
///
/// The sink is created with the source's schema. On cancellation the
/// features copied so far are flushed and kept; cancellation is not an error.
pub fn feature_passthrough(
    params: PassThroughParams<'_>,
    sinks: &dyn SinkProvider,
    feedback: &Feedback,
) -> Result<PassThroughResult> {
    let schema = params.input.schema();
    let mut sink = sinks.create_sink(&params.output, schema)?;
    debug!(sink = sink.id(), geometry_type = %schema.geometry_type, "created feature sink");

    let outcome = copy_features(params.input, sink.as_mut(), feedback)?;
    sink.flush()?;

    info!(
        sink = sink.id(),
        written = outcome.written,
        cancelled = outcome.cancelled,
        "feature pass-through finished"
    );
    Ok(PassThroughResult {
        output: sink.id().to_string(),
        written: outcome.written,
        cancelled: outcome.cancelled,
    })
}

/// Parameters for [`discretize_raster`]
#[derive(Debug, Clone, Default)]
pub struct DiscretizeParams {
    /// Input raster path (band 1 is read)
    pub input: PathBuf,
    /// Output raster path; its extension selects the format
    pub output: PathBuf,
    pub quantile: QuantileParams,
}

impl DiscretizeParams {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            quantile: QuantileParams::default(),
        }
    }
}

/// Result of [`discretize_raster`]
#[derive(Debug, Clone, PartialEq)]
pub struct DiscretizeResult {
    /// Path of the written raster
    pub output: PathBuf,
    pub breakpoints: Breakpoints,
}

impl DiscretizeResult {
    pub fn to_outputs(&self) -> HashMap<String, String> {
        HashMap::from([(OUTPUT.to_string(), self.output.display().to_string())])
    }
}

/// Discretize band 1 of a raster file into quartile buckets and write a
/// single-band byte raster with the input's CRS and geotransform.
///
/// # Errors
/// - [`UnsupportedFormat`](geoproc_core::Error::UnsupportedFormat) if no
///   registered handler writes the output extension
/// - `Io`/`Tiff` if the input cannot be read or the output cannot be written
/// - [`Data`](geoproc_core::Error::Data) if the band is empty or all nodata
///
/// Nothing is written to the output path unless the call succeeds.
pub fn discretize_raster(params: DiscretizeParams, formats: &FormatRegistry) -> Result<DiscretizeResult> {
    discretize_raster_with(params, formats, &FileRasterProvider)
}

/// [`discretize_raster`] with an explicit raster provider for the input.
pub fn discretize_raster_with(
    params: DiscretizeParams,
    formats: &FormatRegistry,
    rasters: &dyn RasterProvider,
) -> Result<DiscretizeResult> {
    let handler = formats.resolve_for_path(&params.output)?;
    debug!(handler = %handler, output = %params.output.display(), "resolved output format");

    let input = rasters.open_band(&params.input, 1)?;
    let (rows, cols) = input.shape();
    info!(input = %params.input.display(), rows, cols, "opened input raster");

    let mut output = handler.create::<u8>(&params.output, rows, cols)?;
    output.set_crs(input.crs().cloned());
    output.set_transform(*input.transform());

    let (classified, breakpoints) = quantile_discretize(&input, params.quantile)?;
    output.set_nodata(classified.nodata());
    output.write_band(classified.into_data())?;
    let path = output.flush()?;

    info!(output = %path.display(), %breakpoints, "wrote discretized raster");
    Ok(DiscretizeResult {
        output: path,
        breakpoints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoproc_core::io::{read_geotiff, write_geotiff};
    use geoproc_core::vector::{Feature, MemoryLayer, MemorySinkProvider, Schema};
    use geoproc_core::{Error, GeoTransform, Raster, CRS};
    use tempfile::tempdir;

    #[test]
    fn test_passthrough_to_memory() {
        let src = MemoryLayer::from_features(
            "src",
            Schema::default(),
            vec![Feature::empty().with_id("a"), Feature::empty().with_id("b")],
        );
        let sinks = MemorySinkProvider::new();
        let params = PassThroughParams {
            input: &src,
            output: "copy".into(),
        };

        let result = feature_passthrough(params, &sinks, &Feedback::new()).unwrap();
        assert_eq!(result.output, "memory:copy");
        assert_eq!(result.written, 2);
        assert_eq!(result.to_outputs()[OUTPUT], "memory:copy");
        assert_eq!(sinks.layer("memory:copy").unwrap().features_slice(), src.features_slice());
    }

    #[test]
    fn test_discretize_file_roundtrip() {
        let dir = tempdir().unwrap();
        let input_path = dir.path().join("in.tif");
        let output_path = dir.path().join("out.TIF");

        let mut input = Raster::from_vec(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        input.set_transform(GeoTransform::new(100.0, 200.0, 10.0, -10.0));
        input.set_crs(Some(CRS::from_epsg(32633)));
        write_geotiff(&input, &input_path, None).unwrap();

        let result = discretize_raster(
            DiscretizeParams::new(&input_path, &output_path),
            &FormatRegistry::native(),
        )
        .unwrap();
        assert_eq!(result.output, output_path);
        assert_eq!(result.breakpoints.values(), &[1.0, 1.75, 2.5, 3.25]);

        let written: Raster<u8> = read_geotiff(&output_path, None).unwrap();
        assert_eq!(written.to_vec(), vec![1, 2, 3, 4]);
        assert!(written.transform().bit_eq(input.transform()));
        assert_eq!(written.crs().and_then(|c| c.epsg()), Some(32633));
    }

    #[test]
    fn test_discretize_unknown_extension() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.xyz123");
        let err = discretize_raster(
            DiscretizeParams::new(dir.path().join("in.tif"), &output),
            &FormatRegistry::native(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref ext) if ext == "xyz123"));
        assert!(!output.exists());
    }

    #[test]
    fn test_discretize_missing_input() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.tif");
        let err = discretize_raster(
            DiscretizeParams::new(dir.path().join("missing.tif"), &output),
            &FormatRegistry::native(),
        )
        .unwrap_err();
        assert!(err.is_io());
        assert!(!output.exists());
    }
}
