//! Quartile discretization
//!
//! Replaces every cell with the index of the quartile bucket it falls into,
//! using breakpoints estimated from the raster's own valid samples.

use ndarray::Array2;
use geoproc_core::raster::Raster;
use geoproc_core::{Algorithm, Error, Result};
use tracing::debug;

use crate::statistics::{quartile_breakpoints, Breakpoints, IntervalClosure};

/// Output value written for skipped input cells
pub const OUTPUT_NODATA: u8 = 255;

/// Parameters for quantile discretization
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantileParams {
    /// Tie rule for values equal to a breakpoint
    pub closure: IntervalClosure,
    /// Treat the band's declared nodata value as missing. When off, only NaN
    /// is missing and a declared nodata value is bucketed like any other.
    pub skip_nodata: bool,
}

/// Quantile discretization algorithm
#[derive(Debug, Clone, Default)]
pub struct QuantileDiscretizer;

impl Algorithm for QuantileDiscretizer {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = QuantileParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Quantile Discretizer"
    }

    fn description(&self) -> &'static str {
        "Discretize a raster into quartile buckets (0-4) using quantile breakpoints"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        quantile_discretize(&input, params).map(|(raster, _)| raster)
    }
}

/// Discretize a raster into quartile buckets.
///
/// Breakpoints are the 0th, 25th, 50th and 75th percentiles of the valid
/// cells. Each valid cell becomes the number of breakpoints it reaches
/// (see [`IntervalClosure`]), so outputs lie in `0..=4`. NaN cells, and
/// declared-nodata cells when [`QuantileParams::skip_nodata`] is set, become
/// [`OUTPUT_NODATA`], which is then declared as the output's nodata value.
///
/// The output keeps the input's shape, transform and CRS.
///
/// # Errors
/// [`Error::Data`] if the raster has no cells or no valid cells.
pub fn quantile_discretize(
    raster: &Raster<f64>,
    params: QuantileParams,
) -> Result<(Raster<u8>, Breakpoints)> {
    if raster.is_empty() {
        let (rows, cols) = raster.shape();
        return Err(Error::Data(format!(
            "raster band has no pixels ({}x{})",
            cols, rows
        )));
    }

    let missing = |v: f64| v.is_nan() || (params.skip_nodata && raster.is_nodata(v));
    let breakpoints = quartile_breakpoints(raster.data().iter().copied().filter(|&v| !missing(v)))?;
    debug!(%breakpoints, closure = ?params.closure, skip_nodata = params.skip_nodata, "quartile breakpoints");

    let mut has_nodata = false;
    let data: Array2<u8> = raster.data().mapv(|v| {
        if missing(v) {
            has_nodata = true;
            OUTPUT_NODATA
        } else {
            breakpoints.bucket(v, params.closure)
        }
    });

    let mut output = raster.with_same_meta::<u8>();
    output.replace_data(data)?;
    if has_nodata {
        output.set_nodata(Some(OUTPUT_NODATA));
    }

    Ok((output, breakpoints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoproc_core::{GeoTransform, CRS};

    fn two_by_two() -> Raster<f64> {
        let mut r = Raster::from_vec(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        r.set_transform(GeoTransform::new(500.0, 1000.0, 30.0, -30.0));
        r.set_crs(Some(CRS::from_epsg(32719)));
        r
    }

    #[test]
    fn test_left_closed_buckets() {
        let (out, bp) = quantile_discretize(&two_by_two(), QuantileParams::default()).unwrap();
        assert_eq!(bp.values(), &[1.0, 1.75, 2.5, 3.25]);
        assert_eq!(out.to_vec(), vec![1, 2, 3, 4]);
        assert_eq!(out.nodata(), None);
    }

    #[test]
    fn test_right_closed_buckets() {
        let params = QuantileParams {
            closure: IntervalClosure::Right,
            ..Default::default()
        };
        let (out, _) = quantile_discretize(&two_by_two(), params).unwrap();
        // 1.0 sits on the first breakpoint; 2.0, 3.0, 4.0 clear 2, 3 and 4 of them
        assert_eq!(out.to_vec(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_metadata_is_inherited() {
        let input = two_by_two();
        let (out, _) = quantile_discretize(&input, QuantileParams::default()).unwrap();
        assert_eq!(out.shape(), input.shape());
        assert!(out.transform().bit_eq(input.transform()));
        assert_eq!(out.crs(), input.crs());
    }

    #[test]
    fn test_uniform_raster() {
        let input: Raster<f64> = Raster::from_vec(vec![3.0; 6], 2, 3).unwrap();
        let (out, bp) = quantile_discretize(&input, QuantileParams::default()).unwrap();
        assert_eq!(bp.values(), &[3.0; 4]);
        assert!(out.to_vec().iter().all(|&v| v == 4));

        let right = QuantileParams {
            closure: IntervalClosure::Right,
            ..Default::default()
        };
        let (out, _) = quantile_discretize(&input, right).unwrap();
        assert!(out.to_vec().iter().all(|&v| v == 0));
    }

    fn skipping() -> QuantileParams {
        QuantileParams {
            skip_nodata: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_nodata_cells_excluded_when_skipping() {
        let mut input =
            Raster::from_vec(vec![1.0, -9999.0, 2.0, 3.0, f64::NAN, 4.0], 2, 3).unwrap();
        input.set_nodata(Some(-9999.0));

        let (out, bp) = quantile_discretize(&input, skipping()).unwrap();
        assert_eq!(bp.values(), &[1.0, 1.75, 2.5, 3.25]);
        assert_eq!(out.to_vec(), vec![1, 255, 2, 3, 255, 4]);
        assert_eq!(out.nodata(), Some(OUTPUT_NODATA));
    }

    #[test]
    fn test_declared_nodata_is_bucketed_by_default() {
        let mut input = Raster::from_vec(vec![1.0, -9999.0, 2.0, 3.0, 4.0, 5.0], 2, 3).unwrap();
        input.set_nodata(Some(-9999.0));

        let (out, bp) = quantile_discretize(&input, QuantileParams::default()).unwrap();
        assert_eq!(bp.values()[0], -9999.0);
        assert!(out.to_vec().iter().all(|&b| b <= 4));
        assert_eq!(out.to_vec()[1], 1);
        assert_eq!(out.nodata(), None);
    }

    #[test]
    fn test_nan_is_always_missing() {
        let input = Raster::from_vec(vec![1.0, f64::NAN, 2.0, 3.0], 2, 2).unwrap();
        let (out, _) = quantile_discretize(&input, QuantileParams::default()).unwrap();
        assert_eq!(out.to_vec()[1], OUTPUT_NODATA);
        assert_eq!(out.nodata(), Some(OUTPUT_NODATA));
    }

    #[test]
    fn test_empty_and_all_nodata_rejected() {
        let empty: Raster<f64> = Raster::new(0, 0);
        assert!(matches!(
            quantile_discretize(&empty, QuantileParams::default()),
            Err(Error::Data(_))
        ));

        let mut all_nd = Raster::from_vec(vec![0.0; 4], 2, 2).unwrap();
        all_nd.set_nodata(Some(0.0));
        assert!(matches!(quantile_discretize(&all_nd, skipping()), Err(Error::Data(_))));

        let (out, _) = quantile_discretize(&all_nd, QuantileParams::default()).unwrap();
        assert!(out.to_vec().iter().all(|&b| b == 4));

        let all_nan = Raster::from_vec(vec![f64::NAN; 4], 2, 2).unwrap();
        assert!(matches!(
            quantile_discretize(&all_nan, QuantileParams::default()),
            Err(Error::Data(_))
        ));
    }

    #[test]
    fn test_algorithm_trait() {
        let algo = QuantileDiscretizer;
        let out = algo.execute_default(two_by_two()).unwrap();
        assert_eq!(out.to_vec(), vec![1, 2, 3, 4]);
        assert_eq!(algo.name(), "Quantile Discretizer");
    }
}
