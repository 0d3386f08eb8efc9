//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{Array2, ArrayView2};

/// A georeferenced 2D raster grid holding a single band.
///
/// Data is stored row-major as `(row, col)`. The transform, CRS and nodata
/// value travel with the grid so that derived rasters can inherit them.
///
/// # Example
///
/// ```ignore
/// use geoproc_core::Raster;
///
/// let raster = Raster::from_vec(vec![1.0, 2.0, 3.0, 4.0], 2, 2)?;
/// assert_eq!(raster.view()[(1, 0)], 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data).map_err(|_| {
            Error::InvalidDimensions {
                width: cols,
                height: rows,
            }
        })?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a zero-filled raster of another element type with the same
    /// shape, transform and CRS. The nodata value is not carried over.
    pub fn with_same_meta<U: RasterElement>(&self) -> Raster<U> {
        Raster {
            data: Array2::zeros(self.data.dim()),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Replace the cell data. The new array must keep the current shape.
    pub fn replace_data(&mut self, data: Array2<T>) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = data.dim();
        if (er, ec) != (ar, ac) {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        self.data = data;
        Ok(())
    }

    pub fn into_data(self) -> Array2<T> {
        self.data
    }

    /// Cell values in row-major order
    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().copied().collect()
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Check if a value is no-data for this raster
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// All valid (non-nodata) cell values in row-major order
    pub fn valid_values(&self) -> impl Iterator<Item = T> + '_ {
        self.data.iter().copied().filter(move |v| !self.is_nodata(*v))
    }

    /// Calculate basic statistics over valid cells
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum = 0.0;
        let mut count = 0usize;

        for value in self.valid_values() {
            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }
            if let Some(v) = num_traits::cast::<T, f64>(value) {
                sum += v;
                count += 1;
            }
        }

        RasterStatistics {
            min,
            max,
            mean: (count > 0).then(|| sum / count as f64),
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_from_vec_rejects_bad_length() {
        let err = Raster::<f64>::from_vec(vec![1.0, 2.0, 3.0], 2, 2).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { width: 2, height: 2 }));
    }

    #[test]
    fn test_from_vec_is_row_major() {
        let raster: Raster<u8> = Raster::from_vec(vec![1, 2, 3, 4, 5, 6], 2, 3).unwrap();
        assert_eq!(raster.view()[(1, 0)], 4);
        assert_eq!(raster.view()[(0, 2)], 3);
    }

    #[test]
    fn test_with_same_meta_keeps_georeferencing() {
        let mut src: Raster<f64> = Raster::new(3, 4);
        src.set_transform(GeoTransform::new(10.0, 20.0, 0.5, -0.5));
        src.set_crs(Some(CRS::from_epsg(32719)));
        src.set_nodata(Some(-9999.0));

        let out: Raster<u8> = src.with_same_meta();
        assert_eq!(out.shape(), (3, 4));
        assert_eq!(out.transform(), src.transform());
        assert_eq!(out.crs(), src.crs());
        assert_eq!(out.nodata(), None);
    }

    #[test]
    fn test_replace_data_checks_shape() {
        let mut raster: Raster<u8> = Raster::new(2, 3);
        assert!(matches!(
            raster.replace_data(Array2::zeros((3, 2))),
            Err(Error::SizeMismatch { .. })
        ));
        assert!(raster.replace_data(Array2::from_elem((2, 3), 4)).is_ok());
        assert_eq!(raster.to_vec(), vec![4; 6]);
    }

    #[test]
    fn test_raster_statistics_skip_nodata() {
        let mut raster = Raster::from_vec(vec![1.0, 2.0, -1.0, f64::NAN], 2, 2).unwrap();
        raster.set_nodata(Some(-1.0));

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(2.0));
        assert_eq!(stats.mean, Some(1.5));
        assert_eq!(stats.valid_count, 2);
        assert_eq!(stats.nodata_count, 2);
    }
}
