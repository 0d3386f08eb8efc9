//! Raster reading, writing and driver discovery using GDAL

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::format::{Backend, Capabilities, FormatHandler};
use crate::raster::{DataType, GeoTransform, Raster, RasterElement};
use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager, Metadata};
use std::path::Path;
use tracing::debug;

/// Read one band (1-indexed) of any GDAL-readable raster as `f64`.
pub fn read_band(path: &Path, band: usize) -> Result<Raster<f64>> {
    let dataset = Dataset::open(path)?;
    let rasterband = dataset.rasterband(band)?;
    let (cols, rows) = dataset.raster_size();

    let buffer = rasterband.read_as::<f64>((0, 0), (cols, rows), (cols, rows), None)?;
    let mut raster = Raster::from_vec(buffer.data().to_vec(), rows, cols)?;

    if let Ok(gt) = dataset.geo_transform() {
        raster.set_transform(GeoTransform::from_gdal(gt));
    }

    if let Ok(srs) = dataset.spatial_ref() {
        let epsg = srs.auth_code().ok().and_then(|c| u32::try_from(c).ok());
        let wkt = srs.to_wkt().ok();
        raster.set_crs(CRS::from_parts(epsg, wkt, None));
    }

    raster.set_nodata(rasterband.no_data_value());
    Ok(raster)
}

fn spatial_ref(crs: &CRS) -> Result<SpatialRef> {
    if let Some(wkt) = crs.wkt() {
        return Ok(SpatialRef::from_wkt(wkt)?);
    }
    if let Some(code) = crs.epsg() {
        return Ok(SpatialRef::from_epsg(code)?);
    }
    if let Some(proj) = crs.proj() {
        return Ok(SpatialRef::from_proj4(proj)?);
    }
    Err(Error::Config(format!("CRS has no usable representation: {}", crs)))
}

/// Build the dataset in GDAL's MEM driver, then copy it to `path` with the
/// named driver. Copying lets CreateCopy-only drivers (PNG, JPEG) work too.
pub fn write_with_driver<T: RasterElement>(driver: &str, raster: &Raster<T>, path: &Path) -> Result<()> {
    let (rows, cols) = raster.shape();
    let mem = DriverManager::get_driver_by_name("MEM")?;
    let target = DriverManager::get_driver_by_name(driver)?;

    let mut dataset = match T::DATA_TYPE {
        DataType::Byte => {
            let mut ds = mem.create_with_band_type::<u8, _>("", cols, rows, 1)?;
            let data: Vec<u8> = raster.data().iter().map(|&v| num_traits::cast(v).unwrap_or(0)).collect();
            let mut buffer = Buffer::new((cols, rows), data);
            ds.rasterband(1)?.write((0, 0), (cols, rows), &mut buffer)?;
            ds
        }
        _ => {
            let mut ds = mem.create_with_band_type::<f64, _>("", cols, rows, 1)?;
            let data: Vec<f64> = raster.data().iter().map(|&v| num_traits::cast(v).unwrap_or(f64::NAN)).collect();
            let mut buffer = Buffer::new((cols, rows), data);
            ds.rasterband(1)?.write((0, 0), (cols, rows), &mut buffer)?;
            ds
        }
    };

    dataset.set_geo_transform(&raster.transform().to_gdal())?;
    if let Some(crs) = raster.crs() {
        dataset.set_spatial_ref(&spatial_ref(crs)?)?;
    }
    if let Some(nodata) = raster.nodata().and_then(num_traits::cast::<T, f64>) {
        dataset.rasterband(1)?.set_no_data_value(Some(nodata))?;
    }

    let mut out = dataset.create_copy(&target, path, &RasterCreationOptions::new())?;
    out.flush_cache()?;
    debug!(driver, path = %path.display(), "wrote raster with GDAL");
    Ok(())
}

/// Describe every registered GDAL driver as a [`FormatHandler`].
pub fn driver_handlers() -> Vec<FormatHandler> {
    let mut handlers = Vec::new();
    for idx in 0..DriverManager::count() {
        let Ok(driver) = DriverManager::get_driver(idx) else {
            continue;
        };
        let flag = |key: &str| driver.metadata_item(key, "").is_some_and(|v| v.eq_ignore_ascii_case("YES"));
        let capabilities = Capabilities {
            raster: flag("DCAP_RASTER"),
            create: flag("DCAP_CREATE") || flag("DCAP_CREATECOPY"),
            vector: flag("DCAP_VECTOR"),
        };
        let extensions = driver.metadata_item("DMD_EXTENSIONS", "").unwrap_or_default();
        let exts: Vec<&str> = extensions.split_whitespace().collect();
        let name = driver.short_name();
        handlers.push(FormatHandler::new(
            name.clone(),
            driver.long_name(),
            &exts,
            capabilities,
            Backend::Gdal(name),
        ));
    }
    debug!(count = handlers.len(), "collected GDAL drivers");
    handlers
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_read_roundtrip() {
        let mut raster: Raster<u8> = Raster::from_vec(vec![0, 1, 2, 3], 2, 2).unwrap();
        raster.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        raster.set_crs(Some(CRS::from_epsg(4326)));

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.tif");
        write_with_driver("GTiff", &raster, &path).unwrap();

        let loaded = read_band(&path, 1).unwrap();
        assert_eq!(loaded.shape(), (2, 2));
        assert_eq!(loaded.to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        assert!(loaded.transform().bit_eq(raster.transform()));
    }

    #[test]
    fn test_gtiff_driver_advertises_tif() {
        let handlers = driver_handlers();
        let gtiff = handlers.iter().find(|h| h.name == "GTiff").unwrap();
        assert!(gtiff.can_write_raster());
        assert!(gtiff.supports_extension("tif"));
    }
}
