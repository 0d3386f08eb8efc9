//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate. Georeferencing is stored in the standard GeoTIFF
//! tags so GDAL-based tools read the files back with the same transform,
//! CRS and nodata value.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{DataType, GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray16, Gray32Float, Gray64Float, Gray8};
use tiff::encoder::compression::{Deflate, Lzw, Uncompressed};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tracing::{debug, warn};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_NODATA: u16 = 42113;

/// Tag for a GeoTIFF id. The decoder maps known ids to named variants, so
/// reads must not use `Tag::Unknown` directly.
fn geo_tag(id: u16) -> Tag {
    Tag::from_u16_exhaustive(id)
}

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GT_CITATION_KEY: u16 = 1026;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Compression used for written strips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Deflate,
    Lzw,
}

impl std::str::FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "DEFLATE" => Ok(Self::Deflate),
            "LZW" => Ok(Self::Lzw),
            other => Err(Error::InvalidParameter {
                name: "compression",
                value: other.to_string(),
                reason: "expected NONE, DEFLATE or LZW".into(),
            }),
        }
    }
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoTiffOptions {
    pub compression: Compression,
}

/// Read one band (1-indexed, default 1) of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file, band)
}

macro_rules! select_band {
    ($buf:expr, $band:expr, $samples:expr) => {
        $buf.iter()
            .skip($band)
            .step_by($samples)
            .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
            .collect::<Vec<T>>()
    };
}

fn decode_geotiff<T, R>(reader: R, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder.read_image()?;
    let total = match &result {
        DecodingResult::U8(b) => b.len(),
        DecodingResult::U16(b) => b.len(),
        DecodingResult::U32(b) => b.len(),
        DecodingResult::I8(b) => b.len(),
        DecodingResult::I16(b) => b.len(),
        DecodingResult::I32(b) => b.len(),
        DecodingResult::F32(b) => b.len(),
        DecodingResult::F64(b) => b.len(),
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF sample format".into())),
    };

    let cells = rows * cols;
    let samples = if cells == 0 { 1 } else { (total / cells).max(1) };
    let band_idx = band.unwrap_or(1);
    if band_idx == 0 || band_idx > samples {
        return Err(Error::InvalidParameter {
            name: "band",
            value: band_idx.to_string(),
            reason: format!("image has {} band(s)", samples),
        });
    }
    let offset = band_idx - 1;

    let data: Vec<T> = match result {
        DecodingResult::U8(buf) => select_band!(buf, offset, samples),
        DecodingResult::U16(buf) => select_band!(buf, offset, samples),
        DecodingResult::U32(buf) => select_band!(buf, offset, samples),
        DecodingResult::I8(buf) => select_band!(buf, offset, samples),
        DecodingResult::I16(buf) => select_band!(buf, offset, samples),
        DecodingResult::I32(buf) => select_band!(buf, offset, samples),
        DecodingResult::F32(buf) => select_band!(buf, offset, samples),
        DecodingResult::F64(buf) => select_band!(buf, offset, samples),
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF sample format".into())),
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));
    if let Ok(nodata) = decoder.get_tag_ascii_string(geo_tag(GDAL_NODATA)) {
        raster.set_nodata(
            nodata
                .trim_matches(char::from(0))
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(num_traits::cast),
        );
    }

    debug!(rows, cols, samples, band = band_idx, "decoded GeoTIFF");
    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(geo_tag(MODEL_TRANSFORMATION)) {
        if m.len() >= 16 {
            return Some(GeoTransform {
                origin_x: m[3],
                pixel_width: m[0],
                row_rotation: m[1],
                origin_y: m[7],
                col_rotation: m[4],
                pixel_height: m[5],
            });
        }
    }

    let scale = decoder.get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(geo_tag(MODEL_TIEPOINT)).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let (origin_x, origin_y) = if tiepoint[0] == 0.0 && tiepoint[1] == 0.0 {
        // Keep the stored coordinates bit for bit (e.g. a -0.0 origin)
        (tiepoint[3], tiepoint[4])
    } else {
        (
            tiepoint[3] - tiepoint[0] * scale[0],
            tiepoint[4] + tiepoint[1] * scale[1],
        )
    };
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let dir = decoder.get_tag_u32_vec(geo_tag(GEO_KEY_DIRECTORY)).ok()?;
    if dir.len() < 4 {
        return None;
    }
    let ascii = decoder
        .get_tag_ascii_string(geo_tag(GEO_ASCII_PARAMS))
        .unwrap_or_default();

    let mut epsg = None;
    let mut citation = None;
    for key in dir[4..].chunks_exact(4) {
        let (id, location, count, value) = (key[0], key[1], key[2], key[3]);
        match id as u16 {
            GEOGRAPHIC_TYPE_KEY | PROJECTED_CS_TYPE_KEY if location == 0 => {
                // 32767 is "user-defined" in GeoTIFF
                if value != 0 && value != 32767 {
                    epsg = Some(value);
                }
            }
            GT_CITATION_KEY if location == u32::from(GEO_ASCII_PARAMS) => {
                let start = value as usize;
                let end = start + (count as usize).saturating_sub(1);
                citation = ascii.get(start..end).map(str::to_string);
            }
            _ => {}
        }
    }

    let (wkt, proj) = match citation {
        Some(c) if c.starts_with('+') => (None, Some(c)),
        Some(c) => (Some(c), None),
        None => (None, None),
    };
    CRS::from_parts(epsg, wkt, proj)
}

/// Write a Raster to a GeoTIFF file.
///
/// Byte and UInt16 rasters keep their type, Float64 is written as 64-bit
/// float and everything else as 32-bit float. The file is synced to disk
/// before returning; on failure the partial file is removed.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let written = encode_geotiff(raster, &mut writer, &options.unwrap_or_default())
        .and_then(|_| writer.flush().map_err(Error::from))
        .and_then(|_| writer.get_ref().sync_all().map_err(Error::from));

    if let Err(e) = written {
        drop(writer);
        let _ = std::fs::remove_file(path);
        return Err(e);
    }
    debug!(path = %path.display(), "wrote GeoTIFF");
    Ok(())
}

macro_rules! encode_image {
    ($encoder:expr, $color:ty, $data:expr, $raster:expr, $compression:expr) => {{
        let (rows, cols) = $raster.shape();
        let (w, h) = (cols as u32, rows as u32);
        match $compression {
            Compression::None => {
                let mut image = $encoder.new_image_with_compression::<$color, _>(w, h, Uncompressed)?;
                write_georeferencing(image.encoder(), $raster)?;
                image.write_data(&$data)?;
            }
            Compression::Deflate => {
                let mut image =
                    $encoder.new_image_with_compression::<$color, _>(w, h, Deflate::default())?;
                write_georeferencing(image.encoder(), $raster)?;
                image.write_data(&$data)?;
            }
            Compression::Lzw => {
                let mut image = $encoder.new_image_with_compression::<$color, _>(w, h, Lzw)?;
                write_georeferencing(image.encoder(), $raster)?;
                image.write_data(&$data)?;
            }
        }
    }};
}

fn cast_all<T: RasterElement, U: num_traits::NumCast + Copy>(raster: &Raster<T>, fallback: U) -> Vec<U> {
    raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(fallback))
        .collect()
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    if raster.is_empty() {
        return Err(Error::InvalidDimensions {
            width: raster.cols(),
            height: raster.rows(),
        });
    }

    let mut encoder = TiffEncoder::new(writer)?;
    match T::DATA_TYPE {
        DataType::Byte => {
            let data: Vec<u8> = cast_all(raster, 0u8);
            encode_image!(encoder, Gray8, data, raster, options.compression)
        }
        DataType::UInt16 => {
            let data: Vec<u16> = cast_all(raster, 0u16);
            encode_image!(encoder, Gray16, data, raster, options.compression)
        }
        DataType::Float64 => {
            let data: Vec<f64> = cast_all(raster, f64::NAN);
            encode_image!(encoder, Gray64Float, data, raster, options.compression)
        }
        _ => {
            let data: Vec<f32> = cast_all(raster, f32::NAN);
            encode_image!(encoder, Gray32Float, data, raster, options.compression)
        }
    }
    Ok(())
}

fn write_georeferencing<W, K, T>(dir: &mut DirectoryEncoder<'_, W, K>, raster: &Raster<T>) -> Result<()>
where
    W: Write + Seek,
    K: TiffKind,
    T: RasterElement,
{
    let gt = raster.transform();

    if gt.is_north_up() {
        let scale = [gt.pixel_width, -gt.pixel_height, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])?;
        dir.write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])?;
    } else {
        let matrix = [
            gt.pixel_width, gt.row_rotation, 0.0, gt.origin_x,
            gt.col_rotation, gt.pixel_height, 0.0, gt.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        dir.write_tag(Tag::Unknown(MODEL_TRANSFORMATION), &matrix[..])?;
    }

    let crs = raster.crs();
    let geographic = crs.map(CRS::is_geographic).unwrap_or(false);
    let citation = crs.and_then(|c| c.wkt().or_else(|| c.proj()));

    let mut keys: Vec<[u16; 4]> = vec![
        [GT_MODEL_TYPE_KEY, 0, 1, if geographic { 2 } else { 1 }],
        [GT_RASTER_TYPE_KEY, 0, 1, 1],
    ];
    let mut ascii = String::new();
    if let Some(text) = citation {
        ascii.push_str(text);
        ascii.push('|');
        let count = u16::try_from(ascii.len()).map_err(|_| Error::InvalidParameter {
            name: "crs",
            value: format!("{} bytes of WKT/PROJ text", text.len()),
            reason: format!("GeoTIFF citations hold at most {} bytes", u16::MAX - 1),
        })?;
        keys.push([GT_CITATION_KEY, GEO_ASCII_PARAMS, count, 0]);
    }
    if let Some(code) = crs.and_then(CRS::epsg) {
        match u16::try_from(code) {
            Ok(code) => {
                let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
                keys.push([key, 0, 1, code]);
            }
            Err(_) => warn!(epsg = code, "EPSG code does not fit a GeoKey, not written"),
        }
    }

    let mut directory: Vec<u16> = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.iter().flatten());
    dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &directory[..])?;
    if !ascii.is_empty() {
        dir.write_tag(Tag::Unknown(GEO_ASCII_PARAMS), ascii.as_str())?;
    }

    if let Some(nodata) = raster.nodata().and_then(num_traits::cast::<T, f64>) {
        dir.write_tag(Tag::Unknown(GDAL_NODATA), format!("{}", nodata).as_str())?;
    }

    Ok(())
}
