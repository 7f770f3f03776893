//! Single-band 8-bit GeoTIFF reading and writing
//!
//! Pure Rust (no GDAL). The geotransform is taken from ModelTransformation
//! or from ModelPixelScale + ModelTiepoint; projection keys and the GDAL
//! no-data tag are carried through untouched so a rewritten tile keeps the
//! source's georeferencing apart from its origin.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray8;
use tiff::encoder::{Compression, DeflateLevel, TiffEncoder};
use tiff::tags::Tag;
use tiff::ColorType;

use super::{GeoKeys, Raster};
use crate::error::RasterError;
use crate::geometry::AffineTransform;

// GeoTIFF / GDAL tag ids
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_DOUBLE_PARAMS: u16 = 34736;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_NODATA: u16 = 42113;

// Header + GTRasterTypeGeoKey = RasterPixelIsArea
const DEFAULT_GEO_KEYS: [u16; 8] = [1, 1, 0, 1, 1025, 0, 1, 1];

/// Compression method for GeoTIFF output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoTiffCompression {
    /// No compression
    #[default]
    None,
    /// LZW compression
    Lzw,
    /// Deflate (zlib) compression
    Deflate,
}

impl From<GeoTiffCompression> for Compression {
    fn from(compression: GeoTiffCompression) -> Self {
        match compression {
            GeoTiffCompression::None => Compression::Uncompressed,
            GeoTiffCompression::Lzw => Compression::Lzw,
            GeoTiffCompression::Deflate => Compression::Deflate(DeflateLevel::Fast),
        }
    }
}

/// Known tags resolve to their named variant, so lookups must go through this
fn geotiff_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Open a GeoTIFF and load its first band into memory
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<Raster, RasterError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RasterError::NotFound(path.to_path_buf()),
        _ => RasterError::Io(e),
    })?;

    let raster = decode(BufReader::new(file))?;
    tracing::debug!(
        path = %path.display(),
        ncols = raster.ncols(),
        nrows = raster.nrows(),
        nodata = ?raster.nodata,
        "GeoTIFF loaded"
    );
    Ok(raster)
}

/// Decode a GeoTIFF from any seekable reader
pub fn decode<R: Read + Seek>(reader: R) -> Result<Raster, RasterError> {
    let mut decoder = Decoder::new(reader)?;

    check_color_type(decoder.colortype()?)?;

    let (width, height) = decoder.dimensions()?;
    let samples = match decoder.read_image()? {
        DecodingResult::U8(samples) => samples,
        _ => return Err(RasterError::Format("expected 8-bit samples".to_string())),
    };
    let pixels = Array2::from_shape_vec((height as usize, width as usize), samples)
        .map_err(|e| RasterError::Format(format!("pixel buffer does not match size: {e}")))?;

    let transform = read_transform(&mut decoder)?;
    let nodata = read_nodata(&mut decoder)?;
    let projection = read_geo_keys(&mut decoder)?;

    Ok(Raster {
        pixels,
        transform,
        nodata,
        projection,
    })
}

/// Paletted bands still hold one u8 index per pixel, which is all the search compares
fn check_color_type(color_type: ColorType) -> Result<(), RasterError> {
    match color_type {
        ColorType::Gray(8) | ColorType::Palette(8) => Ok(()),
        other => Err(RasterError::Format(format!(
            "expected single-band 8-bit raster, found {:?}",
            other
        ))),
    }
}

fn read_f64_tag<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    code: u16,
) -> Result<Option<Vec<f64>>, RasterError> {
    match decoder.find_tag(geotiff_tag(code))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn read_ascii_tag<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    code: u16,
) -> Result<Option<String>, RasterError> {
    match decoder.find_tag(geotiff_tag(code))? {
        Some(value) => Ok(Some(value.into_string()?.trim_end_matches('\0').to_string())),
        None => Ok(None),
    }
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<AffineTransform, RasterError> {
    if let Some(m) = read_f64_tag(decoder, MODEL_TRANSFORMATION)? {
        if m.len() < 16 {
            return Err(RasterError::Format(format!(
                "ModelTransformation has {} values, expected 16",
                m.len()
            )));
        }
        return Ok(AffineTransform::new(m[3], m[0], m[1], m[7], m[4], m[5]));
    }

    let scale = read_f64_tag(decoder, MODEL_PIXEL_SCALE)?;
    let tiepoint = read_f64_tag(decoder, MODEL_TIEPOINT)?;
    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            let (sx, sy) = (scale[0], scale[1]);
            let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
            Ok(AffineTransform::new(x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy))
        }
        _ => Err(RasterError::Format(
            "raster has no georeferencing tags".to_string(),
        )),
    }
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>, RasterError> {
    let Some(text) = read_ascii_tag(decoder, GDAL_NODATA)? else {
        return Ok(None);
    };
    text.trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|_| RasterError::Format(format!("invalid GDAL_NODATA value {text:?}")))
}

fn read_geo_keys<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoKeys>, RasterError> {
    let directory = match decoder.find_tag(geotiff_tag(GEO_KEY_DIRECTORY))? {
        Some(value) => value.into_u16_vec()?,
        None => return Ok(None),
    };
    Ok(Some(GeoKeys {
        directory,
        double_params: read_f64_tag(decoder, GEO_DOUBLE_PARAMS)?,
        ascii_params: read_ascii_tag(decoder, GEO_ASCII_PARAMS)?,
    }))
}

/// Write a raster as a single-band 8-bit GeoTIFF
pub fn write_geotiff<P: AsRef<Path>>(
    path: P,
    raster: &Raster,
    compression: GeoTiffCompression,
) -> Result<(), RasterError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    encode(&mut writer, raster, compression)?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), ?compression, "GeoTIFF written");
    Ok(())
}

/// Encode a raster into any seekable writer
pub fn encode<W: Write + Seek>(
    writer: W,
    raster: &Raster,
    compression: GeoTiffCompression,
) -> Result<(), RasterError> {
    if raster.pixels.is_empty() {
        return Err(RasterError::Format("raster has no pixel data".to_string()));
    }

    let width = u32::try_from(raster.ncols())
        .map_err(|_| RasterError::Format("raster too wide for TIFF".to_string()))?;
    let height = u32::try_from(raster.nrows())
        .map_err(|_| RasterError::Format("raster too tall for TIFF".to_string()))?;

    let mut encoder = TiffEncoder::new(writer)?.with_compression(compression.into());
    let mut image = encoder.new_image::<Gray8>(width, height)?;

    {
        let dir = image.encoder();
        let gt = raster.transform.to_gdal();
        if raster.transform.is_north_up() && gt[1] > 0.0 && gt[5] < 0.0 {
            let scale = [gt[1], -gt[5], 0.0];
            let tiepoint = [0.0, 0.0, 0.0, gt[0], gt[3], 0.0];
            dir.write_tag(geotiff_tag(MODEL_PIXEL_SCALE), &scale[..])?;
            dir.write_tag(geotiff_tag(MODEL_TIEPOINT), &tiepoint[..])?;
        } else {
            let matrix = [
                gt[1], gt[2], 0.0, gt[0], //
                gt[4], gt[5], 0.0, gt[3], //
                0.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ];
            dir.write_tag(geotiff_tag(MODEL_TRANSFORMATION), &matrix[..])?;
        }

        match &raster.projection {
            Some(keys) => {
                dir.write_tag(geotiff_tag(GEO_KEY_DIRECTORY), keys.directory.as_slice())?;
                if let Some(doubles) = &keys.double_params {
                    dir.write_tag(geotiff_tag(GEO_DOUBLE_PARAMS), doubles.as_slice())?;
                }
                if let Some(ascii) = &keys.ascii_params {
                    dir.write_tag(geotiff_tag(GEO_ASCII_PARAMS), ascii.as_str())?;
                }
            }
            None => {
                dir.write_tag(geotiff_tag(GEO_KEY_DIRECTORY), &DEFAULT_GEO_KEYS[..])?;
            }
        }

        if let Some(nodata) = raster.nodata {
            dir.write_tag(geotiff_tag(GDAL_NODATA), format_nodata(nodata).as_str())?;
        }
    }

    let samples: Vec<u8> = raster.pixels.iter().copied().collect();
    image.write_data(&samples)?;
    Ok(())
}

/// GDAL writes integral no-data values without a fractional part
fn format_nodata(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
