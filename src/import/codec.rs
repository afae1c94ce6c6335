//! Image decoding, re-encoding and HEIC transcoding.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::process::{Command, Stdio};
use thiserror::Error;
use uuid::Uuid;

use crate::collection::Reoriented;

/// JPEG quality for transcoded HEIC files and thumbnails.
pub const PREVIEW_QUALITY: u8 = 80;
/// JPEG quality for rotated and document-resized images.
pub const DOCUMENT_QUALITY: u8 = 90;
/// Longest side of the thumbnail produced after a rotation.
pub const ROTATED_THUMBNAIL_SIZE: u32 = 400;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HEIC conversion failed: {0}")]
    Transcode(String),

    #[error("rotation must be a multiple of 90 degrees, got {0}")]
    UnsupportedRotation(i32),

    #[error("codec task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Dimensions and type of an encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub width: u32,
    pub height: u32,
    pub mime: String,
}

/// Re-encoded image bytes with their geometry.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub mime: String,
    pub width: u32,
    pub height: u32,
}

/// Pixel-level operations on encoded image bytes.
///
/// Every call is CPU-bound and blocking; async callers run it on the
/// blocking pool.
pub trait ImageCodec: Send + Sync {
    /// Convert HEIC/HEIF bytes into JPEG bytes.
    fn transcode_heic(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    fn probe(&self, data: &[u8]) -> Result<Probe, CodecError>;

    /// JPEG preview whose longest side is at most `max_size`.
    fn thumbnail(&self, data: &[u8], max_size: u32) -> Result<Vec<u8>, CodecError>;

    /// Rotate by a multiple of 90 degrees (negative is counter-clockwise).
    fn rotate(&self, data: &[u8], degrees: i32) -> Result<Reoriented, CodecError>;

    /// Shrink so the longest side is at most `max_dimension`, re-encoded as JPEG.
    fn resize_for_document(&self, data: &[u8], max_dimension: u32)
        -> Result<EncodedImage, CodecError>;
}

/// `ImageCodec` backed by the `image` crate and an external HEIC converter.
#[derive(Debug, Clone)]
pub struct RasterCodec {
    heic_converter: String,
}

impl RasterCodec {
    pub fn new(heic_converter: impl Into<String>) -> Self {
        Self {
            heic_converter: heic_converter.into(),
        }
    }
}

impl Default for RasterCodec {
    fn default() -> Self {
        Self::new("heif-convert")
    }
}

/// Decode and turn the pixels upright according to the EXIF orientation.
fn decode(data: &[u8]) -> Result<DynamicImage, CodecError> {
    let mut decoder = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Orientations that display the stored pixels turned a quarter.
fn swaps_axes(orientation: Orientation) -> bool {
    matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    )
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
    Ok(buf)
}

/// Target size that fits `width` x `height` inside `max` on the longest side.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    if width > height {
        let h = (height as f64 * max as f64 / width as f64).round().max(1.0) as u32;
        (max, h)
    } else {
        let w = (width as f64 * max as f64 / height as f64).round().max(1.0) as u32;
        (w, max)
    }
}

impl ImageCodec for RasterCodec {
    fn transcode_heic(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let temp_dir = std::env::temp_dir();
        let id = Uuid::now_v7();
        let input_path = temp_dir.join(format!("photosheet_{}.heic", id));
        let output_path = temp_dir.join(format!("photosheet_{}.jpg", id));

        std::fs::write(&input_path, data)?;

        let status = Command::new(&self.heic_converter)
            .arg(&input_path)
            .arg(&output_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        let _ = std::fs::remove_file(&input_path);

        let status = status.map_err(|e| {
            CodecError::Transcode(format!("{} not available: {}", self.heic_converter, e))
        })?;
        if !status.success() {
            let _ = std::fs::remove_file(&output_path);
            return Err(CodecError::Transcode(format!(
                "{} exited with {}",
                self.heic_converter, status
            )));
        }

        let converted = std::fs::read(&output_path);
        let _ = std::fs::remove_file(&output_path);
        let converted = converted?;

        // Normalise quality regardless of the converter's defaults
        encode_jpeg(&decode(&converted)?, PREVIEW_QUALITY)
    }

    fn probe(&self, data: &[u8]) -> Result<Probe, CodecError> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let mime = reader
            .format()
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let mut decoder = reader.into_decoder()?;
        let (stored_width, stored_height) = decoder.dimensions();
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let (width, height) = if swaps_axes(orientation) {
            (stored_height, stored_width)
        } else {
            (stored_width, stored_height)
        };
        Ok(Probe {
            width,
            height,
            mime,
        })
    }

    fn thumbnail(&self, data: &[u8], max_size: u32) -> Result<Vec<u8>, CodecError> {
        let img = decode(data)?;
        let (w, h) = fit_within(img.width(), img.height(), max_size);
        let thumb = if (w, h) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(w, h, FilterType::Triangle)
        };
        encode_jpeg(&thumb, PREVIEW_QUALITY)
    }

    fn rotate(&self, data: &[u8], degrees: i32) -> Result<Reoriented, CodecError> {
        let img = decode(data)?;
        let rotated = match degrees.rem_euclid(360) {
            0 => img,
            90 => img.rotate90(),
            180 => img.rotate180(),
            270 => img.rotate270(),
            _ => return Err(CodecError::UnsupportedRotation(degrees)),
        };

        let (tw, th) = fit_within(rotated.width(), rotated.height(), ROTATED_THUMBNAIL_SIZE);
        let thumbnail = encode_jpeg(&rotated.resize_exact(tw, th, FilterType::Triangle), PREVIEW_QUALITY)?;

        Ok(Reoriented {
            data: encode_jpeg(&rotated, DOCUMENT_QUALITY)?,
            mime: "image/jpeg".to_string(),
            thumbnail,
            width: rotated.width(),
            height: rotated.height(),
        })
    }

    fn resize_for_document(
        &self,
        data: &[u8],
        max_dimension: u32,
    ) -> Result<EncodedImage, CodecError> {
        let img = decode(data)?;
        let (w, h) = fit_within(img.width(), img.height(), max_dimension);
        let resized = if (w, h) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(w, h, FilterType::Lanczos3)
        };
        Ok(EncodedImage {
            data: encode_jpeg(&resized, DOCUMENT_QUALITY)?,
            mime: "image/jpeg".to_string(),
            width: resized.width(),
            height: resized.height(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_fit_within() {
        assert_eq!(fit_within(4000, 3000, 1200), (1200, 900));
        assert_eq!(fit_within(3000, 4000, 800), (600, 800));
        assert_eq!(fit_within(100, 50, 800), (100, 50));
        assert_eq!(fit_within(2000, 2000, 400), (400, 400));
    }

    #[test]
    fn test_probe_png() {
        let codec = RasterCodec::default();
        let probe = codec.probe(&png_bytes(30, 20)).unwrap();
        assert_eq!(
            probe,
            Probe {
                width: 30,
                height: 20,
                mime: "image/png".to_string()
            }
        );
    }

    /// 40x10 JPEG, left half red and right half blue, tagged Orientation=6
    /// (displayed turned a quarter clockwise, so 10x40 with red on top).
    fn jpeg_rotated_by_exif() -> Vec<u8> {
        let img = RgbImage::from_fn(40, 10, |x, _| {
            if x < 20 {
                Rgb([220, 20, 20])
            } else {
                Rgb([20, 20, 220])
            }
        });
        let jpeg = encode_jpeg(&DynamicImage::ImageRgb8(img), 95).unwrap();

        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\0\x2a");
        tiff.extend_from_slice(&8u32.to_be_bytes());
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x0112u16.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&[0, 6, 0, 0]);
        tiff.extend_from_slice(&0u32.to_be_bytes());

        let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
        out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_exif_orientation_is_applied() {
        let codec = RasterCodec::default();
        let data = jpeg_rotated_by_exif();

        let probe = codec.probe(&data).unwrap();
        assert_eq!((probe.width, probe.height), (10, 40));

        let upright = decode(&data).unwrap().to_rgb8();
        assert_eq!(upright.dimensions(), (10, 40));
        let top = upright.get_pixel(5, 5);
        let bottom = upright.get_pixel(5, 35);
        assert!(top[0] > top[2], "top should be red, got {:?}", top);
        assert!(bottom[2] > bottom[0], "bottom should be blue, got {:?}", bottom);

        let document = codec.resize_for_document(&data, 1200).unwrap();
        assert_eq!((document.width, document.height), (10, 40));
        let reprobe = codec.probe(&document.data).unwrap();
        assert_eq!((reprobe.width, reprobe.height), (10, 40));

        let turned = codec.rotate(&data, 90).unwrap();
        assert_eq!((turned.width, turned.height), (40, 10));
    }

    #[test]
    fn test_probe_garbage_fails() {
        let codec = RasterCodec::default();
        assert!(codec.probe(b"not an image").is_err());
    }

    #[test]
    fn test_thumbnail_is_bounded_jpeg() {
        let codec = RasterCodec::default();
        let thumb = codec.thumbnail(&png_bytes(1000, 500), 100).unwrap();
        let probe = codec.probe(&thumb).unwrap();
        assert_eq!((probe.width, probe.height), (100, 50));
        assert_eq!(probe.mime, "image/jpeg");
    }

    #[test]
    fn test_rotate_swaps_dimensions() {
        let codec = RasterCodec::default();
        let data = png_bytes(40, 10);

        let quarter = codec.rotate(&data, 90).unwrap();
        assert_eq!((quarter.width, quarter.height), (10, 40));
        assert_eq!(quarter.mime, "image/jpeg");

        let back = codec.rotate(&data, -90).unwrap();
        assert_eq!((back.width, back.height), (10, 40));

        let half = codec.rotate(&data, 180).unwrap();
        assert_eq!((half.width, half.height), (40, 10));

        assert!(matches!(
            codec.rotate(&data, 45),
            Err(CodecError::UnsupportedRotation(45))
        ));
    }

    #[test]
    fn test_resize_for_document() {
        let codec = RasterCodec::default();
        let resized = codec.resize_for_document(&png_bytes(300, 150), 120).unwrap();
        assert_eq!((resized.width, resized.height), (120, 60));

        let untouched = codec.resize_for_document(&png_bytes(30, 15), 120).unwrap();
        assert_eq!((untouched.width, untouched.height), (30, 15));
    }

    #[test]
    fn test_missing_converter_reports_transcode_error() {
        let codec = RasterCodec::new("photosheet-no-such-converter");
        let err = codec.transcode_heic(b"heic").unwrap_err();
        assert!(matches!(err, CodecError::Transcode(_)));
    }
}
