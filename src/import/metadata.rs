use std::io::Cursor;

use crate::dates::format_exif_date;

/// Kind of file the bytes came from; selects the EXIF fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    /// Original HEIC/HEIF bytes, before transcoding.
    Heic,
    /// Any format the raster decoder reads directly.
    Raster,
}

impl MetadataSource {
    /// Tags tried in order for the capture date.
    pub fn date_tags(&self) -> &'static [exif::Tag] {
        match self {
            MetadataSource::Heic => &[
                exif::Tag::DateTimeOriginal,
                exif::Tag::DateTimeDigitized,
                exif::Tag::DateTime,
            ],
            MetadataSource::Raster => &[exif::Tag::DateTimeOriginal],
        }
    }
}

/// Reads the original capture date out of image bytes.
pub trait MetadataExtractor: Send + Sync {
    /// Capture date formatted as an ROC-year date, if the file carries one.
    fn capture_date(&self, data: &[u8], source: MetadataSource) -> Option<String>;
}

/// `MetadataExtractor` using kamadak-exif.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifExtractor;

impl MetadataExtractor for ExifExtractor {
    fn capture_date(&self, data: &[u8], source: MetadataSource) -> Option<String> {
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
            Ok(exif) => exif,
            Err(e) => {
                tracing::debug!(error = %e, "No EXIF data");
                return None;
            }
        };

        source.date_tags().iter().find_map(|&tag| {
            let field = exif.get_field(tag, exif::In::PRIMARY)?;
            let raw = field.display_value().to_string();
            format_exif_date(raw.trim_matches('"'))
        })
    }
}
