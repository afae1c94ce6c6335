//! Zip bundle of the full-resolution photographs, in collection order.

use std::io::{Cursor, Write};

use super::{archive_entry_name, ExportError};
use crate::collection::ImageCollection;

/// Extension used when the original file name has none.
const FALLBACK_EXTENSION: &str = "jpg";

pub fn render(collection: &ImageCollection, prefix: &str) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    {
        let cursor = Cursor::new(&mut buf);
        let mut zip = zip::ZipWriter::new(cursor);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        for (index, record) in collection.iter().enumerate() {
            let extension = record
                .extension()
                .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
            let name = archive_entry_name(prefix, index + 1, &extension);
            zip.start_file(name, options)?;
            zip.write_all(&record.data)?;
        }
        zip.finish()?;
    }
    Ok(buf)
}
