pub mod archive;
pub mod docx;
pub mod print;

use chrono::NaiveDateTime;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::collection::ImageCollection;
use crate::dates::roc_file_stamp;
use crate::form::{DocumentFormat, FormContext};
use crate::import::codec::CodecError;
use crate::layout::paginate;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Docx,
    Print,
    Zip,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Print => "html",
            ExportFormat::Zip => "zip",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "DOCX",
            ExportFormat::Print => "Print",
            ExportFormat::Zip => "ZIP",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no photos to export")]
    EmptyCollection,

    #[error("image processing failed: {0}")]
    Codec(#[from] CodecError),

    #[error("packaging failed: {0}")]
    Packaging(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ExportError {
    /// Text shown to the user. Diagnostic detail stays in the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            ExportError::EmptyCollection => "請選擇至少一張圖片。",
            _ => "文件生成過程中出錯，請查看日誌以獲取詳細信息。",
        }
    }
}

/// A finished export file, held in memory until written.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Write the artifact into `dir` and return the full path.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        let mut file = File::create(&path)?;
        file.write_all(&self.bytes)?;
        Ok(path)
    }
}

/// Result of an export request.
#[derive(Debug)]
pub enum ExportOutcome {
    Completed(Artifact),
    /// Another export was still in flight; this request was dropped.
    Skipped,
}

/// `<display>照片黏貼表_<YYYMMDD_HHmm>.docx`
pub fn document_file_name(format: DocumentFormat, now: &NaiveDateTime) -> String {
    format!(
        "{}照片黏貼表_{}.{}",
        format.display_name(),
        roc_file_stamp(now),
        ExportFormat::Docx.extension()
    )
}

/// `<display>照片黏貼表_<YYYMMDD_HHmm>.html`
pub fn print_file_name(format: DocumentFormat, now: &NaiveDateTime) -> String {
    format!(
        "{}照片黏貼表_{}.{}",
        format.display_name(),
        roc_file_stamp(now),
        ExportFormat::Print.extension()
    )
}

/// `<prefix>照片打包下載.zip`
pub fn archive_file_name(prefix: &str) -> String {
    format!("{}照片打包下載.{}", prefix, ExportFormat::Zip.extension())
}

/// `<prefix>照片黏貼表-編號<n>.<ext>`
pub fn archive_entry_name(prefix: &str, number: usize, extension: &str) -> String {
    format!("{}照片黏貼表-編號{}.{}", prefix, number, extension)
}

/// Build one artifact from a collection snapshot.
///
/// Pure: the collection is read, never changed. Document image resizing
/// happens before this call.
pub fn render(
    format: ExportFormat,
    collection: &ImageCollection,
    form: &FormContext,
    now: &NaiveDateTime,
) -> Result<Artifact, ExportError> {
    if collection.is_empty() {
        return Err(ExportError::EmptyCollection);
    }

    let (file_name, bytes) = match format {
        ExportFormat::Docx => {
            let layout = paginate(collection, form);
            (document_file_name(form.format, now), docx::render(&layout)?)
        }
        ExportFormat::Print => {
            let layout = paginate(collection, form);
            (
                print_file_name(form.format, now),
                print::render(&layout).into_bytes(),
            )
        }
        ExportFormat::Zip => {
            let prefix = form.file_prefix();
            (archive_file_name(prefix), archive::render(collection, prefix)?)
        }
    };

    tracing::info!(
        format = format.name(),
        file = %file_name,
        bytes = bytes.len(),
        photos = collection.len(),
        "Export built"
    );

    Ok(Artifact {
        format,
        file_name,
        bytes,
    })
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ImageRecord;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 11)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            document_file_name(DocumentFormat::Criminal, &now()),
            "刑案照片黏貼表_1130611_1405.docx"
        );
        assert_eq!(
            print_file_name(DocumentFormat::TrafficAccident, &now()),
            "交通事故照片黏貼表_1130611_1405.html"
        );
        assert_eq!(archive_file_name("竊盜"), "竊盜照片打包下載.zip");
        assert_eq!(archive_entry_name("", 2, "png"), "照片黏貼表-編號2.png");
    }

    #[test]
    fn test_empty_collection_rejected() {
        let collection = ImageCollection::new();
        for format in [ExportFormat::Docx, ExportFormat::Print, ExportFormat::Zip] {
            let err = render(format, &collection, &FormContext::default(), &now()).unwrap_err();
            assert!(matches!(err, ExportError::EmptyCollection));
            assert_eq!(err.user_message(), "請選擇至少一張圖片。");
        }
    }

    #[test]
    fn test_render_does_not_mutate() {
        let mut collection = ImageCollection::new();
        collection.append(ImageRecord::new("a.jpg", vec![1u8, 2], "image/jpeg", 40, 30));
        let before = collection.ids();

        let artifact = render(ExportFormat::Print, &collection, &FormContext::default(), &now())
            .unwrap();

        assert_eq!(collection.ids(), before);
        assert!(artifact.file_name.ends_with(".html"));
        assert_eq!(artifact.format.extension(), "html");
    }

    #[test]
    fn test_artifact_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact {
            format: ExportFormat::Zip,
            file_name: "x.zip".into(),
            bytes: vec![1, 2, 3],
        };
        let path = artifact.write_to(&dir.path().join("out")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
