//! Turning raw files into collection records.
//!
//! HEIC/HEIF sources are transcoded to JPEG first; every file then goes
//! through probe, capture-date lookup and thumbnailing. A batch runs one
//! blocking task per file and joins on all of them before returning, so
//! the caller mutates the collection only after the whole batch settled.

pub mod codec;
pub mod discovery;
pub mod metadata;

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::collection::ImageRecord;
use codec::{CodecError, ImageCodec};
use metadata::{MetadataExtractor, MetadataSource};

/// A file handed to the import pipeline.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    /// Declared MIME type, if the host knows it.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a file from disk, keeping only its file name.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self::new(name, bytes))
    }

    /// HEIC/HEIF by declared type or by file suffix.
    pub fn is_heic(&self) -> bool {
        let declared = self
            .mime
            .as_deref()
            .map(|m| {
                let m = m.to_ascii_lowercase();
                m == "image/heic" || m == "image/heif"
            })
            .unwrap_or(false);
        declared || heic_stem(&self.name).is_some()
    }
}

/// File name without a `.heic`/`.heif` suffix, if it has one.
fn heic_stem(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(5)?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (stem, suffix) = name.split_at(split);
    (suffix.eq_ignore_ascii_case(".heic") || suffix.eq_ignore_ascii_case(".heif")).then_some(stem)
}

/// `photo.HEIC` -> `photo.jpg`
pub fn jpeg_name(name: &str) -> String {
    match heic_stem(name) {
        Some(stem) => format!("{}.jpg", stem),
        None => name.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HEIC conversion of {name} failed: {source}")]
    Heic {
        name: String,
        #[source]
        source: CodecError,
    },

    #[error("failed to process {name}: {source}")]
    Codec {
        name: String,
        #[source]
        source: CodecError,
    },

    #[error("import task for {name} failed: {source}")]
    Join {
        name: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl ImportError {
    pub fn file_name(&self) -> &str {
        match self {
            ImportError::Read { name, .. }
            | ImportError::Heic { name, .. }
            | ImportError::Codec { name, .. }
            | ImportError::Join { name, .. } => name,
        }
    }

    /// Alert text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ImportError::Heic { name, .. } => format!("HEIC 檔案 \"{}\" 轉換失敗", name),
            _ => "處理圖片時發生錯誤".to_string(),
        }
    }
}

/// Runs source files through the codec and metadata capabilities.
#[derive(Clone)]
pub struct Importer {
    codec: Arc<dyn ImageCodec>,
    metadata: Arc<dyn MetadataExtractor>,
    thumbnail_size: u32,
}

impl Importer {
    pub fn new(
        codec: Arc<dyn ImageCodec>,
        metadata: Arc<dyn MetadataExtractor>,
        thumbnail_size: u32,
    ) -> Self {
        Self {
            codec,
            metadata,
            thumbnail_size,
        }
    }

    /// Process one file into a record. Blocking.
    pub fn process(&self, file: SourceFile) -> Result<ImageRecord, ImportError> {
        let heic = file.is_heic();
        let SourceFile { name, bytes, .. } = file;

        let (name, bytes, date) = if heic {
            // Dates come from the original container; transcoding drops them
            let date = self.metadata.capture_date(&bytes, MetadataSource::Heic);
            let converted = self
                .codec
                .transcode_heic(&bytes)
                .map_err(|source| ImportError::Heic {
                    name: name.clone(),
                    source,
                })?;
            debug!(file = %name, bytes = converted.len(), "Transcoded HEIC");
            (jpeg_name(&name), converted, date)
        } else {
            let date = self.metadata.capture_date(&bytes, MetadataSource::Raster);
            (name, bytes, date)
        };

        let codec_err = |source| ImportError::Codec {
            name: name.clone(),
            source,
        };
        let probe = self.codec.probe(&bytes).map_err(codec_err)?;
        let thumbnail = self
            .codec
            .thumbnail(&bytes, self.thumbnail_size)
            .map_err(codec_err)?;

        debug!(
            file = %name,
            width = probe.width,
            height = probe.height,
            date = ?date,
            "Imported image"
        );

        Ok(
            ImageRecord::new(name.clone(), bytes, probe.mime, probe.width, probe.height)
                .with_thumbnail(thumbnail)
                .with_date(date),
        )
    }

    /// Process every file concurrently and return results in input order.
    pub async fn import_batch(&self, files: Vec<SourceFile>) -> Vec<Result<ImageRecord, ImportError>> {
        let handles: Vec<_> = files
            .into_iter()
            .map(|file| {
                let importer = self.clone();
                let name = file.name.clone();
                (name, tokio::task::spawn_blocking(move || importer.process(file)))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(source) => Err(ImportError::Join { name, source }),
            };
            if let Err(ref e) = result {
                warn!(file = %e.file_name(), error = %e, "Import failed");
            }
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::collection::Reoriented;
    use codec::{EncodedImage, Probe};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Codec that reads the first two bytes as width/height and never decodes.
    #[derive(Default)]
    pub(crate) struct FakeCodec {
        pub transcodes: AtomicUsize,
        pub fail_heic: bool,
    }

    impl ImageCodec for FakeCodec {
        fn transcode_heic(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
            self.transcodes.fetch_add(1, Ordering::SeqCst);
            if self.fail_heic {
                return Err(CodecError::Transcode("converter failed".into()));
            }
            Ok(data.to_vec())
        }

        fn probe(&self, data: &[u8]) -> Result<Probe, CodecError> {
            match data {
                [w, h, ..] => Ok(Probe {
                    width: *w as u32,
                    height: *h as u32,
                    mime: "image/jpeg".into(),
                }),
                _ => Err(CodecError::Transcode("unreadable".into())),
            }
        }

        fn thumbnail(&self, data: &[u8], _max_size: u32) -> Result<Vec<u8>, CodecError> {
            Ok(data.iter().take(2).copied().collect())
        }

        fn rotate(&self, data: &[u8], degrees: i32) -> Result<Reoriented, CodecError> {
            let probe = self.probe(data)?;
            let (width, height) = if degrees.rem_euclid(180) == 90 {
                (probe.height, probe.width)
            } else {
                (probe.width, probe.height)
            };
            let mut rotated = data.to_vec();
            rotated[0] = width as u8;
            rotated[1] = height as u8;
            Ok(Reoriented {
                data: rotated.clone(),
                mime: "image/jpeg".into(),
                thumbnail: rotated,
                width,
                height,
            })
        }

        fn resize_for_document(
            &self,
            data: &[u8],
            _max_dimension: u32,
        ) -> Result<EncodedImage, CodecError> {
            let probe = self.probe(data)?;
            let mut resized = data.to_vec();
            resized.push(0xD0);
            Ok(EncodedImage {
                data: resized,
                mime: probe.mime,
                width: probe.width,
                height: probe.height,
            })
        }
    }

    /// Extractor that reports a fixed date for every source kind.
    pub(crate) struct FixedDate(pub Option<&'static str>);

    impl MetadataExtractor for FixedDate {
        fn capture_date(&self, _data: &[u8], _source: MetadataSource) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn importer(codec: FakeCodec) -> Importer {
        Importer::new(Arc::new(codec), Arc::new(FixedDate(Some("113/06/11 14:23"))), 800)
    }

    #[test]
    fn test_is_heic() {
        assert!(SourceFile::new("IMG_1.HEIC", vec![]).is_heic());
        assert!(SourceFile::new("a.heif", vec![]).is_heic());
        assert!(SourceFile::new("blob", vec![]).with_mime("image/heic").is_heic());
        assert!(!SourceFile::new("a.jpg", vec![]).is_heic());
    }

    #[test]
    fn test_jpeg_name() {
        assert_eq!(jpeg_name("IMG_0001.HEIC"), "IMG_0001.jpg");
        assert_eq!(jpeg_name("x.heif"), "x.jpg");
        assert_eq!(jpeg_name("x.png"), "x.png");
    }

    #[test]
    fn test_process_raster() {
        let importer = importer(FakeCodec::default());
        let record = importer
            .process(SourceFile::new("a.jpg", vec![40, 30, 9, 9]))
            .unwrap();
        assert_eq!(record.name, "a.jpg");
        assert_eq!((record.width, record.height), (40, 30));
        assert_eq!(record.size, 4);
        assert_eq!(record.date.as_deref(), Some("113/06/11 14:23"));
        assert_eq!(&*record.thumbnail, &[40, 30]);
    }

    #[test]
    fn test_process_heic_renames() {
        let codec = FakeCodec::default();
        let importer = importer(codec);
        let record = importer
            .process(SourceFile::new("IMG.HEIC", vec![10, 20]))
            .unwrap();
        assert_eq!(record.name, "IMG.jpg");
    }

    #[test]
    fn test_heic_failure_message() {
        let importer = importer(FakeCodec {
            fail_heic: true,
            ..Default::default()
        });
        let err = importer
            .process(SourceFile::new("IMG.heic", vec![10, 20]))
            .unwrap_err();
        assert_eq!(err.user_message(), "HEIC 檔案 \"IMG.heic\" 轉換失敗");
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_isolates_failures() {
        let importer = importer(FakeCodec::default());
        let results = importer
            .import_batch(vec![
                SourceFile::new("1.jpg", vec![1, 1]),
                SourceFile::new("broken.jpg", vec![]),
                SourceFile::new("3.jpg", vec![3, 3]),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name, "1.jpg");
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.file_name(), "broken.jpg");
        assert_eq!(err.user_message(), "處理圖片時發生錯誤");
        assert_eq!(results[2].as_ref().unwrap().name, "3.jpg");
    }
}
