//! Editing session: the collection, the form, and the operations on them.
//!
//! A [`Session`] is the single owner of the model for one run. Every
//! mutation goes through it so the confirmation gates and the export guard
//! apply uniformly. Gates suspend the calling operation; the collection is
//! only touched after the answer arrives.

pub mod guard;
pub mod prompt;

use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::collection::{AccidentTag, ImageCollection, ImageId, ImageRecord, TextField};
use crate::config::Config;
use crate::export::{self, ExportError, ExportFormat, ExportOutcome};
use crate::form::FormContext;
use crate::import::codec::{CodecError, ImageCodec};
use crate::import::metadata::MetadataExtractor;
use crate::import::{ImportError, Importer, SourceFile};

pub use guard::{ExportGuard, ExportPermit};
pub use prompt::{AutoConfirm, Prompt, StdinPrompt};

/// Question asked before adding a file that matches an existing record.
pub fn duplicate_question(name: &str) -> String {
    format!("檔案 \"{}\" 已經存在。是否重複新增？", name)
}

/// Question asked before removing a photo.
pub const REMOVE_QUESTION: &str = "確定要刪除這張照片嗎？";

/// Outcome of one import batch.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Ids appended to the collection, in order.
    pub added: Vec<ImageId>,
    /// File names the user chose not to add again.
    pub declined: Vec<String>,
    pub failures: Vec<ImportError>,
    /// One slot per input file, in input order: the new id if it was added.
    pub slots: Vec<Option<ImageId>>,
}

impl ImportReport {
    /// Alert text for the failed files, one line each.
    pub fn alert(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(
            self.failures
                .iter()
                .map(|e| e.user_message())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

pub struct Session<P: Prompt> {
    collection: ImageCollection,
    form: FormContext,
    importer: Importer,
    codec: Arc<dyn ImageCodec>,
    prompt: P,
    guard: ExportGuard,
    document_max_dimension: u32,
}

impl<P: Prompt> Session<P> {
    pub fn new(
        config: &Config,
        codec: Arc<dyn ImageCodec>,
        metadata: Arc<dyn MetadataExtractor>,
        prompt: P,
    ) -> Self {
        Self {
            collection: ImageCollection::new(),
            form: config.form.to_form(),
            importer: Importer::new(Arc::clone(&codec), metadata, config.import.thumbnail_size),
            codec,
            prompt,
            guard: ExportGuard::new(config.export.release_delay()),
            document_max_dimension: config.export.document_max_dimension,
        }
    }

    pub fn collection(&self) -> &ImageCollection {
        &self.collection
    }

    pub fn form(&self) -> &FormContext {
        &self.form
    }

    pub fn set_form(&mut self, form: FormContext) {
        self.form = form;
    }

    pub fn guard(&self) -> &ExportGuard {
        &self.guard
    }

    /// Import a batch. All files are processed before any is added; each
    /// success then goes through the duplicate gate on its own.
    pub async fn import(&mut self, files: Vec<SourceFile>) -> ImportReport {
        let total = files.len();
        let results = self.importer.import_batch(files).await;

        let mut report = ImportReport::default();
        for result in results {
            match result {
                Ok(record) => {
                    let name = record.name.clone();
                    let added = self.add(record).await;
                    match added {
                        Some(id) => report.added.push(id),
                        None => report.declined.push(name),
                    }
                    report.slots.push(added);
                }
                Err(e) => {
                    report.failures.push(e);
                    report.slots.push(None);
                }
            }
        }

        info!(
            total,
            added = report.added.len(),
            declined = report.declined.len(),
            failed = report.failures.len(),
            "Import batch settled"
        );
        report
    }

    /// Append a record, asking first if its content key is already present.
    pub async fn add(&mut self, record: ImageRecord) -> Option<ImageId> {
        if self.collection.find_duplicate(&record.content_key()).is_some() {
            let question = duplicate_question(&record.name);
            if !self.prompt.confirm(&question).await {
                debug!(file = %record.name, "Duplicate declined");
                return None;
            }
        }
        let id = self.collection.append(record);
        debug!(%id, count = self.collection.len(), "Image added");
        Some(id)
    }

    /// Remove after confirmation. Returns whether the record was removed.
    pub async fn remove(&mut self, id: ImageId) -> bool {
        if self.collection.position(id).is_none() {
            return false;
        }
        if !self.prompt.confirm(REMOVE_QUESTION).await {
            debug!(%id, "Removal cancelled");
            return false;
        }
        let removed = self.collection.remove(id).is_some();
        if removed {
            debug!(%id, count = self.collection.len(), "Image removed");
        }
        removed
    }

    /// Move to a 0-based position, clamped to the collection.
    pub fn move_to(&mut self, id: ImageId, index: usize) -> bool {
        self.collection.move_to(id, index)
    }

    /// Rotate by a multiple of 90 degrees. Returns the cumulative angle,
    /// or `None` if `id` is not in the collection.
    pub async fn rotate(&mut self, id: ImageId, degrees: i32) -> Result<Option<u16>, CodecError> {
        let Some(record) = self.collection.find(id) else {
            return Ok(None);
        };
        let data = Arc::clone(&record.data);
        let codec = Arc::clone(&self.codec);

        let rotated = tokio::task::spawn_blocking(move || codec.rotate(&data, degrees)).await??;
        let angle = self.collection.apply_rotation(id, degrees, rotated);
        debug!(%id, degrees, angle = ?angle, "Image rotated");
        Ok(angle)
    }

    /// Set a free-text annotation. Ignored for ids not in the collection.
    pub fn set_text(&mut self, field: TextField, id: ImageId, value: impl Into<String>) -> bool {
        if self.collection.position(id).is_none() {
            return false;
        }
        self.collection.annotations_mut().set_text(field, id, value);
        true
    }

    pub fn set_accident_tag(&mut self, id: ImageId, tag: AccidentTag, checked: bool) -> bool {
        if self.collection.position(id).is_none() {
            return false;
        }
        self.collection
            .annotations_mut()
            .set_accident_tag(id, tag, checked);
        true
    }

    pub fn set_other_text(&mut self, id: ImageId, text: impl Into<String>) -> bool {
        if self.collection.position(id).is_none() {
            return false;
        }
        self.collection.annotations_mut().set_other_text(id, text);
        true
    }

    /// Build one export artifact from a snapshot of the current state.
    ///
    /// Returns `Skipped` if another export holds the guard.
    pub async fn export(
        &self,
        format: ExportFormat,
        now: NaiveDateTime,
    ) -> Result<ExportOutcome, ExportError> {
        let Some(_permit) = self.guard.try_acquire() else {
            info!(format = format.name(), "Export already in progress, ignoring request");
            return Ok(ExportOutcome::Skipped);
        };

        if self.collection.is_empty() {
            return Err(ExportError::EmptyCollection);
        }

        let mut snapshot = self.collection.clone();
        if format == ExportFormat::Docx {
            self.shrink_for_document(&mut snapshot).await?;
        }

        let form = self.form.clone();
        let artifact =
            tokio::task::spawn_blocking(move || export::render(format, &snapshot, &form, &now))
                .await??;

        Ok(ExportOutcome::Completed(artifact))
    }

    /// Wait until the export guard reopens.
    pub async fn wait_export_idle(&self) {
        self.guard.wait_idle().await;
    }

    async fn shrink_for_document(&self, snapshot: &mut ImageCollection) -> Result<(), ExportError> {
        let max = self.document_max_dimension;
        let handles: Vec<_> = snapshot
            .iter()
            .map(|record| {
                let id = record.id;
                let data = Arc::clone(&record.data);
                let codec = Arc::clone(&self.codec);
                (
                    id,
                    tokio::task::spawn_blocking(move || codec.resize_for_document(&data, max)),
                )
            })
            .collect();

        for (id, handle) in handles {
            match handle.await? {
                Ok(resized) => {
                    snapshot.replace_data(id, resized.data, resized.mime);
                }
                Err(e) => {
                    warn!(%id, error = %e, "Document resize failed");
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::DocumentFormat;
    use crate::import::tests::{FakeCodec, FixedDate};
    use chrono::NaiveDate;
    use prompt::tests::ScriptedPrompt;
    use std::collections::HashSet;
    use std::time::Duration;

    fn config(release_ms: u64) -> Config {
        let mut config = Config::default();
        config.export.release_delay_ms = release_ms;
        config
    }

    fn session(answers: &[bool]) -> Session<ScriptedPrompt> {
        Session::new(
            &config(0),
            Arc::new(FakeCodec::default()),
            Arc::new(FixedDate(None)),
            ScriptedPrompt::new(answers),
        )
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 11)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn file(name: &str, w: u8, h: u8) -> SourceFile {
        SourceFile::new(name, vec![w, h, 7, 7])
    }

    fn content_keys(session: &Session<ScriptedPrompt>) -> HashSet<(String, u64, u32, u32)> {
        session
            .collection()
            .iter()
            .map(|r| (r.name.clone(), r.size, r.width, r.height))
            .collect()
    }

    #[tokio::test]
    async fn test_import_adds_in_order() {
        let mut session = session(&[]);
        let report = session
            .import(vec![file("a.jpg", 4, 3), file("b.jpg", 3, 4)])
            .await;

        assert_eq!(report.added.len(), 2);
        assert!(report.alert().is_none());
        assert_eq!(session.collection().ids(), report.added);
        assert!(session.prompt.questions().is_empty());
    }

    #[tokio::test]
    async fn test_declined_duplicate_leaves_collection_unchanged() {
        let mut session = session(&[false]);
        session.import(vec![file("a.jpg", 4, 3)]).await;
        let ids_before = session.collection().ids();
        let keys_before = content_keys(&session);

        let report = session.import(vec![file("a.jpg", 4, 3)]).await;

        assert_eq!(report.declined, vec!["a.jpg"]);
        assert_eq!(session.collection().ids(), ids_before);
        assert_eq!(content_keys(&session), keys_before);
        assert_eq!(
            session.prompt.questions(),
            vec!["檔案 \"a.jpg\" 已經存在。是否重複新增？"]
        );
    }

    #[tokio::test]
    async fn test_accepted_duplicate_gets_new_id() {
        let mut session = session(&[true]);
        let first = session.import(vec![file("a.jpg", 4, 3)]).await.added[0];
        let second = session.import(vec![file("a.jpg", 4, 3)]).await.added[0];
        assert_ne!(first, second);
        assert_eq!(session.collection().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_file_does_not_block_siblings() {
        let mut session = session(&[]);
        let report = session
            .import(vec![
                file("a.jpg", 4, 3),
                SourceFile::new("broken.jpg", vec![]),
                file("c.jpg", 4, 3),
            ])
            .await;
        assert_eq!(report.added.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.alert().as_deref(), Some("處理圖片時發生錯誤"));
        assert_eq!(
            report.slots,
            vec![Some(report.added[0]), None, Some(report.added[1])]
        );
    }

    #[tokio::test]
    async fn test_cancelled_removal_changes_nothing() {
        let mut session = session(&[false, true]);
        let ids = session
            .import(vec![file("a.jpg", 4, 3), file("b.jpg", 4, 3)])
            .await
            .added;
        session.set_text(TextField::Description, ids[0], "門口");

        assert!(!session.remove(ids[0]).await);
        assert_eq!(session.collection().ids(), ids);
        assert_eq!(session.collection().annotations().description(ids[0]), "門口");

        assert!(session.remove(ids[0]).await);
        assert_eq!(session.collection().ids(), vec![ids[1]]);
        assert!(!session.collection().annotations().has_any(ids[0]));
        assert_eq!(
            session.prompt.questions(),
            vec![REMOVE_QUESTION, REMOVE_QUESTION]
        );
    }

    #[tokio::test]
    async fn test_remove_unknown_id_does_not_prompt() {
        let mut session = session(&[true]);
        assert!(!session.remove(ImageId::new()).await);
        assert!(session.prompt.questions().is_empty());
    }

    #[tokio::test]
    async fn test_annotations_ignore_unknown_ids() {
        let mut session = session(&[]);
        let stranger = ImageId::new();
        assert!(!session.set_text(TextField::CustomDate, stranger, "x"));
        assert!(!session.set_accident_tag(stranger, AccidentTag::Scene, true));
        assert!(!session.set_other_text(stranger, "x"));
        assert!(!session.collection().annotations().has_any(stranger));
    }

    #[tokio::test]
    async fn test_rotate_swaps_dimensions() {
        let mut session = session(&[]);
        let id = session.import(vec![file("a.jpg", 40, 30)]).await.added[0];

        assert_eq!(session.rotate(id, 90).await.unwrap(), Some(90));
        let record = session.collection().find(id).unwrap();
        assert_eq!((record.width, record.height), (30, 40));

        assert_eq!(session.rotate(id, -90).await.unwrap(), Some(0));
        assert_eq!(session.rotate(ImageId::new(), 90).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_export_empty_collection() {
        let session = session(&[]);
        let err = session.export(ExportFormat::Zip, now()).await.unwrap_err();
        assert!(matches!(err, ExportError::EmptyCollection));
    }

    #[tokio::test]
    async fn test_export_docx_uses_resized_snapshot() {
        let mut session = session(&[]);
        session.import(vec![file("a.jpg", 4, 3)]).await;
        let original = session.collection().get(0).unwrap().data.clone();

        let outcome = session.export(ExportFormat::Docx, now()).await.unwrap();
        let ExportOutcome::Completed(artifact) = outcome else {
            panic!("export skipped");
        };

        assert_eq!(artifact.file_name, "刑案照片黏貼表_1130611_0930.docx");
        // Session data is untouched by the document resize
        assert_eq!(session.collection().get(0).unwrap().data, original);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_export_is_skipped() {
        let mut session = Session::new(
            &config(1000),
            Arc::new(FakeCodec::default()),
            Arc::new(FixedDate(None)),
            ScriptedPrompt::new(&[]),
        );
        session.import(vec![file("a.jpg", 4, 3)]).await;
        let mut form = session.form().clone();
        form.format = DocumentFormat::TrafficAccident;
        session.set_form(form);

        let first = session.export(ExportFormat::Print, now()).await.unwrap();
        assert!(matches!(first, ExportOutcome::Completed(_)));

        // Guard still closed inside the release window
        let second = session.export(ExportFormat::Print, now()).await.unwrap();
        assert!(matches!(second, ExportOutcome::Skipped));

        tokio::time::sleep(Duration::from_millis(1001)).await;
        session.wait_export_idle().await;
        let third = session.export(ExportFormat::Zip, now()).await.unwrap();
        assert!(matches!(third, ExportOutcome::Completed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_export_still_releases_guard() {
        let session = Session::new(
            &config(1000),
            Arc::new(FakeCodec::default()),
            Arc::new(FixedDate(None)),
            ScriptedPrompt::new(&[]),
        );
        assert!(session.export(ExportFormat::Docx, now()).await.is_err());
        assert!(session.guard().is_busy());
        session.wait_export_idle().await;
        assert!(!session.guard().is_busy());
    }
}
