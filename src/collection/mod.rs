//! Ordered collection of annotated photographs.
//!
//! Insertion order is the display and printing order. Every record is
//! joined to its annotations through its [`ImageId`]; the collection keeps
//! the [`AnnotationStore`] in step with structural changes.

pub mod annotations;
pub mod tags;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub use annotations::{AnnotationStore, TextField};
pub use tags::{AccidentTag, AccidentTags, CheckGlyphs};

/// Opaque identity of one photograph, assigned at creation and never reused.
///
/// Time-ordered UUIDs (v7): a millisecond timestamp plus random bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImageId(Uuid);

impl ImageId {
    pub fn new() -> Self {
        ImageId(Uuid::now_v7())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata tuple used for the duplicate heuristic. Byte content is not compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub name: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
}

/// One photograph in the collection.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: ImageId,
    /// Full-resolution encoded bytes in the current orientation.
    pub data: Arc<[u8]>,
    /// MIME type of `data`.
    pub mime: String,
    /// Reduced preview, JPEG.
    pub thumbnail: Arc<[u8]>,
    /// Original file name.
    pub name: String,
    /// Byte size at import time.
    pub size: u64,
    pub width: u32,
    pub height: u32,
    /// Capture date from metadata, ROC format.
    pub date: Option<String>,
}

impl ImageRecord {
    pub fn new(
        name: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
        mime: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        let data = data.into();
        Self {
            id: ImageId::new(),
            size: data.len() as u64,
            data,
            mime: mime.into(),
            thumbnail: Arc::from(Vec::new()),
            name: name.into(),
            width,
            height,
            date: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<Arc<[u8]>>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }

    pub fn with_date(mut self, date: Option<String>) -> Self {
        self.date = date.filter(|d| !d.is_empty());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn content_key(&self) -> ContentKey {
        ContentKey {
            name: self.name.clone(),
            size: self.size,
            width: self.width,
            height: self.height,
        }
    }

    /// File extension of the original name, lowercase, without the dot.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

/// New pixel data for a record after a quarter-turn rotation.
#[derive(Debug, Clone)]
pub struct Reoriented {
    pub data: Vec<u8>,
    pub mime: String,
    pub thumbnail: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Ordered image records plus their annotation side tables.
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    records: Vec<ImageRecord>,
    annotations: AnnotationStore,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageRecord> {
        self.records.iter()
    }

    pub fn ids(&self) -> Vec<ImageId> {
        self.records.iter().map(|r| r.id).collect()
    }

    pub fn find(&self, id: ImageId) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn position(&self, id: ImageId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// 1-based position label shown next to the photograph.
    pub fn display_number(&self, id: ImageId) -> Option<usize> {
        self.position(id).map(|p| p + 1)
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationStore {
        &mut self.annotations
    }

    /// Existing record with the same content key, if any.
    pub fn find_duplicate(&self, key: &ContentKey) -> Option<&ImageRecord> {
        self.records.iter().find(|r| &r.content_key() == key)
    }

    /// Append a record at the end. Duplicate confirmation happens before this call.
    pub fn append(&mut self, record: ImageRecord) -> ImageId {
        let id = record.id;
        self.annotations.ensure(id);
        self.records.push(record);
        id
    }

    /// Remove the record with `id` together with all of its annotations.
    pub fn remove(&mut self, id: ImageId) -> Option<ImageRecord> {
        let index = self.position(id)?;
        let record = self.records.remove(index);
        self.annotations.clear(id);
        Some(record)
    }

    /// Move the record with `id` to `target` within the remaining sequence.
    ///
    /// The target is clamped to the valid range. Returns false when `id`
    /// is not present.
    pub fn move_to(&mut self, id: ImageId, target: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let record = self.records.remove(from);
        let target = target.min(self.records.len());
        self.records.insert(target, record);
        true
    }

    /// Swap in new pixel data after a rotation and record the cumulative angle.
    pub fn apply_rotation(&mut self, id: ImageId, degrees: i32, image: Reoriented) -> Option<u16> {
        let record = self.records.iter_mut().find(|r| r.id == id)?;
        record.data = Arc::from(image.data);
        record.mime = image.mime;
        record.thumbnail = Arc::from(image.thumbnail);
        record.width = image.width;
        record.height = image.height;
        Some(self.annotations.add_rotation(id, degrees))
    }

    /// Replace the encoded bytes of a record without touching its geometry.
    pub fn replace_data(&mut self, id: ImageId, data: Vec<u8>, mime: impl Into<String>) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.data = Arc::from(data);
                record.mime = mime.into();
                true
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a ImageCollection {
    type Item = &'a ImageRecord;
    type IntoIter = std::slice::Iter<'a, ImageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
