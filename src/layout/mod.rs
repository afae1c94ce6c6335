//! Pagination of an image collection into fixed-layout form pages.
//!
//! [`paginate`] turns the collection plus the form snapshot into a
//! [`Layout`]: pages of at most two photo blocks, with every display
//! value already resolved. Renderers only walk the tree; they never look
//! back into the collection or its annotations.

pub mod criminal;
pub mod sizing;
pub mod table;
pub mod traffic;

use crate::collection::{AccidentTags, AnnotationStore, CheckGlyphs, ImageCollection, ImageRecord};
use crate::form::{DateMode, DocumentFormat, FormContext};

pub use sizing::FitSize;
pub use table::{Align, Cell, CellContent, Row, COLUMN_GRID};

/// Photo blocks per page.
pub const PHOTOS_PER_PAGE: usize = 2;

/// Per-format behaviour: page header and the fields carried by each photo block.
pub trait FormatLayout: Send + Sync {
    /// Block printed above the first photo of every page, if the format has one.
    fn page_header(&self, form: &FormContext) -> Option<CaseHeader>;

    /// Format-specific fields of one photo block.
    fn details(&self, record: &ImageRecord, annotations: &AnnotationStore, form: &FormContext)
        -> PhotoDetails;
}

/// Layout behaviour for `format`.
pub fn layout_for(format: DocumentFormat) -> &'static dyn FormatLayout {
    match format {
        DocumentFormat::Criminal => &criminal::CriminalLayout,
        DocumentFormat::TrafficAccident => &traffic::TrafficLayout,
    }
}

/// Case reason and unit, shown at the top of criminal-case pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseHeader {
    pub case_reason: String,
    pub unit: String,
}

impl CaseHeader {
    pub fn row(&self) -> Row {
        criminal::header_row(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoDetails {
    Criminal {
        photographer: String,
        address: String,
        description: String,
    },
    Traffic {
        tags: AccidentTags,
    },
}

/// One photograph with its resolved metadata rows.
#[derive(Debug, Clone)]
pub struct PhotoBlock {
    /// 1-based position across the whole collection.
    pub number: usize,
    pub image: ImageRecord,
    pub date: String,
    pub fit: FitSize,
    pub details: PhotoDetails,
}

impl PhotoBlock {
    fn new(
        number: usize,
        record: &ImageRecord,
        annotations: &AnnotationStore,
        form: &FormContext,
        layout: &dyn FormatLayout,
    ) -> Self {
        PhotoBlock {
            number,
            image: record.clone(),
            date: resolve_date(
                annotations.custom_date(record.id),
                form.date_mode,
                record.date.as_deref(),
                &form.manual_date,
            ),
            fit: FitSize::for_dimensions(record.width, record.height),
            details: layout.details(record, annotations, form),
        }
    }

    /// Table rows for this block; the tag line is drawn with `glyphs`.
    pub fn rows(&self, glyphs: CheckGlyphs) -> Vec<Row> {
        match &self.details {
            PhotoDetails::Criminal {
                photographer,
                address,
                description,
            } => criminal::photo_rows(self.number, &self.date, photographer, address, description),
            PhotoDetails::Traffic { tags } => {
                traffic::photo_rows(self.number, &self.date, &tags.encode(glyphs))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum PageEntry {
    Photo(PhotoBlock),
    /// Blank gap between two photos on the same page.
    Spacer,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub header: Option<CaseHeader>,
    pub entries: Vec<PageEntry>,
}

impl Page {
    pub fn photos(&self) -> impl Iterator<Item = &PhotoBlock> {
        self.entries.iter().filter_map(|e| match e {
            PageEntry::Photo(block) => Some(block),
            PageEntry::Spacer => None,
        })
    }
}

/// Paginated form. Page breaks fall between consecutive pages, never after the last.
#[derive(Debug, Clone)]
pub struct Layout {
    pub format: DocumentFormat,
    pub title: &'static str,
    pub pages: Vec<Page>,
}

impl Layout {
    pub fn photos(&self) -> impl Iterator<Item = &PhotoBlock> {
        self.pages.iter().flat_map(|p| p.photos())
    }

    pub fn photo_count(&self) -> usize {
        self.photos().count()
    }
}

/// Date shown for one photo.
///
/// A custom date always wins. Otherwise auto mode uses the capture date
/// when there is one and the manual date when not; manual mode always
/// uses the manual date.
pub fn resolve_date(custom: &str, mode: DateMode, metadata: Option<&str>, manual: &str) -> String {
    if !custom.is_empty() {
        return custom.to_string();
    }
    match mode {
        DateMode::Auto => metadata
            .filter(|d| !d.is_empty())
            .unwrap_or(manual)
            .to_string(),
        DateMode::Manual => manual.to_string(),
    }
}

/// Address shown for one criminal-case photo.
pub fn resolve_address(custom: &str, case_address: &str) -> String {
    if custom.is_empty() {
        case_address.to_string()
    } else {
        custom.to_string()
    }
}

/// Group the collection into pages for the selected format.
pub fn paginate(collection: &ImageCollection, form: &FormContext) -> Layout {
    let layout = layout_for(form.format);
    let annotations = collection.annotations();
    let records: Vec<&ImageRecord> = collection.iter().collect();

    let pages = records
        .chunks(PHOTOS_PER_PAGE)
        .enumerate()
        .map(|(page_index, chunk)| {
            let mut entries = Vec::with_capacity(chunk.len() * 2);
            for (offset, record) in chunk.iter().enumerate() {
                if offset > 0 {
                    entries.push(PageEntry::Spacer);
                }
                let number = page_index * PHOTOS_PER_PAGE + offset + 1;
                entries.push(PageEntry::Photo(PhotoBlock::new(
                    number,
                    record,
                    annotations,
                    form,
                    layout,
                )));
            }
            Page {
                header: layout.page_header(form),
                entries,
            }
        })
        .collect();

    Layout {
        format: form.format,
        title: form.format.title(),
        pages,
    }
}
