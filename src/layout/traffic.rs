//! (非)道路交通事故照片黏貼紀錄表 layout.

use super::table::{Cell, Row};
use super::{CaseHeader, FormatLayout, PhotoDetails};
use crate::collection::{AnnotationStore, ImageRecord};
use crate::form::FormContext;

pub struct TrafficLayout;

impl FormatLayout for TrafficLayout {
    fn page_header(&self, _form: &FormContext) -> Option<CaseHeader> {
        None
    }

    fn details(
        &self,
        record: &ImageRecord,
        annotations: &AnnotationStore,
        _form: &FormContext,
    ) -> PhotoDetails {
        PhotoDetails::Traffic {
            tags: annotations.accident_tags(record.id),
        }
    }
}

pub fn photo_rows(number: usize, date: &str, tag_line: &str) -> Vec<Row> {
    vec![
        Row::new(vec![Cell::photo()]),
        Row::new(vec![
            Cell::label("攝影日期"),
            Cell::value(date, 2),
            Cell::label("照片編號"),
            Cell::value(number.to_string(), 2).centered(),
        ]),
        Row::new(vec![Cell::label("說明"), Cell::value(tag_line, 5)]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_rows() {
        let rows = photo_rows(4, "113/02/03 04:05", "□現場全景");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].cells[3].text(), "4");
        assert_eq!(rows[1].widths(), vec![15, 35, 15, 35]);
        assert_eq!(rows[2].cells[1].text(), "□現場全景");
    }
}
