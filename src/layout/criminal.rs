//! 刑案照片黏貼表 layout.

use super::table::{Cell, Row};
use super::{resolve_address, CaseHeader, FormatLayout, PhotoDetails};
use crate::collection::{AnnotationStore, ImageRecord};
use crate::form::FormContext;

pub struct CriminalLayout;

impl FormatLayout for CriminalLayout {
    fn page_header(&self, form: &FormContext) -> Option<CaseHeader> {
        Some(CaseHeader {
            case_reason: form.case_reason.clone(),
            unit: form.unit.clone(),
        })
    }

    fn details(
        &self,
        record: &ImageRecord,
        annotations: &AnnotationStore,
        form: &FormContext,
    ) -> PhotoDetails {
        PhotoDetails::Criminal {
            photographer: form.photographer.clone(),
            address: resolve_address(annotations.custom_address(record.id), &form.case_address),
            description: annotations.description(record.id).to_string(),
        }
    }
}

/// `案由 | reason | 單位 | unit`
pub fn header_row(header: &CaseHeader) -> Row {
    Row::new(vec![
        Cell::label("案由"),
        Cell::value(header.case_reason.clone(), 2).centered(),
        Cell::label("單位"),
        Cell::value(header.unit.clone(), 2).centered(),
    ])
}

pub fn photo_rows(
    number: usize,
    date: &str,
    photographer: &str,
    address: &str,
    description: &str,
) -> Vec<Row> {
    vec![
        Row::new(vec![Cell::photo()]),
        Row::new(vec![
            Cell::label(format!("編號({})", number)).centered(),
            Cell::label("照片日期"),
            Cell::value(date, 2),
            Cell::label("攝影人"),
            Cell::value(photographer, 1).centered(),
        ]),
        Row::new(vec![Cell::label("攝影地址"), Cell::value(address, 5)]),
        Row::new(vec![Cell::label("說明"), Cell::value(description, 5)]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::table::Align;

    #[test]
    fn test_header_row() {
        let row = header_row(&CaseHeader {
            case_reason: "竊盜".into(),
            unit: "派出所".into(),
        });
        assert_eq!(row.widths(), vec![15, 35, 15, 35]);
        assert_eq!(row.cells[1].text(), "竊盜");
        assert_eq!(row.cells[1].align, Align::Center);
    }

    #[test]
    fn test_photo_rows_cover_grid() {
        let rows = photo_rows(3, "113/01/01 00:00", "甲", "乙", "丙");
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_photo());
        for row in &rows {
            assert_eq!(row.span(), 6);
        }
        assert_eq!(rows[1].cells[0].text(), "編號(3)");
        assert_eq!(rows[1].widths(), vec![15, 15, 35, 15, 20]);
        assert_eq!(rows[2].widths(), vec![15, 85]);
        assert_eq!(rows[3].cells[1].text(), "丙");
    }
}
