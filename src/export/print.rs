//! Print-ready HTML: one page container per page, photos inlined as data URIs.

use base64::Engine;

use super::html_escape;
use crate::collection::CheckGlyphs;
use crate::layout::{Align, Cell, CellContent, Layout, PageEntry, PhotoBlock, Row};

/// Delay between load and the print dialog.
const PRINT_DELAY_MS: u32 = 500;

const STYLE: &str = r#"        @page {
            size: A4;
            margin: 12mm 20mm 1mm 20mm;
        }
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }
        body {
            font-family: "DFKai-SB", "標楷體", "KaiTi", serif;
            font-size: 11.5pt;
            line-height: 1.2;
        }
        h1 {
            text-align: justify;
            text-align-last: justify;
            font-size: 22pt;
            font-weight: normal;
            margin-bottom: 0.5em;
        }
        table {
            width: 100%;
            border-collapse: collapse;
            table-layout: fixed;
            border: 1px solid #000;
        }
        td {
            border: 1px solid #000;
            padding: 4px 6px;
            vertical-align: middle;
            word-wrap: break-word;
        }
        .photo-cell {
            text-align: center;
            height: 100mm;
            padding: 1px;
        }
        .photo-cell img {
            max-width: 100%;
            max-height: 97mm;
            object-fit: contain;
        }
        .label-cell {
            text-align: justify;
            text-align-last: justify;
        }
        .value-cell {
            text-align: left;
        }
        .center {
            text-align: center;
            text-align-last: center;
        }
        .spacer {
            height: 3px;
        }
        .page-container {
            page-break-after: always;
            page-break-inside: avoid;
        }
        .page-container:last-child {
            page-break-after: auto;
        }
"#;

/// Render the layout as a standalone HTML document that prints itself on load.
pub fn render(layout: &Layout) -> String {
    let title = html_escape(layout.title);
    let mut html = String::new();

    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="zh-Hant">
<head>
    <meta charset="UTF-8">
    <title>{}</title>
    <style>
{}    </style>
</head>
<body>
"#,
        title, STYLE
    ));

    for page in &layout.pages {
        html.push_str(r#"<div class="page-container">
"#);
        html.push_str(&format!("    <h1>{}</h1>\n", title));

        let mut header_row = page.header.as_ref().map(|h| h.row());
        for entry in &page.entries {
            match entry {
                PageEntry::Photo(block) => {
                    let mut rows = Vec::new();
                    if let Some(row) = header_row.take() {
                        rows.push(row);
                    }
                    rows.extend(block.rows(CheckGlyphs::PRINT));
                    html.push_str(&table(&rows, block));
                }
                PageEntry::Spacer => {
                    html.push_str(r#"    <div class="spacer"></div>
"#)
                }
            }
        }

        html.push_str("</div>\n");
    }

    html.push_str(&format!(
        r#"<script>
    window.addEventListener("load", function () {{
        window.focus();
        setTimeout(function () {{ window.print(); }}, {});
    }});
</script>
</body>
</html>
"#,
        PRINT_DELAY_MS
    ));

    html
}

fn table(rows: &[Row], block: &PhotoBlock) -> String {
    let mut html = String::from("    <table>\n");
    for row in rows {
        html.push_str("        <tr>");
        for (cell, pct) in row.cells.iter().zip(row.widths()) {
            html.push_str(&table_cell(cell, pct, block));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("    </table>\n");
    html
}

fn table_cell(cell: &Cell, pct: u32, block: &PhotoBlock) -> String {
    let colspan = if cell.span > 1 {
        format!(r#" colspan="{}""#, cell.span)
    } else {
        String::new()
    };

    match &cell.content {
        CellContent::Photo => {
            let (width, height) = block.fit.rounded();
            format!(
                r#"<td class="photo-cell"{}><img src="{}" style="width:{}px; height:{}px;" alt="{}"></td>"#,
                colspan,
                data_uri(block),
                width,
                height,
                html_escape(&block.image.name)
            )
        }
        CellContent::Text(text) => {
            let mut class = String::from(if cell.is_label { "label-cell" } else { "value-cell" });
            match cell.align {
                Align::Center => class.push_str(" center"),
                Align::Distribute | Align::Left => {}
            }
            format!(
                r#"<td class="{}" style="width:{}%;"{}>{}</td>"#,
                class,
                pct,
                colspan,
                html_escape(text)
            )
        }
    }
}

fn data_uri(block: &PhotoBlock) -> String {
    format!(
        "data:{};base64,{}",
        block.image.mime,
        base64::engine::general_purpose::STANDARD.encode(&block.image.data)
    )
}
