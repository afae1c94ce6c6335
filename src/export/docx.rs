//! WordprocessingML package writer.
//!
//! The document is assembled as plain OOXML parts and packed with `zip`.
//! One section: A4 with fixed margins, the form title in the page header,
//! a `第 N 頁` page-number field in the footer. Each photo block becomes
//! one fixed-layout table on the shared six-column grid; the criminal case
//! header row opens the first table of every page.

use std::io::{Cursor, Write};

use super::{html_escape, ExportError};
use crate::collection::CheckGlyphs;
use crate::form::DocumentFormat;
use crate::layout::{Align, Cell, CellContent, Layout, PageEntry, PhotoBlock, Row, COLUMN_GRID};

const FONT: &str = "DFKai-SB";

/// Run sizes in half-points.
const TITLE_SIZE: u32 = 44;
const BODY_SIZE: u32 = 23;
const FOOTER_SIZE: u32 = 20;

/// A4 in twips.
const PAGE_WIDTH: u32 = 11906;
const PAGE_HEIGHT: u32 = 16838;

const MARGIN_TOP_MM: f64 = 26.0;
const MARGIN_BOTTOM_MM: f64 = 10.0;
const MARGIN_SIDE_MM: f64 = 27.0;
const PHOTO_ROW_MM: f64 = 95.0;

const EMU_PER_PIXEL: u64 = 9525;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Escape for XML character data, dropping C0 controls XML 1.0 cannot carry.
fn xml_escape(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| *c >= ' ' || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    html_escape(&cleaned)
}

/// Millimetres to twips, truncated.
fn mm_to_twip(mm: f64) -> u32 {
    (mm / 25.4 * 1440.0).floor() as u32
}

fn text_width() -> u32 {
    PAGE_WIDTH - 2 * mm_to_twip(MARGIN_SIDE_MM)
}

/// An embedded picture part.
struct Media {
    rel_id: String,
    file_name: String,
    bytes: Vec<u8>,
}

fn media_extension(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => "jpeg",
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tiff" => "image/tiff",
        _ => "image/jpeg",
    }
}

/// Render the layout into a `.docx` byte stream.
pub fn render(layout: &Layout) -> Result<Vec<u8>, ExportError> {
    let mut media = Vec::new();
    let body = document_body(layout, &mut media);

    let mut buf = Vec::new();
    {
        let cursor = Cursor::new(&mut buf);
        let mut zip = zip::ZipWriter::new(cursor);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        let parts: [(&str, String); 8] = [
            ("[Content_Types].xml", content_types(&media)),
            ("_rels/.rels", package_rels()),
            ("word/document.xml", document_xml(&body)),
            ("word/_rels/document.xml.rels", document_rels(&media)),
            ("word/styles.xml", styles_xml()),
            ("word/settings.xml", settings_xml()),
            ("word/header1.xml", header_xml(layout.title)),
            ("word/footer1.xml", footer_xml()),
        ];
        for (name, xml) in parts {
            zip.start_file(name, options)?;
            zip.write_all(xml.as_bytes())?;
        }
        for item in &media {
            zip.start_file(format!("word/media/{}", item.file_name), options)?;
            zip.write_all(&item.bytes)?;
        }
        zip.finish()?;
    }

    tracing::debug!(pages = layout.pages.len(), media = media.len(), "DOCX package written");
    Ok(buf)
}

fn document_body(layout: &Layout, media: &mut Vec<Media>) -> String {
    let mut body = String::new();

    for (page_index, page) in layout.pages.iter().enumerate() {
        if page_index > 0 {
            body.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        }

        if let Some(header) = &page.header {
            body.push_str(&table(&[header.row()], ""));
        }
        for entry in &page.entries {
            match entry {
                PageEntry::Photo(block) => {
                    let picture = embed_picture(block, media);
                    body.push_str(&table(&block.rows(CheckGlyphs::DOCUMENT), &picture));
                    if layout.format == DocumentFormat::Criminal {
                        body.push_str("<w:p/>");
                    }
                }
                PageEntry::Spacer => {
                    if layout.format == DocumentFormat::TrafficAccident {
                        body.push_str("<w:p/>");
                    }
                }
            }
        }
    }

    // Closing paragraph kept to a hairline so a full page does not spill
    body.push_str(
        r#"<w:p><w:pPr><w:spacing w:before="0" w:after="0" w:line="20" w:lineRule="exact"/><w:rPr><w:sz w:val="2"/></w:rPr></w:pPr></w:p>"#,
    );
    body
}

/// Register the block's picture as a media part and return its inline drawing run.
fn embed_picture(block: &PhotoBlock, media: &mut Vec<Media>) -> String {
    let index = media.len() + 1;
    let extension = media_extension(&block.image.mime);
    let rel_id = format!("rIdImg{}", index);
    let file_name = format!("image{}.{}", index, extension);

    let (width, height) = block.fit.rounded();
    let cx = width as u64 * EMU_PER_PIXEL;
    let cy = height as u64 * EMU_PER_PIXEL;

    let drawing = format!(
        concat!(
            r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{id}" name="Picture {id}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic><a:graphicData uri="{pic_ns}"><pic:pic>"#,
            r#"<pic:nvPicPr><pic:cNvPr id="{id}" name="{file}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
        ),
        cx = cx,
        cy = cy,
        id = index,
        pic_ns = NS_PIC,
        file = file_name,
        rel = rel_id,
    );

    media.push(Media {
        rel_id,
        file_name,
        bytes: block.image.data.to_vec(),
    });
    drawing
}

fn table(rows: &[Row], picture: &str) -> String {
    let width = text_width();
    let mut xml = String::new();

    xml.push_str("<w:tbl><w:tblPr>");
    xml.push_str(r#"<w:tblW w:w="5000" w:type="pct"/>"#);
    xml.push_str("<w:tblBorders>");
    for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        xml.push_str(&format!(
            r#"<w:{} w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#,
            side
        ));
    }
    xml.push_str("</w:tblBorders>");
    xml.push_str(r#"<w:tblLayout w:type="fixed"/>"#);
    xml.push_str("</w:tblPr><w:tblGrid>");
    for pct in COLUMN_GRID {
        xml.push_str(&format!(r#"<w:gridCol w:w="{}"/>"#, width * pct / 100));
    }
    xml.push_str("</w:tblGrid>");

    for row in rows {
        xml.push_str("<w:tr>");
        if row.is_photo() {
            xml.push_str(&format!(
                r#"<w:trPr><w:trHeight w:val="{}" w:hRule="exact"/></w:trPr>"#,
                mm_to_twip(PHOTO_ROW_MM)
            ));
        }
        for (cell, pct) in row.cells.iter().zip(row.widths()) {
            xml.push_str(&table_cell(cell, pct, picture));
        }
        xml.push_str("</w:tr>");
    }

    xml.push_str("</w:tbl>");
    xml
}

fn table_cell(cell: &Cell, pct: u32, picture: &str) -> String {
    let mut xml = String::from("<w:tc><w:tcPr>");
    // Percentages are expressed in fiftieths
    xml.push_str(&format!(r#"<w:tcW w:w="{}" w:type="pct"/>"#, pct * 50));
    if cell.span > 1 {
        xml.push_str(&format!(r#"<w:gridSpan w:val="{}"/>"#, cell.span));
    }
    xml.push_str(r#"<w:vAlign w:val="center"/></w:tcPr>"#);

    let jc = match cell.align {
        Align::Distribute => "distribute",
        Align::Left => "left",
        Align::Center => "center",
    };
    xml.push_str(&format!(r#"<w:p><w:pPr><w:jc w:val="{}"/></w:pPr>"#, jc));
    match &cell.content {
        CellContent::Photo => xml.push_str(picture),
        CellContent::Text(text) if !text.is_empty() => xml.push_str(&text_run(text, None)),
        CellContent::Text(_) => {}
    }
    xml.push_str("</w:p></w:tc>");
    xml
}

fn text_run(text: &str, size: Option<u32>) -> String {
    let props = match size {
        Some(sz) => format!(
            r#"<w:rPr><w:rFonts w:ascii="{f}" w:eastAsia="{f}" w:hAnsi="{f}"/><w:sz w:val="{sz}"/><w:szCs w:val="{sz}"/></w:rPr>"#,
            f = FONT,
            sz = sz
        ),
        None => String::new(),
    };
    format!(
        r#"<w:r>{}<w:t xml:space="preserve">{}</w:t></w:r>"#,
        props,
        xml_escape(text)
    )
}

fn document_xml(body: &str) -> String {
    let side = mm_to_twip(MARGIN_SIDE_MM);
    format!(
        concat!(
            "{decl}",
            r#"<w:document xmlns:w="{w}" xmlns:r="{r}" xmlns:wp="{wp}" xmlns:a="{a}" xmlns:pic="{pic}">"#,
            "<w:body>{body}",
            "<w:sectPr>",
            r#"<w:headerReference w:type="default" r:id="rIdHeader"/>"#,
            r#"<w:footerReference w:type="default" r:id="rIdFooter"/>"#,
            r#"<w:pgSz w:w="{pw}" w:h="{ph}"/>"#,
            r#"<w:pgMar w:top="{top}" w:right="{side}" w:bottom="{bottom}" w:left="{side}" w:header="708" w:footer="283" w:gutter="0"/>"#,
            "</w:sectPr></w:body></w:document>"
        ),
        decl = XML_DECL,
        w = NS_W,
        r = NS_R,
        wp = NS_WP,
        a = NS_A,
        pic = NS_PIC,
        body = body,
        pw = PAGE_WIDTH,
        ph = PAGE_HEIGHT,
        top = mm_to_twip(MARGIN_TOP_MM),
        bottom = mm_to_twip(MARGIN_BOTTOM_MM),
        side = side,
    )
}

fn content_types(media: &[Media]) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);

    let mut extensions: Vec<&str> = media
        .iter()
        .filter_map(|m| m.file_name.rsplit('.').next())
        .collect();
    extensions.sort_unstable();
    extensions.dedup();
    for ext in extensions {
        xml.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            ext,
            content_type_for(ext)
        ));
    }

    let wml = "application/vnd.openxmlformats-officedocument.wordprocessingml";
    for (part, kind) in [
        ("/word/document.xml", "document.main+xml"),
        ("/word/styles.xml", "styles+xml"),
        ("/word/settings.xml", "settings+xml"),
        ("/word/header1.xml", "header+xml"),
        ("/word/footer1.xml", "footer+xml"),
    ] {
        xml.push_str(&format!(
            r#"<Override PartName="{}" ContentType="{}.{}"/>"#,
            part, wml, kind
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn package_rels() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="{base}/officeDocument" Target="word/document.xml"/>"#,
            "</Relationships>"
        ),
        decl = XML_DECL,
        base = REL_BASE,
    )
}

fn document_rels(media: &[Media]) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    for (id, kind, target) in [
        ("rIdStyles", "styles", "styles.xml"),
        ("rIdSettings", "settings", "settings.xml"),
        ("rIdHeader", "header", "header1.xml"),
        ("rIdFooter", "footer", "footer1.xml"),
    ] {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
            id, REL_BASE, kind, target
        ));
    }
    for item in media {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}/image" Target="media/{}"/>"#,
            item.rel_id, REL_BASE, item.file_name
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn styles_xml() -> String {
    let fonts = format!(
        r#"<w:rFonts w:ascii="{f}" w:eastAsia="{f}" w:hAnsi="{f}" w:cs="{f}"/>"#,
        f = FONT
    );
    format!(
        concat!(
            "{decl}",
            r#"<w:styles xmlns:w="{w}">"#,
            "<w:docDefaults><w:rPrDefault><w:rPr>{fonts}",
            r#"<w:sz w:val="{body}"/><w:szCs w:val="{body}"/></w:rPr></w:rPrDefault>"#,
            r#"<w:pPrDefault><w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr></w:pPrDefault>"#,
            "</w:docDefaults>",
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal">"#,
            r#"<w:name w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/>"#,
            r#"<w:pPr><w:jc w:val="distribute"/></w:pPr>"#,
            r#"<w:rPr>{fonts}<w:sz w:val="{body}"/><w:szCs w:val="{body}"/></w:rPr></w:style>"#,
            r#"<w:style w:type="paragraph" w:styleId="Header">"#,
            r#"<w:name w:val="header"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/>"#,
            r#"<w:rPr>{fonts}<w:sz w:val="{title}"/><w:szCs w:val="{title}"/></w:rPr></w:style>"#,
            r#"<w:style w:type="paragraph" w:styleId="Footer">"#,
            r#"<w:name w:val="footer"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/>"#,
            r#"<w:pPr><w:jc w:val="center"/></w:pPr></w:style>"#,
            r#"<w:style w:type="table" w:default="1" w:styleId="TableNormal">"#,
            r#"<w:name w:val="Normal Table"/><w:tblPr><w:tblInd w:w="0" w:type="dxa"/>"#,
            r#"<w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="85" w:type="dxa"/>"#,
            r#"<w:bottom w:w="0" w:type="dxa"/><w:right w:w="85" w:type="dxa"/></w:tblCellMar>"#,
            "</w:tblPr></w:style>",
            "</w:styles>"
        ),
        decl = XML_DECL,
        w = NS_W,
        fonts = fonts,
        body = BODY_SIZE,
        title = TITLE_SIZE,
    )
}

fn settings_xml() -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(&format!(r#"<w:settings xmlns:w="{}"><w:compat>"#, NS_W));
    for flag in [
        "doNotExpandShiftReturn",
        "doNotUseHTMLParagraphAutoSpacing",
        "doNotBreakWrappedTables",
        "doNotSnapToGridInCell",
        "doNotWrapTextWithPunct",
        "doNotUseEastAsianBreakRules",
        "doNotUseIndentAsNumberingTabStop",
    ] {
        xml.push_str(&format!("<w:{}/>", flag));
    }
    xml.push_str("</w:compat></w:settings>");
    xml
}

fn header_xml(title: &str) -> String {
    format!(
        concat!(
            "{decl}",
            r#"<w:hdr xmlns:w="{w}" xmlns:r="{r}">"#,
            r#"<w:p><w:pPr><w:pStyle w:val="Header"/><w:jc w:val="distribute"/></w:pPr>{run}</w:p>"#,
            "</w:hdr>"
        ),
        decl = XML_DECL,
        w = NS_W,
        r = NS_R,
        run = text_run(title, Some(TITLE_SIZE)),
    )
}

fn footer_xml() -> String {
    let props = format!(
        r#"<w:rPr><w:rFonts w:ascii="{f}" w:eastAsia="{f}" w:hAnsi="{f}"/><w:sz w:val="{sz}"/><w:szCs w:val="{sz}"/></w:rPr>"#,
        f = FONT,
        sz = FOOTER_SIZE
    );
    format!(
        concat!(
            "{decl}",
            r#"<w:ftr xmlns:w="{w}" xmlns:r="{r}">"#,
            r#"<w:p><w:pPr><w:pStyle w:val="Footer"/><w:jc w:val="center"/></w:pPr>"#,
            "{before}",
            r#"<w:r>{props}<w:fldChar w:fldCharType="begin"/></w:r>"#,
            r#"<w:r>{props}<w:instrText xml:space="preserve"> PAGE </w:instrText></w:r>"#,
            r#"<w:r>{props}<w:fldChar w:fldCharType="separate"/></w:r>"#,
            r#"<w:r>{props}<w:t>1</w:t></w:r>"#,
            r#"<w:r>{props}<w:fldChar w:fldCharType="end"/></w:r>"#,
            "{after}",
            "</w:p></w:ftr>"
        ),
        decl = XML_DECL,
        w = NS_W,
        r = NS_R,
        props = props,
        before = text_run("第 ", Some(FOOTER_SIZE)),
        after = text_run(" 頁", Some(FOOTER_SIZE)),
    )
}
