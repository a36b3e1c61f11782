// WordprocessingML writer.
// Produces a minimal package: document, styles, numbering, optional header
// and footer, and core properties. Images are not written.

use std::io::{Cursor, Write};

use chrono::{SecondsFormat, Utc};
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::MAIN_DOCUMENT;
use crate::pipeline::ExportEncodeError;
use crate::richtext::structured_document::*;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// numId written for bullet lists
const BULLET_NUM_ID: u32 = 1;
/// numId written for numbered lists
const DECIMAL_NUM_ID: u32 = 2;

/// Hyperlink relationships collected while writing a part
#[derive(Default)]
struct PartRels {
    entries: Vec<(String, String, String, bool)>,
}

impl PartRels {
    fn add(&mut self, rel_type: &str, target: &str, external: bool) -> String {
        let id = format!("rId{}", self.entries.len() + 1);
        self.entries
            .push((id.clone(), format!("{REL_BASE}/{rel_type}"), target.to_string(), external));
        id
    }

    fn to_xml(&self) -> String {
        let mut out = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<Relationships xmlns=\"{REL_NS}\">"
        );
        for (id, rel_type, target, external) in &self.entries {
            out.push_str(&format!(
                "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"{}/>",
                id,
                rel_type,
                escape(target.as_str()),
                if *external { " TargetMode=\"External\"" } else { "" }
            ));
        }
        out.push_str("</Relationships>");
        out
    }
}

/// Encode a document as a .docx package
pub fn write_docx(doc: &StructuredDocument, title: &str) -> Result<Vec<u8>, ExportEncodeError> {
    let mut document_rels = PartRels::default();
    document_rels.add("styles", "styles.xml", false);
    document_rels.add("numbering", "numbering.xml", false);

    let mut parts: Vec<(String, String)> = Vec::new();
    let mut header_id = None;
    let mut footer_id = None;

    if !doc.header.is_empty() {
        let (xml, rels) = write_part("hdr", &doc.header);
        header_id = Some(document_rels.add("header", "header1.xml", false));
        parts.push(("word/header1.xml".to_string(), xml));
        parts.push(("word/_rels/header1.xml.rels".to_string(), rels.to_xml()));
    }
    if !doc.footer.is_empty() {
        let (xml, rels) = write_part("ftr", &doc.footer);
        footer_id = Some(document_rels.add("footer", "footer1.xml", false));
        parts.push(("word/footer1.xml".to_string(), xml));
        parts.push(("word/_rels/footer1.xml.rels".to_string(), rels.to_xml()));
    }

    let mut body = String::new();
    let body_blocks = doc.blocks();
    if body_blocks.is_empty() {
        body.push_str("<w:p/>");
    }
    for block in body_blocks {
        write_paragraph(block, &mut body, &mut document_rels);
    }
    write_section(
        doc.page.unwrap_or_default(),
        header_id.as_deref(),
        footer_id.as_deref(),
        &mut body,
    );

    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document xmlns:w=\"{W_NS}\" xmlns:r=\"{R_NS}\"><w:body>{body}</w:body></w:document>"
    );

    parts.push((MAIN_DOCUMENT.to_string(), document));
    parts.push(("word/_rels/document.xml.rels".to_string(), document_rels.to_xml()));
    parts.push(("word/styles.xml".to_string(), styles_xml()));
    parts.push(("word/numbering.xml".to_string(), numbering_xml()));
    parts.push(("docProps/core.xml".to_string(), core_properties_xml(title)));
    parts.push(("_rels/.rels".to_string(), package_rels_xml()));
    parts.push((
        "[Content_Types].xml".to_string(),
        content_types_xml(header_id.is_some(), footer_id.is_some()),
    ));

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, xml) in parts.iter().rev() {
        zip.start_file(name.as_str(), options)
            .map_err(|err| ExportEncodeError::Archive(err.to_string()))?;
        zip.write_all(xml.as_bytes())?;
    }
    let cursor = zip
        .finish()
        .map_err(|err| ExportEncodeError::Archive(err.to_string()))?;
    Ok(cursor.into_inner())
}

fn write_part(root: &str, blocks: &[Block]) -> (String, PartRels) {
    let mut rels = PartRels::default();
    let mut body = String::new();
    for block in blocks {
        write_paragraph(block, &mut body, &mut rels);
    }
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:{root} xmlns:w=\"{W_NS}\" xmlns:r=\"{R_NS}\">{body}</w:{root}>"
    );
    (xml, rels)
}

fn write_paragraph(block: &Block, out: &mut String, rels: &mut PartRels) {
    out.push_str("<w:p>");

    let mut props = String::new();
    match block.block_type {
        BlockType::Heading { level } => {
            props.push_str(&format!("<w:pStyle w:val=\"Heading{}\"/>", level.clamp(1, 6)));
        }
        BlockType::ListItem { ordered } => {
            let num_id = if ordered { DECIMAL_NUM_ID } else { BULLET_NUM_ID };
            props.push_str(&format!(
                "<w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"{num_id}\"/></w:numPr>"
            ));
        }
        BlockType::Paragraph => {}
    }
    let jc = match block.alignment {
        Alignment::Left => None,
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
        Alignment::Justify => Some("both"),
    };
    if let Some(jc) = jc {
        props.push_str(&format!("<w:jc w:val=\"{jc}\"/>"));
    }
    if !props.is_empty() {
        out.push_str("<w:pPr>");
        out.push_str(&props);
        out.push_str("</w:pPr>");
    }

    write_inlines(&block.content, out, rels);
    out.push_str("</w:p>");
}

fn write_inlines(content: &[InlineContent], out: &mut String, rels: &mut PartRels) {
    for item in content {
        match item {
            InlineContent::Text(run) => write_run(run, out),
            InlineContent::HardBreak => out.push_str("<w:r><w:br/></w:r>"),
            InlineContent::Link { link, content } => {
                match link.destination.strip_prefix('#') {
                    Some(anchor) => {
                        out.push_str(&format!("<w:hyperlink w:anchor=\"{}\"", escape(anchor)));
                    }
                    None => {
                        let id = rels.add("hyperlink", &link.destination, true);
                        out.push_str(&format!("<w:hyperlink r:id=\"{id}\""));
                    }
                }
                if let Some(title) = &link.title {
                    out.push_str(&format!(" w:tooltip=\"{}\"", escape(title.as_str())));
                }
                out.push_str(" w:history=\"1\">");
                write_inlines(content, out, rels);
                out.push_str("</w:hyperlink>");
            }
            // Pictures need drawing markup and media parts; not written
            InlineContent::Image(_) => {}
        }
    }
}

fn write_run(run: &TextRun, out: &mut String) {
    if run.text.is_empty() {
        return;
    }
    out.push_str("<w:r>");
    let props = run_properties(&run.style);
    if !props.is_empty() {
        out.push_str("<w:rPr>");
        out.push_str(&props);
        out.push_str("</w:rPr>");
    }
    for (i, piece) in run.text.split('\t').enumerate() {
        if i > 0 {
            out.push_str("<w:tab/>");
        }
        if !piece.is_empty() {
            out.push_str("<w:t xml:space=\"preserve\">");
            out.push_str(&escape(piece));
            out.push_str("</w:t>");
        }
    }
    out.push_str("</w:r>");
}

/// Run properties in schema order
fn run_properties(style: &TextStyle) -> String {
    let mut props = String::new();
    if let Some(font) = &style.font_family {
        let font = escape(font.as_str());
        props.push_str(&format!(
            "<w:rFonts w:ascii=\"{font}\" w:hAnsi=\"{font}\" w:cs=\"{font}\"/>"
        ));
    }
    if style.bold {
        props.push_str("<w:b/>");
    }
    if style.italic {
        props.push_str("<w:i/>");
    }
    if style.strikethrough {
        props.push_str("<w:strike/>");
    }
    if let Some(color) = style.color.as_deref().and_then(docx_color) {
        props.push_str(&format!("<w:color w:val=\"{color}\"/>"));
    }
    if let Some(points) = style.font_size {
        let half_points = u32::from(points) * 2;
        props.push_str(&format!(
            "<w:sz w:val=\"{half_points}\"/><w:szCs w:val=\"{half_points}\"/>"
        ));
    }
    if style.underline {
        props.push_str("<w:u w:val=\"single\"/>");
    }
    if let Some(fill) = style.highlight.as_deref().and_then(docx_color) {
        props.push_str(&format!("<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{fill}\"/>"));
    }
    props
}

/// `#ff0000` → `FF0000`
fn docx_color(css: &str) -> Option<String> {
    let hex = css.strip_prefix('#')?;
    (hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())).then(|| hex.to_ascii_uppercase())
}

fn write_section(
    page: PageGeometry,
    header_id: Option<&str>,
    footer_id: Option<&str>,
    out: &mut String,
) {
    out.push_str("<w:sectPr>");
    if let Some(id) = header_id {
        out.push_str(&format!("<w:headerReference w:type=\"default\" r:id=\"{id}\"/>"));
    }
    if let Some(id) = footer_id {
        out.push_str(&format!("<w:footerReference w:type=\"default\" r:id=\"{id}\"/>"));
    }
    out.push_str(&format!(
        "<w:pgSz w:w=\"{}\" w:h=\"{}\"/>\
         <w:pgMar w:top=\"{}\" w:right=\"{}\" w:bottom=\"{}\" w:left=\"{}\" \
         w:header=\"720\" w:footer=\"720\" w:gutter=\"0\"/>",
        page.width,
        page.height,
        page.margin_top,
        page.margin_right,
        page.margin_bottom,
        page.margin_left
    ));
    out.push_str("</w:sectPr>");
}

fn styles_xml() -> String {
    let mut out = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<w:styles xmlns:w=\"{W_NS}\">\
         <w:docDefaults><w:rPrDefault><w:rPr>\
         <w:rFonts w:ascii=\"Times New Roman\" w:hAnsi=\"Times New Roman\" w:cs=\"Times New Roman\"/>\
         <w:sz w:val=\"26\"/><w:szCs w:val=\"26\"/></w:rPr></w:rPrDefault></w:docDefaults>\
         <w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/></w:style>"
    );
    for level in 1..=6u8 {
        let size = match level {
            1 => 32,
            2 => 28,
            3 => 26,
            _ => 24,
        };
        out.push_str(&format!(
            "<w:style w:type=\"paragraph\" w:styleId=\"Heading{level}\">\
             <w:name w:val=\"heading {level}\"/><w:basedOn w:val=\"Normal\"/>\
             <w:next w:val=\"Normal\"/><w:qFormat/>\
             <w:pPr><w:keepNext/><w:outlineLvl w:val=\"{}\"/></w:pPr>\
             <w:rPr><w:b/><w:sz w:val=\"{size}\"/></w:rPr></w:style>",
            level - 1
        ));
    }
    out.push_str("</w:styles>");
    out
}

fn numbering_xml() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<w:numbering xmlns:w=\"{W_NS}\">\
         <w:abstractNum w:abstractNumId=\"0\"><w:lvl w:ilvl=\"0\"><w:start w:val=\"1\"/>\
         <w:numFmt w:val=\"bullet\"/><w:lvlText w:val=\"\u{2022}\"/><w:lvlJc w:val=\"left\"/>\
         <w:pPr><w:ind w:left=\"720\" w:hanging=\"360\"/></w:pPr></w:lvl></w:abstractNum>\
         <w:abstractNum w:abstractNumId=\"1\"><w:lvl w:ilvl=\"0\"><w:start w:val=\"1\"/>\
         <w:numFmt w:val=\"decimal\"/><w:lvlText w:val=\"%1.\"/><w:lvlJc w:val=\"left\"/>\
         <w:pPr><w:ind w:left=\"720\" w:hanging=\"360\"/></w:pPr></w:lvl></w:abstractNum>\
         <w:num w:numId=\"{BULLET_NUM_ID}\"><w:abstractNumId w:val=\"0\"/></w:num>\
         <w:num w:numId=\"{DECIMAL_NUM_ID}\"><w:abstractNumId w:val=\"1\"/></w:num>\
         </w:numbering>"
    )
}

fn core_properties_xml(title: &str) -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <cp:coreProperties \
         xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
         xmlns:dcterms=\"http://purl.org/dc/terms/\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
         <dc:title>{}</dc:title>\
         <dcterms:created xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:created>\
         <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:modified>\
         </cp:coreProperties>",
        escape(title)
    )
}

fn package_rels_xml() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<Relationships xmlns=\"{REL_NS}\">\
         <Relationship Id=\"rId1\" Type=\"{REL_BASE}/officeDocument\" Target=\"{MAIN_DOCUMENT}\"/>\
         <Relationship Id=\"rId2\" \
         Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" \
         Target=\"docProps/core.xml\"/></Relationships>"
    )
}

fn content_types_xml(has_header: bool, has_footer: bool) -> String {
    const WML: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml";
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>",
    );
    out.push_str(&format!(
        "<Override PartName=\"/{MAIN_DOCUMENT}\" ContentType=\"{WML}.document.main+xml\"/>\
         <Override PartName=\"/word/styles.xml\" ContentType=\"{WML}.styles+xml\"/>\
         <Override PartName=\"/word/numbering.xml\" ContentType=\"{WML}.numbering+xml\"/>\
         <Override PartName=\"/docProps/core.xml\" \
         ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>"
    ));
    if has_header {
        out.push_str(&format!(
            "<Override PartName=\"/word/header1.xml\" ContentType=\"{WML}.header+xml\"/>"
        ));
    }
    if has_footer {
        out.push_str(&format!(
            "<Override PartName=\"/word/footer1.xml\" ContentType=\"{WML}.footer+xml\"/>"
        ));
    }
    out.push_str("</Types>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_properties_order() {
        let style = TextStyle {
            bold: true,
            underline: true,
            font_family: Some("Arial".to_string()),
            font_size: Some(14),
            color: Some("#c00000".to_string()),
            highlight: Some("#ffff00".to_string()),
            ..TextStyle::default()
        };
        assert_eq!(
            run_properties(&style),
            "<w:rFonts w:ascii=\"Arial\" w:hAnsi=\"Arial\" w:cs=\"Arial\"/><w:b/>\
             <w:color w:val=\"C00000\"/><w:sz w:val=\"28\"/><w:szCs w:val=\"28\"/>\
             <w:u w:val=\"single\"/><w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"FFFF00\"/>"
        );
    }

    #[test]
    fn test_tabs_become_tab_elements() {
        let mut out = String::new();
        write_run(&TextRun::plain("a\tb"), &mut out);
        assert_eq!(
            out,
            "<w:r><w:t xml:space=\"preserve\">a</w:t><w:tab/><w:t xml:space=\"preserve\">b</w:t></w:r>"
        );
    }

    #[test]
    fn test_external_link_gets_relationship() {
        let mut rels = PartRels::default();
        let mut out = String::new();
        let content = vec![InlineContent::Link {
            link: Link::new("https://luatvietnam.vn/?a=1&b=2"),
            content: vec![InlineContent::Text(TextRun::plain("luật"))],
        }];
        write_inlines(&content, &mut out, &mut rels);
        assert!(out.starts_with("<w:hyperlink r:id=\"rId1\" w:history=\"1\">"));
        assert!(
            rels.to_xml()
                .contains("Target=\"https://luatvietnam.vn/?a=1&amp;b=2\" TargetMode=\"External\"")
        );
    }
}
