// HTML templates in, standalone HTML out.

use quick_xml::escape::escape;

use super::{Decoder, Encoder, ExportEncodeError, ExportFormat, ImportDecodeError, SourceKind};
use crate::richtext::markup::{document_to_markup, markup_to_document};
use crate::richtext::structured_document::StructuredDocument;

const BASE_STYLE: &str = "body{font-family:'Times New Roman',serif;font-size:13pt;line-height:1.5;\
margin:0 auto;max-width:48em;padding:2em}\
article.page{display:block}p{margin:0 0 .5em}";

/// Loads a static HTML template as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupDecoder;

impl Decoder for MarkupDecoder {
    fn kind(&self) -> SourceKind {
        SourceKind::Markup
    }

    fn decode(&self, bytes: &[u8]) -> Result<StructuredDocument, ImportDecodeError> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        Ok(markup_to_document(text)?)
    }
}

/// Writes the current content as a standalone HTML page
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEncoder;

impl Encoder for HtmlEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn encode(&self, doc: &StructuredDocument, title: &str) -> Result<Vec<u8>, ExportEncodeError> {
        let page = standalone_html(title, &document_to_markup(doc), "", None);
        Ok(page.into_bytes())
    }
}

/// Wrap body markup in a complete HTML page
pub fn standalone_html(title: &str, body: &str, extra_style: &str, onload: Option<&str>) -> String {
    let mut out = String::with_capacity(body.len() + 512);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\"/>\n<title>");
    out.push_str(&escape(title));
    out.push_str("</title>\n<style>");
    out.push_str(BASE_STYLE);
    out.push_str(extra_style);
    out.push_str("</style>\n</head>\n<body");
    if let Some(script) = onload {
        out.push_str(" onload=\"");
        out.push_str(&escape(script));
        out.push('"');
    }
    out.push_str(">\n");
    out.push_str(body);
    out.push_str("\n</body>\n</html>\n");
    out
}
