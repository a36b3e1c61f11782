// Markup Converter
// Converts between StructuredDocument and the XHTML-like snapshot markup.
// Snapshots produced here parse back to an equal document; foreign HTML
// (static templates, pasted content) is read on a best-effort basis.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use super::structured_document::*;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkupError {
    #[error("malformed markup: {0}")]
    Malformed(String),
}

/// Convert a StructuredDocument to snapshot markup
pub fn document_to_markup(doc: &StructuredDocument) -> String {
    let mut out = String::new();

    if let Some(page) = &doc.page {
        out.push_str(&format!(
            "<article class=\"page\" data-page-width=\"{}\" data-page-height=\"{}\" \
             data-margin-top=\"{}\" data-margin-right=\"{}\" data-margin-bottom=\"{}\" \
             data-margin-left=\"{}\">",
            page.width,
            page.height,
            page.margin_top,
            page.margin_right,
            page.margin_bottom,
            page.margin_left
        ));
    }

    if !doc.header.is_empty() {
        out.push_str("<header>");
        blocks_to_markup(&doc.header, &mut out);
        out.push_str("</header>");
    }

    blocks_to_markup(doc.blocks(), &mut out);

    if !doc.footer.is_empty() {
        out.push_str("<footer>");
        blocks_to_markup(&doc.footer, &mut out);
        out.push_str("</footer>");
    }

    if doc.page.is_some() {
        out.push_str("</article>");
    }

    out
}

fn blocks_to_markup(blocks: &[Block], out: &mut String) {
    let mut open_list: Option<bool> = None;

    for block in blocks {
        if let BlockType::ListItem { ordered } = block.block_type {
            if open_list != Some(ordered) {
                close_list(open_list, out);
                out.push_str(if ordered { "<ol>" } else { "<ul>" });
                open_list = Some(ordered);
            }
            out.push_str("<li");
            push_alignment(block.alignment, out);
            out.push('>');
            inline_to_markup(&block.content, out);
            out.push_str("</li>");
            continue;
        }

        close_list(open_list.take(), out);
        let tag = match block.block_type {
            BlockType::Heading { level } => format!("h{}", level.clamp(1, 6)),
            _ => "p".to_string(),
        };
        out.push('<');
        out.push_str(&tag);
        push_alignment(block.alignment, out);
        out.push('>');
        inline_to_markup(&block.content, out);
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }

    close_list(open_list, out);
}

fn close_list(open_list: Option<bool>, out: &mut String) {
    match open_list {
        Some(true) => out.push_str("</ol>"),
        Some(false) => out.push_str("</ul>"),
        None => {}
    }
}

fn push_alignment(alignment: Alignment, out: &mut String) {
    if alignment != Alignment::Left {
        out.push_str(" style=\"text-align:");
        out.push_str(alignment.as_css());
        out.push('"');
    }
}

/// Convert inline content to markup
fn inline_to_markup(content: &[InlineContent], out: &mut String) {
    for item in content {
        match item {
            InlineContent::Text(run) => run_to_markup(run, out),
            InlineContent::Link { link, content } => {
                out.push_str("<a href=\"");
                out.push_str(&escape(link.destination.as_str()));
                out.push('"');
                if let Some(title) = &link.title {
                    out.push_str(" title=\"");
                    out.push_str(&escape(title.as_str()));
                    out.push('"');
                }
                out.push('>');
                inline_to_markup(content, out);
                out.push_str("</a>");
            }
            InlineContent::HardBreak => out.push_str("<br/>"),
            InlineContent::Image(image) => {
                out.push_str("<img src=\"");
                out.push_str(&escape(image.src.as_str()));
                out.push('"');
                if let Some(alt) = &image.alt {
                    out.push_str(" alt=\"");
                    out.push_str(&escape(alt.as_str()));
                    out.push('"');
                }
                if let Some(width) = image.width {
                    out.push_str(&format!(" width=\"{}\"", width));
                }
                if let Some(height) = image.height {
                    out.push_str(&format!(" height=\"{}\"", height));
                }
                out.push_str("/>");
            }
        }
    }
}

fn run_to_markup(run: &TextRun, out: &mut String) {
    let style = &run.style;
    let mut closers: Vec<&str> = Vec::new();

    // Outermost first
    if style.bold {
        out.push_str("<strong>");
        closers.push("</strong>");
    }
    if style.italic {
        out.push_str("<em>");
        closers.push("</em>");
    }
    if style.underline {
        out.push_str("<u>");
        closers.push("</u>");
    }
    if style.strikethrough {
        out.push_str("<s>");
        closers.push("</s>");
    }

    let css = span_css(style);
    if !css.is_empty() {
        out.push_str("<span style=\"");
        out.push_str(&escape(css.as_str()));
        out.push_str("\">");
        closers.push("</span>");
    }

    out.push_str(&escape(run.text.as_str()));

    for closer in closers.iter().rev() {
        out.push_str(closer);
    }
}

fn span_css(style: &TextStyle) -> String {
    let mut decls = Vec::new();
    if let Some(family) = &style.font_family {
        decls.push(format!("font-family:{}", family));
    }
    if let Some(size) = style.font_size {
        decls.push(format!("font-size:{}pt", size));
    }
    if let Some(color) = &style.color {
        decls.push(format!("color:{}", color));
    }
    if let Some(highlight) = &style.highlight {
        decls.push(format!("background-color:{}", highlight));
    }
    decls.join(";")
}

/// Visible body text: blocks joined by newlines, images contribute nothing
pub fn visible_text(doc: &StructuredDocument) -> String {
    doc.to_plain_text()
}

/// Visible text of a snapshot
pub fn markup_to_plain_text(markup: &str) -> Result<String, MarkupError> {
    Ok(visible_text(&markup_to_document(markup)?))
}

/// Parse snapshot markup (or foreign HTML) into a StructuredDocument
pub fn markup_to_document(markup: &str) -> Result<StructuredDocument, MarkupError> {
    let mut builder = MarkupBuilder::new();
    let mut reader = Reader::from_str(markup);
    reader.config_mut().check_end_names = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => builder.open(&e, false),
            Ok(Event::Empty(e)) => builder.open(&e, true),
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                builder.close(&name);
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape_with(resolve_html_entity) {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                builder.text(&text);
            }
            Ok(Event::CData(c)) => builder.text(&String::from_utf8_lossy(&c)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(MarkupError::Malformed(format!(
                    "{err} (at byte {})",
                    reader.buffer_position()
                )));
            }
        }
    }

    Ok(builder.finish())
}

/// Named entities that show up in browser-produced HTML
fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some("\u{a0}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "hellip" => Some("\u{2026}"),
        "copy" => Some("\u{a9}"),
        "reg" => Some("\u{ae}"),
        "laquo" => Some("\u{ab}"),
        "raquo" => Some("\u{bb}"),
        "ldquo" => Some("\u{201c}"),
        "rdquo" => Some("\u{201d}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Region {
    Body,
    Header,
    Footer,
}

#[derive(Debug)]
enum FrameKind {
    Block,
    Inline,
    Link,
    List,
    Region(Region),
    Transparent,
}

#[derive(Debug)]
struct Frame {
    tag: String,
    kind: FrameKind,
}

struct MarkupBuilder {
    doc: StructuredDocument,
    region: Region,
    frames: Vec<Frame>,
    styles: Vec<TextStyle>,
    lists: Vec<bool>,
    block: Option<Block>,
    /// Explicit blocks survive even when empty (`<p></p>`)
    block_explicit: bool,
    link: Option<(Link, Vec<InlineContent>)>,
    skip_depth: usize,
}

impl MarkupBuilder {
    fn new() -> Self {
        MarkupBuilder {
            doc: StructuredDocument::new(),
            region: Region::Body,
            frames: Vec::new(),
            styles: vec![TextStyle::default()],
            lists: Vec::new(),
            block: None,
            block_explicit: false,
            link: None,
            skip_depth: 0,
        }
    }

    fn current_style(&self) -> TextStyle {
        self.styles.last().cloned().unwrap_or_default()
    }

    fn open(&mut self, e: &BytesStart, empty: bool) {
        if self.skip_depth > 0 {
            if !empty {
                self.skip_depth += 1;
            }
            return;
        }

        let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
        let attrs = collect_attributes(e);
        let attr = |name: &str| {
            attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        let css = attr("style").map(parse_css).unwrap_or_default();
        let css_value = |name: &str| {
            css.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };

        match tag.as_str() {
            "head" | "style" | "script" | "title" | "template" => {
                if !empty {
                    self.skip_depth = 1;
                }
            }
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "blockquote"
            | "pre" | "td" | "th" => {
                self.flush_block();
                let block_type = match tag.as_str() {
                    "li" => BlockType::ListItem {
                        ordered: self.lists.last().copied().unwrap_or(false),
                    },
                    h if h.starts_with('h') => BlockType::Heading {
                        level: h[1..].parse().unwrap_or(1),
                    },
                    _ => BlockType::Paragraph,
                };
                let alignment = css_value("text-align")
                    .or_else(|| attr("align"))
                    .and_then(Alignment::from_css)
                    .unwrap_or_default();
                self.block = Some(Block::new(0, block_type).with_alignment(alignment));
                self.block_explicit = matches!(
                    tag.as_str(),
                    "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li"
                );
                if empty {
                    self.flush_block();
                } else {
                    self.frames.push(Frame {
                        tag,
                        kind: FrameKind::Block,
                    });
                }
            }
            "ul" | "ol" => {
                if !empty {
                    self.flush_block();
                    self.lists.push(tag == "ol");
                    self.frames.push(Frame {
                        tag,
                        kind: FrameKind::List,
                    });
                }
            }
            "header" | "footer" => {
                if !empty {
                    self.flush_block();
                    let previous = self.region;
                    self.region = if tag == "header" {
                        Region::Header
                    } else {
                        Region::Footer
                    };
                    self.frames.push(Frame {
                        tag,
                        kind: FrameKind::Region(previous),
                    });
                }
            }
            "br" => self.push_inline(InlineContent::HardBreak),
            "img" => {
                if let Some(src) = attr("src") {
                    self.push_inline(InlineContent::Image(InlineImage {
                        src: src.to_string(),
                        alt: attr("alt").map(str::to_string),
                        width: attr("width").and_then(|w| w.trim_end_matches("px").parse().ok()),
                        height: attr("height")
                            .and_then(|h| h.trim_end_matches("px").parse().ok()),
                    }));
                }
            }
            "a" => {
                if !empty {
                    self.finish_link();
                    if let Some(href) = attr("href") {
                        let mut link = Link::new(href);
                        link.title = attr("title").map(str::to_string);
                        self.link = Some((link, Vec::new()));
                        self.frames.push(Frame {
                            tag,
                            kind: FrameKind::Link,
                        });
                    } else {
                        self.frames.push(Frame {
                            tag,
                            kind: FrameKind::Transparent,
                        });
                    }
                }
            }
            "strong" | "b" | "em" | "i" | "u" | "ins" | "s" | "strike" | "del" | "span"
            | "font" | "mark" => {
                if empty {
                    return;
                }
                let mut style = self.current_style();
                match tag.as_str() {
                    "strong" | "b" => style.bold = true,
                    "em" | "i" => style.italic = true,
                    "u" | "ins" => style.underline = true,
                    "s" | "strike" | "del" => style.strikethrough = true,
                    "mark" => style.highlight = Some("#ffff00".to_string()),
                    "font" => {
                        if let Some(face) = attr("face") {
                            style.font_family = Some(face.to_string());
                        }
                        if let Some(size) = attr("size").and_then(|s| s.parse::<u8>().ok()) {
                            style.font_size = Some(legacy_font_size_to_points(size));
                        }
                        if let Some(color) = attr("color") {
                            style.color = Some(color.to_ascii_lowercase());
                        }
                    }
                    _ => {}
                }
                apply_css(&css, &mut style);
                self.styles.push(style);
                self.frames.push(Frame {
                    tag,
                    kind: FrameKind::Inline,
                });
            }
            "article" | "section" | "main" | "body" | "html" => {
                if attr("data-page-width").is_some() {
                    let number = |name: &str, default: u32| {
                        attr(name).and_then(|v| v.parse().ok()).unwrap_or(default)
                    };
                    let defaults = PageGeometry::default();
                    self.doc.page = Some(PageGeometry {
                        width: number("data-page-width", defaults.width),
                        height: number("data-page-height", defaults.height),
                        margin_top: number("data-margin-top", defaults.margin_top),
                        margin_right: number("data-margin-right", defaults.margin_right),
                        margin_bottom: number("data-margin-bottom", defaults.margin_bottom),
                        margin_left: number("data-margin-left", defaults.margin_left),
                    });
                }
                if !empty {
                    self.frames.push(Frame {
                        tag,
                        kind: FrameKind::Transparent,
                    });
                }
            }
            _ => {
                if !empty {
                    self.frames.push(Frame {
                        tag,
                        kind: FrameKind::Transparent,
                    });
                }
            }
        }
    }

    fn close(&mut self, tag: &str) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }

        // Unbalanced end tags are ignored; unclosed children are closed implicitly
        let Some(index) = self.frames.iter().rposition(|f| f.tag == tag) else {
            return;
        };
        while self.frames.len() > index {
            if let Some(frame) = self.frames.pop() {
                self.close_frame(frame);
            }
        }
    }

    fn close_frame(&mut self, frame: Frame) {
        match frame.kind {
            FrameKind::Block => self.flush_block(),
            FrameKind::Inline => {
                if self.styles.len() > 1 {
                    self.styles.pop();
                }
            }
            FrameKind::Link => self.finish_link(),
            FrameKind::List => {
                self.flush_block();
                self.lists.pop();
            }
            FrameKind::Region(previous) => {
                self.flush_block();
                self.region = previous;
            }
            FrameKind::Transparent => {}
        }
    }

    fn text(&mut self, raw: &str) {
        if self.skip_depth > 0 {
            return;
        }
        let text = collapse_formatting_whitespace(raw);
        if text.is_empty() || (self.block.is_none() && text.trim().is_empty()) {
            return;
        }
        let style = self.current_style();
        self.push_inline(InlineContent::Text(TextRun::new(text, style)));
    }

    fn push_inline(&mut self, item: InlineContent) {
        if let Some((_, content)) = self.link.as_mut() {
            content.push(item);
            if self.block.is_none() {
                self.block = Some(Block::paragraph(0));
                self.block_explicit = false;
            }
            return;
        }
        let block = self.block.get_or_insert_with(|| Block::paragraph(0));
        block.content.push(item);
    }

    fn finish_link(&mut self) {
        if let Some((link, content)) = self.link.take()
            && !content.is_empty()
        {
            let block = self.block.get_or_insert_with(|| Block::paragraph(0));
            block.content.push(InlineContent::Link { link, content });
        }
    }

    fn flush_block(&mut self) {
        self.finish_link();
        let Some(mut block) = self.block.take() else {
            return;
        };
        block.merge_adjacent_runs();
        if block.content.is_empty() && !self.block_explicit {
            return;
        }
        self.block_explicit = false;
        match self.region {
            Region::Body => self.doc.add_block(block),
            Region::Header => self.doc.header.push(block),
            Region::Footer => self.doc.footer.push(block),
        }
    }

    fn finish(mut self) -> StructuredDocument {
        while let Some(frame) = self.frames.pop() {
            self.close_frame(frame);
        }
        self.flush_block();
        self.doc
    }
}

fn collect_attributes(e: &BytesStart) -> Vec<(String, String)> {
    e.html_attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_ascii_lowercase();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            (key, value)
        })
        .collect()
}

/// Split a CSS declaration list into lowercase-name/value pairs
fn parse_css(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name, value.to_string()))
        })
        .collect()
}

fn apply_css(css: &[(String, String)], style: &mut TextStyle) {
    for (name, value) in css {
        let lower = value.to_ascii_lowercase();
        match name.as_str() {
            "font-weight" => {
                style.bold = lower == "bold"
                    || lower == "bolder"
                    || lower.parse::<u16>().map(|w| w >= 600).unwrap_or(false);
            }
            "font-style" => style.italic = lower == "italic" || lower == "oblique",
            "text-decoration" | "text-decoration-line" => {
                if lower.contains("underline") {
                    style.underline = true;
                }
                if lower.contains("line-through") {
                    style.strikethrough = true;
                }
            }
            "font-family" => {
                let family = value.trim_matches(|c| c == '\'' || c == '"');
                if !family.is_empty() {
                    style.font_family = Some(family.to_string());
                }
            }
            "font-size" => {
                if let Some(points) = css_length_to_points(&lower) {
                    style.font_size = Some(points);
                }
            }
            "color" => style.color = Some(lower),
            "background-color" | "background" => style.highlight = Some(lower),
            _ => {}
        }
    }
}

fn css_length_to_points(value: &str) -> Option<u16> {
    if let Some(pt) = value.strip_suffix("pt") {
        return pt.trim().parse::<f32>().ok().map(|v| v.round() as u16);
    }
    if let Some(px) = value.strip_suffix("px") {
        return px.trim().parse::<f32>().ok().map(|v| (v * 0.75).round() as u16);
    }
    None
}

/// Map the legacy 1..=7 HTML font size scale to points
pub fn legacy_font_size_to_points(size: u8) -> u16 {
    match size.clamp(1, 7) {
        1 => 8,
        2 => 10,
        3 => 12,
        4 => 14,
        5 => 18,
        6 => 24,
        _ => 36,
    }
}

/// Whitespace runs containing a line break are source formatting, not content
fn collapse_formatting_whitespace(text: &str) -> Cow<'_, str> {
    if !text.contains(['\n', '\r']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut pending = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() && ch != '\u{a0}' {
            pending.push(ch);
            continue;
        }
        flush_whitespace(&mut pending, &mut out);
        out.push(ch);
    }
    flush_whitespace(&mut pending, &mut out);
    Cow::Owned(out)
}

fn flush_whitespace(pending: &mut String, out: &mut String) {
    if pending.is_empty() {
        return;
    }
    if pending.contains(['\n', '\r']) {
        out.push(' ');
    } else {
        out.push_str(pending);
    }
    pending.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_paragraph_markup() {
        let doc = StructuredDocument::with_paragraph("A");
        assert_eq!(document_to_markup(&doc), "<p>A</p>");
    }

    #[test]
    fn test_styled_runs_markup() {
        let mut doc = StructuredDocument::new();
        let style = TextStyle {
            bold: true,
            color: Some("#ff0000".to_string()),
            ..Default::default()
        };
        doc.add_block(
            Block::paragraph(0)
                .with_alignment(Alignment::Center)
                .with_plain_text("Hợp đồng ")
                .with_text("lao động", style),
        );
        insta::assert_snapshot!(
            document_to_markup(&doc),
            @r#"<p style="text-align:center">Hợp đồng <strong><span style="color:#ff0000">lao động</span></strong></p>"#
        );
    }

    #[test]
    fn test_lists_are_grouped() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::list_item(0, true).with_plain_text("one"));
        doc.add_block(Block::list_item(0, true).with_plain_text("two"));
        doc.add_block(Block::list_item(0, false).with_plain_text("dot"));
        doc.add_block(Block::paragraph(0).with_plain_text("end"));
        assert_eq!(
            document_to_markup(&doc),
            "<ol><li>one</li><li>two</li></ol><ul><li>dot</li></ul><p>end</p>"
        );
    }

    #[test]
    fn test_markup_roundtrip_is_stable() {
        let markup = "<article class=\"page\" data-page-width=\"11906\" data-page-height=\"16838\" \
            data-margin-top=\"1134\" data-margin-right=\"850\" data-margin-bottom=\"1134\" \
            data-margin-left=\"1701\"><header><p style=\"text-align:right\">Mẫu 1.9</p></header>\
            <h1>BIÊN BẢN</h1><p>Ngày <em><u>..</u></em> tháng<br/>năm \
            <a href=\"https://example.com?a=1&amp;b=2\">link</a></p><p></p>\
            <footer><p>trang 1</p></footer></article>";
        let doc = markup_to_document(markup).unwrap();
        assert_eq!(doc.header.len(), 1);
        assert_eq!(doc.footer.len(), 1);
        assert_eq!(doc.block_count(), 3);
        assert_eq!(doc.page.unwrap().width, 11906);
        assert_eq!(document_to_markup(&doc), markup);
    }

    #[test]
    fn test_foreign_html_best_effort() {
        let html = "<html><head><title>x</title><style>p{}</style></head><body>\n  \
            <p align=\"center\"><b>Điều 1.</b>&nbsp;Phạm vi</p>\n  \
            <div><span style=\"font-weight: bold; font-size: 14pt\">Tiêu đề</span></div>\n  \
            <p>line<br>next</p></body></html>";
        let doc = markup_to_document(html).unwrap();
        assert_eq!(doc.block_count(), 3);
        assert_eq!(doc.blocks()[0].alignment, Alignment::Center);
        assert_eq!(doc.blocks()[0].to_plain_text(), "Điều 1.\u{a0}Phạm vi");
        match &doc.blocks()[1].content[0] {
            InlineContent::Text(run) => {
                assert!(run.style.bold);
                assert_eq!(run.style.font_size, Some(14));
            }
            other => panic!("unexpected inline {:?}", other),
        }
        assert_eq!(doc.blocks()[2].to_plain_text(), "line\nnext");
    }

    #[test]
    fn test_empty_markup_is_empty_document() {
        let doc = markup_to_document("").unwrap();
        assert!(doc.is_empty());
        assert_eq!(document_to_markup(&doc), "");
    }

    #[test]
    fn test_bare_text_becomes_paragraph() {
        let doc = markup_to_document("just text").unwrap();
        assert_eq!(document_to_markup(&doc), "<p>just text</p>");
    }

    #[test]
    fn test_plain_text_skips_images() {
        let text = markup_to_plain_text(
            "<p>a<img src=\"data:image/png;base64,AAAA\"/>b</p><p>c</p>",
        )
        .unwrap();
        assert_eq!(text, "ab\nc");
    }

    #[test]
    fn test_spaces_inside_text_are_preserved() {
        let doc = markup_to_document("<p>a  b</p>").unwrap();
        assert_eq!(doc.blocks()[0].to_plain_text(), "a  b");
    }
}
