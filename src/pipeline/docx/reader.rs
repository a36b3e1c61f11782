// WordprocessingML reader.
// Best-effort rendering of a .docx package into the document model: enough
// structure for display and editing, not a full object model.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

use super::{EMU_PER_PIXEL, MAIN_DOCUMENT};
use crate::pipeline::ImportDecodeError;
use crate::richtext::structured_document::*;

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Decode a .docx package
pub fn read_docx(bytes: &[u8]) -> Result<StructuredDocument, ImportDecodeError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| ImportDecodeError::Archive(err.to_string()))?;

    let main_path = main_document_path(&mut archive)?;
    let headings = match read_part(&mut archive, "word/styles.xml")? {
        Some(xml) => parse_heading_styles(&xml)?,
        None => HashMap::new(),
    };
    let numbering = match read_part(&mut archive, "word/numbering.xml")? {
        Some(xml) => parse_numbering(&xml)?,
        None => Numbering::default(),
    };
    let context = PartContext { headings, numbering };

    let main = parse_part(&mut archive, &main_path, &context)?;
    let mut doc = StructuredDocument::new();
    for block in main.blocks {
        doc.add_block(block);
    }
    doc.page = main.page;

    for (target, is_header) in [(main.header_part, true), (main.footer_part, false)] {
        let Some(target) = target else { continue };
        match parse_part(&mut archive, &target, &context) {
            Ok(part) if is_header => doc.header = part.blocks,
            Ok(part) => doc.footer = part.blocks,
            Err(err) => {
                tracing::debug!(part = %target, error = %err, "skipping header/footer part")
            }
        }
    }

    doc.ensure_block();
    Ok(doc)
}

fn read_part(archive: &mut Archive<'_>, path: &str) -> Result<Option<String>, ImportDecodeError> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(ImportDecodeError::Archive(format!("{path}: {err}"))),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|err| ImportDecodeError::Archive(format!("{path}: {err}")))?;
    Ok(Some(xml))
}

fn read_binary_part(archive: &mut Archive<'_>, path: &str) -> Option<Vec<u8>> {
    let mut file = archive.by_name(path).ok()?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).ok()?;
    Some(bytes)
}

fn xml_error(part: &str, err: impl std::fmt::Display) -> ImportDecodeError {
    ImportDecodeError::Xml {
        part: part.to_string(),
        message: err.to_string(),
    }
}

/// Attribute value by local name (`w:val` → `val`)
fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// `<w:b/>`, `<w:b w:val="1"/>` and friends
fn on_off(e: &BytesStart<'_>) -> bool {
    match attr(e, b"val") {
        Some(val) => !matches!(val.as_str(), "0" | "false" | "off" | "none"),
        None => true,
    }
}

fn part_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn rels_path_for(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{path}.rels"),
    }
}

/// Resolve a relationship target against the directory of its source part
fn resolve_part_path(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

#[derive(Debug, Clone)]
struct Relationship {
    target: String,
    rel_type: String,
    external: bool,
}

fn parse_relationships(
    xml: &str,
    base_dir: &str,
) -> Result<HashMap<String, Relationship>, ImportDecodeError> {
    let mut rels = HashMap::new();
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) else {
                    continue;
                };
                let external = attr(&e, b"TargetMode").is_some_and(|mode| mode == "External");
                let target = if external {
                    target
                } else {
                    resolve_part_path(base_dir, &target)
                };
                rels.insert(
                    id,
                    Relationship {
                        target,
                        rel_type: attr(&e, b"Type").unwrap_or_default(),
                        external,
                    },
                );
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(xml_error("relationships", err)),
        }
    }
    Ok(rels)
}

fn main_document_path(archive: &mut Archive<'_>) -> Result<String, ImportDecodeError> {
    if let Some(xml) = read_part(archive, "_rels/.rels")? {
        let rels = parse_relationships(&xml, "")?;
        if let Some(rel) = rels.values().find(|r| r.rel_type.ends_with("/officeDocument")) {
            return Ok(rel.target.clone());
        }
    }
    Ok(MAIN_DOCUMENT.to_string())
}

/// Style id → heading level
fn parse_heading_styles(xml: &str) -> Result<HashMap<String, u8>, ImportDecodeError> {
    let mut headings = HashMap::new();
    let mut current: Option<String> = None;
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"style" => current = attr(&e, b"styleId"),
                b"name" => {
                    if let Some(id) = &current
                        && let Some(level) =
                            attr(&e, b"val").and_then(|name| heading_level_from_name(&name))
                    {
                        headings.insert(id.clone(), level);
                    }
                }
                b"outlineLvl" => {
                    if let Some(id) = &current
                        && let Some(level) = attr(&e, b"val").and_then(|v| v.parse::<u8>().ok())
                        && level < 6
                    {
                        headings.entry(id.clone()).or_insert(level + 1);
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"style" => current = None,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(xml_error("word/styles.xml", err)),
        }
    }
    Ok(headings)
}

fn heading_level_from_name(name: &str) -> Option<u8> {
    let name = name.to_ascii_lowercase();
    if name == "title" {
        return Some(1);
    }
    name.strip_prefix("heading ")
        .and_then(|level| level.trim().parse::<u8>().ok())
        .filter(|level| (1..=6).contains(level))
}

#[derive(Debug, Default)]
struct Numbering {
    /// (abstractNumId, level) → ordered
    levels: HashMap<(String, u8), bool>,
    /// numId → abstractNumId
    instances: HashMap<String, String>,
}

impl Numbering {
    fn is_ordered(&self, num_id: &str, level: u8) -> bool {
        self.instances
            .get(num_id)
            .and_then(|abstract_id| self.levels.get(&(abstract_id.clone(), level)))
            .copied()
            .unwrap_or(false)
    }
}

fn parse_numbering(xml: &str) -> Result<Numbering, ImportDecodeError> {
    let mut numbering = Numbering::default();
    let mut abstract_id: Option<String> = None;
    let mut level: Option<u8> = None;
    let mut num_id: Option<String> = None;
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"abstractNum" => abstract_id = attr(&e, b"abstractNumId"),
                b"lvl" => level = attr(&e, b"ilvl").and_then(|v| v.parse().ok()),
                b"numFmt" => {
                    if let (Some(id), Some(lvl)) = (&abstract_id, level) {
                        let format = attr(&e, b"val").unwrap_or_default();
                        let ordered = !matches!(format.as_str(), "bullet" | "none");
                        numbering.levels.insert((id.clone(), lvl), ordered);
                    }
                }
                b"num" => num_id = attr(&e, b"numId"),
                b"abstractNumId" => {
                    if let (Some(num), Some(target)) = (&num_id, attr(&e, b"val")) {
                        numbering.instances.insert(num.clone(), target);
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"abstractNum" => abstract_id = None,
                b"lvl" => level = None,
                b"num" => num_id = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(xml_error("word/numbering.xml", err)),
        }
    }
    Ok(numbering)
}

fn image_mime(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "emf" => "image/emf",
        "wmf" => "image/wmf",
        _ => "application/octet-stream",
    }
}

/// Relationship id → `data:` URI for every embedded image of a part
fn load_images(
    archive: &mut Archive<'_>,
    rels: &HashMap<String, Relationship>,
) -> HashMap<String, String> {
    let mut images = HashMap::new();
    for (id, rel) in rels {
        if rel.external || !rel.rel_type.ends_with("/image") {
            continue;
        }
        match read_binary_part(archive, &rel.target) {
            Some(bytes) => {
                let uri = format!(
                    "data:{};base64,{}",
                    image_mime(&rel.target),
                    STANDARD.encode(bytes)
                );
                images.insert(id.clone(), uri);
            }
            None => tracing::debug!(part = %rel.target, "embedded image is missing"),
        }
    }
    images
}

struct PartContext {
    headings: HashMap<String, u8>,
    numbering: Numbering,
}

struct ParsedPart {
    blocks: Vec<Block>,
    page: Option<PageGeometry>,
    header_part: Option<String>,
    footer_part: Option<String>,
}

fn parse_part(
    archive: &mut Archive<'_>,
    path: &str,
    context: &PartContext,
) -> Result<ParsedPart, ImportDecodeError> {
    let xml = read_part(archive, path)?
        .ok_or_else(|| ImportDecodeError::MissingPart(path.to_string()))?;
    let rels = match read_part(archive, &rels_path_for(path))? {
        Some(rels_xml) => parse_relationships(&rels_xml, part_dir(path))?,
        None => HashMap::new(),
    };
    let images = load_images(archive, &rels);

    let mut parser = PartParser::new(context, &rels, &images);
    let mut reader = Reader::from_str(&xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => parser.open(&e),
            Ok(Event::Empty(e)) => {
                parser.open(&e);
                parser.close(e.local_name().as_ref());
            }
            Ok(Event::End(e)) => parser.close(e.local_name().as_ref()),
            Ok(Event::Text(t)) if parser.wants_text() => {
                let text = t.unescape().map_err(|err| xml_error(path, err))?;
                parser.text(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(xml_error(path, err)),
        }
    }
    Ok(parser.finish())
}

#[derive(Default)]
struct ParagraphState {
    style_id: Option<String>,
    alignment: Alignment,
    num_id: Option<String>,
    level: u8,
    content: Vec<InlineContent>,
    link: Option<(Link, Vec<InlineContent>)>,
}

#[derive(Default)]
struct DrawingState {
    embed: Option<String>,
    alt: Option<String>,
    cx: Option<u64>,
    cy: Option<u64>,
}

/// Streaming state machine over one WordprocessingML part
struct PartParser<'a> {
    context: &'a PartContext,
    rels: &'a HashMap<String, Relationship>,
    images: &'a HashMap<String, String>,
    blocks: Vec<Block>,
    /// Open paragraphs; text boxes nest paragraphs inside runs
    paragraphs: Vec<ParagraphState>,
    run: Option<TextStyle>,
    in_paragraph_props: bool,
    in_run_props: bool,
    in_text: bool,
    in_section: bool,
    drawing_depth: usize,
    drawing: Option<DrawingState>,
    page: Option<PageGeometry>,
    header_part: Option<String>,
    footer_part: Option<String>,
}

impl<'a> PartParser<'a> {
    fn new(
        context: &'a PartContext,
        rels: &'a HashMap<String, Relationship>,
        images: &'a HashMap<String, String>,
    ) -> Self {
        PartParser {
            context,
            rels,
            images,
            blocks: Vec::new(),
            paragraphs: Vec::new(),
            run: None,
            in_paragraph_props: false,
            in_run_props: false,
            in_text: false,
            in_section: false,
            drawing_depth: 0,
            drawing: None,
            page: None,
            header_part: None,
            footer_part: None,
        }
    }

    fn wants_text(&self) -> bool {
        self.in_text
    }

    fn open(&mut self, e: &BytesStart<'_>) {
        let name = e.local_name();
        let name = name.as_ref();

        if self.drawing_depth > 0 {
            self.open_in_drawing(name, e);
            return;
        }
        if self.in_section {
            self.open_in_section(name, e);
            return;
        }

        match name {
            b"p" => self.paragraphs.push(ParagraphState::default()),
            b"pPr" if self.run.is_none() => self.in_paragraph_props = true,
            b"sectPr" => self.in_section = true,
            b"r" if !self.paragraphs.is_empty() => self.run = Some(TextStyle::default()),
            b"rPr" if self.run.is_some() => self.in_run_props = true,
            b"t" if self.run.is_some() => self.in_text = true,
            b"tab" if self.run.is_some() && !self.in_paragraph_props => {
                self.push_text("\t");
            }
            b"br" | b"cr" if self.run.is_some() => {
                let kind = attr(e, b"type");
                if !matches!(kind.as_deref(), Some("page") | Some("column")) {
                    self.push_inline(InlineContent::HardBreak);
                }
            }
            b"hyperlink" => self.open_link(e),
            b"drawing" => {
                self.drawing_depth = 1;
                self.drawing = Some(DrawingState::default());
            }
            _ if self.in_run_props => self.run_property(name, e),
            _ if self.in_paragraph_props => self.paragraph_property(name, e),
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        if self.drawing_depth > 0 {
            if name == b"drawing" {
                self.drawing_depth = 0;
                self.finish_drawing();
            }
            return;
        }

        match name {
            b"p" => self.finish_paragraph(),
            b"pPr" => self.in_paragraph_props = false,
            b"sectPr" => self.in_section = false,
            b"r" => self.run = None,
            b"rPr" => self.in_run_props = false,
            b"t" => self.in_text = false,
            b"hyperlink" => self.close_link(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        self.push_text(text);
    }

    fn paragraph_property(&mut self, name: &[u8], e: &BytesStart<'_>) {
        let Some(paragraph) = self.paragraphs.last_mut() else {
            return;
        };
        match name {
            b"pStyle" => paragraph.style_id = attr(e, b"val"),
            b"jc" => {
                paragraph.alignment = match attr(e, b"val").as_deref() {
                    Some("center") => Alignment::Center,
                    Some("right") | Some("end") => Alignment::Right,
                    Some("both") | Some("distribute") => Alignment::Justify,
                    _ => Alignment::Left,
                }
            }
            b"numId" => paragraph.num_id = attr(e, b"val"),
            b"ilvl" => paragraph.level = attr(e, b"val").and_then(|v| v.parse().ok()).unwrap_or(0),
            _ => {}
        }
    }

    fn run_property(&mut self, name: &[u8], e: &BytesStart<'_>) {
        let Some(style) = self.run.as_mut() else {
            return;
        };
        match name {
            b"b" => style.bold = on_off(e),
            b"i" => style.italic = on_off(e),
            b"strike" | b"dstrike" => style.strikethrough = on_off(e),
            b"u" => style.underline = attr(e, b"val").is_none_or(|val| val != "none"),
            b"rFonts" => {
                if let Some(font) = attr(e, b"ascii")
                    .or_else(|| attr(e, b"hAnsi"))
                    .or_else(|| attr(e, b"cs"))
                {
                    style.font_family = Some(font);
                }
            }
            b"sz" => {
                if let Some(half_points) = attr(e, b"val").and_then(|v| v.parse::<u16>().ok()) {
                    style.font_size = Some(half_points / 2);
                }
            }
            b"color" => style.color = attr(e, b"val").and_then(|v| hex_color(&v)),
            b"highlight" => style.highlight = attr(e, b"val").and_then(|v| highlight_color(&v)),
            b"shd" => {
                if let Some(fill) = attr(e, b"fill").and_then(|v| hex_color(&v)) {
                    style.highlight = Some(fill);
                }
            }
            _ => {}
        }
    }

    fn open_in_section(&mut self, name: &[u8], e: &BytesStart<'_>) {
        let number = |key: &[u8]| attr(e, key).and_then(|v| v.parse::<u32>().ok());
        match name {
            b"pgSz" => {
                let page = self.page.get_or_insert_with(PageGeometry::default);
                if let Some(width) = number(b"w") {
                    page.width = width;
                }
                if let Some(height) = number(b"h") {
                    page.height = height;
                }
            }
            b"pgMar" => {
                let page = self.page.get_or_insert_with(PageGeometry::default);
                if let Some(v) = number(b"top") {
                    page.margin_top = v;
                }
                if let Some(v) = number(b"right") {
                    page.margin_right = v;
                }
                if let Some(v) = number(b"bottom") {
                    page.margin_bottom = v;
                }
                if let Some(v) = number(b"left") {
                    page.margin_left = v;
                }
            }
            b"headerReference" | b"footerReference" => {
                if !matches!(attr(e, b"type").as_deref(), None | Some("default")) {
                    return;
                }
                let target = attr(e, b"id")
                    .and_then(|id| self.rels.get(&id))
                    .filter(|rel| !rel.external)
                    .map(|rel| rel.target.clone());
                if name == b"headerReference" {
                    self.header_part = target.or(self.header_part.take());
                } else {
                    self.footer_part = target.or(self.footer_part.take());
                }
            }
            _ => {}
        }
    }

    fn open_in_drawing(&mut self, name: &[u8], e: &BytesStart<'_>) {
        let Some(drawing) = self.drawing.as_mut() else {
            return;
        };
        match name {
            b"extent" => {
                drawing.cx = attr(e, b"cx").and_then(|v| v.parse().ok());
                drawing.cy = attr(e, b"cy").and_then(|v| v.parse().ok());
            }
            b"docPr" => drawing.alt = attr(e, b"descr").filter(|d| !d.is_empty()),
            b"blip" => drawing.embed = attr(e, b"embed"),
            _ => {}
        }
    }

    fn finish_drawing(&mut self) {
        let Some(drawing) = self.drawing.take() else {
            return;
        };
        let Some(src) = drawing.embed.and_then(|id| self.images.get(&id).cloned()) else {
            return;
        };
        let pixels = |emu: Option<u64>| emu.map(|v| (v / EMU_PER_PIXEL) as u32).filter(|v| *v > 0);
        self.push_inline(InlineContent::Image(InlineImage {
            src,
            alt: drawing.alt,
            width: pixels(drawing.cx),
            height: pixels(drawing.cy),
        }));
    }

    fn open_link(&mut self, e: &BytesStart<'_>) {
        let destination = match (attr(e, b"id"), attr(e, b"anchor")) {
            (Some(id), _) => self.rels.get(&id).map(|rel| rel.target.clone()),
            (None, Some(anchor)) => Some(format!("#{anchor}")),
            _ => None,
        };
        let Some(destination) = destination else {
            return;
        };
        let Some(paragraph) = self.paragraphs.last_mut() else {
            return;
        };
        let link = Link {
            destination,
            title: attr(e, b"tooltip"),
        };
        paragraph.link = Some((link, Vec::new()));
    }

    fn close_link(&mut self) {
        let Some(paragraph) = self.paragraphs.last_mut() else {
            return;
        };
        if let Some((link, content)) = paragraph.link.take()
            && !content.is_empty()
        {
            paragraph.content.push(InlineContent::Link { link, content });
        }
    }

    fn push_text(&mut self, text: &str) {
        let Some(style) = self.run.clone() else {
            return;
        };
        if text.is_empty() {
            return;
        }
        self.push_inline(InlineContent::Text(TextRun::new(text, style)));
    }

    fn push_inline(&mut self, item: InlineContent) {
        let Some(paragraph) = self.paragraphs.last_mut() else {
            return;
        };
        match &mut paragraph.link {
            Some((_, content)) => content.push(item),
            None => paragraph.content.push(item),
        }
    }

    fn finish_paragraph(&mut self) {
        self.close_link();
        let Some(paragraph) = self.paragraphs.pop() else {
            return;
        };
        self.in_paragraph_props = false;

        let block_type = match (&paragraph.num_id, &paragraph.style_id) {
            (Some(num_id), _) if num_id != "0" => BlockType::ListItem {
                ordered: self.context.numbering.is_ordered(num_id, paragraph.level),
            },
            (_, Some(style_id)) => match self.context.headings.get(style_id) {
                Some(level) => BlockType::Heading { level: *level },
                None => BlockType::Paragraph,
            },
            _ => BlockType::Paragraph,
        };

        let mut block = Block::new(0, block_type).with_alignment(paragraph.alignment);
        block.content = paragraph.content;
        block.merge_adjacent_runs();
        self.blocks.push(block);
    }

    fn finish(mut self) -> ParsedPart {
        while !self.paragraphs.is_empty() {
            self.finish_paragraph();
        }
        ParsedPart {
            blocks: self.blocks,
            page: self.page,
            header_part: self.header_part,
            footer_part: self.footer_part,
        }
    }
}

/// `FF0000` → `#ff0000`; `auto` and junk give None
fn hex_color(value: &str) -> Option<String> {
    if value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("#{}", value.to_ascii_lowercase()))
    } else {
        None
    }
}

/// Named highlight colours of WordprocessingML
fn highlight_color(name: &str) -> Option<String> {
    let hex = match name {
        "yellow" => "#ffff00",
        "green" => "#00ff00",
        "cyan" => "#00ffff",
        "magenta" => "#ff00ff",
        "blue" => "#0000ff",
        "red" => "#ff0000",
        "darkBlue" => "#000080",
        "darkCyan" => "#008080",
        "darkGreen" => "#008000",
        "darkMagenta" => "#800080",
        "darkRed" => "#800000",
        "darkYellow" => "#808000",
        "darkGray" => "#808080",
        "lightGray" => "#c0c0c0",
        "black" => "#000000",
        "white" => "#ffffff",
        _ => return None,
    };
    Some(hex.to_string())
}
