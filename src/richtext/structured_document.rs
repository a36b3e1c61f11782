// Structured Document Model
// The in-memory form of the editable surface. Markup is only the snapshot
// format; the container codecs read and write this model directly.

use std::cmp::min;
use std::fmt;

/// Unique identifier for document elements
pub type ElementId = usize;

/// Inline text styling
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub font_family: Option<String>,
    /// Font size in points
    pub font_size: Option<u16>,
    /// Foreground colour as `#rrggbb`
    pub color: Option<String>,
    /// Highlight colour as `#rrggbb`
    pub highlight: Option<String>,
}

impl TextStyle {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn bold() -> Self {
        TextStyle {
            bold: true,
            ..Default::default()
        }
    }

    pub fn italic() -> Self {
        TextStyle {
            italic: true,
            ..Default::default()
        }
    }
}

/// A run of styled text (a contiguous piece of text with uniform styling)
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub style: TextStyle,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        TextRun {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, TextStyle::plain())
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Split this text run at the given byte offset
    /// Returns (left_run, right_run)
    pub fn split_at(&self, offset: usize) -> (TextRun, TextRun) {
        let (left, right) = self.text.split_at(offset);
        (
            TextRun::new(left, self.style.clone()),
            TextRun::new(right, self.style.clone()),
        )
    }
}

/// Link destination
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub destination: String,
    pub title: Option<String>,
}

impl Link {
    pub fn new(destination: impl Into<String>) -> Self {
        Link {
            destination: destination.into(),
            title: None,
        }
    }
}

/// Embedded picture, carried inline as a `data:` URI
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub src: String,
    pub alt: Option<String>,
    /// Display size in CSS pixels
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Inline content (can appear within a block)
#[derive(Debug, Clone, PartialEq)]
pub enum InlineContent {
    Text(TextRun),
    Link {
        link: Link,
        content: Vec<InlineContent>,
    },
    HardBreak,
    Image(InlineImage),
}

impl InlineContent {
    /// Length in bytes of this item's flattened text
    pub fn text_len(&self) -> usize {
        match self {
            InlineContent::Text(run) => run.len(),
            InlineContent::Link { content, .. } => content.iter().map(|c| c.text_len()).sum(),
            InlineContent::HardBreak => 1,
            InlineContent::Image(_) => 0,
        }
    }

    /// Flatten to plain text
    pub fn to_plain_text(&self) -> String {
        match self {
            InlineContent::Text(run) => run.text.clone(),
            InlineContent::Link { content, .. } => {
                content.iter().map(|c| c.to_plain_text()).collect()
            }
            InlineContent::HardBreak => "\n".to_string(),
            InlineContent::Image(_) => String::new(),
        }
    }
}

/// Horizontal alignment of a block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_css(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }

    pub fn from_css(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "justify" => Some(Alignment::Justify),
            _ => None,
        }
    }
}

/// Block-level content types
#[derive(Debug, Clone, PartialEq)]
pub enum BlockType {
    Paragraph,
    Heading { level: u8 }, // 1-6
    ListItem { ordered: bool },
}

/// A block of content
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: ElementId,
    pub block_type: BlockType,
    pub alignment: Alignment,
    pub content: Vec<InlineContent>,
}

impl Block {
    pub fn new(id: ElementId, block_type: BlockType) -> Self {
        Block {
            id,
            block_type,
            alignment: Alignment::Left,
            content: Vec::new(),
        }
    }

    pub fn paragraph(id: ElementId) -> Self {
        Self::new(id, BlockType::Paragraph)
    }

    pub fn heading(id: ElementId, level: u8) -> Self {
        Self::new(
            id,
            BlockType::Heading {
                level: level.clamp(1, 6),
            },
        )
    }

    pub fn list_item(id: ElementId, ordered: bool) -> Self {
        Self::new(id, BlockType::ListItem { ordered })
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>, style: TextStyle) -> Self {
        self.content
            .push(InlineContent::Text(TextRun::new(text, style)));
        self
    }

    pub fn with_plain_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(InlineContent::Text(TextRun::plain(text)));
        self
    }

    pub fn with_inline(mut self, inline: InlineContent) -> Self {
        self.content.push(inline);
        self
    }

    /// Get the total text length of this block (bytes)
    pub fn text_len(&self) -> usize {
        self.content.iter().map(|c| c.text_len()).sum()
    }

    /// Get plain text content
    pub fn to_plain_text(&self) -> String {
        self.content.iter().map(|c| c.to_plain_text()).collect()
    }

    /// Check if this block has no visible content
    pub fn is_empty(&self) -> bool {
        self.content.iter().all(|c| match c {
            InlineContent::Text(run) => run.text.is_empty(),
            _ => false,
        })
    }

    /// Delete text in [start..end) within this block's flattened content
    pub fn delete_text_range(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }

        fn delete_in_vec(content: &mut Vec<InlineContent>, start: usize, end: usize) {
            let mut new_content: Vec<InlineContent> = Vec::new();
            let mut pos = 0usize;

            for mut item in content.drain(..) {
                let len = item.text_len();

                // Completely outside the deletion range
                if pos + len <= start || pos >= end {
                    new_content.push(item);
                    pos += len;
                    continue;
                }

                let local_start = start.saturating_sub(pos);
                let local_end = min(len, end - pos);

                match &mut item {
                    InlineContent::Text(run) => {
                        let mut text = String::with_capacity(len);
                        text.push_str(&run.text[..local_start]);
                        text.push_str(&run.text[local_end..]);
                        if !text.is_empty() {
                            new_content.push(InlineContent::Text(TextRun::new(
                                text,
                                run.style.clone(),
                            )));
                        }
                    }
                    InlineContent::Link {
                        link,
                        content: inner,
                    } => {
                        delete_in_vec(inner, local_start, local_end);
                        if inner.iter().map(|c| c.text_len()).sum::<usize>() > 0 {
                            new_content.push(InlineContent::Link {
                                link: link.clone(),
                                content: std::mem::take(inner),
                            });
                        }
                    }
                    // A single-byte break inside the range is deleted
                    InlineContent::HardBreak | InlineContent::Image(_) => {}
                }

                pos += len;
            }

            *content = new_content;
        }

        let len = self.text_len();
        let start = min(start, len);
        let end = min(end, len);
        let mut content = std::mem::take(&mut self.content);
        delete_in_vec(&mut content, start, end);
        self.content = content;
        self.merge_adjacent_runs();
    }

    /// Split this block's content at a flattened text offset, returning the right part.
    /// The left part remains in self.
    pub fn split_content_at(&mut self, offset: usize) -> Vec<InlineContent> {
        let offset = min(offset, self.text_len());
        let (left, right) = split_inline_vec(&self.content, offset);
        self.content = left;
        right
    }

    /// Insert styled text at a flattened text offset
    pub fn insert_text(&mut self, offset: usize, text: &str, style: TextStyle) {
        let right = self.split_content_at(offset);
        if !text.is_empty() {
            self.content
                .push(InlineContent::Text(TextRun::new(text, style)));
        }
        self.content.extend(right);
        self.merge_adjacent_runs();
    }

    /// Insert plain text at a flattened text offset
    pub fn insert_plain_text(&mut self, offset: usize, text: &str) {
        self.insert_text(offset, text, TextStyle::plain());
    }

    /// Style of the text run covering the byte just before `offset`
    pub fn style_at(&self, offset: usize) -> Option<TextStyle> {
        fn find(content: &[InlineContent], offset: usize) -> Option<TextStyle> {
            let mut pos = 0usize;
            let mut last = None;
            for item in content {
                let len = item.text_len();
                match item {
                    InlineContent::Text(run) if !run.is_empty() => {
                        last = Some(run.style.clone());
                    }
                    InlineContent::Link { content, .. } => {
                        if let Some(style) = find(content, offset.saturating_sub(pos).min(len)) {
                            last = Some(style);
                        }
                    }
                    _ => {}
                }
                pos += len;
                if pos >= offset {
                    break;
                }
            }
            last
        }
        find(&self.content, offset)
    }

    /// Join neighbouring text runs that share a style
    pub fn merge_adjacent_runs(&mut self) {
        merge_runs(&mut self.content);
    }
}

fn merge_runs(content: &mut Vec<InlineContent>) {
    let mut merged: Vec<InlineContent> = Vec::with_capacity(content.len());
    for item in content.drain(..) {
        match item {
            InlineContent::Text(run) if run.is_empty() => {}
            InlineContent::Text(run) => {
                if let Some(InlineContent::Text(prev)) = merged.last_mut()
                    && prev.style == run.style
                {
                    prev.text.push_str(&run.text);
                } else {
                    merged.push(InlineContent::Text(run));
                }
            }
            InlineContent::Link { link, mut content } => {
                merge_runs(&mut content);
                if !content.is_empty() {
                    merged.push(InlineContent::Link { link, content });
                }
            }
            other => merged.push(other),
        }
    }
    *content = merged;
}

/// Split inline content at a flattened byte offset into (left, right)
pub fn split_inline_vec(
    content: &[InlineContent],
    offset: usize,
) -> (Vec<InlineContent>, Vec<InlineContent>) {
    let mut left: Vec<InlineContent> = Vec::new();
    let mut right: Vec<InlineContent> = Vec::new();
    let mut pos = 0usize;
    let mut done = false;

    for item in content.iter() {
        if done {
            right.push(item.clone());
            continue;
        }
        let len = item.text_len();
        // Zero-width items sitting exactly at the offset go right
        if pos + len <= offset && (len > 0 || pos < offset) {
            left.push(item.clone());
            pos += len;
            continue;
        }
        if pos >= offset {
            right.push(item.clone());
            done = true;
            continue;
        }
        // offset falls within this item
        let local = offset - pos;
        match item {
            InlineContent::Text(run) => {
                let (l, r) = run.split_at(local);
                if !l.is_empty() {
                    left.push(InlineContent::Text(l));
                }
                if !r.is_empty() {
                    right.push(InlineContent::Text(r));
                }
            }
            InlineContent::Link {
                link,
                content: inner,
            } => {
                let (l_inner, r_inner) = split_inline_vec(inner, local);
                if !l_inner.is_empty() {
                    left.push(InlineContent::Link {
                        link: link.clone(),
                        content: l_inner,
                    });
                }
                if !r_inner.is_empty() {
                    right.push(InlineContent::Link {
                        link: link.clone(),
                        content: r_inner,
                    });
                }
            }
            InlineContent::HardBreak | InlineContent::Image(_) => {
                right.push(item.clone());
            }
        }
        done = true;
    }

    (left, right)
}

/// Position within a document
/// Block index plus byte offset within the block's flattened text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentPosition {
    pub block_index: usize,
    pub offset: usize,
}

impl DocumentPosition {
    pub fn new(block_index: usize, offset: usize) -> Self {
        DocumentPosition {
            block_index,
            offset,
        }
    }

    pub fn start() -> Self {
        DocumentPosition::new(0, 0)
    }
}

/// Page size and margins in twentieths of a point (twips)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
    pub margin_top: u32,
    pub margin_right: u32,
    pub margin_bottom: u32,
    pub margin_left: u32,
}

impl Default for PageGeometry {
    /// US Letter with one-inch margins
    fn default() -> Self {
        PageGeometry {
            width: 12240,
            height: 15840,
            margin_top: 1440,
            margin_right: 1440,
            margin_bottom: 1440,
            margin_left: 1440,
        }
    }
}

/// The structured document
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredDocument {
    blocks: Vec<Block>,
    pub header: Vec<Block>,
    pub footer: Vec<Block>,
    pub page: Option<PageGeometry>,
    next_id: ElementId,
}

impl StructuredDocument {
    pub fn new() -> Self {
        StructuredDocument {
            blocks: Vec::new(),
            header: Vec::new(),
            footer: Vec::new(),
            page: None,
            next_id: 1,
        }
    }

    /// Get a unique element ID
    fn next_id(&mut self) -> ElementId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Get blocks
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get mutable blocks
    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    /// Add a block
    pub fn add_block(&mut self, mut block: Block) {
        if block.id == 0 {
            block.id = self.next_id();
        }
        self.blocks.push(block);
    }

    /// Insert a block at a specific position
    pub fn insert_block(&mut self, index: usize, mut block: Block) {
        if block.id == 0 {
            block.id = self.next_id();
        }
        let index = min(index, self.blocks.len());
        self.blocks.insert(index, block);
    }

    /// Remove a block
    pub fn remove_block(&mut self, index: usize) -> Option<Block> {
        if index < self.blocks.len() {
            Some(self.blocks.remove(index))
        } else {
            None
        }
    }

    /// Get block count
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Validate and clamp a position to document bounds
    pub fn clamp_position(&self, pos: DocumentPosition) -> DocumentPosition {
        if self.blocks.is_empty() {
            return DocumentPosition::start();
        }

        let block_index = pos.block_index.min(self.blocks.len() - 1);
        let block = &self.blocks[block_index];
        let text = block.to_plain_text();
        let mut offset = pos.offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }

        DocumentPosition::new(block_index, offset)
    }

    /// Body text with blocks separated by a single newline
    pub fn to_plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.to_plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check if document is empty
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Create a simple document with one paragraph
    pub fn with_paragraph(text: impl Into<String>) -> Self {
        let mut doc = Self::new();
        let id = doc.next_id();
        let block = Block::paragraph(id).with_plain_text(text);
        doc.add_block(block);
        doc
    }

    /// Canonical form: adjacent runs with equal style merged, empty runs dropped
    pub fn normalize(&mut self) {
        for block in self
            .blocks
            .iter_mut()
            .chain(self.header.iter_mut())
            .chain(self.footer.iter_mut())
        {
            block.merge_adjacent_runs();
        }
    }

    /// Make sure there is at least one block to put a cursor in
    pub fn ensure_block(&mut self) {
        if self.blocks.is_empty() {
            let id = self.next_id();
            self.blocks.push(Block::paragraph(id));
        }
    }

    /// Delete content in [start..end) across blocks.
    /// If the range spans multiple blocks, merges the tail of the end block into the start block
    /// and removes all fully-covered blocks in between.
    pub fn delete_range(&mut self, start: DocumentPosition, end: DocumentPosition) {
        if self.blocks.is_empty() {
            return;
        }
        let mut a = self.clamp_position(start);
        let mut b = self.clamp_position(end);
        if b < a {
            std::mem::swap(&mut a, &mut b);
        }

        if a.block_index == b.block_index {
            self.blocks[a.block_index].delete_text_range(a.offset, b.offset);
            return;
        }

        // Delete tail of start block
        {
            let block = &mut self.blocks[a.block_index];
            let len = block.text_len();
            block.delete_text_range(a.offset, len);
        }

        // Keep the tail of the end block
        let tail_content = self.blocks[b.block_index].split_content_at(b.offset);

        // Remove covered blocks, the end block included
        self.blocks.drain(a.block_index + 1..=b.block_index);

        let block = &mut self.blocks[a.block_index];
        block.content.extend(tail_content);
        block.merge_adjacent_runs();
    }

    /// Replace content in [start..end) with text. `\n\n` separates paragraphs.
    /// Content after `end` is appended to the last inserted paragraph.
    /// Returns the position just after the inserted text.
    pub fn replace_range(
        &mut self,
        start: DocumentPosition,
        end: DocumentPosition,
        text: &str,
        style: TextStyle,
    ) -> DocumentPosition {
        self.ensure_block();

        let a = self.clamp_position(start);
        let b = self.clamp_position(end);
        let (start_pos, end_pos) = if b < a { (b, a) } else { (a, b) };

        self.delete_range(start_pos, end_pos);

        let insert_block_index = start_pos
            .block_index
            .min(self.blocks.len().saturating_sub(1));
        let insert_offset = start_pos
            .offset
            .min(self.blocks[insert_block_index].text_len());

        if text.is_empty() {
            return DocumentPosition::new(insert_block_index, insert_offset);
        }

        let trailing_right = self.blocks[insert_block_index].split_content_at(insert_offset);
        let template_block = self.blocks[insert_block_index].clone();

        let paragraphs: Vec<&str> = text.split("\n\n").collect();

        if !paragraphs[0].is_empty() {
            self.blocks[insert_block_index]
                .content
                .push(InlineContent::Text(TextRun::new(paragraphs[0], style.clone())));
        }
        let mut cursor = DocumentPosition::new(
            insert_block_index,
            self.blocks[insert_block_index].text_len(),
        );

        // Subsequent paragraphs become new blocks that inherit the block type
        let mut insert_at = insert_block_index + 1;
        for p in paragraphs.iter().skip(1) {
            let mut block = Block::new(0, template_block.block_type.clone())
                .with_alignment(template_block.alignment);
            if !p.is_empty() {
                block
                    .content
                    .push(InlineContent::Text(TextRun::new(*p, style.clone())));
            }
            let len = block.text_len();
            self.insert_block(insert_at, block);
            cursor = DocumentPosition::new(insert_at, len);
            insert_at += 1;
        }

        let target = &mut self.blocks[cursor.block_index];
        target.content.extend(trailing_right);
        target.merge_adjacent_runs();
        cursor
    }

    /// Split the block at `pos` in two, the right part becoming a new block
    pub fn split_block(&mut self, pos: DocumentPosition) -> DocumentPosition {
        self.ensure_block();
        let pos = self.clamp_position(pos);
        let block = &mut self.blocks[pos.block_index];
        let right = block.split_content_at(pos.offset);
        let mut new_block =
            Block::new(0, block.block_type.clone()).with_alignment(block.alignment);
        new_block.content = right;
        self.insert_block(pos.block_index + 1, new_block);
        DocumentPosition::new(pos.block_index + 1, 0)
    }
}

impl Default for StructuredDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StructuredDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "StructuredDocument ({} blocks):", self.blocks.len())?;
        for (i, block) in self.blocks.iter().enumerate() {
            write!(f, "  [{}] ", i)?;
            match &block.block_type {
                BlockType::Paragraph => write!(f, "Paragraph")?,
                BlockType::Heading { level } => write!(f, "Heading(h{})", level)?,
                BlockType::ListItem { ordered } => write!(
                    f,
                    "ListItem({})",
                    if *ordered { "ordered" } else { "unordered" }
                )?,
            }
            if block.alignment != Alignment::Left {
                write!(f, " [{}]", block.alignment.as_css())?;
            }
            writeln!(f, ": {:?}", block.to_plain_text())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_run() {
        let run = TextRun::plain("hello world");
        assert_eq!(run.len(), 11);

        let (left, right) = run.split_at(5);
        assert_eq!(left.text, "hello");
        assert_eq!(right.text, " world");
    }

    #[test]
    fn test_block_text_len() {
        let block = Block::paragraph(1)
            .with_plain_text("hello")
            .with_text(" world", TextStyle::bold());

        assert_eq!(block.text_len(), 11);
        assert_eq!(block.to_plain_text(), "hello world");
    }

    #[test]
    fn test_position_clamping() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_plain_text("hello"));

        let clamped = doc.clamp_position(DocumentPosition::new(3, 100));
        assert_eq!(clamped, DocumentPosition::new(0, 5));
    }

    #[test]
    fn test_position_clamping_respects_char_boundaries() {
        let doc = StructuredDocument::with_paragraph("Điều");
        // 'Đ' is two bytes wide
        let clamped = doc.clamp_position(DocumentPosition::new(0, 1));
        assert_eq!(clamped.offset, 0);
    }

    #[test]
    fn test_delete_range_within_block() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_plain_text("Hello world"));
        doc.delete_range(DocumentPosition::new(0, 5), DocumentPosition::new(0, 11));
        assert_eq!(doc.blocks()[0].to_plain_text(), "Hello");
    }

    #[test]
    fn test_delete_range_across_styled_runs() {
        let mut block = Block::paragraph(1)
            .with_plain_text("abc")
            .with_text("def", TextStyle::bold())
            .with_plain_text("ghi");
        block.delete_text_range(2, 7);
        assert_eq!(block.to_plain_text(), "abhi");
        assert_eq!(block.content.len(), 1);
    }

    #[test]
    fn test_delete_range_across_blocks_merges() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_plain_text("First para"));
        doc.add_block(Block::paragraph(0).with_plain_text("Second"));
        doc.add_block(Block::paragraph(0).with_plain_text("Third para"));

        doc.delete_range(DocumentPosition::new(0, 3), DocumentPosition::new(2, 2));

        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.blocks()[0].to_plain_text(), "Firird para");
    }

    #[test]
    fn test_replace_range_across_blocks_with_paragraphs() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_plain_text("Hello one"));
        doc.add_block(Block::paragraph(0).with_plain_text("Hello two"));
        doc.add_block(Block::paragraph(0).with_plain_text("Hello three"));

        let end = doc.replace_range(
            DocumentPosition::new(0, 6),
            DocumentPosition::new(2, 5),
            "X\n\nY",
            TextStyle::plain(),
        );

        assert_eq!(doc.blocks()[0].to_plain_text(), "Hello X");
        assert_eq!(doc.blocks()[1].to_plain_text(), "Y three");
        assert_eq!(end, DocumentPosition::new(1, 1));
    }

    #[test]
    fn test_split_inside_link_keeps_destination() {
        let block = Block::paragraph(1).with_inline(InlineContent::Link {
            link: Link::new("https://example.com"),
            content: vec![InlineContent::Text(TextRun::plain("click here"))],
        });
        let (left, right) = split_inline_vec(&block.content, 5);
        for half in [&left[0], &right[0]] {
            assert!(matches!(
                half,
                InlineContent::Link { link, .. } if link.destination == "https://example.com"
            ));
        }
    }

    #[test]
    fn test_split_block() {
        let mut doc = StructuredDocument::new();
        doc.add_block(
            Block::paragraph(0)
                .with_plain_text("left right")
                .with_alignment(Alignment::Center),
        );
        let pos = doc.split_block(DocumentPosition::new(0, 4));
        assert_eq!(pos, DocumentPosition::new(1, 0));
        assert_eq!(doc.blocks()[0].to_plain_text(), "left");
        assert_eq!(doc.blocks()[1].to_plain_text(), " right");
        assert_eq!(doc.blocks()[1].alignment, Alignment::Center);
    }

    #[test]
    fn test_insert_text_merges_same_style() {
        let mut block = Block::paragraph(1).with_plain_text("ac");
        block.insert_plain_text(1, "b");
        assert_eq!(block.content, vec![InlineContent::Text(TextRun::plain("abc"))]);
    }
}
