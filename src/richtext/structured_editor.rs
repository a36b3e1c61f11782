// Structured Editor
// Editing operations on a StructuredDocument driven by a character-offset
// selection over the body text (blocks separated by a single newline).

use super::structured_document::*;
use std::cmp::min;
use unicode_segmentation::UnicodeSegmentation;

/// Result of an editing operation
pub type EditResult = Result<(), EditError>;

/// Errors that can occur during editing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("position is outside the document")]
    InvalidPosition,
    #[error("block index is outside the document")]
    InvalidBlockIndex,
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Selection as character offsets into the body text.
/// `start == end` is a collapsed cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

impl SelectionRange {
    pub fn new(start: usize, end: usize) -> Self {
        SelectionRange { start, end }
    }

    pub fn collapsed(offset: usize) -> Self {
        SelectionRange::new(offset, offset)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Same range with start <= end
    pub fn ordered(&self) -> Self {
        SelectionRange::new(min(self.start, self.end), self.start.max(self.end))
    }

    /// Clamp both ends to `len`; offsets past the end land on the end
    pub fn clamp_to(&self, len: usize) -> Self {
        SelectionRange::new(min(self.start, len), min(self.end, len))
    }
}

/// The structured editor with selection state
pub struct StructuredEditor {
    document: StructuredDocument,
    selection: SelectionRange,
    /// Style for the next text typed at a collapsed cursor
    pending_style: Option<TextStyle>,
}

impl StructuredEditor {
    /// Create a new editor with an empty document
    pub fn new() -> Self {
        StructuredEditor {
            document: StructuredDocument::new(),
            selection: SelectionRange::default(),
            pending_style: None,
        }
    }

    /// Create an editor with an existing document
    pub fn with_document(mut document: StructuredDocument) -> Self {
        document.normalize();
        StructuredEditor {
            document,
            selection: SelectionRange::default(),
            pending_style: None,
        }
    }

    pub fn document(&self) -> &StructuredDocument {
        &self.document
    }

    /// Replace the whole document, keeping the selection where it still fits
    pub fn set_document(&mut self, mut document: StructuredDocument) {
        document.normalize();
        self.document = document;
        self.pending_style = None;
        self.selection = self.selection.clamp_to(self.text_len());
    }

    /// Body text as the selection sees it
    pub fn plain_text(&self) -> String {
        self.document.to_plain_text()
    }

    /// Length of the body text in characters
    pub fn text_len(&self) -> usize {
        self.document
            .blocks()
            .iter()
            .map(|b| b.to_plain_text().chars().count())
            .sum::<usize>()
            + self.document.block_count().saturating_sub(1)
    }

    pub fn selection(&self) -> SelectionRange {
        self.selection
    }

    /// Set the selection. Offsets are clamped to the content and snapped back
    /// to the nearest grapheme boundary. Moving the selection drops any
    /// pending insertion style; restoring the same range keeps it.
    pub fn set_selection(&mut self, range: SelectionRange) {
        let text = self.plain_text();
        let len = text.chars().count();
        let range = range.clamp_to(len);
        let snapped = SelectionRange::new(
            snap_to_grapheme(&text, range.start),
            snap_to_grapheme(&text, range.end),
        );
        if snapped != self.selection {
            self.pending_style = None;
        }
        self.selection = snapped;
    }

    pub fn set_cursor(&mut self, offset: usize) {
        self.set_selection(SelectionRange::collapsed(offset));
    }

    pub fn select_all(&mut self) {
        self.selection = SelectionRange::new(0, self.text_len());
    }

    pub fn pending_style(&self) -> Option<&TextStyle> {
        self.pending_style.as_ref()
    }

    /// Map a character offset in the body text to a block position
    pub fn position_from_offset(&self, offset: usize) -> DocumentPosition {
        let blocks = self.document.blocks();
        let mut remaining = offset;
        for (index, block) in blocks.iter().enumerate() {
            let text = block.to_plain_text();
            let chars = text.chars().count();
            if remaining <= chars {
                let byte = text
                    .char_indices()
                    .nth(remaining)
                    .map(|(b, _)| b)
                    .unwrap_or(text.len());
                return DocumentPosition::new(index, byte);
            }
            remaining -= chars + 1;
        }
        match blocks.last() {
            Some(last) => DocumentPosition::new(blocks.len() - 1, last.text_len()),
            None => DocumentPosition::start(),
        }
    }

    /// Map a block position back to a character offset in the body text
    pub fn offset_from_position(&self, pos: DocumentPosition) -> usize {
        let pos = self.document.clamp_position(pos);
        let mut offset = 0;
        for (index, block) in self.document.blocks().iter().enumerate() {
            let text = block.to_plain_text();
            if index == pos.block_index {
                return offset + text[..pos.offset].chars().count();
            }
            offset += text.chars().count() + 1;
        }
        offset
    }

    fn selection_positions(&self) -> (DocumentPosition, DocumentPosition) {
        let range = self.selection.ordered();
        (
            self.position_from_offset(range.start),
            self.position_from_offset(range.end),
        )
    }

    /// Style new text picks up at the cursor
    fn insertion_style(&self, pos: DocumentPosition) -> TextStyle {
        if let Some(style) = &self.pending_style {
            return style.clone();
        }
        self.document
            .blocks()
            .get(pos.block_index)
            .and_then(|b| b.style_at(pos.offset))
            .unwrap_or_default()
    }

    /// Insert text at the cursor, replacing the selection.
    /// Line breaks start new paragraphs.
    pub fn insert_text(&mut self, text: &str) -> EditResult {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let (start, end) = self.selection_positions();
        let style = self.insertion_style(start);
        let paragraphs = normalized.split('\n').collect::<Vec<_>>().join("\n\n");
        let after = self.document.replace_range(start, end, &paragraphs, style);
        self.document.normalize();
        let offset = self.offset_from_position(after);
        self.selection = SelectionRange::collapsed(offset);
        self.pending_style = None;
        Ok(())
    }

    /// Delete the selection, or the character before the cursor
    pub fn delete_backward(&mut self) -> EditResult {
        let range = self.selection.ordered();
        let range = if range.is_collapsed() {
            if range.start == 0 {
                return Ok(());
            }
            let text = self.plain_text();
            let target = previous_grapheme_offset(&text, range.start);
            SelectionRange::new(target, range.start)
        } else {
            range
        };
        let start = self.position_from_offset(range.start);
        let end = self.position_from_offset(range.end);
        self.document.delete_range(start, end);
        self.document.normalize();
        self.selection = SelectionRange::collapsed(range.start);
        Ok(())
    }

    /// Delete the selection; no-op for a collapsed cursor
    pub fn delete_selection(&mut self) -> EditResult {
        if self.selection.is_collapsed() {
            return Ok(());
        }
        self.delete_backward()
    }

    /// Split the current block at the cursor
    pub fn insert_paragraph_break(&mut self) -> EditResult {
        self.delete_selection()?;
        let pos = self.position_from_offset(self.selection.start);
        let next = self.document.split_block(pos);
        self.selection = SelectionRange::collapsed(self.offset_from_position(next));
        Ok(())
    }

    pub fn toggle_bold(&mut self) -> EditResult {
        self.change_style(|style| style.bold = !style.bold)
    }

    pub fn toggle_italic(&mut self) -> EditResult {
        self.change_style(|style| style.italic = !style.italic)
    }

    pub fn toggle_underline(&mut self) -> EditResult {
        self.change_style(|style| style.underline = !style.underline)
    }

    pub fn toggle_strikethrough(&mut self) -> EditResult {
        self.change_style(|style| style.strikethrough = !style.strikethrough)
    }

    pub fn set_font_family(&mut self, family: &str) -> EditResult {
        let family = family.to_string();
        self.change_style(|style| style.font_family = Some(family.clone()))
    }

    pub fn set_font_size(&mut self, points: u16) -> EditResult {
        self.change_style(|style| style.font_size = Some(points))
    }

    pub fn set_color(&mut self, color: &str) -> EditResult {
        let color = color.to_string();
        self.change_style(|style| style.color = Some(color.clone()))
    }

    pub fn set_highlight(&mut self, color: &str) -> EditResult {
        let color = color.to_string();
        self.change_style(|style| style.highlight = Some(color.clone()))
    }

    /// Remove all inline formatting from the selection
    pub fn clear_formatting(&mut self) -> EditResult {
        self.change_style(|style| *style = TextStyle::plain())
    }

    /// Apply a style change to the selection, or to the insertion point when
    /// the selection is collapsed
    fn change_style<F>(&mut self, mut apply_style: F) -> EditResult
    where
        F: FnMut(&mut TextStyle),
    {
        if self.selection.is_collapsed() {
            let pos = self.position_from_offset(self.selection.start);
            let mut style = self.insertion_style(pos);
            apply_style(&mut style);
            self.pending_style = Some(style);
            return Ok(());
        }

        let selection = self.selection;
        self.map_selected_blocks(|content, start, end| {
            let (before, rest) = split_inline_vec(content, start);
            let (selected, after) = split_inline_vec(&rest, end - start);
            let mut result = before;
            result.extend(map_style_on_runs(selected, &mut apply_style));
            result.extend(after);
            result
        })?;
        self.document.normalize();
        self.selection = selection;
        Ok(())
    }

    /// Run `f` over the selected byte range of every block the selection touches
    fn map_selected_blocks<F>(&mut self, mut f: F) -> EditResult
    where
        F: FnMut(&[InlineContent], usize, usize) -> Vec<InlineContent>,
    {
        let (start, end) = self.selection_positions();
        let block_count = self.document.block_count();
        if block_count == 0 {
            return Err(EditError::InvalidPosition);
        }
        if start.block_index >= block_count || end.block_index >= block_count {
            return Err(EditError::InvalidBlockIndex);
        }

        for index in start.block_index..=end.block_index {
            let block = &mut self.document.blocks_mut()[index];
            let from = if index == start.block_index {
                start.offset
            } else {
                0
            };
            let to = if index == end.block_index {
                end.offset
            } else {
                block.text_len()
            };
            if from >= to {
                continue;
            }
            block.content = f(&block.content, from, to);
        }
        Ok(())
    }

    /// Wrap the selection in a hyperlink. A collapsed cursor inserts the
    /// destination itself as the link text.
    pub fn set_link(&mut self, destination: &str) -> EditResult {
        if destination.is_empty() {
            return Err(EditError::InvalidValue("empty link destination".to_string()));
        }

        if self.selection.is_collapsed() {
            let pos = self.position_from_offset(self.selection.start);
            let style = self.insertion_style(pos);
            self.document.ensure_block();
            let pos = self.document.clamp_position(pos);
            let block = &mut self.document.blocks_mut()[pos.block_index];
            let right = block.split_content_at(pos.offset);
            block.content.push(InlineContent::Link {
                link: Link::new(destination),
                content: vec![InlineContent::Text(TextRun::new(destination, style))],
            });
            block.content.extend(right);
            self.document.normalize();
            let offset = self.selection.start + destination.chars().count();
            self.selection = SelectionRange::collapsed(offset);
            self.pending_style = None;
            return Ok(());
        }

        let selection = self.selection;
        self.map_selected_blocks(|content, start, end| {
            let (before, rest) = split_inline_vec(content, start);
            let (selected, after) = split_inline_vec(&rest, end - start);
            let mut result = before;
            result.push(InlineContent::Link {
                link: Link::new(destination),
                content: unwrap_links(selected),
            });
            result.extend(after);
            result
        })?;
        self.document.normalize();
        self.selection = selection;
        Ok(())
    }

    /// Remove hyperlinks overlapping the selection (or under the cursor)
    pub fn remove_link(&mut self) -> EditResult {
        let range = self.selection.ordered();
        let (start, end) = (
            self.position_from_offset(range.start),
            self.position_from_offset(range.end),
        );
        let last = end
            .block_index
            .min(self.document.block_count().saturating_sub(1));
        for index in start.block_index..=last {
            let Some(block) = self.document.blocks_mut().get_mut(index) else {
                return Err(EditError::InvalidBlockIndex);
            };
            let from = if index == start.block_index {
                start.offset
            } else {
                0
            };
            let to = if index == end.block_index {
                end.offset
            } else {
                block.text_len()
            };
            let mut pos = 0usize;
            let mut result = Vec::with_capacity(block.content.len());
            for item in block.content.drain(..) {
                let len = item.text_len();
                let touches = pos <= to && pos + len >= from;
                match item {
                    InlineContent::Link { content, .. } if touches => result.extend(content),
                    other => result.push(other),
                }
                pos += len;
            }
            block.content = result;
        }
        self.document.normalize();
        Ok(())
    }

    /// Set the alignment of every block the selection touches
    pub fn set_alignment(&mut self, alignment: Alignment) -> EditResult {
        let (start, end) = self.touched_blocks()?;
        for block in &mut self.document.blocks_mut()[start..=end] {
            block.alignment = alignment;
        }
        Ok(())
    }

    /// Toggle the touched blocks in or out of a list of the given kind
    pub fn toggle_list(&mut self, ordered: bool) -> EditResult {
        let (start, end) = self.touched_blocks()?;
        let blocks = &mut self.document.blocks_mut()[start..=end];
        let all_in_list = blocks
            .iter()
            .all(|b| b.block_type == BlockType::ListItem { ordered });
        for block in blocks {
            block.block_type = if all_in_list {
                BlockType::Paragraph
            } else {
                BlockType::ListItem { ordered }
            };
        }
        Ok(())
    }

    fn touched_blocks(&mut self) -> Result<(usize, usize), EditError> {
        self.document.ensure_block();
        let (start, end) = self.selection_positions();
        if end.block_index >= self.document.block_count() {
            return Err(EditError::InvalidBlockIndex);
        }
        Ok((start.block_index, end.block_index))
    }
}

impl Default for StructuredEditor {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a style change to every text run, descending into links
fn map_style_on_runs<F>(content: Vec<InlineContent>, apply_style: &mut F) -> Vec<InlineContent>
where
    F: FnMut(&mut TextStyle),
{
    content
        .into_iter()
        .map(|item| match item {
            InlineContent::Text(mut run) => {
                apply_style(&mut run.style);
                InlineContent::Text(run)
            }
            InlineContent::Link { link, content } => InlineContent::Link {
                link,
                content: map_style_on_runs(content, apply_style),
            },
            other => other,
        })
        .collect()
}

/// Flatten nested links so a new link never contains another one
fn unwrap_links(content: Vec<InlineContent>) -> Vec<InlineContent> {
    let mut out = Vec::with_capacity(content.len());
    for item in content {
        match item {
            InlineContent::Link { content, .. } => out.extend(unwrap_links(content)),
            other => out.push(other),
        }
    }
    out
}

/// Largest grapheme boundary at or before the character offset
fn snap_to_grapheme(text: &str, offset: usize) -> usize {
    let mut boundary = 0;
    let mut chars = 0;
    for grapheme in text.graphemes(true) {
        let next = chars + grapheme.chars().count();
        if next > offset {
            break;
        }
        chars = next;
        boundary = next;
    }
    boundary
}

/// Start of the last grapheme beginning before `offset`
fn previous_grapheme_offset(text: &str, offset: usize) -> usize {
    let mut chars = 0;
    let mut previous = 0;
    for grapheme in text.graphemes(true) {
        if chars >= offset {
            break;
        }
        previous = chars;
        chars += grapheme.chars().count();
    }
    previous
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::markup::document_to_markup;

    fn editor_with(paragraphs: &[&str]) -> StructuredEditor {
        let mut doc = StructuredDocument::new();
        for p in paragraphs {
            doc.add_block(Block::paragraph(0).with_plain_text(*p));
        }
        StructuredEditor::with_document(doc)
    }

    #[test]
    fn test_offsets_map_across_blocks() {
        let editor = editor_with(&["abc", "de"]);
        assert_eq!(editor.text_len(), 6);
        assert_eq!(editor.position_from_offset(4), DocumentPosition::new(1, 0));
        assert_eq!(editor.position_from_offset(3), DocumentPosition::new(0, 3));
        assert_eq!(editor.offset_from_position(DocumentPosition::new(1, 2)), 6);
        assert_eq!(editor.position_from_offset(99), DocumentPosition::new(1, 2));
    }

    #[test]
    fn test_insert_replaces_selection() {
        let mut editor = editor_with(&["Hello world"]);
        editor.set_selection(SelectionRange::new(6, 11));
        editor.insert_text("there").unwrap();
        assert_eq!(editor.plain_text(), "Hello there");
        assert_eq!(editor.selection(), SelectionRange::collapsed(11));
    }

    #[test]
    fn test_insert_newline_splits_paragraph() {
        let mut editor = editor_with(&["ab"]);
        editor.set_cursor(1);
        editor.insert_text("x\ny").unwrap();
        assert_eq!(document_to_markup(editor.document()), "<p>ax</p><p>yb</p>");
        assert_eq!(editor.selection(), SelectionRange::collapsed(4));
    }

    #[test]
    fn test_toggle_bold_twice_restores() {
        let mut editor = editor_with(&["Hello world"]);
        editor.set_selection(SelectionRange::new(0, 5));
        editor.toggle_bold().unwrap();
        assert_eq!(
            document_to_markup(editor.document()),
            "<p><strong>Hello</strong> world</p>"
        );
        editor.toggle_bold().unwrap();
        assert_eq!(document_to_markup(editor.document()), "<p>Hello world</p>");
    }

    #[test]
    fn test_collapsed_toggle_applies_to_next_input() {
        let mut editor = editor_with(&["ab"]);
        editor.set_cursor(2);
        editor.toggle_italic().unwrap();
        // Nothing visible changes until text is typed
        assert_eq!(document_to_markup(editor.document()), "<p>ab</p>");
        editor.insert_text("c").unwrap();
        assert_eq!(document_to_markup(editor.document()), "<p>ab<em>c</em></p>");
        // Typing continues the surrounding style
        editor.insert_text("d").unwrap();
        assert_eq!(document_to_markup(editor.document()), "<p>ab<em>cd</em></p>");
    }

    #[test]
    fn test_pending_style_survives_same_selection() {
        let mut editor = editor_with(&["ab"]);
        editor.set_cursor(2);
        editor.toggle_bold().unwrap();
        editor.set_cursor(2);
        assert!(editor.pending_style().is_some());

        editor.set_cursor(1);
        assert!(editor.pending_style().is_none());
    }

    #[test]
    fn test_style_across_blocks() {
        let mut editor = editor_with(&["one", "two", "three"]);
        editor.set_selection(SelectionRange::new(1, 10));
        editor.set_color("#ff0000").unwrap();
        assert_eq!(
            document_to_markup(editor.document()),
            "<p>o<span style=\"color:#ff0000\">ne</span></p>\
             <p><span style=\"color:#ff0000\">two</span></p>\
             <p><span style=\"color:#ff0000\">th</span>ree</p>"
        );
    }

    #[test]
    fn test_delete_backward_merges_blocks() {
        let mut editor = editor_with(&["ab", "cd"]);
        editor.set_cursor(3);
        editor.delete_backward().unwrap();
        assert_eq!(editor.plain_text(), "abcd");
        assert_eq!(editor.selection(), SelectionRange::collapsed(2));
    }

    #[test]
    fn test_delete_backward_removes_whole_grapheme() {
        let mut editor = editor_with(&["ae\u{301}"]);
        editor.set_cursor(3);
        editor.delete_backward().unwrap();
        assert_eq!(editor.plain_text(), "a");
    }

    #[test]
    fn test_selection_snaps_to_grapheme() {
        let mut editor = editor_with(&["e\u{301}x"]);
        editor.set_selection(SelectionRange::new(1, 50));
        assert_eq!(editor.selection(), SelectionRange::new(0, 3));
    }

    #[test]
    fn test_link_wraps_selection() {
        let mut editor = editor_with(&["see the law"]);
        editor.set_selection(SelectionRange::new(8, 11));
        editor.set_link("https://thuvienphapluat.vn").unwrap();
        assert_eq!(
            document_to_markup(editor.document()),
            "<p>see the <a href=\"https://thuvienphapluat.vn\">law</a></p>"
        );
        editor.set_cursor(9);
        editor.remove_link().unwrap();
        assert_eq!(document_to_markup(editor.document()), "<p>see the law</p>");
    }

    #[test]
    fn test_alignment_and_list_toggle() {
        let mut editor = editor_with(&["a", "b", "c"]);
        editor.set_selection(SelectionRange::new(0, 2));
        editor.set_alignment(Alignment::Center).unwrap();
        editor.toggle_list(true).unwrap();
        assert_eq!(
            document_to_markup(editor.document()),
            "<ol><li style=\"text-align:center\">a</li><li style=\"text-align:center\">b</li></ol><p>c</p>"
        );
        editor.toggle_list(true).unwrap();
        assert_eq!(editor.document().blocks()[0].block_type, BlockType::Paragraph);
    }

    #[test]
    fn test_clear_formatting() {
        let mut doc = StructuredDocument::new();
        doc.add_block(Block::paragraph(0).with_text("bold", TextStyle::bold()));
        let mut editor = StructuredEditor::with_document(doc);
        editor.select_all();
        editor.clear_formatting().unwrap();
        assert_eq!(document_to_markup(editor.document()), "<p>bold</p>");
    }

    #[test]
    fn test_insert_into_empty_document() {
        let mut editor = StructuredEditor::new();
        editor.insert_text("Xin chào").unwrap();
        assert_eq!(document_to_markup(editor.document()), "<p>Xin chào</p>");
        assert_eq!(editor.selection(), SelectionRange::collapsed(8));
    }

    #[test]
    fn test_paragraph_break() {
        let mut editor = editor_with(&["abcd"]);
        editor.set_cursor(2);
        editor.insert_paragraph_break().unwrap();
        assert_eq!(editor.plain_text(), "ab\ncd");
        assert_eq!(editor.selection(), SelectionRange::collapsed(3));
    }
}
