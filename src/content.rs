// Common surface trait so history sync and format dispatch can drive any
// editor implementation (the structured editor, or a host-provided one).

use crate::format::{FormatCommand, FormatCommandError};
use crate::richtext::markup::{MarkupError, document_to_markup, markup_to_document};
use crate::richtext::structured_document::StructuredDocument;
use crate::richtext::structured_editor::{SelectionRange, StructuredEditor};

/// The selection could not be read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("selection is not available")]
pub struct SelectionUnavailable;

/// Live editable content.
///
/// `serialize` must return the snapshot markup for the current state; loading
/// that markup back must give a surface that serializes to the same string.
pub trait EditableSurface {
    fn serialize(&self) -> String;
    fn load_markup(&mut self, markup: &str) -> Result<(), MarkupError>;
    fn selection(&self) -> Result<SelectionRange, SelectionUnavailable>;
    fn set_selection(&mut self, range: SelectionRange) -> Result<(), SelectionUnavailable>;
    /// Length of the visible text in characters
    fn text_len(&self) -> usize;
    fn plain_text(&self) -> String;
    fn focus(&mut self);
    fn apply_format(&mut self, command: &FormatCommand) -> Result<(), FormatCommandError>;
}

/// EditableSurface backed by a StructuredEditor
pub struct DocumentSurface {
    editor: StructuredEditor,
    focused: bool,
}

impl DocumentSurface {
    pub fn new() -> Self {
        DocumentSurface {
            editor: StructuredEditor::new(),
            focused: false,
        }
    }

    pub fn from_document(document: StructuredDocument) -> Self {
        DocumentSurface {
            editor: StructuredEditor::with_document(document),
            focused: false,
        }
    }

    pub fn from_markup(markup: &str) -> Result<Self, MarkupError> {
        Ok(Self::from_document(markup_to_document(markup)?))
    }

    pub fn editor(&self) -> &StructuredEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut StructuredEditor {
        &mut self.editor
    }

    pub fn document(&self) -> &StructuredDocument {
        self.editor.document()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }
}

impl Default for DocumentSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl EditableSurface for DocumentSurface {
    fn serialize(&self) -> String {
        document_to_markup(self.editor.document())
    }

    fn load_markup(&mut self, markup: &str) -> Result<(), MarkupError> {
        let document = markup_to_document(markup)?;
        self.editor.set_document(document);
        Ok(())
    }

    fn selection(&self) -> Result<SelectionRange, SelectionUnavailable> {
        Ok(self.editor.selection())
    }

    fn set_selection(&mut self, range: SelectionRange) -> Result<(), SelectionUnavailable> {
        self.editor.set_selection(range);
        Ok(())
    }

    fn text_len(&self) -> usize {
        self.editor.text_len()
    }

    fn plain_text(&self) -> String {
        self.editor.plain_text()
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn apply_format(&mut self, command: &FormatCommand) -> Result<(), FormatCommandError> {
        command.apply(&mut self.editor)
    }
}
