// Editor session: one mounted document and everything attached to it.
// Owns the editable surface, its undo history and the import/export pipeline,
// and reports to the embedding application through Host. Closing the session
// hands the host back.

use crate::clipboard::ClipboardError;
use crate::config::EditorConfig;
use crate::content::{DocumentSurface, EditableSurface};
use crate::format;
use crate::history::History;
use crate::host::{Host, Severity};
use crate::keymap::{self, EditorAction, KeyChord, KeyOutcome};
use crate::pipeline::{
    ArtifactKind, CodecRegistry, ExportError, ExportFormat, ExportJob, ExportReport,
    FallbackExportError, LoadState, Pipeline, SourceDocument,
};
use crate::print_view::print_page;
use crate::richtext::markup::markup_to_document;
use crate::richtext::structured_editor::{EditError, SelectionRange, StructuredEditor};
use crate::status::SaveStatus;
use crate::sync::ContentSync;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

/// What the editor is mounted with
#[derive(Debug, Clone)]
pub enum InitialContent {
    Empty,
    /// Snapshot markup or a static HTML template
    Markup(String),
    /// A document to import; its bytes are kept for fallback export
    Source(SourceDocument),
}

pub struct EditorSession<H: Host> {
    host: H,
    config: EditorConfig,
    title: String,
    surface: DocumentSurface,
    sync: ContentSync,
    pipeline: Pipeline,
    /// Snapshot at the last explicit save
    saved_snapshot: String,
    status: SaveStatus,
}

impl<H: Host> EditorSession<H> {
    /// Mount the editor. Never fails: content that cannot be read is
    /// reported to the host and the editor opens empty.
    pub fn mount(
        host: H,
        config: EditorConfig,
        content: InitialContent,
        title: Option<&str>,
    ) -> Self {
        Self::mount_with_codecs(host, config, CodecRegistry::with_defaults(), content, title)
    }

    /// Mount with a custom set of decoders and encoders
    pub fn mount_with_codecs(
        mut host: H,
        config: EditorConfig,
        codecs: CodecRegistry,
        content: InitialContent,
        title: Option<&str>,
    ) -> Self {
        let mut pipeline = Pipeline::new(codecs);
        let surface = match content {
            InitialContent::Empty => DocumentSurface::new(),
            InitialContent::Markup(markup) => match markup_to_document(&markup) {
                Ok(doc) => DocumentSurface::from_document(doc),
                Err(err) => {
                    host.notify(&format!("Could not open document: {err}"), Severity::Error);
                    DocumentSurface::new()
                }
            },
            InitialContent::Source(source) => match pipeline.import(source) {
                Ok(doc) => DocumentSurface::from_document(doc),
                Err(err) => {
                    host.notify(&format!("Could not open document: {err}"), Severity::Error);
                    DocumentSurface::new()
                }
            },
        };

        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => config.default_title.clone(),
        };

        let initial = surface.serialize();
        tracing::debug!(%title, state = ?pipeline.state(), "editor mounted");
        EditorSession {
            host,
            sync: ContentSync::seed(initial.clone(), config.max_history),
            config,
            title,
            surface,
            pipeline,
            saved_snapshot: initial,
            status: SaveStatus::new(),
        }
    }

    pub fn mount_markup(host: H, config: EditorConfig, markup: &str, title: Option<&str>) -> Self {
        Self::mount(host, config, InitialContent::Markup(markup.to_string()), title)
    }

    pub fn mount_source(
        host: H,
        config: EditorConfig,
        source: SourceDocument,
        title: Option<&str>,
    ) -> Self {
        Self::mount(host, config, InitialContent::Source(source), title)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        if self.title == title {
            return;
        }
        self.title = title.to_string();
        self.host.on_title_change(&self.title);
    }

    pub fn load_state(&self) -> LoadState {
        self.pipeline.state()
    }

    pub fn original(&self) -> Option<&SourceDocument> {
        self.pipeline.original()
    }

    pub fn editor(&self) -> &StructuredEditor {
        self.surface.editor()
    }

    pub fn surface(&self) -> &DocumentSurface {
        &self.surface
    }

    /// Current snapshot
    pub fn markup(&self) -> &str {
        self.sync.current()
    }

    pub fn plain_text(&self) -> String {
        self.surface.plain_text()
    }

    pub fn history(&self) -> &History {
        self.sync.history()
    }

    pub fn revision(&self) -> u64 {
        self.sync.revision()
    }

    pub fn is_saved(&self) -> bool {
        self.sync.current() == self.saved_snapshot
    }

    pub fn status_text(&self) -> String {
        self.status.text(self.is_saved(), self.pipeline.is_exporting())
    }

    pub fn selection(&self) -> SelectionRange {
        self.surface.editor().selection()
    }

    pub fn set_selection(&mut self, range: SelectionRange) {
        self.surface.editor_mut().set_selection(range);
    }

    pub fn select_all(&mut self) {
        self.surface.editor_mut().select_all();
    }

    pub fn insert_text(&mut self, text: &str) -> Result<bool, SessionError> {
        self.surface.editor_mut().insert_text(text)?;
        Ok(self.commit())
    }

    pub fn delete_backward(&mut self) -> Result<bool, SessionError> {
        self.surface.editor_mut().delete_backward()?;
        Ok(self.commit())
    }

    pub fn insert_paragraph_break(&mut self) -> Result<bool, SessionError> {
        self.surface.editor_mut().insert_paragraph_break()?;
        Ok(self.commit())
    }

    /// Run a format command by name. Bad commands are ignored; the
    /// resulting state is captured either way.
    pub fn format(&mut self, name: &str, value: Option<&str>) -> bool {
        let pushed = format::dispatch(&mut self.sync, &mut self.surface, name, value);
        if pushed {
            self.status.mark_changed();
        }
        pushed
    }

    /// Call once the host has re-rendered the surface
    pub fn after_render(&mut self) {
        self.sync.after_render(&mut self.surface);
    }

    pub fn undo(&mut self) -> bool {
        self.sync.undo(&mut self.surface)
    }

    pub fn redo(&mut self) -> bool {
        self.sync.redo(&mut self.surface)
    }

    /// Mark the current snapshot as saved
    pub fn save(&mut self) {
        self.saved_snapshot = self.sync.current().to_string();
        self.status.mark_saved();
        tracing::info!(title = %self.title, "document saved");
        self.host.notify("Document saved", Severity::Success);
    }

    /// Dismiss the editor. Unsaved changes are offered for saving first.
    pub fn close(mut self) -> H {
        if !self.is_saved() && self.host.confirm_save() {
            self.save();
        }
        self.host.on_close();
        self.host
    }

    pub fn export_default(&mut self) -> Result<ArtifactKind, SessionError> {
        self.export(self.config.export_format)
    }

    /// Export the current content and offer the artifact for download
    pub fn export(&mut self, format: ExportFormat) -> Result<ArtifactKind, SessionError> {
        let job = self.begin_export(format)?;
        let outcome = job.run();
        self.finish_export(outcome)
    }

    /// Start an export whose encoding runs elsewhere
    pub fn begin_export(&mut self, format: ExportFormat) -> Result<ExportJob, SessionError> {
        self.pipeline
            .begin_export(self.sync.current(), &self.title, format)
            .map_err(|err| {
                self.host.notify(&format!("Export failed: {err}"), Severity::Error);
                SessionError::from(ExportError::from(err))
            })
    }

    pub fn finish_export(
        &mut self,
        outcome: Result<ExportReport, FallbackExportError>,
    ) -> Result<ArtifactKind, SessionError> {
        match self.pipeline.finish_export(outcome) {
            Ok(report) => {
                let kind = report.artifact.kind;
                match report.primary_error {
                    None => self.host.notify(
                        &format!("Exported {}", report.artifact.file_name),
                        Severity::Success,
                    ),
                    Some(err) => self.host.notify(
                        &format!(
                            "Export failed ({err}); downloading the original document without your edits"
                        ),
                        Severity::Warning,
                    ),
                }
                self.host.offer_download(report.artifact);
                Ok(kind)
            }
            Err(err) => {
                self.host.notify(&format!("Export failed: {err}"), Severity::Error);
                Err(ExportError::from(err).into())
            }
        }
    }

    pub fn copy_plain_text(&mut self) -> Result<(), SessionError> {
        let text = self.surface.plain_text();
        match self.host.copy_to_clipboard(&text) {
            Ok(()) => {
                self.host.notify("Copied to clipboard", Severity::Success);
                Ok(())
            }
            Err(err) => {
                self.host.notify(&format!("Copy failed: {err}"), Severity::Error);
                Err(err.into())
            }
        }
    }

    /// Open the print view with the current content
    pub fn print(&mut self) {
        let html = print_page(
            &self.title,
            self.sync.current(),
            self.surface.document().page.as_ref(),
        );
        self.host.open_print_view(&html);
    }

    /// Global key bindings while mounted
    pub fn handle_key(&mut self, chord: KeyChord) -> KeyOutcome {
        let outcome = keymap::classify(chord);
        match outcome.action {
            Some(EditorAction::Save) => self.save(),
            Some(EditorAction::Undo) => {
                self.undo();
            }
            Some(EditorAction::Redo) => {
                self.redo();
            }
            None => {}
        }
        outcome
    }

    fn commit(&mut self) -> bool {
        let pushed = self.sync.capture(&mut self.surface);
        if pushed {
            self.status.mark_changed();
        }
        pushed
    }
}
