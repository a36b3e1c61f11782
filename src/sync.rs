// Keeps an EditableSurface and its History consistent.
// Mutations are captured as snapshots; the selection seen before a capture is
// restored once the surface has re-rendered.

use crate::content::EditableSurface;
use crate::history::History;
use crate::richtext::structured_editor::SelectionRange;

#[derive(Debug, Clone)]
pub struct ContentSync {
    history: History,
    /// Selection to restore on the next `after_render`
    pending_restore: Option<SelectionRange>,
}

impl ContentSync {
    /// Seed the history with the surface's initial snapshot
    pub fn seed(initial: impl Into<String>, max_history: usize) -> Self {
        ContentSync {
            history: History::with_capacity(initial, max_history),
            pending_restore: None,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current(&self) -> &str {
        self.history.current()
    }

    /// Observed field for renderers: changes whenever `current()` does
    pub fn revision(&self) -> u64 {
        self.history.revision()
    }

    pub fn pending_restore(&self) -> Option<SelectionRange> {
        self.pending_restore
    }

    /// Record the surface state after a mutation.
    /// Returns true when a new snapshot was pushed.
    pub fn capture<S>(&mut self, surface: &mut S) -> bool
    where
        S: EditableSurface + ?Sized,
    {
        let selection = surface.selection().ok();
        let pushed = self.history.push(surface.serialize());
        self.pending_restore = selection;
        pushed
    }

    /// Restore the selection recorded by the last capture, clamped to the
    /// new content. Failures are swallowed.
    pub fn after_render<S>(&mut self, surface: &mut S)
    where
        S: EditableSurface + ?Sized,
    {
        let Some(range) = self.pending_restore.take() else {
            return;
        };
        let clamped = range.clamp_to(surface.text_len());
        if let Err(err) = surface.set_selection(clamped) {
            tracing::trace!(error = %err, "selection restore skipped");
        }
    }

    pub fn undo<S>(&mut self, surface: &mut S) -> bool
    where
        S: EditableSurface + ?Sized,
    {
        if !self.history.undo() {
            return false;
        }
        self.replace_surface(surface);
        true
    }

    pub fn redo<S>(&mut self, surface: &mut S) -> bool
    where
        S: EditableSurface + ?Sized,
    {
        if !self.history.redo() {
            return false;
        }
        self.replace_surface(surface);
        true
    }

    /// Load the current snapshot into the surface and refocus it.
    /// The old cursor is kept when it still fits, otherwise it goes to 0.
    fn replace_surface<S>(&mut self, surface: &mut S)
    where
        S: EditableSurface + ?Sized,
    {
        self.pending_restore = None;
        let previous = surface.selection().ok();

        if let Err(err) = surface.load_markup(self.history.current()) {
            tracing::warn!(error = %err, "history snapshot did not load");
        }
        surface.focus();

        let len = surface.text_len();
        let range = previous
            .filter(|r| r.start.max(r.end) <= len)
            .unwrap_or(SelectionRange::collapsed(0));
        if let Err(err) = surface.set_selection(range) {
            tracing::trace!(error = %err, "cursor not restored after history step");
        }
    }
}
