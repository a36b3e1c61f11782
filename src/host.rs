// Callbacks the embedding application provides to an editor session.

use crate::clipboard::{self, ClipboardError};
use crate::pipeline::Artifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// Host side of the mount contract.
///
/// Notifications are fire-and-forget: the session never waits on them and
/// never inspects what the host did with them.
pub trait Host {
    fn on_title_change(&mut self, title: &str);
    fn on_close(&mut self);
    fn notify(&mut self, message: &str, severity: Severity);
    fn offer_download(&mut self, artifact: Artifact);
    fn open_print_view(&mut self, html: &str);

    /// Asked before closing with unsaved changes. `true` saves first.
    fn confirm_save(&mut self) -> bool {
        false
    }

    fn copy_to_clipboard(&mut self, text: &str) -> Result<(), ClipboardError> {
        clipboard::copy_text(text)
    }
}
