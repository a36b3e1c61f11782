use arboard::Clipboard;

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard is empty")]
    Empty,
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

impl From<arboard::Error> for ClipboardError {
    fn from(err: arboard::Error) -> Self {
        match err {
            arboard::Error::ContentNotAvailable => ClipboardError::Empty,
            other => ClipboardError::Unavailable(other.to_string()),
        }
    }
}

/// Put plain text on the system clipboard
pub fn copy_text(text: &str) -> Result<(), ClipboardError> {
    let mut clipboard = Clipboard::new()?;
    clipboard.set_text(text)?;
    tracing::debug!(chars = text.chars().count(), "copied plain text to clipboard");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_content_maps_to_empty() {
        assert!(matches!(
            ClipboardError::from(arboard::Error::ContentNotAvailable),
            ClipboardError::Empty
        ));
        assert!(matches!(
            ClipboardError::from(arboard::Error::ClipboardNotSupported),
            ClipboardError::Unavailable(_)
        ));
    }
}
