/// A key press together with its modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyChord {
    pub key: char,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyChord {
    pub fn new(key: char) -> Self {
        KeyChord {
            key,
            ..Self::default()
        }
    }

    pub fn ctrl(key: char) -> Self {
        KeyChord {
            key,
            ctrl: true,
            ..Self::default()
        }
    }

    pub fn meta(key: char) -> Self {
        KeyChord {
            key,
            meta: true,
            ..Self::default()
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Ctrl on most platforms, Cmd on macOS
    pub fn has_accelerator(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    Save,
    Undo,
    Redo,
}

/// Result of offering a chord to the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOutcome {
    pub action: Option<EditorAction>,
    /// The host must suppress its own handling of the chord
    pub prevent_default: bool,
}

impl KeyOutcome {
    pub const PASS: KeyOutcome = KeyOutcome {
        action: None,
        prevent_default: false,
    };

    fn handled(action: EditorAction) -> Self {
        KeyOutcome {
            action: Some(action),
            prevent_default: true,
        }
    }
}

pub fn action_for(chord: KeyChord) -> Option<EditorAction> {
    if !chord.has_accelerator() || chord.alt {
        return None;
    }
    match (chord.key.to_ascii_lowercase(), chord.shift) {
        ('s', false) => Some(EditorAction::Save),
        ('z', false) => Some(EditorAction::Undo),
        ('z', true) | ('y', false) => Some(EditorAction::Redo),
        _ => None,
    }
}

pub fn classify(chord: KeyChord) -> KeyOutcome {
    match action_for(chord) {
        Some(action) => KeyOutcome::handled(action),
        None => KeyOutcome::PASS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bindings() {
        assert_eq!(action_for(KeyChord::ctrl('s')), Some(EditorAction::Save));
        assert_eq!(action_for(KeyChord::meta('s')), Some(EditorAction::Save));
        assert_eq!(action_for(KeyChord::ctrl('z')), Some(EditorAction::Undo));
        assert_eq!(action_for(KeyChord::ctrl('y')), Some(EditorAction::Redo));
        assert_eq!(action_for(KeyChord::meta('z').with_shift()), Some(EditorAction::Redo));
        // Shift reports the upper-case key on some platforms
        assert_eq!(action_for(KeyChord::ctrl('Z').with_shift()), Some(EditorAction::Redo));
    }

    #[test]
    fn test_other_chords_pass_through() {
        assert_eq!(classify(KeyChord::new('s')), KeyOutcome::PASS);
        assert_eq!(classify(KeyChord::ctrl('b')), KeyOutcome::PASS);
        assert_eq!(classify(KeyChord::ctrl('s').with_shift()), KeyOutcome::PASS);
        let mut alt = KeyChord::ctrl('z');
        alt.alt = true;
        assert_eq!(classify(alt), KeyOutcome::PASS);
    }

    #[test]
    fn test_handled_chords_prevent_default() {
        let outcome = classify(KeyChord::ctrl('z'));
        assert!(outcome.prevent_default);
        assert_eq!(outcome.action, Some(EditorAction::Undo));
    }
}
