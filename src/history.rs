/// Default cap on the number of snapshots kept in the undo stack.
pub const MAX_HISTORY: usize = 50;

/// Linear undo/redo history of document snapshots.
///
/// The last element of the undo stack is the current state; the stack never
/// becomes empty once constructed. The redo stack holds undone snapshots with
/// the most recently undone one on top.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    max_entries: usize,
    revision: u64,
}

impl History {
    pub fn new(initial: impl Into<String>) -> Self {
        Self::with_capacity(initial, MAX_HISTORY)
    }

    /// Create a history with a custom cap (a cap of 0 is treated as 1)
    pub fn with_capacity(initial: impl Into<String>, max_entries: usize) -> Self {
        History {
            undo_stack: vec![initial.into()],
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
            revision: 0,
        }
    }

    /// Record a new snapshot.
    /// Returns false when the snapshot equals the current one and nothing changed.
    pub fn push(&mut self, snapshot: impl Into<String>) -> bool {
        let snapshot = snapshot.into();
        if self.current() == snapshot {
            return false;
        }

        self.undo_stack.push(snapshot);
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }

        // Branching history is not supported
        self.redo_stack.clear();
        self.revision += 1;
        true
    }

    /// Step back one snapshot. The initial state is the floor.
    pub fn undo(&mut self) -> bool {
        if self.undo_stack.len() <= 1 {
            return false;
        }
        if let Some(popped) = self.undo_stack.pop() {
            self.redo_stack.push(popped);
            self.revision += 1;
            return true;
        }
        false
    }

    /// Re-apply the most recently undone snapshot
    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack.push(next);
                if self.undo_stack.len() > self.max_entries {
                    self.undo_stack.remove(0);
                }
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> &str {
        self.undo_stack.last().map(String::as_str).unwrap_or_default()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of snapshots in the undo stack, current included
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Bumped on every change of the current snapshot.
    /// Renderers compare it against the last value they drew.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
