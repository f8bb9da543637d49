//! Bounded undo/redo over geometric state
//!
//! Snapshots are deep copies of the corner set, position list, manual click
//! store, and array size. The undo stack holds at most `max_history`
//! entries, evicting the oldest; any new save clears the redo stack.

use std::collections::VecDeque;

use crate::geometry::{CornerSet, LedPosition};
use crate::manual::ManualPositionStore;

pub const DEFAULT_MAX_HISTORY: usize = 20;

/// Deep copy of the geometry/position state at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub corners: Option<CornerSet>,
    pub positions: Vec<LedPosition>,
    pub manual: ManualPositionStore,
    pub array_size: u32,
}

/// Undo and redo stacks. Callers snapshot around each logically atomic user
/// action; nothing here auto-snapshots.
#[derive(Debug)]
pub struct HistoryManager {
    history: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    max_history: usize,
}

impl HistoryManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            history: VecDeque::new(),
            redo: Vec::new(),
            max_history,
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Push a snapshot onto the undo stack. Evicts the oldest entry past
    /// the bound and clears the redo stack.
    pub fn save_state(&mut self, snapshot: Snapshot) {
        self.history.push_back(snapshot);
        if self.history.len() > self.max_history {
            self.history.pop_front();
        }
        self.redo.clear();
    }

    /// Pop the last snapshot, pushing `current` onto the redo stack.
    /// Returns None (nothing to undo) when the history is empty, leaving
    /// `current` untouched conceptually -- the caller keeps its state.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.history.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Symmetric to `undo`: pop the redo stack, pushing `current` back onto
    /// the history without the eviction/clearing of `save_state`.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.history.push_back(current);
        Some(next)
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}
