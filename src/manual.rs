//! Manually clicked LED positions
//!
//! When the grid-derived positions are unusable (dark LEDs, irregular
//! spacing), the user clicks every LED in strict row-major order: top-left
//! first, left to right, then the next row. The k-th click lands in cell
//! (k / n, k % n).

use serde::{Deserialize, Serialize};

use crate::geometry::LedPosition;

/// Outcome of recording a click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualClick {
    /// Click accepted; reports the cell it filled and overall progress.
    Placed {
        row: u32,
        col: u32,
        placed: usize,
        expected: usize,
    },
    /// All n² positions already set; the click was ignored.
    Complete,
}

/// Click store filled in strict row-major sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualPositionStore {
    n: u32,
    clicks: Vec<(i32, i32)>,
}

impl ManualPositionStore {
    pub fn new(n: u32) -> Self {
        Self {
            n,
            clicks: Vec::new(),
        }
    }

    pub fn expected(&self) -> usize {
        (self.n as usize) * (self.n as usize)
    }

    pub fn len(&self) -> usize {
        self.clicks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clicks.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.clicks.len() >= self.expected()
    }

    /// Record the next click in display coordinates.
    pub fn record_click(&mut self, x: i32, y: i32) -> ManualClick {
        if self.is_complete() {
            return ManualClick::Complete;
        }
        let k = self.clicks.len() as u32;
        self.clicks.push((x, y));
        ManualClick::Placed {
            row: k / self.n,
            col: k % self.n,
            placed: self.clicks.len(),
            expected: self.expected(),
        }
    }

    /// Discard all clicks, e.g. when the flow is cancelled or the array
    /// size changes out from under a partial store.
    pub fn clear(&mut self, n: u32) {
        self.n = n;
        self.clicks.clear();
    }

    /// Positions for the clicks recorded so far, in click (row-major) order.
    /// Used for measuring against a partially filled store.
    pub fn positions_so_far(&self) -> Vec<LedPosition> {
        self.clicks
            .iter()
            .enumerate()
            .map(|(k, &(x, y))| {
                let k = k as u32;
                LedPosition::new(x, y, k / self.n, k % self.n)
            })
            .collect()
    }

    /// Promote to the canonical position list. A partial store is not
    /// promoted; the caller reports it as incomplete instead.
    pub fn to_positions(&self) -> Option<Vec<LedPosition>> {
        if !self.is_complete() {
            return None;
        }
        Some(
            self.clicks
                .iter()
                .enumerate()
                .map(|(k, &(x, y))| {
                    let k = k as u32;
                    LedPosition::new(x, y, k / self.n, k % self.n)
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_assignment() {
        let mut store = ManualPositionStore::new(3);
        for k in 0..9 {
            let outcome = store.record_click(k * 10, k * 10 + 1);
            assert_eq!(
                outcome,
                ManualClick::Placed {
                    row: k as u32 / 3,
                    col: k as u32 % 3,
                    placed: k as usize + 1,
                    expected: 9,
                }
            );
        }
        assert!(store.is_complete());
    }

    #[test]
    fn test_rejects_when_full() {
        let mut store = ManualPositionStore::new(2);
        for k in 0..4 {
            store.record_click(k, k);
        }
        assert_eq!(store.record_click(99, 99), ManualClick::Complete);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_partial_store_not_promoted() {
        let mut store = ManualPositionStore::new(2);
        store.record_click(0, 0);
        store.record_click(10, 0);
        assert!(store.to_positions().is_none());
    }

    #[test]
    fn test_promotion_preserves_order() {
        let mut store = ManualPositionStore::new(2);
        let clicks = [(5, 6), (15, 6), (5, 16), (15, 16)];
        for &(x, y) in &clicks {
            store.record_click(x, y);
        }
        let positions = store.to_positions().unwrap();
        assert_eq!(positions.len(), 4);
        assert_eq!(positions[0], LedPosition::new(5, 6, 0, 0));
        assert_eq!(positions[1], LedPosition::new(15, 6, 0, 1));
        assert_eq!(positions[2], LedPosition::new(5, 16, 1, 0));
        assert_eq!(positions[3], LedPosition::new(15, 16, 1, 1));
    }

    #[test]
    fn test_clear_resets_progress() {
        let mut store = ManualPositionStore::new(2);
        store.record_click(1, 1);
        store.clear(3);
        assert!(store.is_empty());
        assert_eq!(store.expected(), 9);
    }
}
