//! Ghost-rejecting matrix scanner.
//!
//! Each column is driven high in turn while all rows are sampled. A
//! sweep is only trusted when exactly one switch reads active: two or
//! more simultaneous contacts can alias other positions through the
//! diode-less matrix, so they are rejected as a whole rather than
//! guessed at. Time-based debounce lives in the input controller.

use embedded_hal::digital::{InputPin, OutputPin};

use super::Position;
use crate::config::{MATRIX_COLS, MATRIX_ROWS};

/// Key matrix with column outputs and row inputs (both active high).
pub struct Scanner<In: InputPin, Out: OutputPin> {
    /// Row inputs, pulled down externally or internally.
    rows: [In; MATRIX_ROWS],
    /// Column drivers.
    cols: [Out; MATRIX_COLS],
}

impl<In: InputPin, Out: OutputPin> Scanner<In, Out> {
    pub fn new(rows: [In; MATRIX_ROWS], mut cols: [Out; MATRIX_COLS]) -> Self {
        for col in cols.iter_mut() {
            col.set_low().ok();
        }
        Self { rows, cols }
    }

    /// Sweep the whole matrix once.
    ///
    /// Returns the active position only if it was the sole active switch
    /// in the sweep. A failed pin read counts as inactive.
    pub fn scan(&mut self) -> Option<Position> {
        let mut active = 0u8;
        let mut found = None;

        for (col_idx, col) in self.cols.iter_mut().enumerate() {
            col.set_high().ok();
            for (row_idx, row) in self.rows.iter_mut().enumerate() {
                if row.is_high().unwrap_or(false) {
                    active = active.saturating_add(1);
                    found = Position::new(col_idx as u8, row_idx as u8).ok();
                }
            }
            col.set_low().ok();
        }

        resolve_sweep(active, found)
    }

    #[cfg(test)]
    pub(crate) fn release(self) -> ([In; MATRIX_ROWS], [Out; MATRIX_COLS]) {
        (self.rows, self.cols)
    }
}

/// Apply the ghosting rule to the result of one sweep.
pub fn resolve_sweep(active: u8, last_seen: Option<Position>) -> Option<Position> {
    if active == 1 {
        last_seen
    } else {
        None
    }
}
