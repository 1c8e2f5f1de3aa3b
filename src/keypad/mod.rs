//! Keypad subsystem - matrix positions and the ghost-rejecting scanner.
//!
//! The keypad is a 4-column × 3-row matrix. Keys are addressed either
//! by their `(column, row)` matrix position or by a stable key number:
//!
//! ```text
//!            col 0  col 1  col 2  col 3
//!   row 0      1      2      3      4
//!   row 1      5      6      7      8
//!   row 2      9     10    [11]   [12]
//! ```
//!
//! Keys 1-10 carry user macros. Key 11 cycles the brightness and key 12
//! toggles preview mode; neither ever plays a macro.

pub mod scanner;

use crate::config::{MATRIX_COLS, MATRIX_ROWS, PLAYABLE_KEYS};
use crate::error::Error;

pub use scanner::Scanner;

/// A validated position in the key matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position {
    col: u8,
    row: u8,
}

/// What a position does when pressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyRole {
    /// Plays the macro stored under this key number (1..=10).
    Macro(u8),
    /// Cycles the manual brightness level, then auto-brightness.
    BrightnessCycle,
    /// Toggles preview mode (names are shown, macros are not played).
    PreviewToggle,
}

impl Position {
    /// The brightness-cycle auxiliary key.
    pub const BRIGHTNESS: Position = Position { col: 2, row: 2 };
    /// The preview-toggle auxiliary key.
    pub const PREVIEW: Position = Position { col: 3, row: 2 };

    pub fn new(col: u8, row: u8) -> Result<Self, Error> {
        if (col as usize) < MATRIX_COLS && (row as usize) < MATRIX_ROWS {
            Ok(Self { col, row })
        } else {
            Err(Error::InvalidPosition)
        }
    }

    /// Look up the matrix position of a key number (1..=12).
    pub fn from_key_number(key: u8) -> Result<Self, Error> {
        if key == 0 || key as usize > MATRIX_COLS * MATRIX_ROWS {
            return Err(Error::InvalidPosition);
        }
        let index = key - 1;
        Ok(Self {
            col: index % MATRIX_COLS as u8,
            row: index / MATRIX_COLS as u8,
        })
    }

    /// Iterate over every matrix position in key-number order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..(MATRIX_COLS * MATRIX_ROWS) as u8).map(|i| Position {
            col: i % MATRIX_COLS as u8,
            row: i / MATRIX_COLS as u8,
        })
    }

    /// Iterate over the ten macro keys in key-number order.
    pub fn playable() -> impl Iterator<Item = Position> {
        Self::all().take(PLAYABLE_KEYS)
    }

    pub fn col(&self) -> u8 {
        self.col
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    /// Stable key number (1..=12).
    pub fn key_number(&self) -> u8 {
        self.row * MATRIX_COLS as u8 + self.col + 1
    }

    /// Zero-based index into per-key tables (key number - 1).
    pub fn index(&self) -> usize {
        self.key_number() as usize - 1
    }

    pub fn role(&self) -> KeyRole {
        match *self {
            Position::BRIGHTNESS => KeyRole::BrightnessCycle,
            Position::PREVIEW => KeyRole::PreviewToggle,
            _ => KeyRole::Macro(self.key_number()),
        }
    }

    pub fn is_auxiliary(&self) -> bool {
        !matches!(self.role(), KeyRole::Macro(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_numbers_follow_row_major_order() {
        assert_eq!(Position::new(0, 0).unwrap().key_number(), 1);
        assert_eq!(Position::new(3, 0).unwrap().key_number(), 4);
        assert_eq!(Position::new(0, 1).unwrap().key_number(), 5);
        assert_eq!(Position::new(1, 2).unwrap().key_number(), 10);
        assert_eq!(Position::BRIGHTNESS.key_number(), 11);
        assert_eq!(Position::PREVIEW.key_number(), 12);
    }

    #[test]
    fn key_number_lookup_is_inverse() {
        for key in 1..=12 {
            let pos = Position::from_key_number(key).unwrap();
            assert_eq!(pos.key_number(), key);
        }
        assert_eq!(Position::from_key_number(0), Err(Error::InvalidPosition));
        assert_eq!(Position::from_key_number(13), Err(Error::InvalidPosition));
    }

    #[test]
    fn out_of_matrix_positions_are_rejected() {
        assert_eq!(Position::new(4, 0), Err(Error::InvalidPosition));
        assert_eq!(Position::new(0, 3), Err(Error::InvalidPosition));
    }

    #[test]
    fn roles_split_playable_and_auxiliary() {
        assert_eq!(Position::playable().count(), 10);
        assert!(Position::playable().all(|p| !p.is_auxiliary()));
        assert_eq!(Position::BRIGHTNESS.role(), KeyRole::BrightnessCycle);
        assert_eq!(Position::PREVIEW.role(), KeyRole::PreviewToggle);
        assert_eq!(Position::from_key_number(5).unwrap().role(), KeyRole::Macro(5));
    }
}
