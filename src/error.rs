//! Unified error type for the keypad firmware.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.
//!
//! The keypad core itself is total: these errors only come out of the
//! board adapters and out of validated constructors.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Keypad
    /// Column/row pair (or key number) outside the 4×3 matrix.
    InvalidPosition,

    // Storage
    /// Flash read/write/erase failed.
    Storage,

    // Host link
    /// USB serial endpoint returned an error or the host went away.
    Serial,
}
