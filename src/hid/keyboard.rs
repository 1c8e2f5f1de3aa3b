//! HID keyboard report (boot protocol compatible).
//!
//! Layout (8 bytes):
//! ```text
//! Byte 0: Modifier keys (bitfield)
//!         Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!         Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!         Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!         Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1: Reserved (0x00)
//! Byte 2-7: Up to 6 simultaneous key codes (USB HID usage codes)
//! ```

use crate::macros::MacroAction;

/// Keyboard report size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 8;

/// Standard USB HID boot-protocol keyboard report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    pub modifier: u8,
    /// Reserved byte (always 0x00 per HID spec).
    pub reserved: u8,
    /// Up to 6 simultaneously pressed key codes.
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    /// Create an empty (all-keys-released) report.
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            reserved: 0,
            keycodes: [0; 6],
        }
    }

    pub fn to_bytes(&self) -> [u8; KEYBOARD_REPORT_SIZE] {
        let mut buf = [0u8; KEYBOARD_REPORT_SIZE];
        buf[0] = self.modifier;
        buf[1] = self.reserved;
        buf[2..].copy_from_slice(&self.keycodes);
        buf
    }

    /// Returns `true` if no keys are pressed (release event).
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycodes.iter().all(|&k| k == 0)
    }

    /// Release everything.
    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    /// Fold one macro action into the report.
    ///
    /// Release-all empties the report. Modifier actions set or clear
    /// their bits in byte 0. Other key presses take the first free slot
    /// (a seventh key is dropped); releases clear the first matching slot.
    pub fn apply(&mut self, action: MacroAction) {
        if action.is_release_all() {
            self.clear();
            return;
        }

        if action.is_modifier() {
            if action.is_press() {
                self.modifier |= action.key_code;
            } else {
                self.modifier &= !action.key_code;
            }
            return;
        }

        if action.is_press() {
            if let Some(slot) = self.keycodes.iter_mut().find(|k| **k == 0) {
                *slot = action.key_code;
            }
        } else if let Some(slot) = self.keycodes.iter_mut().find(|k| **k == action.key_code) {
            *slot = 0;
        }
    }
}
