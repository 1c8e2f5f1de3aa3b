//! Bulk catalog transfer.
//!
//! One record per key, key numbers 1..=10:
//!
//! ```text
//! 'M'  id  count  name[30]  r g b  (key_code flags) × count
//! ```
//!
//! An upload carries the same ten records followed by four settings
//! fields. Each settings field is preceded by one separator byte that is
//! skipped:
//!
//! ```text
//! _ delay_hi delay_lo  _ rate_hi rate_lo  _ auto  _ level
//! ```

use crate::config::{MAX_ACTIONS, MAX_BRIGHTNESS, MAX_DUMP_LEN, MAX_NAME_LEN, PLAYABLE_KEYS};
use crate::keypad::Position;
use crate::light::LedBank;
use crate::macros::{Catalog, Colour, MacroAction};
use crate::storage::DeviceSettings;

const RECORD_TAG: u8 = b'M';

pub type CatalogDump = heapless::Vec<u8, MAX_DUMP_LEN>;

/// Serialize the ten playable macros in key-number order.
pub fn encode_catalog(catalog: &Catalog) -> CatalogDump {
    let mut out = CatalogDump::new();

    for pos in Position::playable() {
        let entry = catalog.entry(pos);
        let Colour { r, g, b } = entry.colour;

        // Sized for ten full records; pushes cannot fail.
        let _ = out.push(RECORD_TAG);
        let _ = out.push(pos.key_number());
        let _ = out.push(entry.action_count());
        let _ = out.extend_from_slice(entry.name.padded());
        let _ = out.extend_from_slice(&[r, g, b]);
        for action in entry.actions() {
            let _ = out.extend_from_slice(&[action.key_code, action.flags]);
        }
    }

    debug!("Encoded catalog dump ({} bytes)", out.len());
    out
}

/// Reads past the end of the buffer yield zero.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn next(&mut self) -> u8 {
        let byte = self.bytes.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        byte
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    fn next_u16(&mut self) -> u16 {
        u16::from_be_bytes([self.next(), self.next()])
    }

    fn fill(&mut self, dst: &mut [u8]) {
        for b in dst {
            *b = self.next();
        }
    }
}

/// Decode an upload into `catalog` and return the uploaded settings.
///
/// Record ids outside 1..=10 are read and thrown away. A record's
/// action bytes are consumed for the full count it announces, but only
/// the first [`MAX_ACTIONS`] are kept. A short buffer is not detected:
/// the missing bytes read as zero.
pub fn decode_upload(bytes: &[u8], catalog: &mut Catalog, leds: &mut LedBank) -> DeviceSettings {
    let mut cursor = Cursor::new(bytes);

    for _ in 0..PLAYABLE_KEYS {
        cursor.skip(1);
        let id = cursor.next();
        let count = cursor.next();

        let mut name = [0u8; MAX_NAME_LEN];
        cursor.fill(&mut name);

        let colour = Colour {
            r: cursor.next(),
            g: cursor.next(),
            b: cursor.next(),
        };

        let mut actions = [MacroAction::default(); MAX_ACTIONS];
        for i in 0..count as usize {
            let action = MacroAction::new(cursor.next(), cursor.next());
            if let Some(slot) = actions.get_mut(i) {
                *slot = action;
            }
        }

        match Position::from_key_number(id) {
            Ok(pos) if !pos.is_auxiliary() => {
                catalog.set_action_count(pos, count);
                catalog.set_actions(pos, &actions);
                catalog.set_name(pos, &name);
                catalog.set_colour(pos, colour, leds);
            }
            _ => warn!("Discarding upload record for key id {}", id),
        }
    }

    cursor.skip(1);
    let initial_repeat_delay_ms = cursor.next_u16();
    cursor.skip(1);
    let repeat_rate_ms = cursor.next_u16();
    cursor.skip(1);
    let auto_brightness = cursor.next() != 0;
    cursor.skip(1);
    let brightness_level = cursor.next().min(MAX_BRIGHTNESS);

    DeviceSettings {
        brightness_level,
        auto_brightness,
        initial_repeat_delay_ms,
        repeat_rate_ms,
    }
}
