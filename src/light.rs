//! Key LEDs and ambient light.
//!
//! [`LedBank`] keeps the colour each key LED should currently show
//! (normally the macro colour, black while blinking). Rendering a frame
//! scales every channel by the brightness level and darkens keys with no
//! actions; the scaled frame goes out through [`LedStrip`].

use smart_leds::RGB8;

use crate::config::{KEY_COUNT, MAX_BRIGHTNESS};
use crate::keypad::Position;
use crate::macros::{Catalog, Colour};

const BLACK: Colour = RGB8 { r: 0, g: 0, b: 0 };

/// Sink for a rendered LED frame, in key-number order.
pub trait LedStrip {
    fn write_frame(&mut self, frame: &[Colour; KEY_COUNT]);
}

/// Ambient light sensor reduced to a brightness level.
pub trait LightSensor {
    /// Current level, 0..=9.
    fn sample_level(&mut self) -> u8;
}

/// Colour currently assigned to each key LED, before brightness scaling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedBank {
    colours: [Colour; KEY_COUNT],
}

impl Default for LedBank {
    fn default() -> Self {
        Self::new()
    }
}

impl LedBank {
    pub const fn new() -> Self {
        Self {
            colours: [BLACK; KEY_COUNT],
        }
    }

    pub fn set(&mut self, pos: Position, colour: Colour) {
        self.colours[pos.index()] = colour;
    }

    pub fn get(&self, pos: Position) -> Colour {
        self.colours[pos.index()]
    }

    /// Blank one key (blink feedback).
    pub fn turn_off(&mut self, pos: Position) {
        self.set(pos, BLACK);
    }

    /// Put one key back to its stored macro colour.
    pub fn turn_on(&mut self, pos: Position, catalog: &Catalog) {
        self.set(pos, catalog.colour(pos));
    }

    /// Put every key back to its stored macro colour.
    pub fn restore_all(&mut self, catalog: &Catalog) {
        for pos in Position::all() {
            self.turn_on(pos, catalog);
        }
    }

    /// Scale to `level` and blank keys without actions.
    pub fn render(&self, catalog: &Catalog, level: u8) -> [Colour; KEY_COUNT] {
        let mut frame = [BLACK; KEY_COUNT];
        for pos in Position::all() {
            if catalog.action_count(pos) > 0 {
                frame[pos.index()] = scale(self.get(pos), level);
            }
        }
        frame
    }
}

/// Scale each channel as `(c / 9) * level`; the integer division can
/// round dim channels to zero at low levels.
pub fn scale(colour: Colour, level: u8) -> Colour {
    let level = level.min(MAX_BRIGHTNESS);
    let channel = |c: u8| (c / MAX_BRIGHTNESS) * level;
    RGB8 {
        r: channel(colour.r),
        g: channel(colour.g),
        b: channel(colour.b),
    }
}

/// Bucket a 10-bit light reading into a level: each 100 counts is one
/// step, and anything off the scale falls back to the middle level.
pub fn level_from_adc(raw: u16) -> u8 {
    match raw / 100 {
        bucket @ 0..=9 => bucket as u8,
        _ => 5,
    }
}
