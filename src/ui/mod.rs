//! User interface - the OLED status screen.
//!
//! The keypad only ever shows one thing at a time: the splash, the name
//! of the last key pressed, or the brightness level after a change. A
//! small glyph in the corner tracks whether the desktop tool is
//! connected and is redrawn on every clear.
//!
//! ## Components
//!
//! - **Display**: trait over the screen so the screens can be tested
//! - **OledDisplay**: SSD1306 128×64 OLED via I²C (embedded only)

#[cfg(feature = "embedded")]
pub mod display;

use core::fmt::Write;

use crate::config::{DISPLAY_WIDTH, FONT_WIDTH, TEXT_LINE_Y};
use crate::macros::MacroName;

/// Text screen with a connection glyph and an adjustable backlight.
pub trait Display {
    /// Blank the screen, keeping the connection glyph if `connected`.
    fn clear(&mut self, connected: bool);
    /// Draw `text` with its top-left corner at (`x`, `y`).
    fn draw_text(&mut self, text: &str, x: i32, y: i32);
    fn show_connected_glyph(&mut self, on: bool);
    /// Backlight level, 0..=9.
    fn set_backlight(&mut self, level: u8);
}

/// X offset that centres `len` glyphs on the screen.
pub fn centred_x(len: usize) -> i32 {
    let width = len as i32 * FONT_WIDTH;
    ((DISPLAY_WIDTH - width) / 2).max(0)
}

fn draw_centred(display: &mut impl Display, text: &str, y: i32) {
    display.draw_text(text, centred_x(text.len()), y);
}

/// Product name and version.
pub fn show_splash(display: &mut impl Display) {
    display.clear(false);
    draw_centred(display, "Macropad", TEXT_LINE_Y - 12);
    draw_centred(display, concat!("v", env!("CARGO_PKG_VERSION")), TEXT_LINE_Y + 4);
}

pub fn show_name(display: &mut impl Display, connected: bool, name: &MacroName) {
    display.clear(connected);
    draw_centred(display, name.as_str(), TEXT_LINE_Y);
}

pub fn show_brightness(display: &mut impl Display, connected: bool, level: u8) {
    let mut text: heapless::String<16> = heapless::String::new();
    let _ = write!(text, "Brightness: {}", level);

    display.clear(connected);
    draw_centred(display, &text, TEXT_LINE_Y);
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Display;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Op {
        Clear(bool),
        Text(String, i32, i32),
        Glyph(bool),
        Backlight(u8),
    }

    /// Records every call for inspection.
    #[derive(Default)]
    pub struct RecordingDisplay {
        pub ops: Vec<Op>,
    }

    impl RecordingDisplay {
        /// Text drawn since the last clear.
        pub fn screen(&self) -> Vec<String> {
            let start = self
                .ops
                .iter()
                .rposition(|op| matches!(op, Op::Clear(_)))
                .map_or(0, |i| i + 1);
            self.ops[start..]
                .iter()
                .filter_map(|op| match op {
                    Op::Text(t, _, _) => Some(t.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn last_backlight(&self) -> Option<u8> {
            self.ops.iter().rev().find_map(|op| match op {
                Op::Backlight(level) => Some(*level),
                _ => None,
            })
        }
    }

    impl Display for RecordingDisplay {
        fn clear(&mut self, connected: bool) {
            self.ops.push(Op::Clear(connected));
        }

        fn draw_text(&mut self, text: &str, x: i32, y: i32) {
            self.ops.push(Op::Text(text.into(), x, y));
        }

        fn show_connected_glyph(&mut self, on: bool) {
            self.ops.push(Op::Glyph(on));
        }

        fn set_backlight(&mut self, level: u8) {
            self.ops.push(Op::Backlight(level));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{Op, RecordingDisplay};
    use super::*;

    #[test]
    fn names_are_centred() {
        assert_eq!(centred_x(0), 64);
        assert_eq!(centred_x(4), 52);
        assert_eq!(centred_x(21), 1);
        // Too wide to centre: pinned to the left edge.
        assert_eq!(centred_x(30), 0);
    }

    #[test]
    fn name_screen_clears_then_draws() {
        let mut display = RecordingDisplay::default();
        show_name(&mut display, true, &MacroName::from_bytes(b"Copy"));
        assert_eq!(
            display.ops,
            vec![Op::Clear(true), Op::Text("Copy".into(), 52, TEXT_LINE_Y)]
        );
    }

    #[test]
    fn brightness_screen_text() {
        let mut display = RecordingDisplay::default();
        show_brightness(&mut display, false, 7);
        assert_eq!(display.screen(), vec!["Brightness: 7".to_string()]);
    }

    #[test]
    fn splash_shows_product_and_version() {
        let mut display = RecordingDisplay::default();
        show_splash(&mut display);
        let screen = display.screen();
        assert_eq!(screen[0], "Macropad");
        assert!(screen[1].starts_with('v'));
    }
}
