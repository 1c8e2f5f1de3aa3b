//! Macro catalog - the in-memory table of what every key plays.
//!
//! Each of the 12 matrix positions owns a [`MacroEntry`]: a name shown
//! on the display, an LED colour and up to [`MAX_ACTIONS`] actions.
//! The table holds no timing or transfer state; it is mutated by the
//! host protocol, the persistence codec and the preview toggle.

use smart_leds::RGB8;

use crate::config::{KEY_COUNT, MAX_ACTIONS, MAX_NAME_LEN};
use crate::keypad::Position;
use crate::light::LedBank;

/// Key colour as stored and sent to the host.
pub type Colour = RGB8;

pub const WHITE: Colour = RGB8 { r: 255, g: 255, b: 255 };

/// One step of a macro: a key code plus press/modifier flags.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacroAction {
    pub key_code: u8,
    pub flags: u8,
}

impl MacroAction {
    /// Flag bit: the key code is a modifier bitmask.
    pub const MODIFIER: u8 = 1 << 7;
    /// Flag bit: the action presses (rather than releases) the key.
    pub const PRESS: u8 = 1 << 6;
    /// Key code that releases every held key and modifier.
    pub const RELEASE_ALL: u8 = 0xFF;

    pub const fn new(key_code: u8, flags: u8) -> Self {
        Self { key_code, flags }
    }

    pub const fn press(key_code: u8) -> Self {
        Self::new(key_code, Self::PRESS)
    }

    pub const fn release(key_code: u8) -> Self {
        Self::new(key_code, 0)
    }

    pub const fn press_modifier(mask: u8) -> Self {
        Self::new(mask, Self::MODIFIER | Self::PRESS)
    }

    pub const fn release_modifier(mask: u8) -> Self {
        Self::new(mask, Self::MODIFIER)
    }

    pub const fn release_all() -> Self {
        Self::new(Self::RELEASE_ALL, 0)
    }

    pub fn is_modifier(&self) -> bool {
        self.flags & Self::MODIFIER != 0
    }

    pub fn is_press(&self) -> bool {
        self.flags & Self::PRESS != 0
    }

    pub fn is_release_all(&self) -> bool {
        self.key_code == Self::RELEASE_ALL
    }
}

/// Fixed-size, null-padded macro name.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct MacroName([u8; MAX_NAME_LEN]);

impl MacroName {
    /// Build from raw bytes, stopping at the first 0x00 and truncating
    /// to [`MAX_NAME_LEN`]; the remainder is zero-filled.
    pub fn from_bytes(raw: &[u8]) -> Self {
        let mut name = [0u8; MAX_NAME_LEN];
        for (dst, &src) in name.iter_mut().zip(raw.iter().take_while(|&&b| b != 0)) {
            *dst = src;
        }
        Self(name)
    }

    /// The name bytes up to (not including) the first 0x00.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
        &self.0[..len]
    }

    /// All 30 bytes including padding, as stored and transmitted.
    pub fn padded(&self) -> &[u8; MAX_NAME_LEN] {
        &self.0
    }

    /// Printable form; stops at the first byte that is not valid UTF-8.
    pub fn as_str(&self) -> &str {
        let bytes = self.as_bytes();
        match core::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

/// Everything stored for one key.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct MacroEntry {
    pub name: MacroName,
    pub colour: Colour,
    action_count: u8,
    actions: [MacroAction; MAX_ACTIONS],
}

impl MacroEntry {
    pub fn action_count(&self) -> u8 {
        self.action_count
    }

    /// The live actions; slots past the count are never exposed.
    pub fn actions(&self) -> &[MacroAction] {
        &self.actions[..self.action_count as usize]
    }
}

/// Macro table for all 12 matrix positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    entries: [MacroEntry; KEY_COUNT],
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Empty catalog with both auxiliary keys seeded white. The
    /// brightness key starts lit; the preview key stays dark until
    /// preview mode is switched on.
    pub fn new() -> Self {
        let mut entries = [MacroEntry::default(); KEY_COUNT];
        entries[Position::BRIGHTNESS.index()].colour = WHITE;
        entries[Position::BRIGHTNESS.index()].action_count = 1;
        entries[Position::PREVIEW.index()].colour = WHITE;
        Self { entries }
    }

    pub fn entry(&self, pos: Position) -> &MacroEntry {
        &self.entries[pos.index()]
    }

    pub fn set_name(&mut self, pos: Position, name: &[u8]) {
        self.entries[pos.index()].name = MacroName::from_bytes(name);
    }

    /// Store the key colour and push it to the LED bank straight away.
    pub fn set_colour(&mut self, pos: Position, colour: Colour, leds: &mut LedBank) {
        self.entries[pos.index()].colour = colour;
        leds.set(pos, colour);
    }

    /// Set how many actions are live. Counts above [`MAX_ACTIONS`] saturate.
    pub fn set_action_count(&mut self, pos: Position, count: u8) {
        self.entries[pos.index()].action_count = count.min(MAX_ACTIONS as u8);
    }

    /// Copy in actions for the current count; extra input is ignored and
    /// slots not covered by `actions` are left as they were.
    pub fn set_actions(&mut self, pos: Position, actions: &[MacroAction]) {
        let entry = &mut self.entries[pos.index()];
        let live = entry.action_count as usize;
        for (dst, src) in entry.actions[..live].iter_mut().zip(actions) {
            *dst = *src;
        }
    }

    pub fn action_count(&self, pos: Position) -> u8 {
        self.entries[pos.index()].action_count
    }

    pub fn name(&self, pos: Position) -> &MacroName {
        &self.entries[pos.index()].name
    }

    pub fn colour(&self, pos: Position) -> Colour {
        self.entries[pos.index()].colour
    }

    pub fn actions(&self, pos: Position) -> &[MacroAction] {
        self.entries[pos.index()].actions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> Position {
        Position::from_key_number(n).unwrap()
    }

    #[test]
    fn action_flags_decode() {
        let a = MacroAction::new(0x02, 0xC0);
        assert!(a.is_modifier());
        assert!(a.is_press());
        assert!(!a.is_release_all());

        let r = MacroAction::release(0x04);
        assert!(!r.is_modifier());
        assert!(!r.is_press());
        assert!(MacroAction::release_all().is_release_all());
    }

    #[test]
    fn name_stops_at_nul_and_truncates() {
        let name = MacroName::from_bytes(b"Copy\0junk");
        assert_eq!(name.as_bytes(), b"Copy");
        assert_eq!(name.as_str(), "Copy");
        assert_eq!(&name.padded()[4..9], &[0; 5]);

        let long = MacroName::from_bytes(&[b'x'; 40]);
        assert_eq!(long.len(), MAX_NAME_LEN);
    }

    #[test]
    fn name_with_invalid_utf8_prints_valid_prefix() {
        let name = MacroName::from_bytes(&[b'O', b'K', 0xFF, b'!']);
        assert_eq!(name.as_str(), "OK");
        assert_eq!(name.len(), 4);
    }

    #[test]
    fn new_catalog_seeds_auxiliary_keys() {
        let catalog = Catalog::new();
        assert_eq!(catalog.colour(Position::BRIGHTNESS), WHITE);
        assert_eq!(catalog.action_count(Position::BRIGHTNESS), 1);
        assert_eq!(catalog.colour(Position::PREVIEW), WHITE);
        assert_eq!(catalog.action_count(Position::PREVIEW), 0);
        assert!(Position::playable().all(|p| catalog.action_count(p) == 0));
    }

    #[test]
    fn action_count_saturates_and_limits_view() {
        let mut catalog = Catalog::new();
        catalog.set_action_count(key(3), 200);
        assert_eq!(catalog.action_count(key(3)), MAX_ACTIONS as u8);

        catalog.set_action_count(key(3), 2);
        catalog.set_actions(
            key(3),
            &[MacroAction::press(4), MacroAction::release(4), MacroAction::press(5)],
        );
        assert_eq!(catalog.actions(key(3)), &[MacroAction::press(4), MacroAction::release(4)]);
    }

    #[test]
    fn set_colour_reaches_led_bank() {
        let mut catalog = Catalog::new();
        let mut leds = LedBank::new();
        let green = Colour { r: 0, g: 255, b: 0 };
        catalog.set_colour(key(5), green, &mut leds);
        assert_eq!(catalog.colour(key(5)), green);
        assert_eq!(leds.get(key(5)), green);
    }
}
