//! Persistent settings and macros.
//!
//! The catalog and device settings live in a fixed byte-addressed
//! layout that both the firmware and older tooling agree on. All
//! access goes one byte at a time through [`ByteStore`].
//!
//! Storage layout (offsets in bytes, key order = key number 1..10):
//! ```text
//!     0   brightness level                  1
//!     1   auto-brightness flag              1
//!     2   initial repeat delay (BE u16)     2
//!     4   repeat rate (BE u16)              2
//!    10   names           10 × 30         300
//!   330   colours         10 × RGB         30
//!   360   action counts   10 × 1           10
//!   370   action lists    10 × 20 × 2     400
//! ```
//!
//! On the device the layout is mirrored in RAM by [`NvImage`] and kept
//! in internal flash as a single `sequential-storage` map item.

use crate::config::{
    BYTES_PER_ACTION, DEFAULT_BRIGHTNESS, DEFAULT_INITIAL_REPEAT_DELAY_MS, DEFAULT_REPEAT_RATE_MS,
    MAX_ACTIONS, MAX_NAME_LEN,
};
use crate::keypad::Position;
use crate::light::LedBank;
use crate::macros::{Catalog, Colour, MacroAction};

pub const BRIGHTNESS_ADDR: u16 = 0;
pub const AUTO_BRIGHTNESS_ADDR: u16 = 1;
pub const INITIAL_REPEAT_DELAY_ADDR: u16 = 2;
pub const REPEAT_RATE_ADDR: u16 = 4;
pub const NAMES_ADDR: u16 = 10;
pub const COLOURS_ADDR: u16 = 330;
pub const ACTION_COUNTS_ADDR: u16 = 360;
pub const ACTIONS_ADDR: u16 = 370;

const COLOUR_LEN: u16 = 3;
const ACTION_LIST_LEN: u16 = (MAX_ACTIONS * BYTES_PER_ACTION) as u16;

/// Total size of the layout.
pub const LAYOUT_LEN: usize = ACTIONS_ADDR as usize + 10 * ACTION_LIST_LEN as usize;

/// Byte-addressed non-volatile memory. Writes always complete.
pub trait ByteStore {
    fn read_byte(&mut self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, value: u8);
}

/// Device-wide settings persisted next to the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceSettings {
    /// Manual brightness level, 0..=9.
    pub brightness_level: u8,
    pub auto_brightness: bool,
    pub initial_repeat_delay_ms: u16,
    pub repeat_rate_ms: u16,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            brightness_level: DEFAULT_BRIGHTNESS,
            auto_brightness: false,
            initial_repeat_delay_ms: DEFAULT_INITIAL_REPEAT_DELAY_MS,
            repeat_rate_ms: DEFAULT_REPEAT_RATE_MS,
        }
    }
}

fn write_u16(store: &mut impl ByteStore, addr: u16, value: u16) {
    let [hi, lo] = value.to_be_bytes();
    store.write_byte(addr, hi);
    store.write_byte(addr + 1, lo);
}

fn read_u16(store: &mut impl ByteStore, addr: u16) -> u16 {
    u16::from_be_bytes([store.read_byte(addr), store.read_byte(addr + 1)])
}

/// Offsets of one key's fields, `slot` = key number - 1.
fn name_addr(slot: u16) -> u16 {
    NAMES_ADDR + slot * MAX_NAME_LEN as u16
}

fn colour_addr(slot: u16) -> u16 {
    COLOURS_ADDR + slot * COLOUR_LEN
}

fn actions_addr(slot: u16) -> u16 {
    ACTIONS_ADDR + slot * ACTION_LIST_LEN
}

/// Write only the brightness level and auto-brightness flag.
pub fn store_brightness(store: &mut impl ByteStore, settings: &DeviceSettings) {
    store.write_byte(BRIGHTNESS_ADDR, settings.brightness_level);
    store.write_byte(AUTO_BRIGHTNESS_ADDR, settings.auto_brightness as u8);
}

/// Write the settings and all ten macros.
///
/// Only the live actions of each macro are written; the rest of each
/// action list keeps whatever it held before.
pub fn store(store: &mut impl ByteStore, catalog: &Catalog, settings: &DeviceSettings) {
    write_u16(store, INITIAL_REPEAT_DELAY_ADDR, settings.initial_repeat_delay_ms);
    write_u16(store, REPEAT_RATE_ADDR, settings.repeat_rate_ms);
    store_brightness(store, settings);

    for pos in Position::playable() {
        let slot = pos.index() as u16;
        let entry = catalog.entry(pos);

        for (i, &b) in entry.name.padded().iter().enumerate() {
            store.write_byte(name_addr(slot) + i as u16, b);
        }

        let Colour { r, g, b } = entry.colour;
        for (i, c) in [r, g, b].into_iter().enumerate() {
            store.write_byte(colour_addr(slot) + i as u16, c);
        }

        store.write_byte(ACTION_COUNTS_ADDR + slot, entry.action_count());

        for (i, action) in entry.actions().iter().enumerate() {
            let addr = actions_addr(slot) + (i * BYTES_PER_ACTION) as u16;
            store.write_byte(addr, action.key_code);
            store.write_byte(addr + 1, action.flags);
        }
    }

    debug!("Stored settings and {} macros", Position::playable().count());
}

/// Rebuild the settings and the ten macros from the store.
///
/// Colours are pushed into `leds` as they are loaded. Stored action
/// counts above the maximum saturate.
pub fn load(store: &mut impl ByteStore, catalog: &mut Catalog, leds: &mut LedBank) -> DeviceSettings {
    let settings = DeviceSettings {
        brightness_level: store.read_byte(BRIGHTNESS_ADDR),
        auto_brightness: store.read_byte(AUTO_BRIGHTNESS_ADDR) != 0,
        initial_repeat_delay_ms: read_u16(store, INITIAL_REPEAT_DELAY_ADDR),
        repeat_rate_ms: read_u16(store, REPEAT_RATE_ADDR),
    };

    for pos in Position::playable() {
        let slot = pos.index() as u16;

        let mut name = [0u8; MAX_NAME_LEN];
        for (i, b) in name.iter_mut().enumerate() {
            *b = store.read_byte(name_addr(slot) + i as u16);
        }
        catalog.set_name(pos, &name);

        let colour = Colour {
            r: store.read_byte(colour_addr(slot)),
            g: store.read_byte(colour_addr(slot) + 1),
            b: store.read_byte(colour_addr(slot) + 2),
        };
        catalog.set_colour(pos, colour, leds);

        catalog.set_action_count(pos, store.read_byte(ACTION_COUNTS_ADDR + slot));

        let mut actions = [MacroAction::default(); MAX_ACTIONS];
        let live = catalog.action_count(pos) as usize;
        for (i, action) in actions[..live].iter_mut().enumerate() {
            let addr = actions_addr(slot) + (i * BYTES_PER_ACTION) as u16;
            *action = MacroAction::new(store.read_byte(addr), store.read_byte(addr + 1));
        }
        catalog.set_actions(pos, &actions[..live]);
    }

    info!("Loaded settings: {}", settings);
    settings
}

/// RAM mirror of the whole layout.
///
/// Tracks whether anything changed since the last time it was synced
/// with flash.
pub struct NvImage {
    bytes: [u8; LAYOUT_LEN],
    /// Dirty flag - true if the image differs from flash.
    dirty: bool,
}

impl Default for NvImage {
    fn default() -> Self {
        Self::new()
    }
}

impl NvImage {
    /// All-zero image.
    pub const fn new() -> Self {
        Self {
            bytes: [0; LAYOUT_LEN],
            dirty: false,
        }
    }

    /// Image holding the default settings and an empty catalog.
    pub fn with_defaults() -> Self {
        let mut image = Self::new();
        store(&mut image, &Catalog::new(), &DeviceSettings::default());
        image
    }

    pub fn as_bytes(&self) -> &[u8; LAYOUT_LEN] {
        &self.bytes
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl ByteStore for NvImage {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.bytes.get(addr as usize).copied().unwrap_or(0)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        if let Some(slot) = self.bytes.get_mut(addr as usize) {
            if *slot != value {
                *slot = value;
                self.dirty = true;
            }
        }
    }
}

#[cfg(feature = "embedded")]
pub use flash::*;

#[cfg(feature = "embedded")]
mod flash {
    use super::{NvImage, LAYOUT_LEN};
    use crate::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
    use crate::error::Error;
    use embedded_storage_async::nor_flash::NorFlash;
    use sequential_storage::cache::NoCache;

    /// Flash page size for nRF52840 (4 KB).
    const FLASH_PAGE_SIZE: u32 = 4096;

    /// Start address of our storage region.
    const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

    /// End address (exclusive) of our storage region.
    const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

    /// Key for the settings image in the map storage.
    const KEY_SETTINGS_IMAGE: u8 = 0x01;

    /// Scratch size for sequential-storage (item + header, word aligned).
    const SCRATCH_LEN: usize = 1024;

    impl NvImage {
        /// Load the image from flash, falling back to defaults when no
        /// image has been saved yet or it has the wrong size.
        pub async fn load_from_flash(flash: &mut impl NorFlash) -> Self {
            let mut buf = [0u8; SCRATCH_LEN];

            match sequential_storage::map::fetch_item::<u8, &[u8], _>(
                flash,
                STORAGE_START..STORAGE_END,
                &mut NoCache::new(),
                &mut buf,
                &KEY_SETTINGS_IMAGE,
            )
            .await
            {
                Ok(Some(data)) if data.len() == LAYOUT_LEN => {
                    let mut image = NvImage::new();
                    image.bytes.copy_from_slice(data);
                    info!("Loaded settings image from flash");
                    image
                }
                Ok(Some(data)) => {
                    warn!("Settings image has {} bytes - using defaults", data.len());
                    Self::fresh()
                }
                Ok(None) => {
                    info!("No settings image in flash - using defaults");
                    Self::fresh()
                }
                Err(e) => {
                    error!("Flash read error: {:?}", defmt::Debug2Format(&e));
                    Self::fresh()
                }
            }
        }

        /// Defaults, marked dirty so they reach flash on the next save.
        fn fresh() -> Self {
            let mut image = Self::with_defaults();
            image.dirty = true;
            image
        }

        /// Persist the image if it changed since the last sync.
        pub async fn save_to_flash(&mut self, flash: &mut impl NorFlash) -> Result<(), Error> {
            if !self.dirty {
                debug!("NvImage: no changes to save");
                return Ok(());
            }

            let mut buf = [0u8; SCRATCH_LEN];
            let item: &[u8] = &self.bytes;

            sequential_storage::map::store_item::<u8, &[u8], _>(
                flash,
                STORAGE_START..STORAGE_END,
                &mut NoCache::new(),
                &mut buf,
                &KEY_SETTINGS_IMAGE,
                &item,
            )
            .await
            .map_err(|e| {
                error!("Flash write error: {:?}", defmt::Debug2Format(&e));
                Error::Storage
            })?;

            info!("Saved settings image ({} bytes)", LAYOUT_LEN);
            self.dirty = false;
            Ok(())
        }
    }
}
