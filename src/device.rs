//! The keypad as a whole - wires the catalog, key timing, LEDs, screen,
//! playback and storage together.
//!
//! [`Macropad`] owns every piece of mutable keypad state and is driven
//! from a single loop: one [`Macropad::poll`] per pass, plus
//! [`Macropad::handle_request`] / [`Macropad::finish_upload`] for work
//! requested over the host link. Hardware comes in through the
//! [`Display`], [`LedStrip`], [`ReportLink`], [`LightSensor`] and
//! [`ByteStore`] traits.

use crate::config::{
    AUTO_BRIGHTNESS_PERIOD_MS, BRIGHTNESS_DISPLAY_MS, LED_BLINK_MS, MAX_BRIGHTNESS,
};
use crate::controller::{elapsed, KeyEvent, KeyInputState};
use crate::hid::{HidExecutor, ReportLink};
use crate::keypad::{KeyRole, Position};
use crate::light::{LedBank, LedStrip, LightSensor};
use crate::macros::Catalog;
use crate::protocol::dump::{encode_catalog, CatalogDump};
use crate::protocol::{HostLink, Reply, TransferState};
use crate::storage::{self, ByteStore, DeviceSettings};
use crate::ui::{self, Display};

/// Bytes the main loop has to send back to the host.
#[derive(Debug, PartialEq, Eq)]
pub enum Outgoing {
    Catalog(CatalogDump),
    Reply(Reply),
}

/// Board adapters the keypad drives.
pub struct Peripherals<D, S, H, L, B> {
    pub display: D,
    pub strip: S,
    pub hid: H,
    pub sensor: L,
    pub store: B,
}

#[derive(Clone, Copy, Debug)]
struct Blink {
    pos: Position,
    since_ms: u32,
}

pub struct Macropad<D, S, H, L, B> {
    catalog: Catalog,
    leds: LedBank,
    executor: HidExecutor,
    input: KeyInputState,
    settings: DeviceSettings,
    io: Peripherals<D, S, H, L, B>,

    preview: bool,
    /// The brightness key is down; nothing plays until release.
    brightness_held: bool,
    connected: bool,
    blink: Option<Blink>,
    /// Level last shown on the "Brightness: N" screen.
    shown_level: u8,
    brightness_shown_since: Option<u32>,
    last_auto_sample_ms: u32,
    leds_dirty: bool,
}

impl<D, S, H, L, B> Macropad<D, S, H, L, B>
where
    D: Display,
    S: LedStrip,
    H: ReportLink,
    L: LightSensor,
    B: ByteStore,
{
    pub fn new(io: Peripherals<D, S, H, L, B>) -> Self {
        let settings = DeviceSettings::default();
        Self {
            catalog: Catalog::new(),
            leds: LedBank::new(),
            executor: HidExecutor::new(),
            input: KeyInputState::new(),
            shown_level: settings.brightness_level,
            settings,
            io,
            preview: false,
            brightness_held: false,
            connected: false,
            blink: None,
            brightness_shown_since: None,
            last_auto_sample_ms: 0,
            leds_dirty: false,
        }
    }

    pub fn show_splash(&mut self) {
        ui::show_splash(&mut self.io.display);
    }

    /// Clear the splash, load the catalog and settings from the store
    /// and light the keys.
    pub fn start(&mut self) -> DeviceSettings {
        self.io.display.clear(self.connected);

        let mut catalog = Catalog::new();
        self.leds.restore_all(&catalog);
        self.settings = storage::load(&mut self.io.store, &mut catalog, &mut self.leds);
        self.catalog = catalog;
        self.shown_level = self.settings.brightness_level;

        self.refresh_leds();
        info!("Keypad started");
        self.settings
    }

    pub fn settings(&self) -> DeviceSettings {
        self.settings
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn leds(&self) -> &LedBank {
        &self.leds
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn peripherals(&self) -> &Peripherals<D, S, H, L, B> {
        &self.io
    }

    pub fn peripherals_mut(&mut self) -> &mut Peripherals<D, S, H, L, B> {
        &mut self.io
    }

    /// Serve a request picked up from the host link. Uploads are not
    /// handled here; see [`Macropad::finish_upload`].
    pub fn handle_request(&mut self, request: TransferState) -> Option<Outgoing> {
        match request {
            TransferState::Idle | TransferState::Receiving => None,
            TransferState::SendCatalog => Some(Outgoing::Catalog(encode_catalog(&self.catalog))),
            TransferState::NotifyConnected => {
                self.connected = true;
                self.io.display.show_connected_glyph(true);
                None
            }
            TransferState::NotifyDisconnected => {
                self.connected = false;
                self.io.display.show_connected_glyph(false);
                None
            }
            TransferState::SendRepeatRate => {
                Some(Outgoing::Reply(Reply::RepeatRate(self.settings.repeat_rate_ms)))
            }
            TransferState::SendInitialDelay => {
                Some(Outgoing::Reply(Reply::InitialDelay(self.settings.initial_repeat_delay_ms)))
            }
        }
    }

    /// Decode a drained upload, persist everything and refresh.
    pub fn finish_upload(&mut self, link: &HostLink) {
        self.settings = link.complete_upload(&mut self.catalog, &mut self.leds);
        storage::store(&mut self.io.store, &self.catalog, &self.settings);
        self.input.forget_last_position();
        self.leds_dirty = true;
        self.refresh_leds();
        info!("Upload stored");
    }

    /// One main-loop pass.
    pub fn poll(&mut self, now_ms: u32, scanned: Option<Position>) {
        let events = self.input.update(
            now_ms,
            scanned,
            self.settings.initial_repeat_delay_ms,
            self.settings.repeat_rate_ms,
        );

        for event in events {
            match event {
                KeyEvent::Released => {
                    self.brightness_held = false;
                    self.leds.restore_all(&self.catalog);
                    self.leds_dirty = true;
                }
                KeyEvent::Pressed(pos) => {
                    match pos.role() {
                        KeyRole::BrightnessCycle => {
                            self.cycle_brightness();
                            self.brightness_held = true;
                        }
                        KeyRole::PreviewToggle => self.toggle_preview(),
                        KeyRole::Macro(_) => {}
                    }
                    self.fire(pos, now_ms);
                }
                KeyEvent::Repeat(pos) => self.fire(pos, now_ms),
            }
        }

        self.update_blink(now_ms);

        if self.preview && self.input.take_name_dirty() {
            if let Some(pos) = self.input.last_position() {
                self.show_name(pos);
            }
        }

        if self.settings.auto_brightness
            && elapsed(now_ms, self.last_auto_sample_ms, AUTO_BRIGHTNESS_PERIOD_MS)
        {
            self.settings.brightness_level = self.io.sensor.sample_level().min(MAX_BRIGHTNESS);
            self.last_auto_sample_ms = now_ms;
            self.leds_dirty = true;
        }

        self.update_brightness_screen(now_ms);

        if self.leds_dirty {
            self.refresh_leds();
        }
    }

    fn fire(&mut self, pos: Position, now_ms: u32) {
        if self.preview || self.brightness_held {
            return;
        }
        self.executor.execute(&self.catalog, pos, &mut self.io.hid);
        self.leds.turn_off(pos);
        self.blink = Some(Blink { pos, since_ms: now_ms });
        self.leds_dirty = true;
    }

    fn update_blink(&mut self, now_ms: u32) {
        let Some(blink) = self.blink else {
            return;
        };
        if !elapsed(now_ms, blink.since_ms, LED_BLINK_MS) {
            return;
        }

        self.blink = None;
        self.leds.turn_on(blink.pos, &self.catalog);
        self.leds_dirty = true;

        if self.input.take_name_dirty() {
            self.show_name(blink.pos);
        }
    }

    fn show_name(&mut self, pos: Position) {
        if pos == Position::PREVIEW {
            return;
        }
        if self.catalog.action_count(pos) == 0 {
            self.io.display.clear(self.connected);
            return;
        }
        ui::show_name(&mut self.io.display, self.connected, self.catalog.name(pos));
    }

    /// Manual level 0..9, then auto, then back to manual level 0.
    fn cycle_brightness(&mut self) {
        let settings = &mut self.settings;
        if settings.auto_brightness {
            settings.auto_brightness = false;
            settings.brightness_level = 0;
        } else if settings.brightness_level >= MAX_BRIGHTNESS {
            settings.auto_brightness = true;
            if self.brightness_shown_since.take().is_some() {
                self.io.display.clear(self.connected);
            }
        } else {
            settings.brightness_level += 1;
        }

        storage::store_brightness(&mut self.io.store, &self.settings);
        debug!(
            "Brightness key: level {} auto {}",
            self.settings.brightness_level, self.settings.auto_brightness
        );
    }

    fn toggle_preview(&mut self) {
        self.preview = !self.preview;
        self.catalog.set_action_count(Position::PREVIEW, self.preview as u8);
        self.leds_dirty = true;
        info!("Preview mode {}", self.preview);
    }

    /// Show "Brightness: N" for a second after any manual level change.
    fn update_brightness_screen(&mut self, now_ms: u32) {
        let level = self.settings.brightness_level;
        if level != self.shown_level && !self.settings.auto_brightness {
            if !self.brightness_held {
                self.input.forget_last_position();
            }
            ui::show_brightness(&mut self.io.display, self.connected, level);
            self.shown_level = level;
            self.brightness_shown_since = Some(now_ms);
            self.leds_dirty = true;
        }

        if let Some(since) = self.brightness_shown_since {
            if elapsed(now_ms, since, BRIGHTNESS_DISPLAY_MS) {
                self.io.display.clear(self.connected);
                self.shown_level = level;
                self.brightness_shown_since = None;
            }
        }
    }

    fn refresh_leds(&mut self) {
        let level = self.settings.brightness_level;
        let frame = self.leds.render(&self.catalog, level);
        self.io.strip.write_frame(&frame);
        self.io.display.set_backlight(level);
        self.leds_dirty = false;
    }
}
