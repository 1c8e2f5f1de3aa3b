//! Programmable 12-key macro keypad.
//!
//! Ten keys play user-defined macros (key presses, modifiers, a name and
//! an LED colour each); the remaining two cycle the LED brightness and
//! toggle a preview mode. Macros are edited by a desktop tool over USB
//! serial and played to the computer as 8-byte boot keyboard reports
//! through a bridge on a secondary SPI link.
//!
//! The keypad logic is hardware-independent and builds on the host for
//! testing. Board adapters (USB serial, OLED, WS2812 strip, flash) are
//! behind the `embedded` feature; `main.rs` wires them up.
//!
//! Usage: `cargo test --lib` for the unit tests, `cargo test` for all.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod hid;
pub mod keypad;
pub mod light;
pub mod macros;
pub mod protocol;
pub mod storage;
pub mod ui;

#[cfg(feature = "embedded")]
pub mod usb;

pub use device::{Macropad, Outgoing, Peripherals};
pub use error::Error;
pub use keypad::Position;

// ═══════════════════════════════════════════════════════════════════════════
// Cross-module Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use crate::config::KEY_COUNT;
    use crate::hid::ReportLink;
    use crate::keypad::scanner::Scanner;
    use crate::light::{LedStrip, LightSensor};
    use crate::macros::{Catalog, Colour, MacroAction};
    use crate::protocol::dump::encode_catalog;
    use crate::protocol::{HostLink, TransferState};
    use crate::storage::{self, DeviceSettings, NvImage};
    use crate::ui::mock::RecordingDisplay;
    use crate::{Macropad, Outgoing, Peripherals, Position};

    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    struct NullStrip;

    impl LedStrip for NullStrip {
        fn write_frame(&mut self, _frame: &[Colour; KEY_COUNT]) {}
    }

    struct FixedSensor;

    impl LightSensor for FixedSensor {
        fn sample_level(&mut self) -> u8 {
            4
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: Vec<[u8; 8]>,
    }

    impl ReportLink for Recorder {
        fn send_report(&mut self, report: &[u8; 8]) {
            self.sent.push(*report);
        }
    }

    type Pad = Macropad<RecordingDisplay, NullStrip, Recorder, FixedSensor, NvImage>;

    fn fresh_pad() -> Pad {
        let mut pad = Macropad::new(Peripherals {
            display: RecordingDisplay::default(),
            strip: NullStrip,
            hid: Recorder::default(),
            sensor: FixedSensor,
            store: NvImage::with_defaults(),
        });
        pad.show_splash();
        pad.start();
        pad
    }

    fn key(n: u8) -> Position {
        Position::from_key_number(n).unwrap()
    }

    /// Upload bytes for `catalog` with the given settings tail.
    fn upload_bytes(catalog: &Catalog, settings: &DeviceSettings) -> Vec<u8> {
        let mut bytes = encode_catalog(catalog).to_vec();
        let [dh, dl] = settings.initial_repeat_delay_ms.to_be_bytes();
        let [rh, rl] = settings.repeat_rate_ms.to_be_bytes();
        bytes.extend_from_slice(&[
            0,
            dh,
            dl,
            0,
            rh,
            rl,
            0,
            settings.auto_brightness as u8,
            0,
            settings.brightness_level,
        ]);
        bytes
    }

    fn copy_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        let mut leds = crate::light::LedBank::new();
        catalog.set_name(key(5), b"Copy");
        catalog.set_colour(key(5), Colour { r: 0, g: 255, b: 0 }, &mut leds);
        catalog.set_action_count(key(5), 2);
        catalog.set_actions(
            key(5),
            &[
                MacroAction::new(0x06, MacroAction::MODIFIER | MacroAction::PRESS),
                MacroAction::new(0x06, MacroAction::PRESS),
            ],
        );
        catalog
    }

    // ════════════════════════════════════════════════════════════════════════
    // Upload → Playback
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn uploaded_copy_macro_plays_on_key_five() {
        let mut pad = fresh_pad();
        let link = HostLink::new(pad.settings());

        for byte in upload_bytes(&copy_catalog(), &DeviceSettings::default()) {
            assert_eq!(link.on_byte(byte), None);
        }
        assert_eq!(link.take_request(), TransferState::Receiving);
        pad.finish_upload(&link);

        pad.poll(0, Some(key(5)));
        assert_eq!(
            pad.peripherals().hid.sent,
            vec![
                [0x06, 0, 0, 0, 0, 0, 0, 0],
                [0x06, 0, 0x06, 0, 0, 0, 0, 0],
                [0; 8],
            ]
        );
    }

    #[test]
    fn upload_survives_restart() {
        let mut pad = fresh_pad();
        let link = HostLink::new(pad.settings());
        let settings = DeviceSettings {
            brightness_level: 2,
            auto_brightness: false,
            initial_repeat_delay_ms: 250,
            repeat_rate_ms: 40,
        };
        for byte in upload_bytes(&copy_catalog(), &settings) {
            link.on_byte(byte);
        }
        pad.finish_upload(&link);

        // Power cycle: same image, new keypad.
        let image = core::mem::take(&mut pad.peripherals_mut().store);
        let mut restarted = Macropad::new(Peripherals {
            display: RecordingDisplay::default(),
            strip: NullStrip,
            hid: Recorder::default(),
            sensor: FixedSensor,
            store: image,
        });
        assert_eq!(restarted.start(), settings);
        assert_eq!(restarted.catalog().name(key(5)).as_str(), "Copy");
        assert_eq!(restarted.catalog().actions(key(5)), copy_catalog().actions(key(5)));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Host Requests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn catalog_request_returns_stored_macros() {
        let mut image = NvImage::new();
        storage::store(&mut image, &copy_catalog(), &DeviceSettings::default());
        let mut pad = Macropad::new(Peripherals {
            display: RecordingDisplay::default(),
            strip: NullStrip,
            hid: Recorder::default(),
            sensor: FixedSensor,
            store: image,
        });
        pad.start();

        let link = HostLink::new(pad.settings());
        link.on_byte(b'm');
        match pad.handle_request(link.take_request()) {
            Some(Outgoing::Catalog(dump)) => {
                assert_eq!(&dump[..], &encode_catalog(&copy_catalog())[..]);
            }
            other => panic!("expected a catalog dump, got {other:?}"),
        }
        assert_eq!(link.take_request(), TransferState::Idle);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Scanner → Keypad
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn scanned_key_reaches_the_executor() {
        // Key 5 is column 0, row 1.
        let rows: [PinMock; 3] = core::array::from_fn(|row| {
            PinMock::new(
                &(0..4)
                    .map(|col| Transaction::get(if col == 0 && row == 1 { State::High } else { State::Low }))
                    .collect::<Vec<_>>(),
            )
        });
        let cols: [PinMock; 4] = core::array::from_fn(|_| {
            PinMock::new(&[
                Transaction::set(State::Low),
                Transaction::set(State::High),
                Transaction::set(State::Low),
            ])
        });
        let mut scanner = Scanner::new(rows, cols);

        let mut image = NvImage::new();
        storage::store(&mut image, &copy_catalog(), &DeviceSettings::default());
        let mut pad = Macropad::new(Peripherals {
            display: RecordingDisplay::default(),
            strip: NullStrip,
            hid: Recorder::default(),
            sensor: FixedSensor,
            store: image,
        });
        pad.start();

        let scanned = scanner.scan();
        assert_eq!(scanned, Some(key(5)));
        pad.poll(0, scanned);
        assert_eq!(pad.peripherals().hid.sent.len(), 3);

        let (mut rows, mut cols) = scanner.release();
        rows.iter_mut().for_each(PinMock::done);
        cols.iter_mut().for_each(PinMock::done);
    }
}
