//! Host sync protocol - single-byte commands over the serial link.
//!
//! The receive side runs byte-at-a-time in its own task and only ever
//! appends to the receive buffer, records a request for the main loop,
//! or answers one of the two synchronous queries. Everything that
//! touches the catalog happens later in the main loop.
//!
//! ## Commands
//!
//! | Byte      | Effect                                        |
//! |-----------|-----------------------------------------------|
//! | `M`       | start a bulk upload (the `M` is kept)          |
//! | `m`       | send the catalog                              |
//! | `C` / `c` | show / hide the connected glyph               |
//! | `r` / `i` | send the repeat rate / initial repeat delay   |
//! | `b`       | reply `B, level` immediately                  |
//! | `a`       | reply `A, 0|1` immediately                    |
//!
//! While an upload is in progress every byte is buffered, commands
//! included.

pub mod dump;

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::config::RECEIVE_BUFFER_LEN;
use crate::light::LedBank;
use crate::macros::Catalog;
use crate::storage::DeviceSettings;

/// What the main loop has been asked to do next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferState {
    #[default]
    Idle,
    /// Bulk upload in progress; bytes are being buffered.
    Receiving,
    SendCatalog,
    NotifyConnected,
    NotifyDisconnected,
    SendRepeatRate,
    SendInitialDelay,
}

/// A received command byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Upload,
    RequestCatalog,
    Connected,
    Disconnected,
    RequestRepeatRate,
    RequestInitialDelay,
    QueryBrightness,
    QueryAutoBrightness,
    Unknown(u8),
}

impl From<u8> for Command {
    fn from(byte: u8) -> Self {
        match byte {
            b'M' => Command::Upload,
            b'm' => Command::RequestCatalog,
            b'C' => Command::Connected,
            b'c' => Command::Disconnected,
            b'r' => Command::RequestRepeatRate,
            b'i' => Command::RequestInitialDelay,
            b'b' => Command::QueryBrightness,
            b'a' => Command::QueryAutoBrightness,
            other => Command::Unknown(other),
        }
    }
}

/// Frames sent back to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    Brightness(u8),
    AutoBrightness(bool),
    RepeatRate(u16),
    InitialDelay(u16),
}

impl Reply {
    /// Wire bytes; 16-bit values are big-endian.
    pub fn encode(&self) -> heapless::Vec<u8, 3> {
        let (tag, value, wide) = match *self {
            Reply::Brightness(level) => (b'B', level as u16, false),
            Reply::AutoBrightness(on) => (b'A', on as u16, false),
            Reply::RepeatRate(ms) => (b'R', ms, true),
            Reply::InitialDelay(ms) => (b'D', ms, true),
        };

        let mut out = heapless::Vec::new();
        let [hi, lo] = value.to_be_bytes();
        // At most three bytes, always fits.
        let _ = out.push(tag);
        if wide {
            let _ = out.push(hi);
        }
        let _ = out.push(lo);
        out
    }
}

pub type ReceiveBuffer = heapless::Vec<u8, RECEIVE_BUFFER_LEN>;

struct SharedState {
    rx: ReceiveBuffer,
    state: TransferState,
    settings: DeviceSettings,
}

/// State shared between the serial receive task and the main loop.
///
/// Every access runs inside one critical section, so an upload can
/// never be decoded while the receive task is halfway through a byte.
pub struct HostLink {
    inner: Mutex<CriticalSectionRawMutex, RefCell<SharedState>>,
}

impl HostLink {
    pub fn new(settings: DeviceSettings) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(SharedState {
                rx: ReceiveBuffer::new(),
                state: TransferState::Idle,
                settings,
            })),
        }
    }

    /// Handle one received byte. Returns the frame to send straight
    /// back for the synchronous queries.
    pub fn on_byte(&self, byte: u8) -> Option<Reply> {
        self.inner.lock(|cell| {
            let mut shared = cell.borrow_mut();

            if shared.state == TransferState::Receiving {
                // Past capacity the byte is dropped.
                let _ = shared.rx.push(byte);
                return None;
            }

            match Command::from(byte) {
                Command::Upload => {
                    shared.rx.clear();
                    let _ = shared.rx.push(byte);
                    shared.state = TransferState::Receiving;
                }
                Command::RequestCatalog => shared.state = TransferState::SendCatalog,
                Command::Connected => shared.state = TransferState::NotifyConnected,
                Command::Disconnected => shared.state = TransferState::NotifyDisconnected,
                Command::RequestRepeatRate => shared.state = TransferState::SendRepeatRate,
                Command::RequestInitialDelay => shared.state = TransferState::SendInitialDelay,
                Command::QueryBrightness => {
                    return Some(Reply::Brightness(shared.settings.brightness_level));
                }
                Command::QueryAutoBrightness => {
                    return Some(Reply::AutoBrightness(shared.settings.auto_brightness));
                }
                Command::Unknown(_) => {}
            }
            None
        })
    }

    /// Current request without consuming it.
    pub fn pending(&self) -> TransferState {
        self.inner.lock(|cell| cell.borrow().state)
    }

    /// Consume the pending request.
    ///
    /// An upload in progress is reported but left in place; it is only
    /// cleared by [`HostLink::complete_upload`].
    pub fn take_request(&self) -> TransferState {
        self.inner.lock(|cell| {
            let mut shared = cell.borrow_mut();
            match shared.state {
                TransferState::Receiving => TransferState::Receiving,
                other => {
                    shared.state = TransferState::Idle;
                    other
                }
            }
        })
    }

    /// Decode the buffered upload into `catalog`, adopt the uploaded
    /// settings and return to idle, all in one critical section.
    pub fn complete_upload(&self, catalog: &mut Catalog, leds: &mut LedBank) -> DeviceSettings {
        self.inner.lock(|cell| {
            let mut shared = cell.borrow_mut();
            let settings = dump::decode_upload(&shared.rx, catalog, leds);
            info!("Upload decoded ({} bytes buffered)", shared.rx.len());
            shared.rx.clear();
            shared.settings = settings;
            shared.state = TransferState::Idle;
            settings
        })
    }

    pub fn settings(&self) -> DeviceSettings {
        self.inner.lock(|cell| cell.borrow().settings)
    }

    /// Publish settings changed by the main loop so the synchronous
    /// queries answer with current values.
    pub fn set_settings(&self, settings: DeviceSettings) {
        self.inner.lock(|cell| cell.borrow_mut().settings = settings);
    }

    #[cfg(test)]
    pub(crate) fn buffered(&self) -> usize {
        self.inner.lock(|cell| cell.borrow().rx.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> HostLink {
        HostLink::new(DeviceSettings::default())
    }

    #[test]
    fn request_bytes_set_state() {
        let cases = [
            (b'm', TransferState::SendCatalog),
            (b'C', TransferState::NotifyConnected),
            (b'c', TransferState::NotifyDisconnected),
            (b'r', TransferState::SendRepeatRate),
            (b'i', TransferState::SendInitialDelay),
        ];
        for (byte, expected) in cases {
            let link = link();
            assert_eq!(link.on_byte(byte), None);
            assert_eq!(link.take_request(), expected);
            assert_eq!(link.pending(), TransferState::Idle);
        }
    }

    #[test]
    fn unknown_bytes_are_ignored() {
        let link = link();
        for byte in [0x00, b'x', b'Z', 0xFF] {
            assert_eq!(link.on_byte(byte), None);
        }
        assert_eq!(link.pending(), TransferState::Idle);
    }

    #[test]
    fn queries_reply_without_state_change() {
        let link = link();
        link.set_settings(DeviceSettings {
            brightness_level: 7,
            auto_brightness: true,
            ..DeviceSettings::default()
        });
        assert_eq!(link.on_byte(b'b'), Some(Reply::Brightness(7)));
        assert_eq!(link.on_byte(b'a'), Some(Reply::AutoBrightness(true)));
        assert_eq!(link.pending(), TransferState::Idle);
    }

    #[test]
    fn upload_buffers_everything_including_commands() {
        let link = link();
        link.on_byte(b'M');
        assert_eq!(link.on_byte(b'b'), None);
        link.on_byte(b'm');
        assert_eq!(link.pending(), TransferState::Receiving);
        assert_eq!(link.buffered(), 3);

        // The main loop does not clear an upload by polling it.
        assert_eq!(link.take_request(), TransferState::Receiving);
        assert_eq!(link.pending(), TransferState::Receiving);
    }

    #[test]
    fn upload_past_capacity_is_dropped() {
        let link = link();
        for _ in 0..RECEIVE_BUFFER_LEN + 50 {
            link.on_byte(b'M');
        }
        assert_eq!(link.buffered(), RECEIVE_BUFFER_LEN);
    }

    #[test]
    fn complete_upload_returns_to_idle() {
        let link = link();
        link.on_byte(b'M');
        let mut catalog = Catalog::new();
        let mut leds = LedBank::new();
        link.complete_upload(&mut catalog, &mut leds);
        assert_eq!(link.pending(), TransferState::Idle);
        assert_eq!(link.buffered(), 0);

        // A later request byte is dispatched normally again.
        link.on_byte(b'r');
        assert_eq!(link.take_request(), TransferState::SendRepeatRate);
    }

    #[test]
    fn reply_frames() {
        assert_eq!(&Reply::Brightness(4).encode()[..], &[b'B', 4]);
        assert_eq!(&Reply::AutoBrightness(false).encode()[..], &[b'A', 0]);
        assert_eq!(&Reply::RepeatRate(0x0102).encode()[..], &[b'R', 1, 2]);
        assert_eq!(&Reply::InitialDelay(500).encode()[..], &[b'D', 0x01, 0xF4]);
    }
}
