//! HID playback - keyboard reports and the bridge link they travel over.
//!
//! The keypad has no USB HID interface of its own. Macros are played by
//! streaming 8-byte boot-protocol reports to a keyboard bridge on a
//! secondary SPI link; the bridge replays them to the computer.

pub mod executor;
pub mod keyboard;
pub mod link;


pub use executor::HidExecutor;
pub use keyboard::KeyboardReport;
pub use link::{ReportLink, SpiReportLink};
