//! USB device subsystem - the serial link to the desktop tool.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb` with a single CDC-ACM interface. The desktop tool
//! talks the byte protocol in [`crate::protocol`] over it.
//!
//! The receive half is owned by one task that feeds every byte to the
//! [`HostLink`](crate::protocol::HostLink). The send half is shared
//! with the main loop behind an async mutex so a reply can never land
//! in the middle of a catalog dump.

pub mod serial;
