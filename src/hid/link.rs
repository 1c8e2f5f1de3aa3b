//! Bridge link - blocking 8-byte report transfer over SPI.
//!
//! The bridge raises its ready line while idle. Each report waits for
//! that line, frames the 8 bytes with chip-select, and holds the frame
//! for a short settle delay so the bridge can latch it. Nothing is ever
//! retried: a bus error drops that one report.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;

use super::keyboard::KEYBOARD_REPORT_SIZE;
use crate::config::HID_SETTLE_US;

/// Blocking transport for HID reports.
pub trait ReportLink {
    /// Send one report. Returns once the bridge has been handed the bytes.
    fn send_report(&mut self, report: &[u8; KEYBOARD_REPORT_SIZE]);
}

/// SPI bridge link with manual chip-select and a ready input.
pub struct SpiReportLink<SPI, CS, RDY, D> {
    spi: SPI,
    cs: CS,
    ready: RDY,
    delay: D,
}

impl<SPI, CS, RDY, D> SpiReportLink<SPI, CS, RDY, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    RDY: InputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, mut cs: CS, ready: RDY, delay: D) -> Self {
        cs.set_high().ok();
        Self {
            spi,
            cs,
            ready,
            delay,
        }
    }

    /// Spin until the bridge reports idle. A failed read counts as busy.
    fn wait_ready(&mut self) {
        while !self.ready.is_high().unwrap_or(false) {
            core::hint::spin_loop();
        }
    }

    #[cfg(test)]
    pub(crate) fn release(self) -> (SPI, CS, RDY) {
        (self.spi, self.cs, self.ready)
    }
}

impl<SPI, CS, RDY, D> ReportLink for SpiReportLink<SPI, CS, RDY, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    RDY: InputPin,
    D: DelayNs,
{
    fn send_report(&mut self, report: &[u8; KEYBOARD_REPORT_SIZE]) {
        self.wait_ready();

        self.cs.set_low().ok();
        if self.spi.write(report).and_then(|_| self.spi.flush()).is_err() {
            warn!("Bridge SPI write failed - report dropped");
        }
        self.delay.delay_us(HID_SETTLE_US);
        self.cs.set_high().ok();
    }
}
