//! SSD1306 OLED display wrapper.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle};
use embedded_graphics::text::{Baseline, Text};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

use super::Display;
use crate::config::DISPLAY_WIDTH;

/// Type alias for the concrete display driver.
type Driver<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

const GLYPH_DIAMETER: u32 = 6;

/// Buffered OLED; every call flushes.
pub struct OledDisplay<I2C> {
    driver: Driver<I2C>,
}

impl<I2C> OledDisplay<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Initialise the SSD1306 display and clear the screen.
    pub fn new(i2c: I2C) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let mut driver = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        if driver.init().is_err() {
            warn!("OLED init failed");
        }
        driver.clear_buffer();
        let _ = driver.flush();
        Self { driver }
    }

    fn glyph(&mut self, on: bool) {
        let colour = if on { BinaryColor::On } else { BinaryColor::Off };
        let top_left = Point::new(DISPLAY_WIDTH - GLYPH_DIAMETER as i32 - 1, 1);
        let _ = Circle::new(top_left, GLYPH_DIAMETER)
            .into_styled(PrimitiveStyle::with_fill(colour))
            .draw(&mut self.driver);
    }

    fn flush(&mut self) {
        if self.driver.flush().is_err() {
            warn!("OLED flush failed");
        }
    }
}

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

impl<I2C> Display for OledDisplay<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    fn clear(&mut self, connected: bool) {
        self.driver.clear_buffer();
        if connected {
            self.glyph(true);
        }
        self.flush();
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        let _ = Text::with_baseline(text, Point::new(x, y), text_style(), Baseline::Top)
            .draw(&mut self.driver);
        self.flush();
    }

    fn show_connected_glyph(&mut self, on: bool) {
        self.glyph(on);
        self.flush();
    }

    fn set_backlight(&mut self, level: u8) {
        let brightness = match level {
            0..=1 => Brightness::DIMMEST,
            2..=3 => Brightness::DIM,
            4..=5 => Brightness::NORMAL,
            6..=7 => Brightness::BRIGHT,
            _ => Brightness::BRIGHTEST,
        };
        if self.driver.set_brightness(brightness).is_err() {
            warn!("OLED contrast update failed");
        }
    }
}
