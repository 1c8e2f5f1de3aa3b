//! Application-wide constants and compile-time configuration.
//!
//! All matrix dimensions, timing parameters, and protocol constants
//! live here so they can be tuned in one place.

// Keypad matrix

/// Number of driven columns in the key matrix.
pub const MATRIX_COLS: usize = 4;

/// Number of sensed rows in the key matrix.
pub const MATRIX_ROWS: usize = 3;

/// Total key positions (10 playable + 2 auxiliary).
pub const KEY_COUNT: usize = MATRIX_COLS * MATRIX_ROWS;

/// Number of keys that carry user macros (key numbers 1..=10).
pub const PLAYABLE_KEYS: usize = 10;

// Macros

/// Maximum actions per macro.
pub const MAX_ACTIONS: usize = 20;

/// Bytes per stored action (key code + flags).
pub const BYTES_PER_ACTION: usize = 2;

/// Maximum macro name length in bytes (null-padded, no terminator stored).
pub const MAX_NAME_LEN: usize = 30;

/// Highest manual brightness level.
pub const MAX_BRIGHTNESS: u8 = 9;

// Timing (milliseconds)

/// How long the splash screen stays up after power-on.
pub const START_SCREEN_MS: u32 = 2000;

/// How long the "Brightness: N" screen stays up after a change.
pub const BRIGHTNESS_DISPLAY_MS: u32 = 1000;

/// How long a key LED stays dark after each fired macro.
pub const LED_BLINK_MS: u32 = 50;

/// Drain wait between the first byte of a bulk upload and decoding it.
pub const RECEIVE_DRAIN_MS: u64 = 1000;

/// Light-sensor sampling period while auto-brightness is on.
pub const AUTO_BRIGHTNESS_PERIOD_MS: u32 = 200;

/// ADC conversion period of the light-sensor task. The keypad reads the
/// latest conversion, so this bounds how stale an auto level can be.
pub const LIGHT_SAMPLE_MS: u64 = 10;

/// Settle delay after each 8-byte report before chip-select is released (µs).
pub const HID_SETTLE_US: u32 = 20;

// Defaults written into a blank settings image

pub const DEFAULT_BRIGHTNESS: u8 = 5;
pub const DEFAULT_INITIAL_REPEAT_DELAY_MS: u16 = 500;
pub const DEFAULT_REPEAT_RATE_MS: u16 = 100;

// Host link

/// Receive buffer capacity for a bulk upload. A full upload is 770 bytes.
pub const RECEIVE_BUFFER_LEN: usize = 1024;

/// Largest catalog dump sent to the host (10 × (36 + 40) bytes).
pub const MAX_DUMP_LEN: usize = PLAYABLE_KEYS * (6 + MAX_NAME_LEN + MAX_ACTIONS * BYTES_PER_ACTION);

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "macropad";
pub const USB_PRODUCT: &str = "Programmable Macro Keypad";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// CDC-ACM bulk endpoint packet size.
pub const USB_PACKET_SIZE: u16 = 64;

// Display

/// OLED width in pixels (SSD1306 128×64).
pub const DISPLAY_WIDTH: i32 = 128;

/// Glyph width of the 6×10 font.
pub const FONT_WIDTH: i32 = 6;

/// Baseline of the centred text line.
pub const TEXT_LINE_Y: i32 = 38;

// GPIO pin assignments (nRF52840-DK defaults)
//
// Adjust for your custom PCB; the concrete pins are picked in `main.rs`.
//
//   Matrix columns     → P0.03, P0.04, P0.28, P0.29 (outputs, active high)
//   Matrix rows        → P0.30, P0.31, P1.01        (inputs, pull-down)
//   Bridge SPI SCK     → P1.12
//   Bridge SPI MOSI    → P1.13
//   Bridge chip-select → P1.14 (active low)
//   Bridge ready       → P1.15 (high = idle)
//   WS2812 data (SPIM) → P1.10
//   I²C SDA / SCL      → P0.26 / P0.27
//   Light sensor       → P0.02 (AIN0)

// Settings storage

/// Flash page index where the settings image starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for the settings image.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;
