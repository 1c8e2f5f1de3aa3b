//! Macropad firmware entry point (nRF52840).
//!
//! Spawns the USB device, serial receive and light-sensor tasks, then
//! runs the keypad loop on the main task: pick up host requests, scan
//! the matrix, advance the keypad and flush settings to flash.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU8, Ordering};

use defmt::{info, warn};
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::nvmc::Nvmc;
use embassy_nrf::saadc::{self, Saadc};
use embassy_nrf::spim::{self, Spim};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_sync::mutex::Mutex;
use embassy_time::{Delay, Instant, Timer};
use smart_leds::SmartLedsWrite;
use static_cell::StaticCell;
use ws2812_spi::Ws2812;
use {defmt_rtt as _, panic_probe as _};

use macropad::config::{KEY_COUNT, LIGHT_SAMPLE_MS, RECEIVE_DRAIN_MS, START_SCREEN_MS};
use macropad::hid::SpiReportLink;
use macropad::keypad::scanner::Scanner;
use macropad::light::{level_from_adc, LedStrip, LightSensor};
use macropad::macros::Colour;
use macropad::protocol::{HostLink, TransferState};
use macropad::storage::NvImage;
use macropad::ui::display::OledDisplay;
use macropad::usb::serial::{self, SharedSender, UsbDriver};
use macropad::{Macropad, Outgoing, Peripherals};

bind_interrupts!(struct Irqs {
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<peripherals::SPI2>;
    SPIM3 => spim::InterruptHandler<peripherals::SPI3>;
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<peripherals::TWISPI0>;
    SAADC => saadc::InterruptHandler;
});

static HOST_LINK: StaticCell<HostLink> = StaticCell::new();
static SERIAL_TX: StaticCell<SharedSender> = StaticCell::new();

/// Latest light level from the sensor task.
static LIGHT_LEVEL: AtomicU8 = AtomicU8::new(5);

/// WS2812 chain on a dedicated SPIM.
struct KeyLeds {
    ws: Ws2812<Spim<'static, peripherals::SPI3>>,
}

impl LedStrip for KeyLeds {
    fn write_frame(&mut self, frame: &[Colour; KEY_COUNT]) {
        if self.ws.write(frame.iter().copied()).is_err() {
            warn!("LED strip write failed");
        }
    }
}

/// Reads the level published by [`light_sensor_task`].
struct AmbientLight;

impl LightSensor for AmbientLight {
    fn sample_level(&mut self) -> u8 {
        LIGHT_LEVEL.load(Ordering::Relaxed)
    }
}

#[embassy_executor::task]
async fn usb_task(device: embassy_usb::UsbDevice<'static, UsbDriver>) -> ! {
    serial::run_usb_device(device).await
}

#[embassy_executor::task]
async fn serial_rx_task(
    receiver: embassy_usb::class::cdc_acm::Receiver<'static, UsbDriver>,
    link: &'static HostLink,
    sender: &'static SharedSender,
) -> ! {
    serial::receive_loop(receiver, link, sender).await
}

#[embassy_executor::task]
async fn light_sensor_task(mut saadc: Saadc<'static, 1>) -> ! {
    saadc.calibrate().await;
    let mut buf = [0i16; 1];
    loop {
        saadc.sample(&mut buf).await;
        LIGHT_LEVEL.store(level_from_adc(buf[0].max(0) as u16), Ordering::Relaxed);
        Timer::after_millis(LIGHT_SAMPLE_MS).await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("Macropad starting");

    // Settings image
    let mut flash = BlockingAsync::new(Nvmc::new(p.NVMC));
    let image = NvImage::load_from_flash(&mut flash).await;

    // Key matrix
    let cols = [
        Output::new(p.P0_03, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_04, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_28, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_29, Level::Low, OutputDrive::Standard),
    ];
    let rows = [
        Input::new(p.P0_30, Pull::Down),
        Input::new(p.P0_31, Pull::Down),
        Input::new(p.P1_01, Pull::Down),
    ];
    let mut scanner = Scanner::new(rows, cols);

    // Keyboard bridge
    let mut bridge_config = spim::Config::default();
    bridge_config.frequency = spim::Frequency::M1;
    bridge_config.mode = spim::MODE_0;
    let bridge_spi = Spim::new_txonly(p.SPI2, Irqs, p.P1_12, p.P1_13, bridge_config);
    let hid = SpiReportLink::new(
        bridge_spi,
        Output::new(p.P1_14, Level::High, OutputDrive::Standard),
        Input::new(p.P1_15, Pull::None),
        Delay,
    );

    // Key LEDs
    let mut led_config = spim::Config::default();
    led_config.frequency = spim::Frequency::M2;
    let led_spi = Spim::new_txonly(p.SPI3, Irqs, p.P1_11, p.P1_10, led_config);
    let strip = KeyLeds {
        ws: Ws2812::new(led_spi),
    };

    // Display
    let mut i2c_config = twim::Config::default();
    i2c_config.frequency = twim::Frequency::K400;
    let i2c = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, i2c_config);
    let display = OledDisplay::new(i2c);

    // Light sensor
    let mut adc_config = saadc::Config::default();
    adc_config.resolution = saadc::Resolution::_10BIT;
    let channel = saadc::ChannelConfig::single_ended(p.P0_02);
    let saadc = Saadc::new(p.SAADC, Irqs, adc_config, [channel]);

    let mut pad = Macropad::new(Peripherals {
        display,
        strip,
        hid,
        sensor: AmbientLight,
        store: image,
    });

    pad.show_splash();
    Timer::after_millis(START_SCREEN_MS.into()).await;
    let settings = pad.start();

    // Host link
    let usb = serial::init(p.USBD);
    let link: &'static HostLink = HOST_LINK.init(HostLink::new(settings));
    let sender: &'static SharedSender = SERIAL_TX.init(Mutex::new(usb.sender));

    spawner.must_spawn(usb_task(usb.device));
    spawner.must_spawn(serial_rx_task(usb.receiver, link, sender));
    spawner.must_spawn(light_sensor_task(saadc));

    info!("Entering keypad loop");

    loop {
        match link.take_request() {
            TransferState::Receiving => {
                Timer::after_millis(RECEIVE_DRAIN_MS).await;
                pad.finish_upload(link);
            }
            request => {
                if let Some(outgoing) = pad.handle_request(request) {
                    let mut tx = sender.lock().await;
                    let sent = match outgoing {
                        Outgoing::Catalog(dump) => serial::write_frame(&mut tx, &dump).await,
                        Outgoing::Reply(reply) => serial::write_frame(&mut tx, &reply.encode()).await,
                    };
                    if sent.is_err() {
                        warn!("Host reply dropped");
                    }
                }
            }
        }

        let now_ms = Instant::now().as_millis() as u32;
        pad.poll(now_ms, scanner.scan());
        link.set_settings(pad.settings());

        let store = &mut pad.peripherals_mut().store;
        if store.is_dirty() && store.save_to_flash(&mut flash).await.is_err() {
            warn!("Settings not persisted");
        }

        Timer::after_millis(1).await;
    }
}
