//! USB CDC-ACM serial port.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral and exposes one virtual serial port.

use crate::config;
use crate::error::Error;
use crate::protocol::HostLink;
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_usb::class::cdc_acm::{CdcAcmClass, Receiver, Sender, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

/// Send half shared by the receive task and the main loop.
pub type SharedSender = Mutex<CriticalSectionRawMutex, Sender<'static, UsbDriver>>;

static CDC_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// Build result containing the USB device runner and both serial halves.
pub struct UsbSerial {
    pub device: UsbDevice<'static, UsbDriver>,
    pub sender: Sender<'static, UsbDriver>,
    pub receiver: Receiver<'static, UsbDriver>,
}

/// Initialise the USB stack and create the serial port.
///
/// Must be called exactly once. All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD) -> UsbSerial {
    // Create the low-level USB driver with hardware VBUS detection.
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        USB_CONFIG_DESC.init([0u8; 256]),
        USB_BOS_DESC.init([0u8; 256]),
        USB_MSOS_DESC.init([0u8; 256]),
        USB_CTRL_BUF.init([0u8; 64]),
    );

    let class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), config::USB_PACKET_SIZE);
    let (sender, receiver) = class.split();
    let device = builder.build();

    info!("USB serial device initialised");

    UsbSerial {
        device,
        sender,
        receiver,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Write `data` as full packets, closing with a short (or empty) one.
pub async fn write_frame(sender: &mut Sender<'static, UsbDriver>, data: &[u8]) -> Result<(), Error> {
    let max_packet_size = usize::from(sender.max_packet_size());
    for chunk in data.chunks(max_packet_size) {
        sender.write_packet(chunk).await.map_err(|_| Error::Serial)?;
    }
    if data.len() % max_packet_size == 0 {
        sender.write_packet(&[]).await.map_err(|_| Error::Serial)?;
    }
    Ok(())
}

/// Feed every received byte to the host link and answer the
/// synchronous queries.
pub async fn receive_loop(
    mut receiver: Receiver<'static, UsbDriver>,
    link: &'static HostLink,
    sender: &'static SharedSender,
) -> ! {
    info!("Serial receive task started - waiting for host");

    let mut buf = [0u8; config::USB_PACKET_SIZE as usize];

    loop {
        receiver.wait_connection().await;
        info!("Serial port opened");

        loop {
            let n = match receiver.read_packet(&mut buf).await {
                Ok(n) => n,
                Err(EndpointError::Disabled) => break,
                Err(EndpointError::BufferOverflow) => {
                    warn!("Serial packet larger than buffer - dropped");
                    continue;
                }
            };

            for &byte in &buf[..n] {
                if let Some(reply) = link.on_byte(byte) {
                    let mut tx = sender.lock().await;
                    if write_frame(&mut tx, &reply.encode()).await.is_err() {
                        warn!("Reply {} not sent", reply);
                    }
                }
            }
        }

        info!("Serial port closed");
    }
}
