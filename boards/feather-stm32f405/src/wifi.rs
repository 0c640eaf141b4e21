#![deny(unsafe_code)]
#![deny(warnings)]
//! Wi-Fi co-processor hardware layer
//!
//! An ESP32 running ESP-Hosted firmware hangs off SPI2. Besides the bus it
//! needs a chip select, a reset line and two EXTI inputs: `handshake`
//! (co-processor ready for a transfer) and `ready` (data pending).

use defmt::{error, info};
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice as SpiDeviceBus;
use embassy_net_esp_hosted::{Control, NetDriver, Runner, State};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Async;
use embassy_stm32::spi::Spi;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;

type SpiBus = Mutex<CriticalSectionRawMutex, Spi<'static, Async>>;

pub type EspSpi =
    SpiDeviceBus<'static, CriticalSectionRawMutex, Spi<'static, Async>, Output<'static>>;

pub type EspRunner = Runner<'static, EspSpi, ExtiInput<'static>, Output<'static>>;

/// Co-processor peripherals bundle
pub struct WifiPeripherals<'a> {
    pub spi: Spi<'a, Async>,
    pub cs: Output<'a>,
    pub reset: Output<'a>,
    pub handshake: ExtiInput<'a>,
    pub ready: ExtiInput<'a>,
}

/// Bring up the ESP32 and return the network device, control handle and
/// runner
///
/// The runner must be polled continuously for the device to make progress,
/// including while `init` below is waiting on it, so callers join it with
/// the rest of the network task before using `Control`.
pub async fn init_esp_hosted(
    periph: WifiPeripherals<'static>,
) -> (NetDriver<'static>, Control<'static>, EspRunner) {
    let WifiPeripherals {
        spi,
        cs,
        reset,
        handshake,
        ready,
    } = periph;

    static SPI_BUS: StaticCell<SpiBus> = StaticCell::new();
    let spi_bus = SPI_BUS.init(Mutex::new(spi));
    let spi_device = SpiDeviceBus::new(spi_bus, cs);

    static STATE: StaticCell<State> = StaticCell::new();
    let state = STATE.init(State::new());

    info!("Resetting ESP32 co-processor...");
    let (device, control, runner) =
        embassy_net_esp_hosted::new(state, spi_device, handshake, ready, reset).await;
    info!("ESP-Hosted driver created");

    (device, control, runner)
}

/// Initialize the co-processor's Wi-Fi stack
///
/// Needs the runner already being polled.
pub async fn init_control(control: &mut Control<'static>) {
    match control.init().await {
        Ok(()) => info!("ESP32 Wi-Fi initialized"),
        Err(e) => error!("ESP32 Wi-Fi init failed: {:?}", defmt::Debug2Format(&e)),
    }
}
