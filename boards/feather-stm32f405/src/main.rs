#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod clock;
mod config;
mod device_id;
mod network;
mod sensor;
mod wifi;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// MQTT packet buffer for the bump allocator
const MQTT_BUFFER_LEN: usize = 2048;
/// TCP socket buffer, each direction
const SOCKET_BUFFER_LEN: usize = 1024;

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2, USART3])]
mod app {
    use super::*;
    use defmt::info;
    use embassy_futures::join::join3;
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Level, Output, OutputOpenDrain, Pull, Speed};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use sensor_hub_core::sensor::Dht;
    use sensor_hub_core::{Relay, SensorNode};

    use clock::MonoClock;
    use network::{MqttSession, SharedSocket, TcpTransport, WifiLink};
    use sensor::{BoardSensor, CycleDelay};

    type SpiPeripheral = embassy_stm32::Peri<'static, peripherals::SPI2>;
    type PinPB13 = embassy_stm32::Peri<'static, peripherals::PB13>;
    type PinPB15 = embassy_stm32::Peri<'static, peripherals::PB15>;
    type PinPB14 = embassy_stm32::Peri<'static, peripherals::PB14>;
    type PinPC6 = embassy_stm32::Peri<'static, peripherals::PC6>;
    type PinPC3 = embassy_stm32::Peri<'static, peripherals::PC3>;
    type PinPC2 = embassy_stm32::Peri<'static, peripherals::PC2>;
    type PinPB8 = embassy_stm32::Peri<'static, peripherals::PB8>;
    type PinPC7 = embassy_stm32::Peri<'static, peripherals::PC7>;
    type PinPB9 = embassy_stm32::Peri<'static, peripherals::PB9>;
    type Exti2 = embassy_stm32::Peri<'static, peripherals::EXTI2>;
    type Exti8 = embassy_stm32::Peri<'static, peripherals::EXTI8>;
    type DmaTx = embassy_stm32::Peri<'static, peripherals::DMA1_CH4>;
    type DmaRx = embassy_stm32::Peri<'static, peripherals::DMA1_CH3>;
    type RngPeripheral = embassy_stm32::Peri<'static, peripherals::RNG>;

    /// ESP32 co-processor wiring
    struct WifiPins {
        spi: SpiPeripheral,
        sck: PinPB13,
        mosi: PinPB15,
        miso: PinPB14,
        cs: PinPC6,
        reset: PinPC3,
        handshake: PinPC2,
        handshake_exti: Exti2,
        ready: PinPB8,
        ready_exti: Exti8,
        dma_tx: DmaTx,
        dma_rx: DmaRx,
    }

    /// Relay (D5) and DHT data line (D10)
    struct IoPins {
        relay: PinPC7,
        dht: PinPB9,
    }

    embassy_stm32::bind_interrupts!(struct RngIrqs {
        RNG => embassy_stm32::rng::InterruptHandler<peripherals::RNG>;
    });

    #[shared]
    struct Shared {}

    #[local]
    struct Local {}

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("Sensor hub starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK, assumed by sensor::CycleDelay)
        // VCO / DIVQ(7) = 48 MHz (RNG clock)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);
        info!("PLL configured: SYSCLK=84MHz, PLLQ=48MHz for RNG");

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        Mono::start(84_000_000);
        info!("TIM2 monotonic timer initialized at 1 MHz");

        let wifi_pins = WifiPins {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            handshake: p.PC2,
            handshake_exti: p.EXTI2,
            ready: p.PB8,
            ready_exti: p.EXTI8,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };
        let io_pins = IoPins {
            relay: p.PC7,
            dht: p.PB9,
        };

        network_task::spawn(wifi_pins, io_pins, p.RNG).ok();

        (Shared {}, Local {})
    }

    /// Network task: co-processor runner, embassy-net runner and the node loop
    ///
    /// Stack is !Send and must remain within this task.
    #[task(priority = 1)]
    async fn network_task(
        _cx: network_task::Context,
        wifi_pins: WifiPins,
        io_pins: IoPins,
        rng_periph: RngPeripheral,
    ) -> ! {
        use embassy_net::{Config, StackResources};
        use embassy_stm32::rng::Rng;
        use embassy_sync::mutex::Mutex;
        use rand_core::RngCore;
        use rust_mqtt::buffer::BumpBuffer;
        use static_cell::StaticCell;

        info!("Network task started");

        let device_id = match device_id::device_id() {
            Ok(id) => id,
            Err(e) => defmt::panic!("Device identity unusable: {}", e),
        };
        static DEVICE_ID: StaticCell<device_id::DeviceId> = StaticCell::new();
        let device_id = DEVICE_ID.init(device_id);

        let node_config = match config::node_config(device_id.as_str()) {
            Ok(config) => config,
            Err(e) => defmt::panic!("Invalid configuration: {}", e),
        };
        static NODE_CONFIG: StaticCell<sensor_hub_core::NodeConfig<'static>> = StaticCell::new();
        let node_config = NODE_CONFIG.init(node_config);
        info!("Device ID: {}", node_config.device_id);

        // Relay first so the output is driven OFF as early as possible
        let relay_pin = Output::new(io_pins.relay, Level::Low, Speed::Low);
        let relay = Relay::new(relay_pin, node_config.relay).unwrap_or_else(|never| match never {});

        let dht_pin = OutputOpenDrain::new(io_pins.dht, Level::High, Speed::Low);
        let sensor = BoardSensor::new(Dht::new(dht_pin, CycleDelay, node_config.sensor));

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000);
        spi_config.mode = spi::MODE_2;

        let spi = Spi::new(
            wifi_pins.spi,
            wifi_pins.sck,
            wifi_pins.mosi,
            wifi_pins.miso,
            wifi_pins.dma_tx,
            wifi_pins.dma_rx,
            spi_config,
        );

        let wifi_periph = wifi::WifiPeripherals {
            spi,
            cs: Output::new(wifi_pins.cs, Level::High, Speed::VeryHigh),
            reset: Output::new(wifi_pins.reset, Level::High, Speed::Low),
            handshake: ExtiInput::new(wifi_pins.handshake, wifi_pins.handshake_exti, Pull::Down),
            ready: ExtiInput::new(wifi_pins.ready, wifi_pins.ready_exti, Pull::Down),
        };
        let (device, mut control, wifi_runner) = wifi::init_esp_hosted(wifi_periph).await;

        let seed = Rng::new(rng_periph, RngIrqs).next_u64();

        static RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            seed,
        );
        info!("Network stack initialized with DHCP");

        static RX_BUFFER: StaticCell<[u8; SOCKET_BUFFER_LEN]> = StaticCell::new();
        static TX_BUFFER: StaticCell<[u8; SOCKET_BUFFER_LEN]> = StaticCell::new();
        static SOCKET: StaticCell<SharedSocket> = StaticCell::new();
        let socket = SOCKET.init(Mutex::new(TcpTransport::new(
            stack,
            RX_BUFFER.init([0; SOCKET_BUFFER_LEN]),
            TX_BUFFER.init([0; SOCKET_BUFFER_LEN]),
        )));

        static MQTT_BUFFER: StaticCell<[u8; MQTT_BUFFER_LEN]> = StaticCell::new();
        static MQTT_BUMP: StaticCell<BumpBuffer<'static>> = StaticCell::new();
        let mqtt_buffer = MQTT_BUMP.init(BumpBuffer::new(MQTT_BUFFER.init([0; MQTT_BUFFER_LEN])));
        let session = MqttSession::new(socket, mqtt_buffer);

        let app_logic = async {
            // Control requests only complete while the runner is polled
            wifi::init_control(&mut control).await;

            let link = WifiLink::new(stack, control);
            let mut node =
                SensorNode::new(node_config, link, session, sensor, relay, Mono, MonoClock);
            node.start().await;
            node.run().await
        };

        let (_, never, _) = join3(wifi_runner.run(), net_runner.run(), app_logic).await;
        never
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
