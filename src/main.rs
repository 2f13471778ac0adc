//! PixelTag - BLE e-paper name badge firmware.
//!
//! Target: nRF52840 with the S140 SoftDevice and a 2.13" e-paper panel.
//!
//! Architecture:
//!   ┌───────────────┐   BadgeEvent   ┌──────────────┐   frames   ┌──────────┐
//!   │ BLE peripheral ├──────────────►│  main loop   ├───────────►│  e-paper │
//!   │ button task    │   (channel)   │  (Badge)     │            └──────────┘
//!   └───────────────┘               └──────┬───────┘
//!                                          │ flash
//!                                   ┌──────▼───────┐
//!                                   │ FlashStore   │
//!                                   └──────────────┘
//!
//! The main loop owns the panel and the store; everything else talks to it
//! through `ble::EVENTS`. When the idle budget runs out it stops advertising
//! and drops into System OFF, to be woken by the button.

#![no_std]
#![no_main]

mod ble;
mod power;
mod storage;
mod ui;

use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pin, Pull};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::{bind_interrupts, peripherals, saadc, spim};
use embassy_time::{with_timeout, Delay, Duration, Instant, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use nrf_softdevice::{Flash, Softdevice};
use pixeltag::config::LOOP_YIELD_MS;
use pixeltag::{Badge, TickOutcome};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::storage::FlashStore;

bind_interrupts!(struct Irqs {
    SPIM3 => spim::InterruptHandler<peripherals::SPI3>;
    SAADC => saadc::InterruptHandler;
});

/// How long to wait for the peripheral task to tear down advertising.
const ADVERTISING_STOP_TIMEOUT_MS: u64 = 500;

static SERVER: StaticCell<ble::Server> = StaticCell::new();

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Bring-up failure: nothing useful can run, so log and start over.
fn fatal(what: &str) -> ! {
    error!("Fatal: {}", what);
    cortex_m::peripheral::SCB::sys_reset()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("PixelTag starting");

    // SoftDevice owns priorities 0, 1 and 4.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);
    interrupt::SPIM3.set_priority(Priority::P3);
    interrupt::SAADC.set_priority(Priority::P3);

    // - BLE ------------------------------------------------
    let sd = Softdevice::enable(&ble::softdevice_config());
    let server: &'static ble::Server = match ble::Server::new(sd) {
        Ok(server) => SERVER.init(server),
        Err(e) => {
            error!("GATT registration failed: {:?}", e);
            fatal("gatt server")
        }
    };
    let sd: &'static Softdevice = sd;
    spawner.must_spawn(softdevice_task(sd));

    let cause = power::wake_cause();
    info!("Wake cause: {:?}", cause);

    // - Storage ---------------------------------------------
    let store = FlashStore::new(Flash::take(sd));

    // - E-paper ---------------------------------------------
    let mut spim_config = spim::Config::default();
    spim_config.frequency = spim::Frequency::M4;
    let spim = spim::Spim::new_txonly(p.SPI3, Irqs, p.P0_19, p.P0_20, spim_config);
    let cs = Output::new(p.P0_22, Level::High, OutputDrive::Standard);
    let spi = match ExclusiveDevice::new(spim, cs, Delay) {
        Ok(spi) => spi,
        Err(_) => fatal("panel chip select"),
    };
    let dc = Output::new(p.P0_24, Level::Low, OutputDrive::Standard);
    let rst = Output::new(p.P0_25, Level::High, OutputDrive::Standard);
    let busy = Input::new(p.P0_26, Pull::None);
    let panel = match ui::display::init(spi, busy, dc, rst) {
        Ok(panel) => panel,
        Err(e) => {
            error!("Panel init failed: {:?}", e);
            fatal("panel")
        }
    };

    // - Battery sense ---------------------------------------
    let mut channel = saadc::ChannelConfig::single_ended(p.P0_29);
    channel.reference = saadc::Reference::VDD1_4;
    channel.gain = saadc::Gain::GAIN1_4;
    let mut adc = saadc::Saadc::new(p.SAADC, Irqs, saadc::Config::default(), [channel]);
    adc.calibrate().await;

    // - Tasks -----------------------------------------------
    spawner.must_spawn(ui::buttons::button_task(p.P0_11.degrade()));
    spawner.must_spawn(ble::peripheral::peripheral_task(sd, server));

    let mut badge = Badge::boot(panel, store, cause, Instant::now().as_millis()).await;

    // The battery is only sampled while a central is connected; until
    // then the level characteristic reads 0.
    let mut published = badge.controller().content().clone();
    ble::publish_content(server, &published);

    info!("Entering main loop");
    loop {
        match badge.tick(&ble::EVENTS, Instant::now().as_millis()).await {
            TickOutcome::Continue { sample_battery } => {
                if sample_battery {
                    let percent = power::battery_percent(&mut adc).await;
                    badge.record_battery(percent);
                    ble::publish_battery(server, percent);
                }
            }
            TickOutcome::EnterDeepSleep => break,
        }

        if badge.controller().content() != &published {
            published = badge.controller().content().clone();
            ble::publish_content(server, &published);
        }

        Timer::after_millis(LOOP_YIELD_MS).await;
    }

    ble::STOP_ADVERTISING.signal(());
    if with_timeout(
        Duration::from_millis(ADVERTISING_STOP_TIMEOUT_MS),
        ble::ADVERTISING_STOPPED.wait(),
    )
    .await
    .is_err()
    {
        warn!("Advertising did not stop in time");
    }

    power::enter_system_off()
}
