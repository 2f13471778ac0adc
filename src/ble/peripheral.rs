//! Advertising and connection handling.
//!
//! One central at a time. Each inbound write is parsed here and queued as a
//! `BadgeEvent`; link changes are queued as `Connected` / `Disconnected`.
//! After a disconnect the task goes straight back to advertising until the
//! main loop raises `STOP_ADVERTISING`.

use crate::ble::{
    BadgeServiceEvent, BatteryServiceEvent, Server, ServerEvent, ADVERTISING_STOPPED,
    BATTERY_LEVEL, EVENTS, STOP_ADVERTISING,
};
use defmt::{error, info, warn};
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList, ServiceUuid16,
};
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::Softdevice;
use pixeltag::command;
use pixeltag::config::BLE_DEVICE_NAME;
use pixeltag::BadgeEvent;

/// Badge service UUID, little-endian as it goes on air.
const BADGE_SERVICE_UUID_LE: [u8; 16] = 0x4fafc201_1fb5_459e_8fcc_c5c9c331914c_u128.to_le_bytes();

/// Pause before retrying a failed advertising start.
const ADVERTISE_RETRY_MS: u64 = 1_000;

#[embassy_executor::task]
pub async fn peripheral_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    let adv_data: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
        .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
        .services_128(ServiceList::Complete, &[BADGE_SERVICE_UUID_LE])
        .build();
    let scan_data: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
        .full_name(BLE_DEVICE_NAME)
        .services_16(ServiceList::Incomplete, &[ServiceUuid16::BATTERY])
        .build();
    let config = peripheral::Config::default();

    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &adv_data,
            scan_data: &scan_data,
        };

        info!("Advertising as '{}'", BLE_DEVICE_NAME);
        let conn = match select(
            peripheral::advertise_connectable(sd, adv, &config),
            STOP_ADVERTISING.wait(),
        )
        .await
        {
            Either::First(Ok(conn)) => conn,
            Either::First(Err(e)) => {
                error!("Advertising failed: {:?}", e);
                Timer::after(Duration::from_millis(ADVERTISE_RETRY_MS)).await;
                continue;
            }
            Either::Second(()) => {
                // Dropping the advertise future has already stopped the radio.
                info!("Advertising stopped");
                ADVERTISING_STOPPED.signal(());
                loop {
                    Timer::after(Duration::from_secs(3600)).await;
                }
            }
        };

        info!("Central connected");
        EVENTS.send(BadgeEvent::Connected).await;

        match select(serve(&conn, server), notify_battery(&conn, server)).await {
            Either::First(()) | Either::Second(()) => {}
        }

        info!("Central disconnected, resuming advertising");
        EVENTS.send(BadgeEvent::Disconnected).await;
    }
}

/// Run the GATT server until the link drops.
async fn serve(conn: &Connection, server: &Server) {
    let reason = gatt_server::run(conn, server, |e| match e {
        ServerEvent::Badge(BadgeServiceEvent::DataWrite(data)) => on_write(&data),
        ServerEvent::Bas(BatteryServiceEvent::BatteryLevelCccdWrite { notifications }) => {
            info!("Battery notifications: {}", notifications);
        }
    })
    .await;
    info!("GATT server done: {:?}", reason);
}

fn on_write(data: &[u8]) {
    info!("Data write ({} bytes)", data.len());
    // Rejected writes are logged by the parser and dropped here.
    let Ok(command) = command::parse(data) else {
        return;
    };
    if EVENTS.try_send(BadgeEvent::Command(command)).is_err() {
        warn!("Event queue full, dropping write");
    }
}

/// Forward every new battery reading as a notification.
async fn notify_battery(conn: &Connection, server: &Server) {
    loop {
        let percent = BATTERY_LEVEL.wait().await;
        if let Err(e) = server.bas.battery_level_notify(conn, &percent) {
            // Central has not enabled notifications; the read path still works.
            info!("Battery notify skipped: {:?}", e);
        }
    }
}
