//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **GATT server** - the badge service (one write characteristic for
//!    commands, four read-back characteristics) and the standard Battery
//!    Service.
//! 2. **Peripheral task** - advertises, accepts one central at a time,
//!    forwards parsed writes and link changes into the badge event channel,
//!    and pushes battery notifications while connected.
//!
//! Communication with the main loop goes through the static channel and
//! signals defined here; the GATT callback never touches the panel.

pub mod peripheral;

use core::mem;

use defmt::warn;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;
use nrf_softdevice::raw;
use pixeltag::config::{BLE_DEVICE_NAME, EVENT_QUEUE_DEPTH, MAX_INFO_LEN, MAX_QR_LEN, MAX_WRITE_LEN};
use pixeltag::{BadgeContent, BadgeEvent, InfoField};

/// Everything the peripheral task and the button task feed into the loop.
pub static EVENTS: Channel<CriticalSectionRawMutex, BadgeEvent, EVENT_QUEUE_DEPTH> = Channel::new();

/// Latest battery percentage to notify while connected.
pub static BATTERY_LEVEL: Signal<CriticalSectionRawMutex, u8> = Signal::new();

/// Raised by the main loop before System OFF.
pub static STOP_ADVERTISING: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Raised by the peripheral task once advertising has been torn down.
pub static ADVERTISING_STOPPED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
    #[characteristic(uuid = "2a19", read, notify)]
    pub battery_level: u8,
}

#[nrf_softdevice::gatt_service(uuid = "4fafc201-1fb5-459e-8fcc-c5c9c331914c")]
pub struct BadgeService {
    /// `command:` / `display:` / `data:` strings.
    #[characteristic(uuid = "beb5483e-36e1-4688-b7f5-ea07361b26a9", write)]
    pub data: Vec<u8, MAX_WRITE_LEN>,

    #[characteristic(uuid = "beb5483e-36e1-4688-b7f5-ea07361b26aa", read)]
    pub name: Vec<u8, MAX_INFO_LEN>,

    #[characteristic(uuid = "beb5483e-36e1-4688-b7f5-ea07361b26ab", read)]
    pub title: Vec<u8, MAX_INFO_LEN>,

    #[characteristic(uuid = "beb5483e-36e1-4688-b7f5-ea07361b26ac", read)]
    pub phone: Vec<u8, MAX_INFO_LEN>,

    #[characteristic(uuid = "beb5483e-36e1-4688-b7f5-ea07361b26ad", read)]
    pub qr: Vec<u8, MAX_QR_LEN>,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub bas: BatteryService,
    pub badge: BadgeService,
}

/// SoftDevice configuration: one peripheral link, GAP name from config.
pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 247 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: BLE_DEVICE_NAME.as_ptr() as _,
            current_len: BLE_DEVICE_NAME.len() as u16,
            max_len: BLE_DEVICE_NAME.len() as u16,
            // SAFETY: all-zero security mode = no write access to the name.
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Mirror the badge content into the read-back characteristics.
pub fn publish_content(server: &Server, content: &BadgeContent) {
    let info = &content.info;
    let results = [
        server.badge.name_set(&to_value(info.field(InfoField::Name))),
        server.badge.title_set(&to_value(info.field(InfoField::Title))),
        server.badge.phone_set(&to_value(info.field(InfoField::Phone))),
        server.badge.qr_set(&to_value(content.qr_str())),
    ];
    if results.iter().any(Result::is_err) {
        warn!("Failed to update read-back characteristics");
    }
}

/// Latest reading for the battery level characteristic (read path).
pub fn publish_battery(server: &Server, percent: u8) {
    if server.bas.battery_level_set(&percent).is_err() {
        warn!("Failed to set battery level");
    }
    BATTERY_LEVEL.signal(percent);
}

fn to_value<const N: usize>(text: &str) -> Vec<u8, N> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let _ = out.extend_from_slice(&bytes[..bytes.len().min(N)]);
    out
}
