//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// BLE

/// Advertised GAP device name.
pub const BLE_DEVICE_NAME: &str = "PixelTag";

/// Badge service (command write + read-back characteristics).
pub const BADGE_SERVICE_UUID: &str = "4fafc201-1fb5-459e-8fcc-c5c9c331914c";

/// Write-only characteristic carrying `command:` / `display:` / `data:` strings.
pub const DATA_CHARACTERISTIC_UUID: &str = "beb5483e-36e1-4688-b7f5-ea07361b26a9";

/// Largest inbound write we accept (one ATT write with a 247-byte MTU).
pub const MAX_WRITE_LEN: usize = 244;

// Timing

/// Minimum spacing between two accepted button clicks (ms).
pub const BUTTON_COOLDOWN_MS: u64 = 5_000;

/// Time the badge stays awake while disconnected before deep sleep (ms).
pub const IDLE_BUDGET_MS: u64 = 60_000;

/// Battery sample + notify period while connected (ms).
pub const BATTERY_INTERVAL_MS: u64 = 15_000;

/// Pause between two iterations of the main loop (ms).
pub const LOOP_YIELD_MS: u64 = 10;

/// Capacity of the event queue between the BLE/button tasks and the main loop.
pub const EVENT_QUEUE_DEPTH: usize = 8;

// QR symbol

/// Fixed QR symbol version (45×45 modules).
pub const QR_VERSION: u8 = 7;

/// Longest QR payload (bytes) accepted over BLE.
/// Version 7 at ECC Low holds 154 bytes; the cap keeps URLs short enough to scan.
pub const MAX_QR_LEN: usize = 90;

/// Pixels per QR module.
pub const QR_SCALE: u32 = 2;

/// Blank modules around the symbol.
pub const QR_QUIET_ZONE: u32 = 4;

// Personal info

/// Longest personal-info payload (bytes); longer payloads are truncated.
pub const MAX_INFO_LEN: usize = 150;

/// Info lines drawn on the panel; the rest are dropped.
pub const MAX_INFO_LINES: usize = 10;

/// Default personal info when nothing has been stored yet.
pub const DEFAULT_INFO_TEXT: &str = "Default Name\nDefault Title\n";

// Panel (LilyGo T5 2.13", landscape)

pub const PANEL_WIDTH: u32 = 250;
pub const PANEL_HEIGHT: u32 = 122;

/// Sub-rectangle used for partial status updates (centered on the panel).
pub const STATUS_WIDTH: u32 = 200;
pub const STATUS_HEIGHT: u32 = 24;

/// Extra pixels between two info lines.
pub const LINE_SPACING: u32 = 5;

// Battery

/// SAADC full-scale count (12-bit).
pub const BATTERY_ADC_MAX: u32 = 4095;

/// SAADC reference voltage (mV).
pub const BATTERY_ADC_REF_MV: u32 = 3300;

/// Resistor divider between the cell and the ADC pin.
pub const BATTERY_DIVIDER: u32 = 2;

pub const BATTERY_MIN_MV: u32 = 3000;
pub const BATTERY_MAX_MV: u32 = 4200;

/// Percentage at or below which the "Low battery" status is shown.
pub const LOW_BATTERY_PERCENT: u8 = 10;

// GPIO pin assignments (nRF52840 badge board)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Button         → P0.11 (active-low, also the System OFF wake source)
//   EPD SCK        → P0.19
//   EPD MOSI       → P0.20
//   EPD CS         → P0.22
//   EPD DC         → P0.24
//   EPD RST        → P0.25
//   EPD BUSY       → P0.26
//   Battery sense  → P0.29 (AIN5)

/// Port-0 pin number of the button; armed as the System OFF wake source.
pub const BUTTON_PIN: usize = 11;

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

// Persistent storage

/// Namespace all badge keys live under.
pub const STORE_NAMESPACE: &str = "badgeData";

/// Flash page index where badge storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for badge storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;
