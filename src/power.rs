//! Power management module - wake cause, battery sense, System OFF.
//!
//! The policy (when to sleep) lives in `pixeltag::power_logic`; this
//! module only talks to the hardware.
//!
//! nRF52840 power modes:
//! - System ON: Normal operation (~3.5 mA with BLE advertising)
//! - System OFF: Deep sleep, wake on GPIO sense (~0.4 µA)

use defmt::{info, warn};
use embassy_nrf::pac;
use embassy_nrf::pac::gpio::vals;
use embassy_nrf::saadc::Saadc;
use nrf_softdevice::raw;
use pixeltag::config::BUTTON_PIN;
use pixeltag::power_logic::WakeCause;
use pixeltag::telemetry;

/// RESETREAS bit set after a wake from System OFF via GPIO.
const RESETREAS_OFF: u32 = 1 << 16;

/// Read and clear the reset reason. Requires the SoftDevice to be enabled.
pub fn wake_cause() -> WakeCause {
    let mut reason: u32 = 0;
    // SAFETY: plain SVC calls into the enabled SoftDevice.
    let err = unsafe { raw::sd_power_reset_reason_get(&mut reason) };
    if err != raw::NRF_SUCCESS {
        warn!("Reset reason unavailable (err {})", err);
        return WakeCause::TimerOrPowerOn;
    }
    unsafe {
        raw::sd_power_reset_reason_clr(reason);
    }
    info!("Reset reason 0x{:08x}", reason);

    if reason & RESETREAS_OFF != 0 {
        WakeCause::Button
    } else {
        WakeCause::TimerOrPowerOn
    }
}

/// Sample the battery sense pin and convert to percent.
pub async fn battery_percent(adc: &mut Saadc<'static, 1>) -> u8 {
    let mut buf = [0i16; 1];
    adc.sample(&mut buf).await;
    let raw = buf[0].max(0) as u16;
    let percent = telemetry::percent_from_raw(raw);
    info!(
        "Battery: raw {} = {} mV = {}%",
        raw,
        telemetry::millivolts_from_raw(raw),
        percent
    );
    percent
}

/// Arm the button as wake source and enter System OFF. Never returns.
pub fn enter_system_off() -> ! {
    info!("Entering System OFF, wake on button (P0.{})", BUTTON_PIN);

    pac::P0.pin_cnf(BUTTON_PIN).write(|w| {
        w.set_dir(vals::Dir::INPUT);
        w.set_input(vals::Input::CONNECT);
        w.set_pull(vals::Pull::PULLUP);
        w.set_sense(vals::Sense::LOW);
    });

    // SAFETY: the SoftDevice owns POWER; this is its System OFF entry.
    unsafe {
        raw::sd_power_system_off();
    }

    // Only reached under a debugger, where System OFF is emulated.
    loop {
        cortex_m::asm::wfe();
    }
}
