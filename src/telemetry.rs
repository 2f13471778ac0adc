//! Battery level conversion and the periodic report schedule.

use crate::config::{
    BATTERY_ADC_MAX, BATTERY_ADC_REF_MV, BATTERY_DIVIDER, BATTERY_INTERVAL_MS, BATTERY_MAX_MV,
    BATTERY_MIN_MV,
};

/// Cell voltage for a raw 12-bit SAADC count behind the divider.
pub fn millivolts_from_raw(raw: u16) -> u32 {
    let raw = (raw as u32).min(BATTERY_ADC_MAX);
    raw * BATTERY_ADC_REF_MV * BATTERY_DIVIDER / BATTERY_ADC_MAX
}

/// Linear 0..=100 between the empty and full cell voltages.
pub fn percent_from_millivolts(mv: u32) -> u8 {
    let mv = mv.clamp(BATTERY_MIN_MV, BATTERY_MAX_MV);
    ((mv - BATTERY_MIN_MV) * 100 / (BATTERY_MAX_MV - BATTERY_MIN_MV)) as u8
}

pub fn percent_from_raw(raw: u16) -> u8 {
    percent_from_millivolts(millivolts_from_raw(raw))
}

/// Fires every `BATTERY_INTERVAL_MS` while connected.
pub struct TelemetryScheduler {
    last_ms: u64,
    interval_ms: u64,
}

impl TelemetryScheduler {
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_ms: now_ms,
            interval_ms: BATTERY_INTERVAL_MS,
        }
    }

    /// `true` when a sample is due. Nothing is due while disconnected.
    pub fn poll(&mut self, now_ms: u64, connected: bool) -> bool {
        if !connected || now_ms.saturating_sub(self.last_ms) < self.interval_ms {
            return false;
        }
        self.last_ms = now_ms;
        true
    }
}
