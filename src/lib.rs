//! Host-testable core of the pixeltag badge firmware.
//!
//! Everything that does not touch hardware lives here: the command parser,
//! the mode controller, rendering into a frame buffer, persistence over a
//! key-value trait, and the power/telemetry policies.
//!
//! Usage: `cargo test --lib` / `cargo test`
//!
//! Note: The embedded binary (main.rs, `embedded` feature) adds the
//! SoftDevice, e-paper, flash and SAADC glue on top of this crate.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod badge;
pub mod command;
pub mod config;
pub mod content;
pub mod controller;
pub mod error;
pub mod framebuffer;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod persist;
pub mod qr;
pub mod render;
pub mod telemetry;

pub mod power_logic;

pub mod ui {
    pub mod input_logic;
}

pub use badge::{Badge, BadgeEvent, TickOutcome};
pub use command::Command;
pub use content::{BadgeContent, DisplayMode, InfoField, InfoText, QrText};
pub use error::Error;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::content::DisplayMode;
    use super::ui::input_logic::{next_mode, ClickCooldown};

    // ════════════════════════════════════════════════════════════════════════
    // Button rotation
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn info_goes_to_qr_when_payload_present() {
        assert_eq!(next_mode(DisplayMode::Info, true), DisplayMode::Qr);
    }

    #[test]
    fn info_skips_qr_without_payload() {
        assert_eq!(next_mode(DisplayMode::Info, false), DisplayMode::Blank);
    }

    #[test]
    fn qr_and_blank_rotate_regardless_of_payload() {
        for has_qr in [true, false] {
            assert_eq!(next_mode(DisplayMode::Qr, has_qr), DisplayMode::Blank);
            assert_eq!(next_mode(DisplayMode::Blank, has_qr), DisplayMode::Info);
        }
    }

    #[test]
    fn rotation_never_stays_put() {
        for mode in [DisplayMode::Info, DisplayMode::Qr, DisplayMode::Blank] {
            assert_ne!(next_mode(mode, true), mode);
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Click cooldown
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn first_click_is_never_cooling() {
        let cd = ClickCooldown::new(5_000);
        assert!(!cd.is_cooling(0));
        assert!(!cd.is_cooling(u64::MAX));
    }

    #[test]
    fn cooling_window_is_half_open() {
        let mut cd = ClickCooldown::new(5_000);
        cd.start(10_000);
        assert!(cd.is_cooling(10_000));
        assert!(cd.is_cooling(14_999));
        assert!(!cd.is_cooling(15_000));
    }

    #[test]
    fn earlier_timestamp_counts_as_cooling() {
        let mut cd = ClickCooldown::new(5_000);
        cd.start(10_000);
        assert!(cd.is_cooling(9_000));
    }
}
