//! User interface subsystem - e-paper panel + physical button.
//!
//! The badge loop owns the panel and repaints it only from its own tick;
//! the button task only queues clicks.
//!
//! ## Components
//!
//! - **Display**: 2.13" 250×122 e-paper (Waveshare v2 controller) via SPI
//! - **Button**: one tactile switch with debouncing, also the System OFF
//!   wake source

pub mod buttons;
pub mod display;
