//! Mode button.
//!
//! One active-low switch with the internal pull-up. A press must still read
//! low after `BUTTON_DEBOUNCE_MS` to count; the click is queued as
//! `BadgeEvent::Click` and the controller applies its own cooldown.
//!
//! The same pin is armed as the System OFF wake source in `power.rs`, so
//! the press that wakes the badge is not seen here: it happened before boot.

use crate::ble::EVENTS;
use defmt::{debug, info, warn};
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::Timer;
use pixeltag::config::BUTTON_DEBOUNCE_MS;
use pixeltag::BadgeEvent;

#[embassy_executor::task]
pub async fn button_task(pin: AnyPin) -> ! {
    let mut button = Input::new(pin, Pull::Up);

    // A button held across boot must be released before the first click.
    button.wait_for_high().await;

    loop {
        button.wait_for_low().await;
        Timer::after_millis(BUTTON_DEBOUNCE_MS).await;

        if button.is_high() {
            debug!("Button: bounce ignored");
            continue;
        }

        info!("Button: click");
        if EVENTS.try_send(BadgeEvent::Click).is_err() {
            warn!("Button: event queue full, click dropped");
        }

        button.wait_for_high().await;
        Timer::after_millis(BUTTON_DEBOUNCE_MS).await;
    }
}
