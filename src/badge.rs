//! The badge loop body.
//!
//! Event sources (BLE writes, connection changes, the button) push
//! [`BadgeEvent`]s into one channel. [`Badge::tick`] drains it, runs the
//! mode controller, and reports whether the caller should sample the
//! battery or power down. The caller owns the clock and the hardware.

use crate::command::Command;
use crate::config::LOW_BATTERY_PERCENT;
use crate::content::DisplayMode;
use crate::controller::{ModeController, TickReport, TickScope};
use crate::persist::{KeyValueStore, Persistence};
use crate::power_logic::{PowerAction, PowerManager, WakeCause};
use crate::render::{Panel, Renderer};
use crate::telemetry::TelemetryScheduler;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

/// Status text for a nearly empty cell.
pub const LOW_BATTERY_TEXT: &str = "Low battery";

/// Everything the loop reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BadgeEvent {
    Command(Command),
    /// Debounced button press.
    Click,
    Connected,
    Disconnected,
}

/// What the caller should do after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    Continue {
        /// A battery sample is due; report it with [`Badge::record_battery`].
        sample_battery: bool,
    },
    /// Stop advertising and enter System OFF. The panel is already on hold.
    EnterDeepSleep,
}

pub struct Badge<P, S> {
    controller: ModeController<P, S>,
    power: PowerManager,
    telemetry: TelemetryScheduler,
    connected: bool,
    battery_percent: Option<u8>,
    low_battery_shown: bool,
    last_report: TickReport,
}

impl<P: Panel, S: KeyValueStore> Badge<P, S> {
    /// Load persisted state and start advertising-awake.
    pub async fn boot(panel: P, store: S, cause: WakeCause, now_ms: u64) -> Self {
        let controller =
            ModeController::boot(Renderer::new(panel), Persistence::new(store)).await;
        Self::new(controller, PowerManager::boot(cause, now_ms), now_ms)
    }

    pub fn new(controller: ModeController<P, S>, power: PowerManager, now_ms: u64) -> Self {
        Self {
            controller,
            power,
            telemetry: TelemetryScheduler::new(now_ms),
            connected: false,
            battery_percent: None,
            low_battery_shown: false,
            last_report: TickReport::default(),
        }
    }

    pub async fn handle(&mut self, event: BadgeEvent, now_ms: u64) {
        match event {
            BadgeEvent::Command(command) => self.controller.apply(command).await,
            BadgeEvent::Click => {
                self.controller.click(now_ms);
            }
            BadgeEvent::Connected => {
                info!("Central connected");
                self.connected = true;
                self.power.set_connected(true, now_ms);
            }
            BadgeEvent::Disconnected => {
                info!("Central disconnected");
                self.connected = false;
                self.power.set_connected(false, now_ms);
            }
        }
    }

    /// Drain pending events, then run one controller tick.
    pub async fn tick<M: RawMutex, const N: usize>(
        &mut self,
        events: &Channel<M, BadgeEvent, N>,
        now_ms: u64,
    ) -> TickOutcome {
        while let Ok(event) = events.try_receive() {
            self.handle(event, now_ms).await;
        }

        if self.connected {
            let sample_battery = self.telemetry.poll(now_ms, true);
            self.last_report = self.controller.tick(TickScope::Connected).await;
            return TickOutcome::Continue { sample_battery };
        }

        self.last_report = self.controller.tick(TickScope::Disconnected).await;
        match self.power.poll(now_ms) {
            PowerAction::Stay => TickOutcome::Continue {
                sample_battery: false,
            },
            PowerAction::EnterDeepSleep => {
                self.controller.hold();
                TickOutcome::EnterDeepSleep
            }
        }
    }

    /// Store a fresh battery reading; shows the low-battery notice once.
    pub fn record_battery(&mut self, percent: u8) {
        info!("Battery at {}%", percent);
        self.battery_percent = Some(percent);
        if percent <= LOW_BATTERY_PERCENT
            && !self.low_battery_shown
            && self.controller.current() != DisplayMode::Blank
        {
            warn!("Battery low ({}%)", percent);
            self.low_battery_shown = true;
            self.controller.show_status(LOW_BATTERY_TEXT);
        }
    }

    pub fn battery_percent(&self) -> Option<u8> {
        self.battery_percent
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn controller(&self) -> &ModeController<P, S> {
        &self.controller
    }

    pub fn power(&self) -> &PowerManager {
        &self.power
    }

    /// Report of the most recent controller tick.
    pub fn last_report(&self) -> TickReport {
        self.last_report
    }
}
