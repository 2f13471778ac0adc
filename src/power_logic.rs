//! Awake/sleep policy, independent of the hardware.
//!
//! The badge is awake while connected. Once disconnected it advertises for
//! `IDLE_BUDGET_MS`, measured from boot or from the last disconnect, then
//! asks for System OFF. Wake-up is a full reboot, so there is no way back
//! from `DeepSleep` inside one run.

use crate::config::IDLE_BUDGET_MS;

/// Why the chip is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeCause {
    /// Woken from System OFF by the button.
    Button,
    /// Power-on, reset, or anything else.
    TimerOrPowerOn,
}

/// Captured once per boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeContext {
    pub cause: WakeCause,
    pub wake_start_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    AwakeAdvertising,
    AwakeConnected,
    DeepSleep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerAction {
    Stay,
    EnterDeepSleep,
}

/// `true` once `elapsed_ms` has used up the idle budget.
pub fn idle_expired(elapsed_ms: u64, budget_ms: u64) -> bool {
    elapsed_ms >= budget_ms
}

pub struct PowerManager {
    state: PowerState,
    wake: WakeContext,
    idle_since_ms: u64,
    budget_ms: u64,
}

impl PowerManager {
    pub fn boot(cause: WakeCause, now_ms: u64) -> Self {
        Self::with_budget(cause, now_ms, IDLE_BUDGET_MS)
    }

    pub fn with_budget(cause: WakeCause, now_ms: u64, budget_ms: u64) -> Self {
        info!("Power: wake cause {:?} at {} ms", cause, now_ms);
        Self {
            state: PowerState::AwakeAdvertising,
            wake: WakeContext {
                cause,
                wake_start_ms: now_ms,
            },
            idle_since_ms: now_ms,
            budget_ms,
        }
    }

    /// Track the link. A disconnect restarts the idle budget.
    pub fn set_connected(&mut self, connected: bool, now_ms: u64) {
        let next = match (self.state, connected) {
            (PowerState::DeepSleep, _) => return,
            (_, true) => PowerState::AwakeConnected,
            (PowerState::AwakeConnected, false) => {
                self.idle_since_ms = now_ms;
                PowerState::AwakeAdvertising
            }
            (PowerState::AwakeAdvertising, false) => return,
        };
        if next != self.state {
            info!("Power: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Check the idle budget; only advertising can time out.
    pub fn poll(&mut self, now_ms: u64) -> PowerAction {
        if self.state != PowerState::AwakeAdvertising {
            return PowerAction::Stay;
        }
        let elapsed = now_ms.saturating_sub(self.idle_since_ms);
        if idle_expired(elapsed, self.budget_ms) {
            info!("Power: idle for {} ms, entering deep sleep", elapsed);
            self.state = PowerState::DeepSleep;
            PowerAction::EnterDeepSleep
        } else {
            PowerAction::Stay
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn wake(&self) -> WakeContext {
        self.wake
    }

    pub fn is_advertising(&self) -> bool {
        self.state == PowerState::AwakeAdvertising
    }

    /// When the current idle window started.
    pub fn idle_since_ms(&self) -> u64 {
        self.idle_since_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_exactly_at_budget() {
        assert!(!idle_expired(59_999, 60_000));
        assert!(idle_expired(60_000, 60_000));
        assert!(idle_expired(u64::MAX, 60_000));
    }

    #[test]
    fn advertising_times_out_from_boot() {
        let mut pm = PowerManager::boot(WakeCause::TimerOrPowerOn, 1_000);
        assert_eq!(pm.poll(60_999), PowerAction::Stay);
        assert_eq!(pm.poll(61_000), PowerAction::EnterDeepSleep);
        assert_eq!(pm.state(), PowerState::DeepSleep);
        assert_eq!(pm.poll(70_000), PowerAction::Stay);
    }

    #[test]
    fn connected_never_times_out() {
        let mut pm = PowerManager::boot(WakeCause::Button, 0);
        pm.set_connected(true, 10);
        assert_eq!(pm.poll(10_000_000), PowerAction::Stay);
        assert_eq!(pm.state(), PowerState::AwakeConnected);
    }

    #[test]
    fn disconnect_restarts_budget() {
        let mut pm = PowerManager::boot(WakeCause::Button, 0);
        pm.set_connected(true, 5_000);
        pm.set_connected(false, 100_000);
        assert!(pm.is_advertising());
        assert_eq!(pm.idle_since_ms(), 100_000);
        assert_eq!(pm.poll(159_999), PowerAction::Stay);
        assert_eq!(pm.poll(160_000), PowerAction::EnterDeepSleep);
    }

    #[test]
    fn repeated_disconnect_does_not_extend_budget() {
        let mut pm = PowerManager::boot(WakeCause::TimerOrPowerOn, 0);
        pm.set_connected(false, 30_000);
        assert_eq!(pm.idle_since_ms(), 0);
        assert_eq!(pm.poll(60_000), PowerAction::EnterDeepSleep);
    }

    #[test]
    fn clock_going_backwards_is_not_expiry() {
        let mut pm = PowerManager::boot(WakeCause::TimerOrPowerOn, 50_000);
        assert_eq!(pm.poll(10), PowerAction::Stay);
    }

    #[test]
    fn sleep_is_terminal() {
        let mut pm = PowerManager::with_budget(WakeCause::TimerOrPowerOn, 0, 10);
        assert_eq!(pm.poll(10), PowerAction::EnterDeepSleep);
        pm.set_connected(true, 11);
        assert_eq!(pm.state(), PowerState::DeepSleep);
        assert_eq!(pm.wake().cause, WakeCause::TimerOrPowerOn);
    }
}
