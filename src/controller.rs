//! Display mode state machine.
//!
//! The controller owns the badge content and two modes: `current`, what the
//! panel shows, and `requested`, where commands and clicks want it to go.
//! Commands and clicks only set requests and flags. All painting happens
//! in [`ModeController::tick`], which resolves at most one of these per call,
//! in priority order:
//!
//! 1. pending clear
//! 2. `requested != current`
//! 3. info text changed while showing info
//! 4. QR payload changed while showing QR
//!
//! Any paint is followed by panel hibernation. The mode is written to the
//! store whenever it differs from the last written value, so it is durable
//! before the loop can decide to sleep.

use crate::command::Command;
use crate::config::BUTTON_COOLDOWN_MS;
use crate::content::{BadgeContent, DisplayMode};
use crate::persist::{KeyValueStore, PersistedState, Persistence};
use crate::render::{Panel, RenderOutcome, Renderer, NO_QR_TEXT};
use crate::ui::input_logic::{next_mode, ClickCooldown};

/// How much of the priority list a tick evaluates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickScope {
    /// All four steps.
    Connected,
    /// Mode mismatch only. Pending clear and content flags are left alone.
    Disconnected,
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Outcome of the full repaint, if one happened.
    pub painted: Option<RenderOutcome>,
    pub mode_saved: bool,
}

impl TickReport {
    pub fn cleared(&self) -> bool {
        self.painted == Some(RenderOutcome::Blank)
    }
}

pub struct ModeController<P, S> {
    renderer: Renderer<P>,
    persistence: Persistence<S>,
    content: BadgeContent,
    current: DisplayMode,
    requested: DisplayMode,
    persisted_mode: DisplayMode,
    clear_requested: bool,
    info_changed: bool,
    qr_changed: bool,
    boot_redraw: bool,
    cooldown: ClickCooldown,
}

impl<P: Panel, S: KeyValueStore> ModeController<P, S> {
    /// Load the persisted state and start in the stored mode.
    pub async fn boot(renderer: Renderer<P>, mut persistence: Persistence<S>) -> Self {
        let state = persistence.load().await;
        Self::new(renderer, persistence, state)
    }

    pub fn new(renderer: Renderer<P>, persistence: Persistence<S>, state: PersistedState) -> Self {
        Self {
            renderer,
            persistence,
            content: state.content,
            current: state.mode,
            requested: state.mode,
            persisted_mode: state.mode,
            clear_requested: false,
            info_changed: false,
            qr_changed: false,
            boot_redraw: true,
            cooldown: ClickCooldown::new(BUTTON_COOLDOWN_MS),
        }
    }

    /// Record a parsed command. Content changes are persisted right away;
    /// the panel is only touched by the next tick.
    pub async fn apply(&mut self, command: Command) {
        match command {
            Command::Clear => {
                info!("Clear requested");
                self.clear_requested = true;
                self.info_changed = false;
                self.qr_changed = false;
            }
            Command::SetMode(mode) => {
                info!("Mode {:?} requested", mode);
                self.requested = mode;
            }
            Command::SetInfo(info) => {
                if info == self.content.info {
                    debug!("Info unchanged, ignoring");
                    return;
                }
                self.content.info = info;
                self.persistence.save_info(&self.content.info).await;
                info!("Info updated ({} bytes)", self.content.info.as_str().len());
                self.clear_requested = false;
                self.requested = DisplayMode::Info;
                self.info_changed = true;
            }
            Command::SetQr(Some(qr)) => {
                if self.content.qr.as_ref() == Some(&qr) {
                    debug!("QR payload unchanged, ignoring");
                    return;
                }
                self.content.qr = Some(qr);
                self.persistence.save_qr(self.content.qr.as_ref()).await;
                info!("QR payload updated ({} bytes)", self.content.qr_str().len());
                self.clear_requested = false;
                self.requested = DisplayMode::Qr;
                self.qr_changed = true;
            }
            Command::SetQr(None) => {
                if self.content.qr.is_none() {
                    return;
                }
                self.content.qr = None;
                self.persistence.save_qr(None).await;
                self.qr_changed = false;
                info!("QR payload erased");
                if self.current == DisplayMode::Qr || self.requested == DisplayMode::Qr {
                    self.requested = DisplayMode::Info;
                }
            }
        }
    }

    /// Button click: rotate `requested`. Returns `false` while cooling down.
    pub fn click(&mut self, now_ms: u64) -> bool {
        if self.cooldown.is_cooling(now_ms) {
            debug!("Click ignored, cooling down");
            return false;
        }
        let before = self.requested;
        self.requested = next_mode(self.current, self.content.has_qr());
        if self.requested != self.current || self.requested != before {
            self.cooldown.start(now_ms);
        }
        info!("Click: {:?} -> {:?}", self.current, self.requested);
        true
    }

    /// Resolve pending requests, paint at most once, persist the mode.
    pub async fn tick(&mut self, scope: TickScope) -> TickReport {
        let full = scope == TickScope::Connected;
        let mut paint = None;

        // QR is only a valid target while a payload exists. An erase
        // followed by `display:qr` in the same tick leaves both modes on QR.
        if self.requested == DisplayMode::Qr && !self.content.has_qr() {
            let fallback = if self.current == DisplayMode::Qr {
                DisplayMode::Info
            } else {
                self.current
            };
            warn!("QR requested without QR data, using {:?}", fallback);
            self.requested = fallback;
        }

        if full && self.clear_requested {
            self.clear_requested = false;
            self.requested = DisplayMode::Blank;
            if self.current != DisplayMode::Blank {
                info!("Clearing display");
                self.current = DisplayMode::Blank;
                paint = Some(DisplayMode::Blank);
            }
        } else if self.requested != self.current {
            info!("Mode {:?} -> {:?}", self.current, self.requested);
            self.current = self.requested;
            paint = Some(self.current);
        } else if full && self.current == DisplayMode::Info && self.info_changed {
            paint = Some(DisplayMode::Info);
        } else if full && self.current == DisplayMode::Qr && self.qr_changed {
            paint = Some(DisplayMode::Qr);
        }

        if paint.is_none() && self.boot_redraw {
            paint = Some(self.current);
        }

        let mut report = TickReport::default();
        if let Some(mode) = paint {
            self.boot_redraw = false;
            report.painted = Some(self.paint(mode));
            if full {
                match mode {
                    DisplayMode::Info => self.info_changed = false,
                    DisplayMode::Qr => self.qr_changed = false,
                    DisplayMode::Blank => {}
                }
            }
        }

        if self.current != self.persisted_mode {
            self.persistence.save_mode(self.current).await;
            self.persisted_mode = self.current;
            report.mode_saved = true;
        }
        report
    }

    /// Partial status update over the current screen, then hibernate.
    pub fn show_status(&mut self, text: &str) {
        if let Err(e) = self.renderer.render_status(text) {
            warn!("Status update failed: {:?}", e);
        }
        self.renderer.hibernate();
    }

    /// Force the panel into low-power hold.
    pub fn hold(&mut self) {
        self.renderer.hibernate();
    }

    pub fn current(&self) -> DisplayMode {
        self.current
    }

    pub fn requested(&self) -> DisplayMode {
        self.requested
    }

    pub fn content(&self) -> &BadgeContent {
        &self.content
    }

    pub fn is_clear_pending(&self) -> bool {
        self.clear_requested
    }

    pub fn renderer(&self) -> &Renderer<P> {
        &self.renderer
    }

    pub fn panel(&self) -> &P {
        self.renderer.panel()
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    fn paint(&mut self, mode: DisplayMode) -> RenderOutcome {
        let outcome = match self.content.screen(mode) {
            Some(screen) => self.renderer.render_full(screen),
            None => self.renderer.render_message(NO_QR_TEXT),
        };
        self.renderer.hibernate();
        outcome
    }
}
