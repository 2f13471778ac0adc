use crate::content::DisplayMode;

/// Mode a button click moves to: Info -> QR -> Blank -> Info.
/// QR is skipped when there is no payload to show.
pub fn next_mode(current: DisplayMode, has_qr: bool) -> DisplayMode {
    match current {
        DisplayMode::Info if has_qr => DisplayMode::Qr,
        DisplayMode::Info => DisplayMode::Blank,
        DisplayMode::Qr => DisplayMode::Blank,
        DisplayMode::Blank => DisplayMode::Info,
    }
}

/// Rejects clicks within `window_ms` of the last accepted one.
///
/// The first click after boot is always accepted.
#[derive(Clone, Copy, Debug)]
pub struct ClickCooldown {
    window_ms: u64,
    last_accepted: Option<u64>,
}

impl ClickCooldown {
    pub const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_accepted: None,
        }
    }

    pub fn is_cooling(&self, now_ms: u64) -> bool {
        match self.last_accepted {
            Some(at) => now_ms.saturating_sub(at) < self.window_ms,
            None => false,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        self.last_accepted = Some(now_ms);
    }
}
