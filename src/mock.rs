//! In-memory doubles for the store and the panel.
//!
//! Used by the unit and integration tests, and handy for bring-up on a
//! board without a panel attached.

use crate::error::{PanelError, StoreError};
use crate::framebuffer::FrameBuffer;
use crate::persist::{Access, KeyValueStore, StoreKey};
use crate::render::Panel;
use embedded_graphics::primitives::Rectangle;
use heapless::String;

const RAW_CAPACITY: usize = 256;

/// Writes that reached the store, per key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub info: u32,
    pub qr: u32,
    pub mode: u32,
}

/// RAM-backed [`KeyValueStore`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    info: Option<String<RAW_CAPACITY>>,
    qr: Option<String<RAW_CAPACITY>>,
    mode: Option<u32>,
    /// Fail every `Access::ReadOnly` open (fresh namespace).
    pub read_only_open_fails: bool,
    /// Fail every operation.
    pub unavailable: bool,
    pub opens: u32,
    pub writes: WriteCounts,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a string key without counting a write. Ignored for `Mode`.
    pub fn set_raw_str(&mut self, key: StoreKey, value: &str) {
        let mut s = String::new();
        let _ = s.push_str(value);
        match key {
            StoreKey::Info => self.info = Some(s),
            StoreKey::Qr => self.qr = Some(s),
            StoreKey::Mode => {}
        }
    }

    pub fn set_raw_mode(&mut self, mode: Option<u32>) {
        self.mode = mode;
    }

    pub fn raw_str(&self, key: StoreKey) -> Option<&str> {
        match key {
            StoreKey::Info => self.info.as_deref(),
            StoreKey::Qr => self.qr.as_deref(),
            StoreKey::Mode => None,
        }
    }

    pub fn raw_mode(&self) -> Option<u32> {
        self.mode
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    async fn open(&mut self, access: Access) -> Result<(), StoreError> {
        self.opens += 1;
        self.check()?;
        if access == Access::ReadOnly && self.read_only_open_fails {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }

    async fn read_str<'b>(
        &mut self,
        key: StoreKey,
        buf: &'b mut [u8],
    ) -> Result<Option<&'b str>, StoreError> {
        self.check()?;
        let Some(value) = self.raw_str(key) else {
            return Ok(None);
        };
        let bytes = value.as_bytes();
        if bytes.len() > buf.len() {
            return Err(StoreError::BufferTooSmall);
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        core::str::from_utf8(&buf[..bytes.len()])
            .map(Some)
            .map_err(|_| StoreError::Corrupt)
    }

    async fn write_str(&mut self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        self.check()?;
        self.set_raw_str(key, value);
        match key {
            StoreKey::Info => self.writes.info += 1,
            StoreKey::Qr => self.writes.qr += 1,
            StoreKey::Mode => {}
        }
        Ok(())
    }

    async fn read_u32(&mut self, key: StoreKey) -> Result<Option<u32>, StoreError> {
        self.check()?;
        Ok(match key {
            StoreKey::Mode => self.mode,
            _ => None,
        })
    }

    async fn write_u32(&mut self, key: StoreKey, value: u32) -> Result<(), StoreError> {
        self.check()?;
        if key == StoreKey::Mode {
            self.mode = Some(value);
            self.writes.mode += 1;
        }
        Ok(())
    }
}

/// [`Panel`] that records what it was asked to do.
#[derive(Clone, Debug, Default)]
pub struct RecordingPanel {
    pub full_updates: u32,
    pub partial_updates: u32,
    pub hibernations: u32,
    pub last_partial: Option<Rectangle>,
    /// Inked pixels in the last frame pushed with a full update.
    pub last_full_ink: usize,
    /// Cleared by `hibernate`, set by any update.
    pub awake: bool,
    /// Make every call fail.
    pub fail: bool,
}

impl RecordingPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total paints of any kind.
    pub fn updates(&self) -> u32 {
        self.full_updates + self.partial_updates
    }
}

impl Panel for RecordingPanel {
    fn full_update(&mut self, frame: &FrameBuffer) -> Result<(), PanelError> {
        if self.fail {
            return Err(PanelError::Bus);
        }
        self.full_updates += 1;
        self.last_full_ink = frame.dark_pixels().count();
        self.awake = true;
        Ok(())
    }

    fn partial_update(&mut self, _frame: &FrameBuffer, area: &Rectangle) -> Result<(), PanelError> {
        if self.fail {
            return Err(PanelError::Bus);
        }
        self.partial_updates += 1;
        self.last_partial = Some(*area);
        self.awake = true;
        Ok(())
    }

    fn hibernate(&mut self) -> Result<(), PanelError> {
        if self.fail {
            return Err(PanelError::Busy);
        }
        self.hibernations += 1;
        self.awake = false;
        Ok(())
    }
}
