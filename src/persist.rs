//! Badge persistence over a namespaced key-value store.
//!
//! Three keys live under `STORE_NAMESPACE`:
//!
//! | key        | type   | meaning                                  |
//! |------------|--------|------------------------------------------|
//! | `persInfo` | string | personal info, newline separated         |
//! | `qrData`   | string | QR payload, empty means none             |
//! | `dispMode` | u32    | `DisplayMode` ordinal                    |
//!
//! Loading never fails: any missing, unreadable or inconsistent value falls
//! back to its default. Saving logs failures and carries on; the in-memory
//! state stays authoritative until the next successful write.

use crate::config::{MAX_INFO_LEN, STORE_NAMESPACE};
use crate::content::{BadgeContent, DisplayMode, InfoText, QrText};
use crate::error::StoreError;

/// How the namespace is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreKey {
    Info,
    Qr,
    Mode,
}

impl StoreKey {
    /// Key name inside the namespace.
    pub const fn name(self) -> &'static str {
        match self {
            StoreKey::Info => "persInfo",
            StoreKey::Qr => "qrData",
            StoreKey::Mode => "dispMode",
        }
    }

    /// Compact on-flash key.
    pub const fn id(self) -> u8 {
        match self {
            StoreKey::Info => 0x01,
            StoreKey::Qr => 0x02,
            StoreKey::Mode => 0x03,
        }
    }
}

/// Namespaced string/u32 store backing the badge state.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn open(&mut self, access: Access) -> Result<(), StoreError>;

    /// Read a string into `buf`; `Ok(None)` if the key was never written.
    async fn read_str<'b>(
        &mut self,
        key: StoreKey,
        buf: &'b mut [u8],
    ) -> Result<Option<&'b str>, StoreError>;

    async fn write_str(&mut self, key: StoreKey, value: &str) -> Result<(), StoreError>;

    async fn read_u32(&mut self, key: StoreKey) -> Result<Option<u32>, StoreError>;

    async fn write_u32(&mut self, key: StoreKey, value: u32) -> Result<(), StoreError>;
}

/// Mode and content as loaded at boot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub mode: DisplayMode,
    pub content: BadgeContent,
}

pub struct Persistence<S> {
    store: S,
    writable: bool,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            writable: false,
        }
    }

    /// Load the persisted state, defaulting anything unavailable.
    pub async fn load(&mut self) -> PersistedState {
        if let Err(e) = self.store.open(Access::ReadOnly).await {
            warn!(
                "Read-only open of '{}' failed ({:?}), retrying read-write",
                STORE_NAMESPACE, e
            );
            if let Err(e) = self.ensure_writable().await {
                error!("Storage unavailable ({:?}), using defaults", e);
                return PersistedState::default();
            }
        }

        let mut buf = [0u8; MAX_INFO_LEN];
        let info = match self.store.read_str(StoreKey::Info, &mut buf).await {
            Ok(Some(text)) => InfoText::new(text),
            Ok(None) => InfoText::default(),
            Err(e) => {
                warn!("Reading {} failed ({:?}), using default", StoreKey::Info.name(), e);
                InfoText::default()
            }
        };

        let qr = match self.store.read_str(StoreKey::Qr, &mut buf).await {
            Ok(Some(text)) => QrText::new(text),
            Ok(None) => None,
            Err(e) => {
                warn!("Reading {} failed ({:?}), treating as empty", StoreKey::Qr.name(), e);
                None
            }
        };

        let stored_mode = match self.store.read_u32(StoreKey::Mode).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Reading {} failed ({:?})", StoreKey::Mode.name(), e);
                None
            }
        };

        let content = BadgeContent { info, qr };
        let mode = resolve_mode(stored_mode, content.has_qr());
        info!(
            "Loaded state: mode={:?}, info {} bytes, qr {} bytes",
            mode,
            content.info.as_str().len(),
            content.qr_str().len()
        );
        PersistedState { mode, content }
    }

    pub async fn save_mode(&mut self, mode: DisplayMode) {
        if let Err(e) = self.write_u32(StoreKey::Mode, mode.ordinal()).await {
            error!("Saving mode {:?} failed: {:?}", mode, e);
        }
    }

    pub async fn save_info(&mut self, info: &InfoText) {
        if let Err(e) = self.write_str(StoreKey::Info, info.as_str()).await {
            error!("Saving info failed: {:?}", e);
        }
    }

    /// `None` stores the empty string.
    pub async fn save_qr(&mut self, qr: Option<&QrText>) {
        let text = qr.map_or("", QrText::as_str);
        if let Err(e) = self.write_str(StoreKey::Qr, text).await {
            error!("Saving QR payload failed: {:?}", e);
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    async fn write_str(&mut self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        self.ensure_writable().await?;
        self.store.write_str(key, value).await?;
        debug!("Stored {} ({} bytes)", key.name(), value.len());
        Ok(())
    }

    async fn write_u32(&mut self, key: StoreKey, value: u32) -> Result<(), StoreError> {
        self.ensure_writable().await?;
        self.store.write_u32(key, value).await?;
        debug!("Stored {} = {}", key.name(), value);
        Ok(())
    }

    async fn ensure_writable(&mut self) -> Result<(), StoreError> {
        if !self.writable {
            self.store.open(Access::ReadWrite).await?;
            self.writable = true;
        }
        Ok(())
    }
}

/// Map a stored ordinal to a mode that can actually be shown.
pub fn resolve_mode(stored: Option<u32>, has_qr: bool) -> DisplayMode {
    match stored.map(DisplayMode::from_ordinal) {
        None => DisplayMode::Info,
        Some(None) => {
            warn!("Stored mode is invalid, falling back to Info");
            DisplayMode::Info
        }
        Some(Some(DisplayMode::Qr)) if !has_qr => {
            warn!("Stored mode is QR but no QR data, falling back to Info");
            DisplayMode::Info
        }
        Some(Some(mode)) => mode,
    }
}
