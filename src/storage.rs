//! Persistent badge storage in internal flash.
//!
//! Uses the nRF52840's internal flash via `sequential-storage` crate
//! as the key-value store behind `pixeltag::persist`.
//!
//! Storage layout:
//!   - The `badgeData` namespace is the page range below; each
//!     `StoreKey` is a one-byte map key.
//!   - Strings are stored as raw UTF-8, the mode as a little-endian u32.
//!   - Records are appended sequentially; the flash pages are managed
//!     by `sequential-storage` which handles wear levelling and GC.

use core::ops::Range;

use defmt::{error, info, warn};
use embedded_storage_async::nor_flash::NorFlash;
use pixeltag::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START, STORE_NAMESPACE};
use pixeltag::error::StoreError;
use pixeltag::persist::{Access, KeyValueStore, StoreKey};
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Scratch for one item: key, length header and the longest string.
const ITEM_BUFFER_SIZE: usize = 256;

/// [`KeyValueStore`] over a `NorFlash` page range.
pub struct FlashStore<F> {
    flash: F,
    buf: [u8; ITEM_BUFFER_SIZE],
    /// Set when a probe found the range unreadable; the next read-write
    /// open erases it.
    needs_format: bool,
}

impl<F: NorFlash> FlashStore<F> {
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            buf: [0; ITEM_BUFFER_SIZE],
            needs_format: false,
        }
    }

    const fn range() -> Range<u32> {
        STORAGE_START..STORAGE_END
    }

    async fn fetch(&mut self, key: StoreKey) -> Result<Option<&[u8]>, StoreError> {
        fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            Self::range(),
            &mut NoCache::new(),
            &mut self.buf,
            &key.id(),
        )
        .await
        .map_err(|e| {
            error!("Flash read of {} failed: {:?}", key.name(), defmt::Debug2Format(&e));
            map_error(&e)
        })
    }

    async fn store(&mut self, key: StoreKey, value: &[u8]) -> Result<(), StoreError> {
        store_item::<u8, &[u8], _>(
            &mut self.flash,
            Self::range(),
            &mut NoCache::new(),
            &mut self.buf,
            &key.id(),
            &value,
        )
        .await
        .map_err(|e| {
            error!("Flash write of {} failed: {:?}", key.name(), defmt::Debug2Format(&e));
            map_error(&e)
        })
    }
}

fn map_error<E>(e: &sequential_storage::Error<E>) -> StoreError {
    match e {
        sequential_storage::Error::Corrupted { .. } => StoreError::Corrupt,
        sequential_storage::Error::BufferTooSmall { .. } => StoreError::BufferTooSmall,
        _ => StoreError::Flash,
    }
}

impl<F: NorFlash> KeyValueStore for FlashStore<F> {
    async fn open(&mut self, access: Access) -> Result<(), StoreError> {
        match access {
            Access::ReadOnly => match self.fetch(StoreKey::Mode).await {
                Ok(_) => Ok(()),
                Err(e) => {
                    warn!("Namespace '{}' unreadable", STORE_NAMESPACE);
                    self.needs_format = true;
                    Err(e)
                }
            },
            Access::ReadWrite => {
                if self.needs_format {
                    info!("Formatting namespace '{}'", STORE_NAMESPACE);
                    sequential_storage::erase_all(&mut self.flash, Self::range())
                        .await
                        .map_err(|e| {
                            error!("Flash erase failed: {:?}", defmt::Debug2Format(&e));
                            StoreError::Unavailable
                        })?;
                    self.needs_format = false;
                }
                Ok(())
            }
        }
    }

    async fn read_str<'b>(
        &mut self,
        key: StoreKey,
        buf: &'b mut [u8],
    ) -> Result<Option<&'b str>, StoreError> {
        let Some(value) = self.fetch(key).await? else {
            return Ok(None);
        };
        let len = value.len();
        if len > buf.len() {
            return Err(StoreError::BufferTooSmall);
        }
        buf[..len].copy_from_slice(value);
        core::str::from_utf8(&buf[..len])
            .map(Some)
            .map_err(|_| StoreError::Corrupt)
    }

    async fn write_str(&mut self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        self.store(key, value.as_bytes()).await
    }

    async fn read_u32(&mut self, key: StoreKey) -> Result<Option<u32>, StoreError> {
        let Some(value) = self.fetch(key).await? else {
            return Ok(None);
        };
        let bytes: [u8; 4] = value.try_into().map_err(|_| StoreError::Corrupt)?;
        Ok(Some(u32::from_le_bytes(bytes)))
    }

    async fn write_u32(&mut self, key: StoreKey, value: u32) -> Result<(), StoreError> {
        self.store(key, &value.to_le_bytes()).await
    }
}
