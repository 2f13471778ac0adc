//! Unified error type for pixeltag.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// An inbound write could not be turned into a command.
    Parse(ParseError),

    /// The QR payload could not be turned into a symbol.
    Qr(QrError),

    /// The key-value store failed.
    Store(StoreError),

    /// The e-paper panel failed.
    Panel(PanelError),

    /// SoftDevice or BLE stack failure during bring-up.
    Ble,
}

/// Why an inbound write was ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Payload was not valid UTF-8.
    NotUtf8,
    /// No keyword or prefix matched.
    Unrecognized,
    /// `data:qr:` payload longer than `MAX_QR_LEN`.
    QrTooLong { len: usize },
}

/// QR encoder failure (fixed version and ECC, no fallback).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QrError {
    /// Input longer than `MAX_QR_LEN`.
    TooLong { len: usize },
    /// The encoder could not fit the data into the fixed version.
    EncodingFailed,
}

/// Key-value store failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Namespace could not be opened.
    Unavailable,
    /// Stored value did not fit the read buffer.
    BufferTooSmall,
    /// Stored string was not UTF-8.
    Corrupt,
    /// Flash read/write/erase failed.
    Flash,
}

/// E-paper panel failure (SPI or busy-pin timeout).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelError {
    Bus,
    Busy,
}

// Convenience conversions

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<QrError> for Error {
    fn from(e: QrError) -> Self {
        Error::Qr(e)
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}

impl From<PanelError> for Error {
    fn from(e: PanelError) -> Self {
        Error::Panel(e)
    }
}
