//! QR encoder adapter over `qrcodegen-no-heap`.
//!
//! Version and ECC level are fixed (version 7, ECC Low). There is no
//! fallback to a larger version or a weaker level: payloads that do not fit
//! must be shortened by the sender.

use crate::config::{MAX_QR_LEN, QR_VERSION};
use crate::error::QrError;
use qrcodegen_no_heap::{QrCode, QrCodeEcc, Version};

/// Modules per side for the fixed version.
pub const QR_SIDE: u32 = QR_VERSION as u32 * 4 + 17;

/// Working-buffer size required by the encoder for the fixed version.
pub const QR_BUFFER_LEN: usize = {
    let side = QR_SIDE as usize;
    (side * side + 7) / 8 + 1
};

/// Scratch and output storage for one symbol.
pub struct QrBuffers {
    temp: [u8; QR_BUFFER_LEN],
    out: [u8; QR_BUFFER_LEN],
}

impl QrBuffers {
    pub const fn new() -> Self {
        Self {
            temp: [0; QR_BUFFER_LEN],
            out: [0; QR_BUFFER_LEN],
        }
    }
}

impl Default for QrBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// Square module grid borrowed from a [`QrBuffers`].
pub struct ModuleGrid<'a> {
    code: QrCode<'a>,
}

impl ModuleGrid<'_> {
    /// Modules per side.
    pub fn side(&self) -> u32 {
        self.code.size() as u32
    }

    /// `true` for a dark module. Out-of-range coordinates are light.
    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        self.code.get_module(x as i32, y as i32)
    }
}

/// Encode `text` at the fixed version and ECC level.
pub fn encode<'a>(text: &str, buffers: &'a mut QrBuffers) -> Result<ModuleGrid<'a>, QrError> {
    if text.len() > MAX_QR_LEN {
        return Err(QrError::TooLong { len: text.len() });
    }

    let version = Version::new(QR_VERSION);
    let QrBuffers { temp, out } = buffers;
    QrCode::encode_text(
        text,
        temp,
        out,
        QrCodeEcc::Low,
        version,
        version,
        None,
        false,
    )
    .map(|code| ModuleGrid { code })
    .map_err(|_| QrError::EncodingFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_version_yields_45_modules() {
        let mut buffers = QrBuffers::new();
        let grid = encode("https://example.com", &mut buffers).unwrap();
        assert_eq!(grid.side(), 45);
        assert_eq!(grid.side(), QR_SIDE);
    }

    #[test]
    fn finder_pattern_corners_are_dark() {
        let mut buffers = QrBuffers::new();
        let grid = encode("hello", &mut buffers).unwrap();
        let last = grid.side() - 1;
        assert!(grid.is_dark(0, 0));
        assert!(grid.is_dark(last, 0));
        assert!(grid.is_dark(0, last));
        // Separator ring inside the finder is light.
        assert!(!grid.is_dark(1, 1));
    }

    #[test]
    fn every_length_up_to_limit_encodes() {
        let mut buffers = QrBuffers::new();
        for len in 0..=MAX_QR_LEN {
            let text = "Z".repeat(len);
            let grid = encode(&text, &mut buffers);
            assert!(grid.is_ok(), "length {} failed", len);
        }
    }

    #[test]
    fn every_byte_mode_length_up_to_limit_encodes() {
        let mut buffers = QrBuffers::new();
        for len in 0..=MAX_QR_LEN {
            // Lowercase forces byte mode.
            let text = "z".repeat(len);
            let grid = encode(&text, &mut buffers);
            assert!(grid.is_ok(), "length {} failed", len);
        }
    }

    #[test]
    fn multibyte_payload_at_limit_encodes() {
        let mut buffers = QrBuffers::new();
        // 45 two-byte chars = 90 bytes.
        let text = "é".repeat(MAX_QR_LEN / 2);
        assert_eq!(text.len(), MAX_QR_LEN);
        let grid = encode(&text, &mut buffers).unwrap();
        assert_eq!(grid.side(), QR_SIDE);
    }

    #[test]
    fn over_limit_is_rejected_before_encoding() {
        let mut buffers = QrBuffers::new();
        let text = "a".repeat(MAX_QR_LEN + 1);
        assert!(matches!(
            encode(&text, &mut buffers),
            Err(QrError::TooLong { len }) if len == MAX_QR_LEN + 1
        ));
    }

    #[test]
    fn multibyte_payload_counts_bytes() {
        let mut buffers = QrBuffers::new();
        // 46 two-byte chars = 92 bytes.
        let text = "é".repeat(46);
        assert!(matches!(
            encode(&text, &mut buffers),
            Err(QrError::TooLong { len: 92 })
        ));
    }
}
