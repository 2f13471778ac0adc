//! Badge content model: display mode, personal info and QR payload.
//!
//! `QrText` can only be built from a non-empty payload within
//! `MAX_QR_LEN`, and `Screen::Qr` can only be built from a `QrText`, so the
//! renderer is never asked to draw a QR code without data.

use crate::config::{DEFAULT_INFO_TEXT, MAX_INFO_LEN, MAX_INFO_LINES, MAX_QR_LEN};
use heapless::String;

/// What the panel shows. The discriminant is the persisted ordinal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    #[default]
    Info = 0,
    Qr = 1,
    Blank = 2,
}

impl DisplayMode {
    pub const fn ordinal(self) -> u32 {
        self as u32
    }

    pub const fn from_ordinal(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Info),
            1 => Some(Self::Qr),
            2 => Some(Self::Blank),
            _ => None,
        }
    }
}

/// Newline-delimited personal info (name, title/email, phone, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfoText(String<MAX_INFO_LEN>);

/// Read-back segments of the info text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InfoField {
    /// Up to the first newline.
    Name,
    /// Between the first and second newline.
    Title,
    /// Everything after the second newline.
    Phone,
}

impl InfoText {
    /// Store `text` verbatim, truncated to `MAX_INFO_LEN` bytes.
    pub fn new(text: &str) -> Self {
        let mut out = String::new();
        for c in text.chars() {
            if out.push(c).is_err() {
                break;
            }
        }
        Self(out)
    }

    /// Like [`InfoText::new`], but turns literal `\n` escapes into line breaks.
    pub fn unescaped(payload: &str) -> Self {
        let mut out: String<MAX_INFO_LEN> = String::new();
        let mut chars = payload.chars().peekable();
        while let Some(c) = chars.next() {
            let c = if c == '\\' && chars.peek() == Some(&'n') {
                chars.next();
                '\n'
            } else {
                c
            };
            if out.push(c).is_err() {
                break;
            }
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn field(&self, field: InfoField) -> &str {
        let mut parts = self.0.splitn(3, '\n');
        let part = match field {
            InfoField::Name => parts.next(),
            InfoField::Title => parts.nth(1),
            InfoField::Phone => parts.nth(2),
        };
        part.unwrap_or("")
    }

    /// Non-empty lines to draw, capped at `MAX_INFO_LINES`.
    pub fn display_lines(&self) -> impl Iterator<Item = &str> {
        self.0
            .split('\n')
            .filter(|line| !line.is_empty())
            .take(MAX_INFO_LINES)
    }
}

impl Default for InfoText {
    fn default() -> Self {
        Self::new(DEFAULT_INFO_TEXT)
    }
}

/// A non-empty QR payload of at most `MAX_QR_LEN` bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QrText(String<MAX_QR_LEN>);

impl QrText {
    /// `None` when `text` is empty or longer than `MAX_QR_LEN`.
    pub fn new(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let mut out = String::new();
        out.push_str(text).ok()?;
        Some(Self(out))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Everything the badge can show, mirrored in persistent storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BadgeContent {
    pub info: InfoText,
    pub qr: Option<QrText>,
}

impl BadgeContent {
    pub fn has_qr(&self) -> bool {
        self.qr.is_some()
    }

    /// Raw QR text, empty when none is stored.
    pub fn qr_str(&self) -> &str {
        self.qr.as_ref().map_or("", QrText::as_str)
    }

    /// The screen for `mode`, or `None` for QR without a payload.
    pub fn screen(&self, mode: DisplayMode) -> Option<Screen<'_>> {
        match mode {
            DisplayMode::Info => Some(Screen::Info(&self.info)),
            DisplayMode::Qr => self.qr.as_ref().map(Screen::Qr),
            DisplayMode::Blank => Some(Screen::Blank),
        }
    }
}

/// A fully validated request for the renderer.
#[derive(Clone, Copy, Debug)]
pub enum Screen<'a> {
    Info(&'a InfoText),
    Qr(&'a QrText),
    Blank,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_ordinals_roundtrip_and_reject_unknown() {
        for mode in [DisplayMode::Info, DisplayMode::Qr, DisplayMode::Blank] {
            assert_eq!(DisplayMode::from_ordinal(mode.ordinal()), Some(mode));
        }
        assert_eq!(DisplayMode::from_ordinal(3), None);
        assert_eq!(DisplayMode::from_ordinal(u32::MAX), None);
    }

    #[test]
    fn unescape_turns_literal_backslash_n_into_newline() {
        let info = InfoText::unescaped("Ada\\nEngineer\\n555-0100");
        assert_eq!(info.as_str(), "Ada\nEngineer\n555-0100");
    }

    #[test]
    fn unescape_keeps_other_backslashes() {
        let info = InfoText::unescaped("a\\tb\\");
        assert_eq!(info.as_str(), "a\\tb\\");
    }

    #[test]
    fn info_is_truncated_on_a_char_boundary() {
        let long: std::string::String = "é".repeat(100);
        let info = InfoText::new(&long);
        assert_eq!(info.as_str().len(), MAX_INFO_LEN);
        assert!(info.as_str().chars().all(|c| c == 'é'));
    }

    #[test]
    fn fields_split_on_first_two_newlines() {
        let info = InfoText::new("Ada\nEngineer\n555-0100\nextra");
        assert_eq!(info.field(InfoField::Name), "Ada");
        assert_eq!(info.field(InfoField::Title), "Engineer");
        assert_eq!(info.field(InfoField::Phone), "555-0100\nextra");

        let single = InfoText::new("Ada");
        assert_eq!(single.field(InfoField::Name), "Ada");
        assert_eq!(single.field(InfoField::Title), "");
        assert_eq!(single.field(InfoField::Phone), "");
    }

    #[test]
    fn display_lines_skip_empty_and_cap() {
        let info = InfoText::new("a\n\nb\n");
        assert_eq!(info.display_lines().count(), 2);

        let many = InfoText::new("1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n12");
        assert_eq!(many.display_lines().count(), MAX_INFO_LINES);
        assert_eq!(many.display_lines().last(), Some("10"));
    }

    #[test]
    fn qr_text_rejects_empty_and_oversize() {
        assert!(QrText::new("").is_none());
        assert!(QrText::new(&"x".repeat(MAX_QR_LEN + 1)).is_none());
        assert_eq!(
            QrText::new(&"x".repeat(MAX_QR_LEN)).map(|q| q.as_str().len()),
            Some(MAX_QR_LEN)
        );
    }

    #[test]
    fn qr_screen_requires_payload() {
        let mut content = BadgeContent::default();
        assert!(content.screen(DisplayMode::Qr).is_none());
        assert!(matches!(content.screen(DisplayMode::Blank), Some(Screen::Blank)));

        content.qr = QrText::new("https://example.com");
        assert!(matches!(content.screen(DisplayMode::Qr), Some(Screen::Qr(_))));
        assert_eq!(content.qr_str(), "https://example.com");
    }

    #[test]
    fn default_content_uses_placeholder_info() {
        let content = BadgeContent::default();
        assert_eq!(content.info.as_str(), DEFAULT_INFO_TEXT);
        assert!(!content.has_qr());
    }
}
