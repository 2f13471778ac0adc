//! Inbound command/data protocol.
//!
//! Writes to the data characteristic are short ASCII strings:
//!
//! ```text
//! command:clear            -> Clear
//! display:info             -> SetMode(Info)
//! display:qr               -> SetMode(Qr)
//! data:personal:<text>     -> SetInfo(text)   ("\n" escapes become line breaks)
//! data:qr:<text>           -> SetQr(text)     (ignored when longer than MAX_QR_LEN)
//! ```
//!
//! Keywords are case-insensitive, data prefixes are exact. Parsing never
//! touches badge state.

use crate::config::MAX_QR_LEN;
use crate::content::{DisplayMode, InfoText, QrText};
use crate::error::ParseError;

const CLEAR_KEYWORD: &str = "command:clear";
const SHOW_INFO_KEYWORD: &str = "display:info";
const SHOW_QR_KEYWORD: &str = "display:qr";
const INFO_PREFIX: &str = "data:personal:";
const QR_PREFIX: &str = "data:qr:";

/// A classified inbound write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Clear,
    SetMode(DisplayMode),
    SetInfo(InfoText),
    /// `None` erases the stored QR payload (`data:qr:` with nothing after it).
    SetQr(Option<QrText>),
}

/// Classify raw bytes from the data characteristic.
pub fn parse(raw: &[u8]) -> Result<Command, ParseError> {
    match core::str::from_utf8(raw) {
        Ok(text) => parse_str(text),
        Err(_) => {
            warn!("Ignoring non-UTF-8 write ({} bytes)", raw.len());
            Err(ParseError::NotUtf8)
        }
    }
}

/// Classify an inbound string; surrounding whitespace is ignored.
pub fn parse_str(input: &str) -> Result<Command, ParseError> {
    let input = input.trim();

    if input.eq_ignore_ascii_case(CLEAR_KEYWORD) {
        return Ok(Command::Clear);
    }
    if input.eq_ignore_ascii_case(SHOW_INFO_KEYWORD) {
        return Ok(Command::SetMode(DisplayMode::Info));
    }
    if input.eq_ignore_ascii_case(SHOW_QR_KEYWORD) {
        return Ok(Command::SetMode(DisplayMode::Qr));
    }
    if let Some(payload) = input.strip_prefix(INFO_PREFIX) {
        return Ok(Command::SetInfo(InfoText::unescaped(payload)));
    }
    if let Some(payload) = input.strip_prefix(QR_PREFIX) {
        if payload.len() > MAX_QR_LEN {
            warn!(
                "QR payload too long ({} > {}), ignoring",
                payload.len(),
                MAX_QR_LEN
            );
            return Err(ParseError::QrTooLong { len: payload.len() });
        }
        return Ok(Command::SetQr(QrText::new(payload)));
    }

    warn!("Unrecognized command/data format, ignoring: {}", input);
    Err(ParseError::Unrecognized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(parse_str("COMMAND:Clear"), Ok(Command::Clear));
        assert_eq!(
            parse_str("Display:Info"),
            Ok(Command::SetMode(DisplayMode::Info))
        );
        assert_eq!(parse_str("DISPLAY:QR"), Ok(Command::SetMode(DisplayMode::Qr)));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(parse_str("  command:clear\r\n"), Ok(Command::Clear));
    }

    #[test]
    fn data_prefixes_are_case_sensitive() {
        assert_eq!(parse_str("DATA:qr:abc"), Err(ParseError::Unrecognized));
        assert_eq!(
            parse_str("data:Personal:Ada"),
            Err(ParseError::Unrecognized)
        );
    }

    #[test]
    fn personal_payload_is_unescaped() {
        let cmd = parse_str("data:personal:Ada Lovelace\\nEngineer").unwrap();
        match cmd {
            Command::SetInfo(info) => assert_eq!(info.as_str(), "Ada Lovelace\nEngineer"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn qr_payload_kept_verbatim() {
        let cmd = parse_str("data:qr:https://Example.com/a\\nb").unwrap();
        match cmd {
            Command::SetQr(Some(qr)) => assert_eq!(qr.as_str(), "https://Example.com/a\\nb"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn qr_payload_at_limit_accepted_above_rejected() {
        let at_limit = ["data:qr:", &"a".repeat(MAX_QR_LEN)].concat();
        assert!(matches!(parse_str(&at_limit), Ok(Command::SetQr(Some(_)))));

        let over = ["data:qr:", &"a".repeat(MAX_QR_LEN + 1)].concat();
        assert_eq!(
            parse_str(&over),
            Err(ParseError::QrTooLong {
                len: MAX_QR_LEN + 1
            })
        );
    }

    #[test]
    fn empty_qr_payload_erases() {
        assert_eq!(parse_str("data:qr:"), Ok(Command::SetQr(None)));
    }

    #[test]
    fn unknown_and_binary_input_rejected() {
        assert_eq!(parse_str("hello"), Err(ParseError::Unrecognized));
        assert_eq!(parse_str(""), Err(ParseError::Unrecognized));
        assert_eq!(parse(&[0xFF, 0xFE]), Err(ParseError::NotUtf8));
        assert_eq!(parse(b"display:qr"), Ok(Command::SetMode(DisplayMode::Qr)));
    }
}
