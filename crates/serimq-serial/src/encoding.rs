//! Text encodings for the serial line protocol.
//!
//! Microcontroller firmware emits single-byte text; the default is plain
//! ASCII. A frame whose bytes are invalid under the configured encoding is
//! dropped by the reader, not surfaced as an error.

use std::fmt;
use std::str::FromStr;

use serimq_types::BridgeError;

/// The text encoding applied to raw serial frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// Strict 7-bit ASCII. Any byte above `0x7F` makes the frame invalid.
    #[default]
    Ascii,
    /// UTF-8.
    Utf8,
    /// ISO-8859-1: every byte maps to the Unicode code point of the same
    /// value, so decoding never fails.
    Latin1,
}

impl TextEncoding {
    /// Decode `bytes` into text, or `None` when the bytes are invalid under
    /// this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Ascii => {
                if bytes.is_ascii() {
                    // ASCII is a subset of UTF-8, so this cannot fail.
                    Some(String::from_utf8_lossy(bytes).into_owned())
                } else {
                    None
                }
            }
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Ascii => write!(f, "ascii"),
            TextEncoding::Utf8 => write!(f, "utf-8"),
            TextEncoding::Latin1 => write!(f, "latin-1"),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" => Ok(TextEncoding::Ascii),
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(BridgeError::Config(format!(
                "unknown text encoding '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_accepts_seven_bit_bytes() {
        assert_eq!(
            TextEncoding::Ascii.decode(b"sensor T1 23.5"),
            Some("sensor T1 23.5".to_string())
        );
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        assert_eq!(TextEncoding::Ascii.decode(&[b's', 0xC3, 0xA9]), None);
    }

    #[test]
    fn utf8_accepts_multibyte_sequences() {
        let bytes = "sensor T1 23.5\u{00B0}".as_bytes();
        assert_eq!(
            TextEncoding::Utf8.decode(bytes),
            Some("sensor T1 23.5\u{00B0}".to_string())
        );
    }

    #[test]
    fn utf8_rejects_invalid_sequences() {
        assert_eq!(TextEncoding::Utf8.decode(&[0xFF, 0xFE]), None);
    }

    #[test]
    fn latin1_never_fails() {
        assert_eq!(
            TextEncoding::Latin1.decode(&[0x61, 0xE9]),
            Some("a\u{00E9}".to_string())
        );
    }

    #[test]
    fn parses_known_names() {
        assert_eq!("ascii".parse::<TextEncoding>().unwrap(), TextEncoding::Ascii);
        assert_eq!("UTF-8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("utf8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!(
            "iso-8859-1".parse::<TextEncoding>().unwrap(),
            TextEncoding::Latin1
        );
    }

    #[test]
    fn unknown_name_is_a_config_error() {
        let err = "ebcdic".parse::<TextEncoding>().unwrap_err();
        assert!(err.to_string().contains("ebcdic"));
    }

    #[test]
    fn default_is_ascii() {
        assert_eq!(TextEncoding::default(), TextEncoding::Ascii);
    }
}
