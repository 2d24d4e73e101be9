//! The serial wire protocol.
//!
//! Two line shapes are meaningful, terminator already stripped:
//!
//! ```text
//! error <free-text message>
//! sensor <hardware-id> <value text>
//! ```
//!
//! Everything else classifies as [`ParsedLine::Malformed`] and is discarded
//! without diagnostic.

use serimq_types::ParsedLine;

/// Prefix that marks a line as an error report.
const ERROR_PREFIX: &str = "error";

/// Category field of a sensor reading.
const SENSOR_CATEGORY: &str = "sensor";

/// Classify one decoded, terminator-stripped line.
///
/// A line starting with `error` is an [`ParsedLine::ErrorReport`] carrying
/// the entire line, prefix included. Otherwise the line is split on the
/// first two spaces into category, hardware id and value; the value keeps
/// any further spaces. Fewer than three fields, or a category other than
/// `sensor`, classifies as [`ParsedLine::Malformed`].
pub fn classify(line: &str) -> ParsedLine {
    if line.starts_with(ERROR_PREFIX) {
        return ParsedLine::ErrorReport {
            message: line.to_string(),
        };
    }

    let mut fields = line.splitn(3, ' ');
    let (Some(category), Some(hardware_id), Some(value)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return ParsedLine::Malformed;
    };
    if category != SENSOR_CATEGORY {
        return ParsedLine::Malformed;
    }

    ParsedLine::SensorReading {
        hardware_id: hardware_id.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(hardware_id: &str, value: &str) -> ParsedLine {
        ParsedLine::SensorReading {
            hardware_id: hardware_id.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn sensor_line_classifies_as_reading() {
        assert_eq!(classify("sensor T1 23.5"), reading("T1", "23.5"));
    }

    #[test]
    fn value_keeps_embedded_spaces() {
        assert_eq!(
            classify("sensor door open since 14:02"),
            reading("door", "open since 14:02")
        );
    }

    #[test]
    fn error_line_carries_the_entire_line() {
        assert_eq!(
            classify("error disk full"),
            ParsedLine::ErrorReport {
                message: "error disk full".to_string()
            }
        );
    }

    #[test]
    fn error_prefix_is_literal_not_a_word() {
        // The grammar tests the prefix only, so this is still an error report.
        assert_eq!(
            classify("errors: 3"),
            ParsedLine::ErrorReport {
                message: "errors: 3".to_string()
            }
        );
    }

    #[test]
    fn bare_error_prefix_is_an_error_report() {
        assert_eq!(
            classify("error"),
            ParsedLine::ErrorReport {
                message: "error".to_string()
            }
        );
    }

    #[test]
    fn line_without_spaces_is_malformed() {
        assert_eq!(classify("foo"), ParsedLine::Malformed);
    }

    #[test]
    fn two_field_line_is_malformed() {
        assert_eq!(classify("sensor T1"), ParsedLine::Malformed);
    }

    #[test]
    fn unknown_category_is_malformed() {
        assert_eq!(classify("actuator A1 on"), ParsedLine::Malformed);
    }

    #[test]
    fn empty_line_is_malformed() {
        assert_eq!(classify(""), ParsedLine::Malformed);
    }
}
