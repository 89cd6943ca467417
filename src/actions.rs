// MIT License - Copyright (c) 2026 Peter Wright
// Keyword table for controller output lines

//! Static table mapping inbound keywords to event kinds and field parsers.

use crate::event::{EventKind, FieldValue};

/// Parser for one field following the address of an inbound line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldParser {
    /// Keypad button number.
    Button,
    /// Dimmer level, 0-100 as reported by the controller.
    Level,
    /// `enabled` or anything else.
    Enabled,
    /// LED states, one digit per LED, e.g. `0102000000000000000000`.
    LedState,
}

impl FieldParser {
    /// Parse a raw field. Returns `None` if the text does not fit the field.
    pub fn parse(&self, raw: &str) -> Option<FieldValue> {
        match self {
            Self::Button | Self::Level => parse_integer(raw).map(FieldValue::Integer),
            Self::Enabled => Some(FieldValue::Flag(raw == "enabled")),
            Self::LedState => parse_led_states(raw).map(FieldValue::LedStates),
        }
    }
}

/// Addresses are passed through verbatim.
pub fn parse_address(raw: &str) -> String {
    raw.to_string()
}

fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn parse_led_states(raw: &str) -> Option<Vec<u8>> {
    raw.chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect()
}

/// What a keyword turns into.
///
/// Every inbound line carries the address right after the keyword; `fields`
/// covers what follows the address, so a well-formed line has exactly
/// `field_count()` comma separated fields after its keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub kind: EventKind,
    pub fields: &'static [FieldParser],
}

impl ActionSpec {
    const fn new(kind: EventKind, fields: &'static [FieldParser]) -> Self {
        Self { kind, fields }
    }

    /// Number of fields expected after the keyword, address included.
    pub fn field_count(&self) -> usize {
        1 + self.fields.len()
    }
}

const BUTTON: &[FieldParser] = &[FieldParser::Button];

/// Keypad (`K`), dimmer (`D`) and GrafikEye/seeTouch (`SV`) button events share
/// their shape.
static ACTIONS: [(&str, ActionSpec); 15] = [
    ("KBP", ActionSpec::new(EventKind::ButtonPressed, BUTTON)),
    ("KBR", ActionSpec::new(EventKind::ButtonReleased, BUTTON)),
    ("KBH", ActionSpec::new(EventKind::ButtonHold, BUTTON)),
    ("KBDT", ActionSpec::new(EventKind::ButtonDoubleTap, BUTTON)),
    ("DBP", ActionSpec::new(EventKind::ButtonPressed, BUTTON)),
    ("DBR", ActionSpec::new(EventKind::ButtonReleased, BUTTON)),
    ("DBH", ActionSpec::new(EventKind::ButtonHold, BUTTON)),
    ("DBDT", ActionSpec::new(EventKind::ButtonDoubleTap, BUTTON)),
    ("SVBP", ActionSpec::new(EventKind::ButtonPressed, BUTTON)),
    ("SVBR", ActionSpec::new(EventKind::ButtonReleased, BUTTON)),
    ("SVBH", ActionSpec::new(EventKind::ButtonHold, BUTTON)),
    ("SVBDT", ActionSpec::new(EventKind::ButtonDoubleTap, BUTTON)),
    (
        "KLS",
        ActionSpec::new(EventKind::KeypadLedChanged, &[FieldParser::LedState]),
    ),
    (
        "DL",
        ActionSpec::new(EventKind::LightChanged, &[FieldParser::Level]),
    ),
    (
        "KES",
        ActionSpec::new(EventKind::KeypadEnableChanged, &[FieldParser::Enabled]),
    ),
];

/// Look up the action for an inbound keyword.
pub fn lookup(keyword: &str) -> Option<&'static ActionSpec> {
    ACTIONS
        .iter()
        .find(|(k, _)| *k == keyword)
        .map(|(_, action)| action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_keywords() {
        for prefix in ["K", "D", "SV"] {
            assert_eq!(
                lookup(&format!("{prefix}BP")).unwrap().kind,
                EventKind::ButtonPressed
            );
            assert_eq!(
                lookup(&format!("{prefix}BR")).unwrap().kind,
                EventKind::ButtonReleased
            );
            assert_eq!(
                lookup(&format!("{prefix}BH")).unwrap().kind,
                EventKind::ButtonHold
            );
            assert_eq!(
                lookup(&format!("{prefix}BDT")).unwrap().kind,
                EventKind::ButtonDoubleTap
            );
        }
    }

    #[test]
    fn test_field_counts() {
        for (keyword, action) in ACTIONS.iter() {
            assert_eq!(action.field_count(), 2, "{keyword}");
        }
    }

    #[test]
    fn test_unknown_keyword() {
        assert!(lookup("RDL").is_none());
        assert!(lookup("kbp").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_parse_integer_fields() {
        assert_eq!(FieldParser::Button.parse("3"), Some(FieldValue::Integer(3)));
        assert_eq!(FieldParser::Level.parse("100"), Some(FieldValue::Integer(100)));
        assert_eq!(FieldParser::Level.parse("abc"), None);
        assert_eq!(FieldParser::Button.parse(""), None);
    }

    #[test]
    fn test_parse_enabled() {
        assert_eq!(FieldParser::Enabled.parse("enabled"), Some(FieldValue::Flag(true)));
        assert_eq!(FieldParser::Enabled.parse("disabled"), Some(FieldValue::Flag(false)));
        assert_eq!(FieldParser::Enabled.parse("Enabled"), Some(FieldValue::Flag(false)));
    }

    #[test]
    fn test_parse_led_states() {
        assert_eq!(
            FieldParser::LedState.parse("010"),
            Some(FieldValue::LedStates(vec![0, 1, 0]))
        );
        assert_eq!(
            FieldParser::LedState.parse("0123"),
            Some(FieldValue::LedStates(vec![0, 1, 2, 3]))
        );
        assert_eq!(FieldParser::LedState.parse("01x"), None);
    }

    #[test]
    fn test_parse_address_passthrough() {
        assert_eq!(parse_address("[01:01:00:02:04]"), "[01:01:00:02:04]");
    }
}
