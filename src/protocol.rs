// MIT License - Copyright (c) 2026 Peter Wright
// Outbound command formatting

use crate::constants::{FIELD_SEPARATOR, LINE_SEPARATOR};

/// Commands that can be sent to a Homeworks controller.
///
/// # Session setup
///
/// After connecting (and logging in, if the controller asks for it) the
/// client sends the monitoring commands in [`SUBSCRIPTIONS`] order. Each one
/// is acknowledged with an informational line such as
/// `Dimmer level monitoring enabled`, which the codec drops.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `PROMPTOFF`: stop printing the `L232>` prompt after each reply.
    PromptOff,
    /// `KBMON`: report keypad button presses, releases, holds and double taps.
    KeypadButtonMonitor,
    /// `GSMON`: report GrafikEye scene changes.
    GrafikEyeSceneMonitor,
    /// `DLMON`: report dimmer level changes (`DL, <address>, <level>`).
    DimmerLevelMonitor,
    /// `KLMON`: report keypad LED changes (`KLS, <address>, <states>`).
    KeypadLedMonitor,
    /// `FADEDIM, <intensity>, <fade>, <delay>, <address>`: fade a dimmer
    /// to `intensity` percent over `fade_time` seconds, after `delay_time` seconds.
    FadeDim {
        intensity: f64,
        fade_time: f64,
        delay_time: f64,
        address: String,
    },
    /// `RDL, <address>`: request a dimmer level. The controller answers with a
    /// `DL` line.
    RequestDimmerLevel { address: String },
    /// Raw command string (for any unlisted commands).
    Raw(String),
}

/// Monitoring commands sent right after connecting, in order.
pub const SUBSCRIPTIONS: [Command; 5] = [
    Command::PromptOff,
    Command::KeypadButtonMonitor,
    Command::GrafikEyeSceneMonitor,
    Command::DimmerLevelMonitor,
    Command::KeypadLedMonitor,
];

impl Command {
    /// Convert the command to its wire string representation (no separator).
    pub fn to_wire_string(&self) -> String {
        match self {
            Command::PromptOff => "PROMPTOFF".to_string(),
            Command::KeypadButtonMonitor => "KBMON".to_string(),
            Command::GrafikEyeSceneMonitor => "GSMON".to_string(),
            Command::DimmerLevelMonitor => "DLMON".to_string(),
            Command::KeypadLedMonitor => "KLMON".to_string(),
            Command::FadeDim {
                intensity,
                fade_time,
                delay_time,
                address,
            } => [
                "FADEDIM".to_string(),
                format_number(*intensity),
                format_number(*fade_time),
                format_number(*delay_time),
                address.clone(),
            ]
            .join(FIELD_SEPARATOR),
            Command::RequestDimmerLevel { address } => {
                ["RDL", address.as_str()].join(FIELD_SEPARATOR)
            }
            Command::Raw(s) => s.clone(),
        }
    }

    /// The bytes written to the socket: wire string plus line separator.
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = self.to_wire_string();
        line.push_str(LINE_SEPARATOR);
        line.into_bytes()
    }
}

/// Integral values print without a fraction (`50`), others as shortest
/// round-trip decimals (`37.5`).
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
