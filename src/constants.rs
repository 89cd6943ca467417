// MIT License - Copyright (c) 2026 Peter Wright
// Protocol markers, defaults and timeouts

use std::time::Duration;

/// Terminates every line written to the controller.
pub const LINE_SEPARATOR: &str = "\r\n";

/// Carriage return: ends an inbound line.
pub const CR: u8 = b'\r';
/// Line feed: separator noise on inbound lines, always dropped.
pub const LF: u8 = b'\n';

/// Separator between the keyword and each field of a line.
pub const FIELD_SEPARATOR: &str = ", ";

/// Sent by the controller (with no trailing separator) when it requires a login.
pub const LOGIN_PROMPT: &[u8] = b"LOGIN: ";
/// Controller reply to accepted credentials.
pub const LOGIN_SUCCESSFUL: &[u8] = b"login successful";
/// Controller reply to rejected credentials.
pub const LOGIN_INCORRECT: &[u8] = b"login incorrect";

/// Acknowledgements the controller prints after each monitoring command.
pub const IGNORED_LINES: [&str; 4] = [
    "Keypad button monitoring enabled",
    "GrafikEye scene monitoring enabled",
    "Dimmer level monitoring enabled",
    "Keypad led monitoring enabled",
];

/// TCP port an NPort adaptor exposes the controller's serial line on.
pub const DEFAULT_PORT: u16 = 4008;

/// Read wait and reconnect backoff.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Size of a single socket read.
pub const READ_CHUNK_SIZE: usize = 1024;

/// Returns true if `line` is one of the monitoring acknowledgements.
pub fn is_ignored_line(line: &str) -> bool {
    IGNORED_LINES.contains(&line)
}
