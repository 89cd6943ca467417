// MIT License - Copyright (c) 2026 Peter Wright
// Line framing and decoding of controller output

//! Line framing and decoding of inbound controller output.

use tracing::{debug, warn};

use crate::actions::{self, parse_address};
use crate::constants::{is_ignored_line, CR, FIELD_SEPARATOR, LF};
use crate::error::DecodeError;
use crate::event::HomeworksEvent;

/// Accumulates raw bytes and turns complete lines into events.
///
/// A line ends at `\r`. Line feeds are dropped wherever they appear, so the
/// controller's `\r\n` and a bare `\r` both terminate a line.
#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: Vec<u8>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet resolved into a complete line.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Append a chunk and return the events for every line it completes.
    ///
    /// Rejected lines are logged and dropped; they never affect the lines
    /// around them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<HomeworksEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            match byte {
                CR => {
                    if self.buffer.is_empty() {
                        continue;
                    }
                    let line = std::mem::take(&mut self.buffer);
                    match decode_line(&line) {
                        Ok(Some(event)) => events.push(event),
                        Ok(None) => {}
                        Err(e) => warn!("Discarding line: {}", e),
                    }
                }
                LF => {}
                _ => self.buffer.push(byte),
            }
        }
        events
    }
}

/// Decode one line (without its terminator).
///
/// Returns `Ok(None)` for monitoring acknowledgements.
pub fn decode_line(raw: &[u8]) -> Result<Option<HomeworksEvent>, DecodeError> {
    let line = std::str::from_utf8(raw).map_err(|_| DecodeError::Undecodable {
        bytes: raw.to_vec(),
    })?;
    debug!("Raw: {}", line);

    if is_ignored_line(line) {
        return Ok(None);
    }

    let mut parts = line.split(FIELD_SEPARATOR);
    let keyword = parts.next().unwrap_or_default();
    let raw_fields: Vec<&str> = parts.collect();

    let action = actions::lookup(keyword).ok_or_else(|| DecodeError::UnknownKeyword {
        keyword: keyword.to_string(),
    })?;

    if raw_fields.len() != action.field_count() {
        return Err(DecodeError::FieldCount {
            keyword: keyword.to_string(),
            expected: action.field_count(),
            found: raw_fields.len(),
        });
    }

    let address = parse_address(raw_fields[0]);
    let values = action
        .fields
        .iter()
        .zip(&raw_fields[1..])
        .enumerate()
        .map(|(i, (parser, raw))| {
            parser.parse(raw).ok_or_else(|| DecodeError::InvalidField {
                keyword: keyword.to_string(),
                index: i + 1,
                value: raw.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(HomeworksEvent::new(action.kind, address, values)))
}
