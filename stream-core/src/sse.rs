//! Server-Sent Events line parser.
//!
//! Splits a byte stream into named events:
//! - `event:` sets the event name
//! - `data:` lines form the payload (joined with `\n`)
//! - `id:` sets the event ID
//! - `:` starts a comment (keepalive)
//! - an empty line dispatches the event
//!
//! Bytes are buffered until a full line is available, so multi-byte
//! characters split across chunks survive.

use flagstream_types::RawEvent;

/// Event name used when the server sends no `event:` field.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (`event:` field).
    pub event_type: Option<String>,
    /// Payload (`data:` fields), `None` when the event had no data line.
    pub data: Option<String>,
    /// Event ID (`id:` field).
    pub id: Option<String>,
}

impl SseEvent {
    /// Convert into the transport-level event handed to the dispatcher.
    pub fn into_raw(self) -> RawEvent {
        RawEvent {
            name: self
                .event_type
                .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
            data: self.data,
        }
    }
}

/// Streaming SSE parser that accumulates bytes and yields complete events.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event_type: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl SseParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the parser and return any complete events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        // Complete lines never stay buffered, so only new bytes can hold a newline
        let mut scan_from = self.buffer.len();
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = buffer[scan_from..].iter().position(|b| *b == b'\n') {
            let newline = scan_from + offset;
            let line = &buffer[consumed..newline];
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            match std::str::from_utf8(line) {
                Ok(line) => {
                    if let Some(event) = self.process_line(line) {
                        events.push(event);
                    }
                }
                Err(e) => tracing::warn!("Skipping invalid UTF-8 line in SSE stream: {}", e),
            }
            consumed = newline + 1;
            scan_from = consumed;
        }

        buffer.drain(..consumed);
        self.buffer = buffer;
        events
    }

    /// Reset the parser state (e.g., on reconnect).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event_type = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            // retry and unknown fields
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.event_type.is_none() && self.data.is_empty() {
            return None;
        }
        let data = if self.data.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data).join("\n"))
        };
        Some(SseEvent {
            event_type: self.event_type.take(),
            data,
            id: self.id.take(),
        })
    }
}
