//! Event kinds delivered by the flag stream.
//!
//! A transport hands over [`RawEvent`]s: a name and an optional payload.
//! Names outside the five known kinds are not an error; they simply do
//! not become a [`StreamEvent`].

use std::fmt;

/// The five event types the server pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Full flag set replacement.
    Put,
    /// Single flag upsert.
    Patch,
    /// Single flag delete.
    Delete,
    /// Full flag set must be fetched out-of-band.
    IndirectPut,
    /// Single flag must be fetched out-of-band.
    IndirectPatch,
}

impl EventKind {
    /// All kinds, in wire order.
    pub const ALL: [EventKind; 5] = [
        EventKind::Put,
        EventKind::Patch,
        EventKind::Delete,
        EventKind::IndirectPut,
        EventKind::IndirectPatch,
    ];

    /// Look up a kind by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "put" => Some(Self::Put),
            "patch" => Some(Self::Patch),
            "delete" => Some(Self::Delete),
            "indirect/put" => Some(Self::IndirectPut),
            "indirect/patch" => Some(Self::IndirectPatch),
            _ => None,
        }
    }

    /// The wire name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::IndirectPut => "indirect/put",
            Self::IndirectPatch => "indirect/patch",
        }
    }

    /// Whether events of this kind are unusable without payload data.
    ///
    /// `indirect/put` is only a trigger; everything else carries data.
    pub fn requires_payload(&self) -> bool {
        !matches!(self, Self::IndirectPut)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named event as delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Event name (`event:` field for SSE).
    pub name: String,
    /// Payload text, if the event carried one.
    pub data: Option<String>,
}

impl RawEvent {
    /// Create a raw event with a payload.
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Some(data.into()),
        }
    }

    /// Create a raw event without a payload.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: None,
        }
    }

    /// Recognise this event, returning `None` for unknown names.
    pub fn recognize(self) -> Option<StreamEvent> {
        EventKind::from_name(&self.name).map(|kind| StreamEvent {
            kind,
            data: self.data,
        })
    }
}

/// An event whose kind is one of the five known [`EventKind`]s.
///
/// Lives only for the duration of one handler invocation (plus any
/// secondary fetch it triggers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Raw payload text.
    pub data: Option<String>,
}

impl StreamEvent {
    /// Create an event of the given kind.
    pub fn new(kind: EventKind, data: Option<String>) -> Self {
        Self { kind, data }
    }

    /// Usable payload: present and non-empty.
    pub fn payload(&self) -> Option<&str> {
        self.data.as_deref().filter(|data| !data.is_empty())
    }

    /// Payload text for diagnostics, empty when absent.
    pub fn raw(&self) -> &str {
        self.data.as_deref().unwrap_or_default()
    }
}
