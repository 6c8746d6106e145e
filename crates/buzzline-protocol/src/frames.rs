use std::fmt;

use buzzline_core::error::Result;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

/// A buzzer fired: payload is the signal string, e.g. `"A"`.
pub const KIND_SIGNAL: &str = "signal";
/// Direct score push from a URL hit: payload `{ "sig": "A", "score": 10 }`.
pub const KIND_SCORE: &str = "score";
/// Full team roster replacement: payload is a `Team[]`.
pub const KIND_TEAMS: &str = "teams";
/// Relative score change: payload `{ "teamName": "Team 1", "scoreChange": 10 }`.
pub const KIND_SCORE_UPDATE: &str = "score_update";

/// One published event. Immutable once built; encoded once per broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: String,
    payload: Value,
}

impl Event {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Build an event from any serializable payload.
    pub fn from_serialize(kind: impl Into<String>, payload: impl Serialize) -> Result<Self> {
        Ok(Self::new(kind, serde_json::to_value(payload)?))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// Typed envelope carried inside every frame.
/// Wire: `{ "type": "signal", "payload": "A" }`
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub payload: &'a Value,
}

impl<'a> From<&'a Event> for Envelope<'a> {
    fn from(event: &'a Event) -> Self {
        Self {
            kind: &event.kind,
            payload: &event.payload,
        }
    }
}

/// One encoded SSE frame: `data: <envelope JSON>\n\n`.
///
/// Clones share the same buffer, so a single encode can be handed to every
/// subscriber of a broadcast and written out as a body chunk without a copy.
/// Only built by `encode`, so the bytes are always UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Shared handle to the encoded bytes (refcount bump, no copy).
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialize an event into its wire frame.
///
/// Compact JSON never contains a raw newline, so the frame is always a
/// single `data:` line followed by the blank-line terminator.
pub fn encode(event: &Event) -> Frame {
    let json = serde_json::to_string(&Envelope::from(event))
        // a Value with string keys always serializes
        .unwrap_or_else(|_| "null".to_string());
    Frame(Bytes::from(format!("data: {json}\n\n")))
}

/// SSE comment line sent on idle streams. Clients ignore it.
pub const KEEPALIVE_FRAME: &str = ": keep-alive\n\n";
