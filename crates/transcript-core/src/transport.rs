//! EDL wire protocol to the transport backend: line-delimited JSON over a
//! bidirectional byte stream. `TransportCodec` is a pure encode/decode pair
//! independent of any actual socket or process, so it stays testable
//! without I/O. Validation is strict; unknown types and malformed payloads
//! are logged and dropped, never mutating state.

use serde::{Deserialize, Serialize};

use crate::edl::EdlEntry;

/// Commands sent by the core to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransportCommand {
    #[serde(rename = "load")]
    Load { id: String, path: String },
    #[serde(rename = "updateEdl")]
    UpdateEdl {
        id: String,
        revision: u64,
        clips: Vec<EdlEntry>,
    },
    #[serde(rename = "updateEdlFromFile")]
    UpdateEdlFromFile { id: String, revision: u64, path: String },
    #[serde(rename = "play")]
    Play { id: String },
    #[serde(rename = "pause")]
    Pause { id: String },
    #[serde(rename = "stop")]
    Stop { id: String },
    #[serde(rename = "queryState")]
    QueryState { id: String },
    #[serde(rename = "seek")]
    Seek { id: String, #[serde(rename = "timeSec")] time_sec: f64 },
    #[serde(rename = "setRate")]
    SetRate { id: String, rate: f64 },
    #[serde(rename = "setTimeStretch")]
    SetTimeStretch { id: String, ratio: f64 },
    #[serde(rename = "setVolume")]
    SetVolume { id: String, value: f64 },
}

/// Events received from the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransportEvent {
    #[serde(rename = "loaded")]
    Loaded {
        id: String,
        #[serde(rename = "durationSec")]
        duration_sec: f64,
        #[serde(rename = "sampleRate")]
        sample_rate: u32,
        channels: u16,
    },
    #[serde(rename = "state")]
    State { id: String, playing: bool },
    #[serde(rename = "position")]
    Position {
        id: String,
        #[serde(rename = "editedSec")]
        edited_sec: f64,
        #[serde(rename = "originalSec")]
        original_sec: f64,
        #[serde(default)]
        revision: Option<u64>,
    },
    #[serde(rename = "edlApplied")]
    EdlApplied {
        id: String,
        revision: u64,
        #[serde(rename = "wordCount", default)]
        word_count: Option<usize>,
        #[serde(rename = "spacerCount", default)]
        spacer_count: Option<usize>,
        #[serde(rename = "totalSegments", default)]
        total_segments: Option<usize>,
    },
    #[serde(rename = "ended")]
    Ended { id: String },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        code: Option<String>,
        message: String,
    },
}

/// Encodes/decodes one JSON object per `\n`-terminated line. Pure
/// functions; no socket or process dependency.
pub struct TransportCodec;

impl TransportCodec {
    /// Encodes a command as one line, `\n`-terminated.
    pub fn encode_command_line(command: &TransportCommand) -> String {
        format!("{}\n", serde_json::to_string(command).expect("transport command must serialize"))
    }

    /// Decodes one line into an event. Malformed or unrecognized payloads
    /// return `None` after logging; the caller must not mutate state on
    /// `None`.
    pub fn decode_event_line(line: &str) -> Option<TransportEvent> {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<TransportEvent>(trimmed) {
            Ok(event) => Some(event),
            Err(error) => {
                tracing::warn!(line = trimmed, %error, "dropping malformed transport event");
                None
            }
        }
    }
}
