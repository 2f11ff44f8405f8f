//! Live analytics counters pushed by the server.
//!
//! The dashboard subscribes to `GET /api/analytics/live`, a server-sent event
//! stream where each `data:` line carries one [`CounterEvent`] as JSON. The
//! client only folds these into [`LiveCounters`] for display; nothing is
//! computed locally.

use std::collections::BTreeMap;

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// A counter update from the live feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CounterEvent {
    /// Full replacement of every counter.
    Snapshot { counters: BTreeMap<String, i64> },
    /// Absolute value for one counter.
    Set { name: String, value: i64 },
    /// Relative change for one counter.
    Increment { name: String, by: i64 },
}

/// Current counter values as last pushed by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiveCounters {
    counters: BTreeMap<String, i64>,
    updated_at: Option<DateTime<Utc>>,
}

impl LiveCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the current values.
    pub fn apply(&mut self, event: CounterEvent) {
        match event {
            CounterEvent::Snapshot { counters } => self.counters = counters,
            CounterEvent::Set { name, value } => {
                self.counters.insert(name, value);
            }
            CounterEvent::Increment { name, by } => {
                let entry = self.counters.entry(name).or_insert(0);
                *entry = entry.saturating_add(by);
            }
        }
        self.updated_at = Some(Utc::now());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<i64> {
        self.counters.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.counters.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// When the last event was applied, if any.
    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// Turn an SSE response into a stream of counter events.
pub(crate) fn counter_stream(
    response: reqwest::Response,
) -> impl Stream<Item = Result<CounterEvent, ApiError>> {
    stream! {
        use futures::StreamExt;

        let mut buffer: Vec<u8> = Vec::new();
        let mut byte_stream = std::pin::pin!(response.bytes_stream());

        while let Some(chunk_result) = byte_stream.next().await {
            match chunk_result {
                Ok(chunk) => {
                    push_chunk(&mut buffer, &chunk);

                    while let Some(raw) = extract_sse_event(&mut buffer) {
                        match String::from_utf8(raw) {
                            Ok(event) => {
                                if let Some(parsed) = parse_sse_event(&event) {
                                    yield parsed;
                                }
                            }
                            Err(e) => {
                                yield Err(ApiError::Parse(format!("Invalid UTF-8: {e}")));
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(ApiError::Stream(e.to_string()));
                }
            }
        }
    }
}

/// Append raw bytes to the buffer, dropping carriage returns so `\r\n`
/// framing split across chunks still lines up.
fn push_chunk(buffer: &mut Vec<u8>, chunk: &[u8]) {
    buffer.extend(chunk.iter().copied().filter(|byte| *byte != b'\r'));
}

/// Extract a complete SSE event from the buffer.
///
/// Returns `Some(event)` and removes it from the buffer if a complete event was
/// found, `None` if more data is needed. Bytes are only decoded once the event
/// is complete, so multi-byte characters may straddle chunks.
fn extract_sse_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let idx = buffer.windows(2).position(|window| window == b"\n\n")?;
    let event = buffer.drain(..idx + 2).take(idx).collect();
    Some(event)
}

/// Parse one SSE event into a counter event.
///
/// Comment-only events (keep-alives) and events without data yield `None`.
/// Multiple `data:` lines are joined with newlines per the SSE framing rules.
fn parse_sse_event(event: &str) -> Option<Result<CounterEvent, ApiError>> {
    let data: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();

    if data.is_empty() {
        return None;
    }

    let payload = data.join("\n");
    Some(
        serde_json::from_str::<CounterEvent>(&payload)
            .map_err(|e| ApiError::Parse(format!("Failed to parse counter event: {e}"))),
    )
}
