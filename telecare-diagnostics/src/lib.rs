/*
 * Copyright 2026 Telecare Contributors
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Lightweight diagnostics sample bus shared across the telecare code-base.
//!
//! Components publish [`DiagEvent`]s (transport quality samples, chat
//! payload sizes, speaker levels) without knowing who, if anyone, is
//! listening; dashboards and health reporters subscribe independently.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

// === Diagnostic data structures ===

/// One batch of samples from a single subsystem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagEvent {
    /// Subsystem that produced the event (e.g. "transport", "chat", "speaker").
    pub scope: &'static str,
    /// Optional participant connection id the samples refer to.
    pub participant: Option<String>,
    /// Unix time in milliseconds when the samples were captured.
    pub ts_ms: u64,
    /// Arbitrary named samples.
    pub samples: Vec<Sample>,
}

/// A single named measurement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sample {
    pub name: &'static str,
    pub value: SampleValue,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum SampleValue {
    U64(u64),
    F64(f64),
    Text(String),
}

impl From<u64> for SampleValue {
    fn from(v: u64) -> Self {
        SampleValue::U64(v)
    }
}
impl From<usize> for SampleValue {
    fn from(v: usize) -> Self {
        SampleValue::U64(v as u64)
    }
}
impl From<f64> for SampleValue {
    fn from(v: f64) -> Self {
        SampleValue::F64(v)
    }
}
impl From<&str> for SampleValue {
    fn from(v: &str) -> Self {
        SampleValue::Text(v.to_string())
    }
}
impl From<String> for SampleValue {
    fn from(v: String) -> Self {
        SampleValue::Text(v)
    }
}

/// Shorthand for constructing a [`Sample`], e.g. `sample!("rtt_ms", 42.0)`.
#[macro_export]
macro_rules! sample {
    ($name:expr, $value:expr) => {
        $crate::Sample {
            name: $name,
            value: $crate::SampleValue::from($value),
        }
    };
}

// === Global broadcast bus ===

static BUS: Lazy<(flume::Sender<DiagEvent>, flume::Receiver<DiagEvent>)> =
    Lazy::new(flume::unbounded);

/// Obtain a sender that can publish diagnostics events.
pub fn global_sender() -> &'static flume::Sender<DiagEvent> {
    &BUS.0
}

/// Subscribe to the diagnostics stream. Subscribers share one queue, so a
/// given event is delivered to exactly one of them; run a single drain task
/// and fan out from there if multiple sinks are needed.
pub fn subscribe() -> flume::Receiver<DiagEvent> {
    BUS.1.clone()
}

/// Publish a single event, ignoring the (impossible on an unbounded
/// channel) send failure.
pub fn publish(event: DiagEvent) {
    let _ = global_sender().send(event);
}

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_macro_converts_common_types() {
        let s = sample!("rtt_ms", 42.5);
        assert!(matches!(s.value, SampleValue::F64(v) if v == 42.5));
        let s = sample!("payload_bytes", 8000usize);
        assert!(matches!(s.value, SampleValue::U64(8000)));
        let s = sample!("quality", "good");
        assert!(matches!(s.value, SampleValue::Text(ref t) if t == "good"));
    }

    #[test]
    fn subscribers_receive_published_events() {
        let rx = subscribe();
        publish(DiagEvent {
            scope: "transport",
            participant: Some("conn-1".to_string()),
            ts_ms: now_ms(),
            samples: vec![sample!("rtt_ms", 10.0)],
        });
        // The bus is shared process-wide; drain until our event shows up.
        let event = rx
            .try_iter()
            .find(|e| e.scope == "transport" && e.participant.as_deref() == Some("conn-1"))
            .expect("published event not observed");
        assert_eq!(event.samples[0].name, "rtt_ms");
    }

    #[test]
    fn events_serialize_to_json() {
        let event = DiagEvent {
            scope: "chat",
            participant: None,
            ts_ms: 7,
            samples: vec![sample!("payload_bytes", 120usize)],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"scope\":\"chat\""));
    }
}
