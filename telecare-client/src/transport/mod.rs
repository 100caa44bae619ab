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

//! Abstract capability surface over the vendor real-time transport.
//!
//! The session core never touches a vendor SDK directly. A provider
//! integration implements [`SessionTransport`] and [`Publication`] and
//! translates its own event stream (however it is delivered, including
//! DOM-mutation based signals) into [`TransportEvent`]s pushed through the
//! callback given at connect time. Everything vendor-specific stays inside
//! that boundary module.

use crate::constants::DEFAULT_SIGNAL_PAYLOAD_CEILING;
use crate::error::{SourceSwapError, TransportError};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use telecare_types::{Callback, MediaKind, SessionCredentials, StreamKind};

/// Provider-specific limits the core must respect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportCapabilities {
    /// Largest signaling payload the provider will deliver, in bytes.
    pub signal_payload_ceiling: usize,
}

impl Default for TransportCapabilities {
    fn default() -> Self {
        Self {
            signal_payload_ceiling: DEFAULT_SIGNAL_PAYLOAD_CEILING,
        }
    }
}

/// Transport-level statistics sampled by the quality monitor. Serializable
/// so provider integrations can log raw samples alongside diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportStats {
    pub round_trip_ms: f64,
    pub packet_loss_pct: f64,
    pub jitter_ms: f64,
}

/// Events a provider integration pushes into the core.
///
/// Stream events for a given connection id are assumed delivered in
/// transport order; the participant registry's dedup key is the defense
/// against duplicates, not sequence numbers.
#[derive(Clone, Debug)]
pub enum TransportEvent {
    /// The connect attempt started by [`SessionTransport::connect`]
    /// succeeded.
    Connected { connection_id: String },

    /// The connect attempt failed after `connect` had already returned.
    ConnectFailed(TransportError),

    /// A remote peer published a stream.
    StreamCreated {
        connection_id: String,
        stream_id: String,
        kind: StreamKind,
        has_audio: bool,
        has_video: bool,
    },

    /// A previously announced stream went away.
    StreamDestroyed { stream_id: String },

    /// The transport is trying to recover the connection on its own.
    Reconnecting,

    /// Recovery succeeded; the outbound publication survived.
    Reconnected,

    /// The session is over. `reason` is present for server-forced
    /// disconnects that carry one.
    Disconnected { reason: Option<String> },

    /// A low-bandwidth signal arrived (chat, typing, anything else).
    SignalReceived {
        from_connection_id: String,
        kind: String,
        payload: String,
    },
}

/// Options handed to [`SessionTransport::connect`].
#[derive(Clone)]
pub struct TransportOptions {
    /// All transport events are delivered through this callback, on the
    /// host's event loop.
    pub on_event: Callback<TransportEvent>,
}

/// What the controller asks the transport to publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishRequest {
    /// Stream id of the already-acquired local media.
    pub local_stream_id: String,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub audio_device: Option<String>,
    pub video_device: Option<String>,
}

/// An outbound publication bound to the session.
///
/// Consumers must not assume `stream_id` is stable across a device switch:
/// the recreate fallback produces a new one.
pub trait Publication {
    fn stream_id(&self) -> String;

    /// Enable/disable the published audio track. Local observable state is
    /// updated by the caller before this returns; the transport
    /// acknowledgment is reconciled out-of-band.
    fn set_audio_enabled(&self, enabled: bool);

    /// Enable/disable the published video track.
    fn set_video_enabled(&self, enabled: bool);

    /// Swap the capture source in place, without renegotiation. Providers
    /// that cannot do this return [`SourceSwapError::Unsupported`] and the
    /// controller falls back to recreate-and-republish.
    fn replace_source(&self, kind: MediaKind, device_id: &str) -> Result<(), SourceSwapError>;

    /// Tear the publication down. Safe to call more than once.
    fn unpublish(&self);
}

/// The vendor session abstracted to the operations the core needs.
pub trait SessionTransport {
    /// Start connecting. Returns immediately; completion arrives as
    /// [`TransportEvent::Connected`] or [`TransportEvent::ConnectFailed`].
    /// An immediate `Err` means the attempt could not even start
    /// (e.g. the token failed the provider's local checks).
    fn connect(
        &self,
        credentials: &SessionCredentials,
        options: TransportOptions,
    ) -> Result<(), TransportError>;

    /// Tear down the connection. Must be safe on a never-connected or
    /// already-disconnected transport.
    fn disconnect(&self);

    /// Our own connection id, once connected.
    fn connection_id(&self) -> Option<String>;

    /// Bind local media to the session's outbound channel.
    fn publish(&self, request: PublishRequest) -> Result<Rc<dyn Publication>, TransportError>;

    /// Send a low-bandwidth signal to all peers.
    fn send_signal(&self, kind: &str, payload: &str) -> Result<(), TransportError>;

    /// Latest transport statistics, if the provider has any yet.
    fn poll_stats(&self) -> Option<TransportStats>;

    /// Instantaneous audio level (0.0..=1.0) per remote connection.
    fn poll_audio_levels(&self) -> Vec<(String, f32)>;

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::default()
    }
}
