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

//! Framework-agnostic events emitted by the session core.
//!
//! These are broadcast on the event bus and can be consumed by any
//! frontend without a direct dependency on the session internals.

use telecare_types::{ChatMessage, MediaKind, SignalQuality, StreamKind};

/// Events emitted by [`CallSession`](crate::CallSession).
#[derive(Clone, Debug)]
pub enum SessionEvent {
    // === Connection events ===
    /// The call reached `Connected` for the first time.
    Connected,

    /// The transport is recovering the connection; no user action needed.
    Reconnecting,

    /// Recovery succeeded.
    Reconnected,

    /// The call is over. `reason` is set for server-forced disconnects that
    /// carried one; a plain hang-up has `None`.
    CallEnded { reason: Option<String> },

    // === Participant events ===
    /// A remote participant's first stream arrived.
    PeerAdded(String),

    /// A remote participant's last stream went away.
    PeerRemoved(String),

    /// A remote tile is ready to render (also fired when a tile is
    /// replaced after the peer re-published).
    TileReady {
        connection_id: String,
        stream_id: String,
        kind: StreamKind,
    },

    /// No remote tiles remain; show "waiting for the other participant".
    WaitingForPeer,

    // === Chat events ===
    /// A chat message was appended to history (own or remote).
    ChatMessage(ChatMessage),

    /// The set of currently-typing names changed.
    TypingChanged(Vec<String>),

    // === Media events ===
    /// Local mute/camera state flipped (optimistically, ahead of the
    /// transport acknowledgment).
    MediaToggled { kind: MediaKind, enabled: bool },

    /// The outbound stream id changed because a device switch fell back to
    /// recreating the publication.
    PublicationReplaced { stream_id: String },

    // === Quality events ===
    QualityChanged(SignalQuality),

    /// `None` means nobody is above the speaking threshold.
    ActiveSpeakerChanged(Option<String>),

    // === Error events ===
    /// A transient error banner was raised.
    ErrorRaised(String),

    /// The banner auto-dismissed.
    ErrorDismissed,
}
