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

//! Error taxonomy for the session core.
//!
//! Every variant maps to a distinct, user-actionable message; remediation
//! differs per variant (grant permission vs. request a new link vs. pick a
//! smaller file), so a single generic message is deliberately avoided.

use telecare_types::CredentialsError;
use thiserror::Error;

/// Device acquisition failures. All three are recoverable by user action
/// and a manual retry; none is retried automatically.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MediaError {
    /// The platform permission prompt was dismissed or denied.
    #[error("Camera and microphone access was denied. Please allow access in your browser settings and try again.")]
    PermissionDenied,

    /// No matching input hardware is present.
    #[error("No camera or microphone was found. Please connect one and try again.")]
    DeviceNotFound,

    /// The hardware is held by another application.
    #[error("Your camera or microphone is in use by another application. Close it and try again.")]
    DeviceBusy,
}

/// Transport-level failures, pattern-matched from vendor error codes so
/// each gets its own guidance.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The provider rejected the session token.
    #[error("This appointment link is no longer valid. Please use the link from your latest reminder email.")]
    InvalidToken,

    /// The provider does not know the session.
    #[error("This appointment session could not be found. Please contact support if the problem persists.")]
    SessionNotFound,

    /// Generic connect failure, usually network-side.
    #[error("Could not connect to the video service: {0}. Please check your internet connection.")]
    ConnectionFailed(String),

    /// Binding the local stream to the session failed.
    #[error("Could not start your video: {0}")]
    PublishFailed(String),

    /// A signaling send was rejected.
    #[error("Message could not be delivered: {0}")]
    SignalFailed(String),
}

/// Outcome of asking a publication to swap its source in place.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceSwapError {
    /// The provider cannot swap without renegotiating; use the
    /// unpublish-and-recreate fallback.
    #[error("in-place source swap not supported")]
    Unsupported,

    /// The swap was attempted and failed.
    #[error("source swap failed: {0}")]
    Failed(String),
}

/// Chat send-path failures. Rejected client-side, never partially sent.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    /// The serialized message would exceed the transport's signaling
    /// ceiling. Names the file and the computed size so the user can pick a
    /// smaller one.
    #[error("\"{name}\" is too large to send ({encoded_size} bytes encoded, limit {ceiling}). Please choose a smaller file.")]
    PayloadTooLarge {
        name: String,
        encoded_size: usize,
        ceiling: usize,
    },

    /// The attachment could not be decoded as an image.
    #[error("\"{name}\" could not be read as an image: {reason}")]
    UnsupportedImage { name: String, reason: String },
}

/// Picture-in-Picture failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipError {
    #[error("Picture-in-Picture is not available: {0}")]
    Unavailable(String),

    /// No video tile is eligible as a PiP target.
    #[error("No video is available for Picture-in-Picture yet.")]
    NoTarget,
}

/// Unified error surfaced by [`CallSession`](crate::CallSession) operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Failed before any network or device call.
    #[error("{0}")]
    Precondition(#[from] CredentialsError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Pip(#[from] PipError),

    /// An operation arrived for a session that is not in a state to take it.
    #[error("The call is not active.")]
    NotActive,
}

impl SessionError {
    /// The user-facing remediation string for this error. Today this is the
    /// `Display` text; kept as a named method so UI layers do not format
    /// debug output by accident.
    pub fn guidance(&self) -> String {
        self.to_string()
    }

    /// Whether the session must be fully torn down before this error is
    /// surfaced. Chat and PiP failures leave the call running.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Precondition(_) | SessionError::Media(_) | SessionError::Transport(_)
        )
    }
}
