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

//! Shared, framework-agnostic types for the telecare session core.
//!
//! This crate carries everything the UI layer and the session core need to
//! agree on without either depending on the other: the chat signal wire
//! protocol, session credentials, device descriptors, the call status and
//! signal quality enums, and a small [`Callback`] wrapper so the client
//! crate has no dependency on any particular UI framework.

pub mod callback;
pub mod chat;
pub mod credentials;
pub mod device;
pub mod session;

pub use callback::Callback;
pub use chat::{
    parse_legacy_chat, Attachment, AttachmentSignal, ChatKind, ChatMessage, ChatSignal,
    TypingIndicator, TypingSignal, CHAT_SIGNAL_KIND, TYPING_SIGNAL_KIND,
};
pub use credentials::{CredentialsError, SessionCredentials};
pub use device::{DeviceDescriptor, MediaKind};
pub use session::{CallStatus, SignalQuality, StreamKind};

impl std::fmt::Display for session::CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            session::CallStatus::Idle => write!(f, "idle"),
            session::CallStatus::Loading => write!(f, "loading"),
            session::CallStatus::Connected => write!(f, "connected"),
            session::CallStatus::Reconnecting => write!(f, "reconnecting"),
            session::CallStatus::Ended => write!(f, "ended"),
            session::CallStatus::Error => write!(f, "error"),
        }
    }
}

impl std::fmt::Display for session::SignalQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            session::SignalQuality::Excellent => write!(f, "excellent"),
            session::SignalQuality::Good => write!(f, "good"),
            session::SignalQuality::Fair => write!(f, "fair"),
            session::SignalQuality::Poor => write!(f, "poor"),
        }
    }
}
