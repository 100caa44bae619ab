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

//! Structured chat over the session's signaling primitive.
//!
//! Outbound messages are JSON envelopes measured against the transport's
//! payload ceiling after full serialization; an oversize message is
//! rejected whole, never truncated. Successful sends append to local
//! history immediately rather than waiting for the network to echo them
//! back. Inbound payloads are parsed as JSON first, then through the
//! legacy colon-delimited fallback.

mod image;
mod typing;

pub use image::{recompress, RECOMPRESSED_MIME};
pub use typing::TypingRoster;

use crate::constants::TYPING_REFRESH_MS;
use crate::error::{ChatError, SessionError, TransportError};
use crate::transport::SessionTransport;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{debug, warn};
use telecare_types::{
    parse_legacy_chat, Attachment, AttachmentSignal, ChatKind, ChatMessage, ChatSignal,
    TypingSignal, CHAT_SIGNAL_KIND, TYPING_SIGNAL_KIND,
};

/// What an inbound signal did to the chat state.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatUpdate {
    Message(ChatMessage),
    Typing(Vec<String>),
}

pub struct ChatChannel {
    display_name: String,
    history: Vec<ChatMessage>,
    typing: TypingRoster,
    last_typing_sent_ms: Option<u64>,
}

impl ChatChannel {
    pub fn new(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            history: Vec::new(),
            typing: TypingRoster::new(),
            last_typing_sent_ms: None,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn typing_names(&self) -> Vec<String> {
        self.typing.names()
    }

    /// Send a plain text message. On success the message is already in
    /// local history.
    pub fn send_text(
        &mut self,
        transport: &dyn SessionTransport,
        content: &str,
        now_ms: u64,
    ) -> Result<ChatMessage, SessionError> {
        let signal = ChatSignal {
            author: self.display_name.clone(),
            content: content.to_string(),
            kind: ChatKind::Text,
            attachment: None,
            timestamp: now_ms,
        };
        self.send_envelope(transport, &signal, "message")?;
        let message = ChatMessage::text(&self.display_name, content, now_ms, true);
        self.history.push(message.clone());
        Ok(message)
    }

    /// Send a file attachment. Images are recompressed first (bounded edge,
    /// fixed JPEG quality) to give them a chance of fitting the ceiling;
    /// other files are sent as-is, base64-encoded.
    pub fn send_attachment(
        &mut self,
        transport: &dyn SessionTransport,
        name: &str,
        mime_type: &str,
        bytes: &[u8],
        now_ms: u64,
    ) -> Result<ChatMessage, SessionError> {
        let is_image = mime_type.starts_with("image/");
        let (payload_bytes, mime_type, kind) = if is_image {
            let compressed =
                recompress(bytes).map_err(|reason| ChatError::UnsupportedImage {
                    name: name.to_string(),
                    reason,
                })?;
            (compressed, RECOMPRESSED_MIME.to_string(), ChatKind::Image)
        } else {
            (bytes.to_vec(), mime_type.to_string(), ChatKind::File)
        };

        let data = BASE64.encode(&payload_bytes);
        let signal = ChatSignal {
            author: self.display_name.clone(),
            content: name.to_string(),
            kind,
            attachment: Some(AttachmentSignal {
                name: name.to_string(),
                size: data.len(),
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
            timestamp: now_ms,
        };
        self.send_envelope(transport, &signal, name)?;

        let message = ChatMessage::with_attachment(
            &self.display_name,
            name,
            now_ms,
            true,
            kind,
            Attachment {
                name: name.to_string(),
                size: data.len(),
                mime_type: mime_type.clone(),
                url: format!("data:{mime_type};base64,{data}"),
            },
        );
        self.history.push(message.clone());
        Ok(message)
    }

    fn send_envelope(
        &self,
        transport: &dyn SessionTransport,
        signal: &ChatSignal,
        name: &str,
    ) -> Result<(), SessionError> {
        let payload = serde_json::to_string(signal)
            .map_err(|e| TransportError::SignalFailed(e.to_string()))?;
        let ceiling = transport.capabilities().signal_payload_ceiling;
        if payload.len() > ceiling {
            return Err(ChatError::PayloadTooLarge {
                name: name.to_string(),
                encoded_size: payload.len(),
                ceiling,
            }
            .into());
        }
        transport.send_signal(CHAT_SIGNAL_KIND, &payload)?;
        debug!("sent chat signal, {} bytes", payload.len());
        Ok(())
    }

    /// Send a typing refresh, throttled to one per second. Best-effort: a
    /// transport failure is logged and swallowed.
    pub fn notify_typing(
        &mut self,
        transport: &dyn SessionTransport,
        local_connection: &str,
        now_ms: u64,
    ) {
        if let Some(last) = self.last_typing_sent_ms {
            if now_ms.saturating_sub(last) < TYPING_REFRESH_MS {
                return;
            }
        }
        let signal = TypingSignal {
            id: local_connection.to_string(),
            name: self.display_name.clone(),
        };
        let payload = match serde_json::to_string(&signal) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("typing signal serialization failed: {e}");
                return;
            }
        };
        if let Err(e) = transport.send_signal(TYPING_SIGNAL_KIND, &payload) {
            warn!("typing signal send failed: {e}");
            return;
        }
        self.last_typing_sent_ms = Some(now_ms);
    }

    /// Route an inbound signal. `local_connection` drives self-echo
    /// filtering. Unknown kinds and self-echoes yield `None`.
    pub fn handle_signal(
        &mut self,
        kind: &str,
        payload: &str,
        from_connection: &str,
        local_connection: Option<&str>,
        now_ms: u64,
    ) -> Option<ChatUpdate> {
        if local_connection == Some(from_connection) {
            debug!("dropping self-echoed {kind} signal");
            return None;
        }
        match kind {
            CHAT_SIGNAL_KIND => {
                let message = self.parse_inbound(payload, now_ms);
                self.history.push(message.clone());
                Some(ChatUpdate::Message(message))
            }
            TYPING_SIGNAL_KIND => {
                let signal: TypingSignal = match serde_json::from_str(payload) {
                    Ok(signal) => signal,
                    Err(e) => {
                        warn!("malformed typing signal: {e}");
                        return None;
                    }
                };
                if self.typing.refresh(&signal.id, &signal.name, now_ms) {
                    Some(ChatUpdate::Typing(self.typing.names()))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn parse_inbound(&self, payload: &str, now_ms: u64) -> ChatMessage {
        if let Ok(signal) = serde_json::from_str::<ChatSignal>(payload) {
            let attachment = signal.attachment.map(|a| Attachment {
                url: format!("data:{};base64,{}", a.mime_type, a.data),
                name: a.name,
                size: a.size,
                mime_type: a.mime_type,
            });
            return ChatMessage {
                id: uuid::Uuid::new_v4().to_string(),
                author: signal.author,
                content: signal.content,
                timestamp: signal.timestamp,
                is_own: false,
                kind: signal.kind,
                attachment,
            };
        }
        // older peers send bare "author: content" text
        match parse_legacy_chat(payload) {
            Some((author, content)) => ChatMessage::text(author, content, now_ms, false),
            None => ChatMessage::text("", payload, now_ms, false),
        }
    }

    /// Expire stale typing indicators. Returns the new roster when it
    /// changed.
    pub fn prune_typing(&mut self, now_ms: u64) -> Option<Vec<String>> {
        self.typing.prune(now_ms).then(|| self.typing.names())
    }

    /// Drop a departed peer's typing entry. Returns the new roster when it
    /// changed.
    pub fn peer_left(&mut self, connection_id: &str) -> Option<Vec<String>> {
        self.typing
            .remove(connection_id)
            .then(|| self.typing.names())
    }

    /// Forget history and typing state. Called on session teardown.
    pub fn clear(&mut self) {
        self.history.clear();
        self.typing.clear();
        self.last_typing_sent_ms = None;
    }
}
