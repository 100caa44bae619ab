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

//! Wire protocol and display records for the in-call chat channel.
//!
//! Chat rides the session's low-bandwidth signaling primitive as JSON
//! envelopes ([`ChatSignal`], [`TypingSignal`]). A legacy colon-delimited
//! text format (`author: content`) is still accepted on receive for older
//! peers, but is never emitted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Signal kind under which chat message envelopes are sent.
pub const CHAT_SIGNAL_KIND: &str = "chat";

/// Signal kind for best-effort typing indicator refreshes.
pub const TYPING_SIGNAL_KIND: &str = "typing";

/// Payload category of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Text,
    Image,
    File,
}

/// Attachment data as carried on the wire (base64-encoded contents).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttachmentSignal {
    pub name: String,
    /// Size of the base64-encoded data, in bytes.
    pub size: usize,
    pub mime_type: String,
    /// Base64 (standard alphabet) encoding of the attachment bytes.
    pub data: String,
}

/// JSON envelope for a chat message signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatSignal {
    pub author: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentSignal>,
    /// Sender wall-clock time, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// JSON envelope for a typing indicator refresh.
///
/// There is no "stopped typing" signal; receivers expire indicators on
/// their own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypingSignal {
    pub id: String,
    pub name: String,
}

/// Attachment metadata as shown to the user.
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    pub name: String,
    /// Encoded size in bytes, as counted against the signaling budget.
    pub size: usize,
    pub mime_type: String,
    /// A `data:` URL suitable for handing straight to an `<img>`/download
    /// link equivalent.
    pub url: String,
}

/// A chat message as retained in session history.
///
/// The `id` is generated locally and only has to be unique enough for
/// display-list purposes; it is never sent on the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub author: String,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub is_own: bool,
    pub kind: ChatKind,
    pub attachment: Option<Attachment>,
}

impl ChatMessage {
    /// Build a plain text message record.
    pub fn text(author: &str, content: &str, timestamp: u64, is_own: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author: author.to_string(),
            content: content.to_string(),
            timestamp,
            is_own,
            kind: ChatKind::Text,
            attachment: None,
        }
    }

    /// Build a message record carrying an attachment.
    pub fn with_attachment(
        author: &str,
        content: &str,
        timestamp: u64,
        is_own: bool,
        kind: ChatKind,
        attachment: Attachment,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author: author.to_string(),
            content: content.to_string(),
            timestamp,
            is_own,
            kind,
            attachment: Some(attachment),
        }
    }
}

/// A peer currently typing. Entries self-expire; see the chat channel.
#[derive(Clone, Debug, PartialEq)]
pub struct TypingIndicator {
    pub id: String,
    pub name: String,
    /// Last refresh time, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Parse the legacy `author: content` chat format used by peers that
/// predate the JSON envelope.
///
/// Returns `None` when the payload has no `: ` separator, in which case
/// the whole payload should be treated as anonymous content by the caller.
pub fn parse_legacy_chat(payload: &str) -> Option<(&str, &str)> {
    let (author, content) = payload.split_once(": ")?;
    if author.is_empty() {
        return None;
    }
    Some((author, content))
}
