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

//! Receiver-side typing indicator roster.
//!
//! There is no "stopped typing" signal on the wire. Each refresh restamps
//! the sender's entry, and entries older than the expiry window are pruned
//! unconditionally.

use crate::constants::TYPING_EXPIRY_MS;
use telecare_types::TypingIndicator;

#[derive(Default)]
pub struct TypingRoster {
    entries: Vec<TypingIndicator>,
}

impl TypingRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a refresh from a peer. Returns `true` when the set of names
    /// changed (a new typist appeared), `false` for a pure restamp.
    pub fn refresh(&mut self, id: &str, name: &str, now_ms: u64) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.timestamp = now_ms;
            entry.name = name.to_string();
            return false;
        }
        self.entries.push(TypingIndicator {
            id: id.to_string(),
            name: name.to_string(),
            timestamp: now_ms,
        });
        true
    }

    /// Drop entries not refreshed within the expiry window. Returns `true`
    /// when anything was removed.
    pub fn prune(&mut self, now_ms: u64) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| now_ms.saturating_sub(e.timestamp) < TYPING_EXPIRY_MS);
        self.entries.len() != before
    }

    /// Drop a peer's entry outright (their connection went away). Returns
    /// `true` when an entry was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Names currently typing, in first-seen order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
