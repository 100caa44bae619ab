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

//! The single mutator of the remote participant list.
//!
//! Transport stream events are assumed in order per connection; duplicates
//! and republishes are absorbed by keying tiles on
//! `(connection_id, stream_kind)`. The local participant's own events are
//! filtered unconditionally, whether or not the vendor claims to do so.

use log::{debug, warn};
use std::collections::BTreeSet;
use telecare_types::StreamKind;

/// One remote media tile: a participant's camera or screen stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteTile {
    pub connection_id: String,
    pub stream_id: String,
    pub kind: StreamKind,
    pub has_audio: bool,
    pub has_video: bool,
}

/// What a stream-created event did to the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileOutcome {
    /// New tile for a participant/kind not seen before.
    Added,
    /// The participant republished this kind; the old tile's stream id is
    /// returned so bound consumers (PiP, renderers) can re-resolve.
    Replaced { previous_stream_id: String },
    /// Self-echo or an exact duplicate; nothing changed.
    Ignored,
}

#[derive(Default)]
pub struct ParticipantRegistry {
    local_connection: Option<String>,
    tiles: Vec<RemoteTile>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The local connection id, learned on connect. Required for self-echo
    /// filtering; until set, no event can be attributed to self.
    pub fn set_local_connection(&mut self, connection_id: Option<String>) {
        self.local_connection = connection_id;
    }

    /// Reconcile a stream-created event into the tile list.
    pub fn add_stream(&mut self, tile: RemoteTile) -> TileOutcome {
        if self.local_connection.as_deref() == Some(tile.connection_id.as_str()) {
            debug!("ignoring self-echo stream {}", tile.stream_id);
            return TileOutcome::Ignored;
        }
        if let Some(existing) = self
            .tiles
            .iter_mut()
            .find(|t| t.connection_id == tile.connection_id && t.kind == tile.kind)
        {
            if existing.stream_id == tile.stream_id {
                debug!("duplicate stream-created for {}", tile.stream_id);
                return TileOutcome::Ignored;
            }
            let previous_stream_id = std::mem::replace(existing, tile).stream_id;
            debug!("replaced tile {previous_stream_id}");
            return TileOutcome::Replaced { previous_stream_id };
        }
        debug!(
            "new {:?} tile {} from {}",
            tile.kind, tile.stream_id, tile.connection_id
        );
        self.tiles.push(tile);
        TileOutcome::Added
    }

    /// Reconcile a stream-destroyed event. Returns the removed tile, `None`
    /// when the stream id is unknown (already replaced or never tracked).
    pub fn remove_stream(&mut self, stream_id: &str) -> Option<RemoteTile> {
        let index = self.tiles.iter().position(|t| t.stream_id == stream_id)?;
        Some(self.tiles.remove(index))
    }

    /// Whether a participant still owns any tile.
    pub fn has_participant(&self, connection_id: &str) -> bool {
        self.tiles.iter().any(|t| t.connection_id == connection_id)
    }

    pub fn tiles(&self) -> &[RemoteTile] {
        &self.tiles
    }

    pub fn tile_for(&self, connection_id: &str, kind: StreamKind) -> Option<&RemoteTile> {
        self.tiles
            .iter()
            .find(|t| t.connection_id == connection_id && t.kind == kind)
    }

    /// Distinct remote participants.
    pub fn remote_count(&self) -> usize {
        self.remote_connections().len()
    }

    /// Remote participants plus self.
    pub fn participant_count(&self) -> usize {
        self.remote_count() + 1
    }

    /// True when no remote tile exists, i.e. the session should display a
    /// waiting state.
    pub fn is_waiting(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn remote_connections(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.tiles.iter().map(|t| t.connection_id.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    pub fn clear(&mut self) {
        if !self.tiles.is_empty() {
            warn!("clearing {} remote tiles", self.tiles.len());
        }
        self.tiles.clear();
        self.local_connection = None;
    }
}
