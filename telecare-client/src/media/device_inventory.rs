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

//! Cached camera/microphone inventory with a per-kind current selection.
//!
//! Queried lazily on first need; a switch operation that finds an empty
//! cache triggers a refresh. Ordering is whatever the platform reports and
//! is only stable while the hardware set is unchanged.

use super::MediaProvider;
use log::debug;
use std::rc::Rc;
use telecare_types::{DeviceDescriptor, MediaKind};

pub struct DeviceInventory {
    provider: Rc<dyn MediaProvider>,
    audio_inputs: Vec<DeviceDescriptor>,
    video_inputs: Vec<DeviceDescriptor>,
    selected_audio: Option<String>,
    selected_video: Option<String>,
    loaded: bool,
}

impl DeviceInventory {
    pub fn new(provider: Rc<dyn MediaProvider>) -> Self {
        Self {
            provider,
            audio_inputs: Vec::new(),
            video_inputs: Vec::new(),
            selected_audio: None,
            selected_video: None,
            loaded: false,
        }
    }

    /// Re-enumerate the hardware, replacing the cache. Selections are kept
    /// if the selected device still exists, otherwise cleared back to the
    /// default.
    pub fn refresh(&mut self) {
        let devices = self.provider.enumerate_devices();
        self.audio_inputs = devices
            .iter()
            .filter(|d| d.kind == MediaKind::Audio)
            .cloned()
            .collect();
        self.video_inputs = devices
            .into_iter()
            .filter(|d| d.kind == MediaKind::Video)
            .collect();
        self.loaded = true;

        let audio_ids: Vec<&str> = self.audio_inputs.iter().map(|d| d.device_id.as_str()).collect();
        if let Some(selected) = &self.selected_audio {
            if !audio_ids.contains(&selected.as_str()) {
                self.selected_audio = None;
            }
        }
        let video_ids: Vec<&str> = self.video_inputs.iter().map(|d| d.device_id.as_str()).collect();
        if let Some(selected) = &self.selected_video {
            if !video_ids.contains(&selected.as_str()) {
                self.selected_video = None;
            }
        }
        debug!(
            "device inventory refreshed: {} microphones, {} cameras",
            self.audio_inputs.len(),
            self.video_inputs.len()
        );
    }

    fn ensure_loaded(&mut self) {
        if !self.loaded {
            self.refresh();
        }
    }

    /// The cached device list for a kind, loading lazily on first call.
    pub fn devices(&mut self, kind: MediaKind) -> &[DeviceDescriptor] {
        self.ensure_loaded();
        match kind {
            MediaKind::Audio => &self.audio_inputs,
            MediaKind::Video => &self.video_inputs,
        }
    }

    /// Currently selected device id for a kind; the first cached device is
    /// the default selection.
    pub fn selected(&self, kind: MediaKind) -> Option<String> {
        let (explicit, list) = match kind {
            MediaKind::Audio => (&self.selected_audio, &self.audio_inputs),
            MediaKind::Video => (&self.selected_video, &self.video_inputs),
        };
        explicit
            .clone()
            .or_else(|| list.first().map(|d| d.device_id.clone()))
    }

    /// Select a device. Ignored when the id is not in the cached list.
    pub fn select(&mut self, kind: MediaKind, device_id: &str) {
        self.ensure_loaded();
        let list = match kind {
            MediaKind::Audio => &self.audio_inputs,
            MediaKind::Video => &self.video_inputs,
        };
        if list.iter().any(|d| d.device_id == device_id) {
            match kind {
                MediaKind::Audio => self.selected_audio = Some(device_id.to_string()),
                MediaKind::Video => self.selected_video = Some(device_id.to_string()),
            }
        }
    }

    /// The next device after the current selection, round-robin. Refreshes
    /// the cache when it is empty. `None` when there are no devices of the
    /// kind at all.
    pub fn next_device(&mut self, kind: MediaKind) -> Option<DeviceDescriptor> {
        self.ensure_loaded();
        if self.devices_of(kind).is_empty() {
            self.refresh();
        }
        let selected = self.selected(kind);
        let list = self.devices_of(kind);
        if list.is_empty() {
            return None;
        }
        let current = selected
            .and_then(|id| list.iter().position(|d| d.device_id == id))
            .unwrap_or(0);
        Some(list[(current + 1) % list.len()].clone())
    }

    fn devices_of(&self, kind: MediaKind) -> &[DeviceDescriptor] {
        match kind {
            MediaKind::Audio => &self.audio_inputs,
            MediaKind::Video => &self.video_inputs,
        }
    }
}
