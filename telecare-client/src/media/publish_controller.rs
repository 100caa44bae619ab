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

//! Owner of the local stream and the single outbound publication.
//!
//! No other component touches the local media or the publication. Mute and
//! camera toggles update observable state synchronously and let the
//! transport acknowledgment catch up out-of-band. Device switches prefer an
//! in-place source swap (no renegotiation, no visual flash) and fall back
//! to recreating the publication, restoring the prior device if even the
//! fallback fails.

use super::{LocalMedia, MediaProvider};
use crate::error::{MediaError, SessionError, TransportError};
use crate::transport::{Publication, PublishRequest, SessionTransport};
use log::{debug, error, warn};
use std::rc::Rc;
use telecare_types::MediaKind;

/// How a device switch was carried out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The publication swapped sources in place; `stream_id` unchanged.
    SwappedInPlace { device_id: String },
    /// The publication was recreated with the new device. The outbound
    /// stream id changed; consumers must not have assumed it stable.
    Republished { device_id: String, stream_id: String },
    /// There was no publication; only the local preview stream was rebuilt.
    PreviewSwapped { device_id: String },
}

pub struct PublishController {
    provider: Rc<dyn MediaProvider>,
    local: Option<Box<dyn LocalMedia>>,
    publication: Option<Rc<dyn Publication>>,
    audio_enabled: bool,
    video_enabled: bool,
    audio_device: Option<String>,
    video_device: Option<String>,
}

impl PublishController {
    pub fn new(provider: Rc<dyn MediaProvider>) -> Self {
        Self {
            provider,
            local: None,
            publication: None,
            audio_enabled: true,
            video_enabled: true,
            audio_device: None,
            video_device: None,
        }
    }

    /// Request camera+microphone access independent of any session, for the
    /// pre-join preview. Never retried automatically; the three
    /// [`MediaError`] kinds are surfaced for the user to act on.
    pub fn acquire_preview(
        &mut self,
        audio_device: Option<String>,
        video_device: Option<String>,
    ) -> Result<(), MediaError> {
        let local = self
            .provider
            .acquire(audio_device.as_deref(), video_device.as_deref())?;
        local.set_audio_enabled(self.audio_enabled);
        local.set_video_enabled(self.video_enabled);
        self.local = Some(local);
        self.audio_device = audio_device;
        self.video_device = video_device;
        Ok(())
    }

    pub fn has_local_stream(&self) -> bool {
        self.local.is_some()
    }

    pub fn is_publishing(&self) -> bool {
        self.publication.is_some()
    }

    pub fn published_stream_id(&self) -> Option<String> {
        self.publication.as_ref().map(|p| p.stream_id())
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    /// Bind the current (or freshly acquired) local stream to the session's
    /// outbound channel. On failure nothing is left half-published.
    pub fn publish(
        &mut self,
        transport: &dyn SessionTransport,
        audio_device: Option<String>,
        video_device: Option<String>,
    ) -> Result<String, SessionError> {
        if self.local.is_none() {
            self.acquire_preview(audio_device, video_device)?;
        }
        self.bind_publication(transport).map_err(Into::into)
    }

    fn bind_publication(
        &mut self,
        transport: &dyn SessionTransport,
    ) -> Result<String, TransportError> {
        let Some(local) = self.local.as_ref() else {
            return Err(TransportError::PublishFailed(
                "no local stream to publish".to_string(),
            ));
        };
        let request = PublishRequest {
            local_stream_id: local.stream_id(),
            audio_enabled: self.audio_enabled,
            video_enabled: self.video_enabled,
            audio_device: self.audio_device.clone(),
            video_device: self.video_device.clone(),
        };
        match transport.publish(request) {
            Ok(publication) => {
                let stream_id = publication.stream_id();
                self.publication = Some(publication);
                Ok(stream_id)
            }
            Err(e) => {
                // roll back: no partial publish state survives
                self.publication = None;
                if let Some(local) = self.local.take() {
                    local.stop();
                }
                Err(e)
            }
        }
    }

    /// Set the local audio enablement. Returns `false` when the state
    /// already matched (idempotent), `true` when it flipped. Observable
    /// state updates synchronously; the transport acknowledgment is
    /// reconciled out-of-band.
    pub fn set_audio_enabled(&mut self, enabled: bool) -> bool {
        if self.audio_enabled == enabled {
            return false;
        }
        self.audio_enabled = enabled;
        if let Some(local) = &self.local {
            local.set_audio_enabled(enabled);
        }
        if let Some(publication) = &self.publication {
            publication.set_audio_enabled(enabled);
        }
        true
    }

    /// Set the local video enablement; same contract as
    /// [`set_audio_enabled`](Self::set_audio_enabled).
    pub fn set_video_enabled(&mut self, enabled: bool) -> bool {
        if self.video_enabled == enabled {
            return false;
        }
        self.video_enabled = enabled;
        if let Some(local) = &self.local {
            local.set_video_enabled(enabled);
        }
        if let Some(publication) = &self.publication {
            publication.set_video_enabled(enabled);
        }
        true
    }

    /// Flip audio enablement, returning the new state.
    pub fn toggle_audio(&mut self) -> bool {
        let target = !self.audio_enabled;
        self.set_audio_enabled(target);
        target
    }

    /// Flip video enablement, returning the new state.
    pub fn toggle_video(&mut self) -> bool {
        let target = !self.video_enabled;
        self.set_video_enabled(target);
        target
    }

    fn device_for(&self, kind: MediaKind) -> Option<String> {
        match kind {
            MediaKind::Audio => self.audio_device.clone(),
            MediaKind::Video => self.video_device.clone(),
        }
    }

    fn set_device_for(&mut self, kind: MediaKind, device_id: Option<String>) {
        match kind {
            MediaKind::Audio => self.audio_device = device_id,
            MediaKind::Video => self.video_device = device_id,
        }
    }

    /// Move the publication onto `device_id`.
    ///
    /// Strategy (a): in-place source swap on the existing publication —
    /// strongly preferred. Strategy (b): unpublish, destroy, re-acquire and
    /// republish. If (b) fails too, the prior device is restored so no
    /// ambiguous device state is left behind, and the original error is
    /// reported.
    pub fn switch_device(
        &mut self,
        transport: &dyn SessionTransport,
        kind: MediaKind,
        device_id: &str,
    ) -> Result<SwitchOutcome, SessionError> {
        let Some(publication) = self.publication.clone() else {
            return self.swap_preview(kind, device_id);
        };

        match publication.replace_source(kind, device_id) {
            Ok(()) => {
                self.set_device_for(kind, Some(device_id.to_string()));
                debug!("switched {kind} source in place to {device_id}");
                Ok(SwitchOutcome::SwappedInPlace {
                    device_id: device_id.to_string(),
                })
            }
            Err(swap_error) => {
                debug!("in-place {kind} swap unavailable ({swap_error}), recreating publication");
                self.republish_with_device(transport, kind, device_id)
            }
        }
    }

    fn republish_with_device(
        &mut self,
        transport: &dyn SessionTransport,
        kind: MediaKind,
        device_id: &str,
    ) -> Result<SwitchOutcome, SessionError> {
        let prior_device = self.device_for(kind);

        if let Some(publication) = self.publication.take() {
            publication.unpublish();
        }
        if let Some(local) = self.local.take() {
            local.stop();
        }

        self.set_device_for(kind, Some(device_id.to_string()));
        match self.reacquire_and_bind(transport) {
            Ok(stream_id) => Ok(SwitchOutcome::Republished {
                device_id: device_id.to_string(),
                stream_id,
            }),
            Err(e) => {
                warn!("republish with {kind} device {device_id} failed: {e}");
                self.set_device_for(kind, prior_device.clone());
                match self.reacquire_and_bind(transport) {
                    Ok(_) => debug!("restored prior {kind} device {prior_device:?}"),
                    Err(restore_error) => {
                        error!("could not restore prior {kind} device: {restore_error}")
                    }
                }
                Err(e)
            }
        }
    }

    fn reacquire_and_bind(
        &mut self,
        transport: &dyn SessionTransport,
    ) -> Result<String, SessionError> {
        let local = self
            .provider
            .acquire(self.audio_device.as_deref(), self.video_device.as_deref())?;
        local.set_audio_enabled(self.audio_enabled);
        local.set_video_enabled(self.video_enabled);
        self.local = Some(local);
        self.bind_publication(transport).map_err(Into::into)
    }

    fn swap_preview(
        &mut self,
        kind: MediaKind,
        device_id: &str,
    ) -> Result<SwitchOutcome, SessionError> {
        let prior_device = self.device_for(kind);
        if let Some(local) = self.local.take() {
            local.stop();
        }
        self.set_device_for(kind, Some(device_id.to_string()));
        match self
            .provider
            .acquire(self.audio_device.as_deref(), self.video_device.as_deref())
        {
            Ok(local) => {
                local.set_audio_enabled(self.audio_enabled);
                local.set_video_enabled(self.video_enabled);
                self.local = Some(local);
                Ok(SwitchOutcome::PreviewSwapped {
                    device_id: device_id.to_string(),
                })
            }
            Err(e) => {
                self.set_device_for(kind, prior_device);
                Err(e.into())
            }
        }
    }

    /// Release everything. Safe on partially-initialized state and safe to
    /// call twice.
    pub fn teardown(&mut self) {
        if let Some(publication) = self.publication.take() {
            publication.unpublish();
        }
        if let Some(local) = self.local.take() {
            local.stop();
        }
        self.audio_enabled = true;
        self.video_enabled = true;
    }
}
