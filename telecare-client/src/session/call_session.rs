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

//! The call session: one object owning the whole in-call lifecycle.
//!
//! Vendor transport events collapse into a five-state machine
//! (`Idle | Loading | Connected | Reconnecting | Ended`, plus terminal
//! `Error`), so "is the call usable" is a single status check for the UI.
//! The session owns every timer and every sub-component; teardown releases
//! all of them, whichever path got us there.
//!
//! Single-threaded and callback-driven. The `join()` guard is a plain
//! status check, not a lock: it exists to reject overlapping user-triggered
//! join attempts, there is no parallelism to protect against.

use crate::chat::{ChatChannel, ChatUpdate};
use crate::constants::{
    AUDIO_LEVEL_POLL_MS, ERROR_DISMISS_MS, STATS_POLL_MS, TYPING_PRUNE_MS,
};
use crate::error::{MediaError, SessionError};
use crate::event_bus::emit_session_event;
use crate::events::SessionEvent;
use crate::media::{DeviceInventory, MediaProvider, PublishController, SwitchOutcome};
use crate::peers::{ParticipantRegistry, RemoteTile, TileOutcome};
use crate::pip::{PipController, PipSurface};
use crate::quality::{classify, SpeakerTracker};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::transport::{SessionTransport, TransportEvent, TransportOptions};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use telecare_diagnostics::{sample, DiagEvent};
use telecare_types::{
    Callback, CallStatus, ChatMessage, DeviceDescriptor, MediaKind, SessionCredentials,
    SignalQuality,
};

/// Platform integrations the session is built on.
pub struct SessionBackend {
    pub transport: Rc<dyn SessionTransport>,
    pub media: Rc<dyn MediaProvider>,
    pub scheduler: Rc<dyn Scheduler>,
    pub pip: Rc<dyn PipSurface>,
}

pub struct CallSessionOptions {
    /// Name shown to peers as chat author and typing indicator.
    pub display_name: String,
    pub credentials: SessionCredentials,
    /// Called on every status transition, in addition to the event bus.
    pub on_status_changed: Callback<CallStatus>,
}

/// Something to deliver once the state borrow is released. Callbacks run
/// user code that may call back into the session, so nothing is emitted
/// while `Inner` is borrowed.
enum Emission {
    Status(CallStatus),
    Event(SessionEvent),
}

struct Inner {
    transport: Rc<dyn SessionTransport>,
    scheduler: Rc<dyn Scheduler>,
    options: CallSessionOptions,
    self_weak: Weak<RefCell<Inner>>,

    status: CallStatus,
    local_connection: Option<String>,

    inventory: DeviceInventory,
    publisher: PublishController,
    registry: ParticipantRegistry,
    chat: ChatChannel,
    pip: PipController,
    speaker: SpeakerTracker,

    quality: Option<SignalQuality>,
    current_error: Option<String>,

    stats_timer: Option<Box<dyn TimerHandle>>,
    audio_timer: Option<Box<dyn TimerHandle>>,
    typing_timer: Option<Box<dyn TimerHandle>>,
    // Outlives teardown so a failure message stays readable after the call
    // state is gone.
    error_timer: Option<Box<dyn TimerHandle>>,
}

#[derive(Clone)]
pub struct CallSession {
    inner: Rc<RefCell<Inner>>,
}

fn flush(inner: &Rc<RefCell<Inner>>, emissions: Vec<Emission>) {
    for emission in emissions {
        match emission {
            Emission::Status(status) => {
                let callback = inner.borrow().options.on_status_changed.clone();
                callback.emit(status);
            }
            Emission::Event(event) => emit_session_event(event),
        }
    }
}

impl CallSession {
    pub fn new(backend: SessionBackend, options: CallSessionOptions) -> Self {
        let display_name = options.display_name.clone();
        let inner = Rc::new(RefCell::new(Inner {
            transport: backend.transport,
            scheduler: backend.scheduler,
            options,
            self_weak: Weak::new(),
            status: CallStatus::Idle,
            local_connection: None,
            inventory: DeviceInventory::new(backend.media.clone()),
            publisher: PublishController::new(backend.media),
            registry: ParticipantRegistry::new(),
            chat: ChatChannel::new(&display_name),
            pip: PipController::new(backend.pip),
            speaker: SpeakerTracker::new(),
            quality: None,
            current_error: None,
            stats_timer: None,
            audio_timer: None,
            typing_timer: None,
            error_timer: None,
        }));
        inner.borrow_mut().self_weak = Rc::downgrade(&inner);
        Self { inner }
    }

    // === Lifecycle ===

    /// Start the call. No-op while a join is already in flight or the call
    /// is live; a session in `Ended` or `Error` may be joined again.
    pub fn join(&self) {
        let mut emissions = Vec::new();
        {
            let mut inner = self.inner.borrow_mut();
            if matches!(
                inner.status,
                CallStatus::Loading | CallStatus::Connected | CallStatus::Reconnecting
            ) {
                debug!("join ignored, session is {}", inner.status);
                return;
            }
            inner.begin_join(&mut emissions);
        }
        flush(&self.inner, emissions);
    }

    /// Hang up. Tears down partial state too, so a user backing out of a
    /// stuck `Loading` screen releases the camera.
    pub fn leave(&self) {
        let mut emissions = Vec::new();
        {
            let mut inner = self.inner.borrow_mut();
            if !matches!(
                inner.status,
                CallStatus::Loading | CallStatus::Connected | CallStatus::Reconnecting
            ) {
                return;
            }
            info!("leaving call");
            inner.teardown();
            inner.set_status(CallStatus::Ended, &mut emissions);
            emissions.push(Emission::Event(SessionEvent::CallEnded { reason: None }));
        }
        flush(&self.inner, emissions);
    }

    pub fn status(&self) -> CallStatus {
        self.inner.borrow().status
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.inner.borrow().status,
            CallStatus::Connected | CallStatus::Reconnecting
        )
    }

    // === Devices and media ===

    pub fn devices(&self, kind: MediaKind) -> Vec<DeviceDescriptor> {
        self.inner.borrow_mut().inventory.devices(kind).to_vec()
    }

    pub fn selected_device(&self, kind: MediaKind) -> Option<String> {
        self.inner.borrow().inventory.selected(kind)
    }

    pub fn refresh_devices(&self) {
        self.inner.borrow_mut().inventory.refresh();
    }

    /// Flip the microphone. Observable state changes before the transport
    /// acknowledges. Returns the new enabled state.
    pub fn toggle_audio(&self) -> bool {
        self.toggle(MediaKind::Audio)
    }

    /// Flip the camera. Same contract as [`toggle_audio`](Self::toggle_audio).
    pub fn toggle_video(&self) -> bool {
        self.toggle(MediaKind::Video)
    }

    fn toggle(&self, kind: MediaKind) -> bool {
        let mut emissions = Vec::new();
        let enabled = {
            let mut inner = self.inner.borrow_mut();
            let enabled = match kind {
                MediaKind::Audio => inner.publisher.toggle_audio(),
                MediaKind::Video => inner.publisher.toggle_video(),
            };
            emissions.push(Emission::Event(SessionEvent::MediaToggled { kind, enabled }));
            enabled
        };
        flush(&self.inner, emissions);
        enabled
    }

    pub fn audio_enabled(&self) -> bool {
        self.inner.borrow().publisher.audio_enabled()
    }

    pub fn video_enabled(&self) -> bool {
        self.inner.borrow().publisher.video_enabled()
    }

    /// Move capture to a specific device. A failure leaves the previous
    /// device active and raises a transient error besides returning it.
    pub fn switch_device(&self, kind: MediaKind, device_id: &str) -> Result<(), SessionError> {
        let mut emissions = Vec::new();
        let result = {
            let mut inner = self.inner.borrow_mut();
            inner.switch_device(kind, device_id, &mut emissions)
        };
        flush(&self.inner, emissions);
        result
    }

    /// Move capture to the next device of the kind, round-robin. `Ok(None)`
    /// when there is no other device to switch to.
    pub fn cycle_device(&self, kind: MediaKind) -> Result<Option<String>, SessionError> {
        let next = {
            let mut inner = self.inner.borrow_mut();
            inner.inventory.next_device(kind)
        };
        let Some(next) = next else { return Ok(None) };
        self.switch_device(kind, &next.device_id)?;
        Ok(Some(next.device_id))
    }

    // === Participants ===

    pub fn participant_count(&self) -> usize {
        self.inner.borrow().registry.participant_count()
    }

    pub fn remote_participants(&self) -> Vec<String> {
        self.inner.borrow().registry.remote_connections()
    }

    // === Chat ===

    pub fn send_chat(&self, content: &str) -> Result<ChatMessage, SessionError> {
        let mut emissions = Vec::new();
        let result = {
            let mut inner = self.inner.borrow_mut();
            inner.send_chat(content, &mut emissions)
        };
        flush(&self.inner, emissions);
        result
    }

    pub fn send_chat_attachment(
        &self,
        name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<ChatMessage, SessionError> {
        let mut emissions = Vec::new();
        let result = {
            let mut inner = self.inner.borrow_mut();
            inner.send_chat_attachment(name, mime_type, bytes, &mut emissions)
        };
        flush(&self.inner, emissions);
        result
    }

    /// Tell peers we are typing. Throttled and best-effort; a no-op when
    /// not connected.
    pub fn notify_typing(&self) {
        let mut inner = self.inner.borrow_mut();
        let Some(local) = inner.local_connection.clone() else {
            return;
        };
        let now = inner.scheduler.now_ms();
        let transport = inner.transport.clone();
        inner.chat.notify_typing(transport.as_ref(), &local, now);
    }

    pub fn chat_history(&self) -> Vec<ChatMessage> {
        self.inner.borrow().chat.history().to_vec()
    }

    pub fn typing_names(&self) -> Vec<String> {
        self.inner.borrow().chat.typing_names()
    }

    // === Picture-in-Picture ===

    /// Engage or leave PiP. Target priority: active speaker, first remote,
    /// local preview.
    pub fn toggle_pip(&self) -> Result<bool, SessionError> {
        let mut emissions = Vec::new();
        let result = {
            let mut inner = self.inner.borrow_mut();
            match inner.pip.toggle() {
                Ok(engaged) => Ok(engaged),
                Err(e) => {
                    let error: SessionError = e.into();
                    inner.raise_error(error.guidance(), &mut emissions);
                    Err(error)
                }
            }
        };
        flush(&self.inner, emissions);
        result
    }

    pub fn set_pip_follow_speaker(&self, follow: bool) {
        self.inner.borrow_mut().pip.set_follow_speaker(follow);
    }

    /// The platform closed the PiP window on its own.
    pub fn handle_native_pip_exit(&self) {
        self.inner.borrow_mut().pip.handle_native_exit();
    }

    pub fn is_pip_engaged(&self) -> bool {
        self.inner.borrow().pip.is_engaged()
    }

    // === Observability ===

    pub fn quality(&self) -> Option<SignalQuality> {
        self.inner.borrow().quality
    }

    pub fn active_speaker(&self) -> Option<String> {
        self.inner.borrow().speaker.current().map(str::to_string)
    }

    /// The transient error currently displayed, if any.
    pub fn current_error(&self) -> Option<String> {
        self.inner.borrow().current_error.clone()
    }
}

impl Inner {
    fn begin_join(&mut self, out: &mut Vec<Emission>) {
        if let Err(e) = self.options.credentials.validate() {
            self.fail_join(SessionError::Precondition(e), out);
            return;
        }
        info!("joining session {}", self.options.credentials.session_identifier);
        self.set_status(CallStatus::Loading, out);

        // loads the inventory on first join; selections default to the
        // first device of each kind
        self.inventory.devices(MediaKind::Audio);
        let audio = self.inventory.selected(MediaKind::Audio);
        let video = self.inventory.selected(MediaKind::Video);
        if let Err(e) = self.publisher.acquire_preview(audio, video) {
            self.fail_join(e.into(), out);
            return;
        }

        let weak = self.self_weak.clone();
        let on_event = Callback::from(move |event: TransportEvent| {
            if let Some(rc) = weak.upgrade() {
                let mut emissions = Vec::new();
                // a transport may deliver events from inside connect() or
                // disconnect(), while the state is already borrowed
                match rc.try_borrow_mut() {
                    Ok(mut inner) => inner.handle_transport_event(event, &mut emissions),
                    Err(_) => {
                        warn!("dropping re-entrant transport event: {event:?}");
                        return;
                    }
                }
                flush(&rc, emissions);
            }
        });
        if let Err(e) = self
            .transport
            .connect(&self.options.credentials, TransportOptions { on_event })
        {
            self.fail_join(e.into(), out);
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent, out: &mut Vec<Emission>) {
        match event {
            TransportEvent::Connected { connection_id } => {
                self.handle_connected(connection_id, out)
            }
            TransportEvent::ConnectFailed(e) => {
                if self.status == CallStatus::Loading {
                    self.fail_join(e.into(), out);
                }
            }
            TransportEvent::StreamCreated {
                connection_id,
                stream_id,
                kind,
                has_audio,
                has_video,
            } => {
                if !self.is_live() {
                    return;
                }
                let was_present = self.registry.has_participant(&connection_id);
                let outcome = self.registry.add_stream(RemoteTile {
                    connection_id: connection_id.clone(),
                    stream_id: stream_id.clone(),
                    kind,
                    has_audio,
                    has_video,
                });
                match outcome {
                    TileOutcome::Ignored => {}
                    TileOutcome::Added | TileOutcome::Replaced { .. } => {
                        self.pip.register_sink(&connection_id, &stream_id, false);
                        if !was_present {
                            out.push(Emission::Event(SessionEvent::PeerAdded(
                                connection_id.clone(),
                            )));
                        }
                        out.push(Emission::Event(SessionEvent::TileReady {
                            connection_id,
                            stream_id,
                            kind,
                        }));
                    }
                }
            }
            TransportEvent::StreamDestroyed { stream_id } => {
                let Some(tile) = self.registry.remove_stream(&stream_id) else {
                    return;
                };
                if !self.registry.has_participant(&tile.connection_id) {
                    self.pip.unregister_sink(&tile.connection_id);
                    if self.speaker.remove(&tile.connection_id).is_some() {
                        self.pip.set_active_speaker(None);
                        out.push(Emission::Event(SessionEvent::ActiveSpeakerChanged(None)));
                    }
                    if let Some(names) = self.chat.peer_left(&tile.connection_id) {
                        out.push(Emission::Event(SessionEvent::TypingChanged(names)));
                    }
                    out.push(Emission::Event(SessionEvent::PeerRemoved(
                        tile.connection_id,
                    )));
                }
                if self.registry.is_waiting() {
                    out.push(Emission::Event(SessionEvent::WaitingForPeer));
                }
            }
            TransportEvent::Reconnecting => {
                if self.status == CallStatus::Connected {
                    warn!("transport reconnecting");
                    self.set_status(CallStatus::Reconnecting, out);
                    out.push(Emission::Event(SessionEvent::Reconnecting));
                }
            }
            TransportEvent::Reconnected => {
                if self.status == CallStatus::Reconnecting {
                    info!("transport reconnected");
                    self.set_status(CallStatus::Connected, out);
                    out.push(Emission::Event(SessionEvent::Reconnected));
                }
            }
            TransportEvent::Disconnected { reason } => {
                if !matches!(
                    self.status,
                    CallStatus::Loading | CallStatus::Connected | CallStatus::Reconnecting
                ) {
                    return;
                }
                info!("remote disconnect: {reason:?}");
                self.teardown();
                self.set_status(CallStatus::Ended, out);
                out.push(Emission::Event(SessionEvent::CallEnded { reason }));
            }
            TransportEvent::SignalReceived {
                from_connection_id,
                kind,
                payload,
            } => {
                let now = self.scheduler.now_ms();
                let local = self.local_connection.clone();
                match self
                    .chat
                    .handle_signal(&kind, &payload, &from_connection_id, local.as_deref(), now)
                {
                    Some(ChatUpdate::Message(message)) => {
                        out.push(Emission::Event(SessionEvent::ChatMessage(message)));
                    }
                    Some(ChatUpdate::Typing(names)) => {
                        out.push(Emission::Event(SessionEvent::TypingChanged(names)));
                    }
                    None => {}
                }
            }
        }
    }

    fn handle_connected(&mut self, connection_id: String, out: &mut Vec<Emission>) {
        if self.status != CallStatus::Loading {
            debug!("stale connected event ignored");
            return;
        }
        self.local_connection = Some(connection_id.clone());
        self.registry.set_local_connection(Some(connection_id.clone()));

        let transport = self.transport.clone();
        let audio = self.inventory.selected(MediaKind::Audio);
        let video = self.inventory.selected(MediaKind::Video);
        match self.publisher.publish(transport.as_ref(), audio, video) {
            Ok(stream_id) => {
                self.pip.register_sink(&connection_id, &stream_id, true);
                self.set_status(CallStatus::Connected, out);
                out.push(Emission::Event(SessionEvent::Connected));
                if self.registry.is_waiting() {
                    out.push(Emission::Event(SessionEvent::WaitingForPeer));
                }
                self.start_monitors();
            }
            Err(e) => self.fail_join(e, out),
        }
    }

    fn switch_device(
        &mut self,
        kind: MediaKind,
        device_id: &str,
        out: &mut Vec<Emission>,
    ) -> Result<(), SessionError> {
        // reject ids the inventory does not know, so the recorded selection
        // can never disagree with the device actually capturing
        if !self
            .inventory
            .devices(kind)
            .iter()
            .any(|d| d.device_id == device_id)
        {
            warn!("refusing switch to unknown {kind} device {device_id}");
            let error = SessionError::Media(MediaError::DeviceNotFound);
            self.raise_error(error.guidance(), out);
            return Err(error);
        }
        let transport = self.transport.clone();
        match self.publisher.switch_device(transport.as_ref(), kind, device_id) {
            Ok(outcome) => {
                self.inventory.select(kind, device_id);
                telecare_diagnostics::publish(DiagEvent {
                    scope: "media",
                    participant: self.local_connection.clone(),
                    ts_ms: self.scheduler.now_ms(),
                    samples: vec![sample!("device_switch", format!("{kind}:{device_id}"))],
                });
                if let SwitchOutcome::Republished { stream_id, .. } = outcome {
                    if let Some(local) = self.local_connection.clone() {
                        self.pip.register_sink(&local, &stream_id, true);
                    }
                    out.push(Emission::Event(SessionEvent::PublicationReplaced {
                        stream_id,
                    }));
                }
                Ok(())
            }
            Err(e) => {
                error!("device switch failed: {e}");
                self.raise_error(e.guidance(), out);
                Err(e)
            }
        }
    }

    fn send_chat(
        &mut self,
        content: &str,
        out: &mut Vec<Emission>,
    ) -> Result<ChatMessage, SessionError> {
        if !self.is_live() {
            return Err(SessionError::NotActive);
        }
        let now = self.scheduler.now_ms();
        let transport = self.transport.clone();
        match self.chat.send_text(transport.as_ref(), content, now) {
            Ok(message) => {
                out.push(Emission::Event(SessionEvent::ChatMessage(message.clone())));
                Ok(message)
            }
            Err(e) => {
                self.raise_error(e.guidance(), out);
                Err(e)
            }
        }
    }

    fn send_chat_attachment(
        &mut self,
        name: &str,
        mime_type: &str,
        bytes: &[u8],
        out: &mut Vec<Emission>,
    ) -> Result<ChatMessage, SessionError> {
        if !self.is_live() {
            return Err(SessionError::NotActive);
        }
        let now = self.scheduler.now_ms();
        let transport = self.transport.clone();
        match self
            .chat
            .send_attachment(transport.as_ref(), name, mime_type, bytes, now)
        {
            Ok(message) => {
                telecare_diagnostics::publish(DiagEvent {
                    scope: "chat",
                    participant: self.local_connection.clone(),
                    ts_ms: now,
                    samples: vec![sample!(
                        "attachment_bytes",
                        message.attachment.as_ref().map(|a| a.size).unwrap_or(0)
                    )],
                });
                out.push(Emission::Event(SessionEvent::ChatMessage(message.clone())));
                Ok(message)
            }
            Err(e) => {
                self.raise_error(e.guidance(), out);
                Err(e)
            }
        }
    }

    fn is_live(&self) -> bool {
        matches!(
            self.status,
            CallStatus::Connected | CallStatus::Reconnecting
        )
    }

    fn set_status(&mut self, status: CallStatus, out: &mut Vec<Emission>) {
        if self.status == status {
            return;
        }
        debug!("call status {} -> {}", self.status, status);
        self.status = status;
        out.push(Emission::Status(status));
    }

    fn fail_join(&mut self, error: SessionError, out: &mut Vec<Emission>) {
        error!("join failed: {error}");
        self.teardown();
        self.set_status(CallStatus::Error, out);
        self.raise_error(error.guidance(), out);
    }

    /// Put a message in the single observable error slot and arm its
    /// auto-dismiss. A newer error restarts the clock.
    fn raise_error(&mut self, message: String, out: &mut Vec<Emission>) {
        self.current_error = Some(message.clone());
        out.push(Emission::Event(SessionEvent::ErrorRaised(message)));

        let weak = self.self_weak.clone();
        self.error_timer = Some(self.scheduler.timeout(
            ERROR_DISMISS_MS,
            Box::new(move || {
                if let Some(rc) = weak.upgrade() {
                    let mut emissions = Vec::new();
                    match rc.try_borrow_mut() {
                        Ok(mut inner) => {
                            inner.error_timer = None;
                            if inner.current_error.take().is_some() {
                                emissions.push(Emission::Event(SessionEvent::ErrorDismissed));
                            }
                        }
                        Err(_) => {
                            warn!("error dismiss timer fired while the session was borrowed");
                            return;
                        }
                    }
                    flush(&rc, emissions);
                }
            }),
        ));
    }

    fn start_monitors(&mut self) {
        let weak = self.self_weak.clone();
        self.stats_timer = Some(self.scheduler.interval(
            STATS_POLL_MS,
            Box::new(move || {
                if let Some(rc) = weak.upgrade() {
                    let mut emissions = Vec::new();
                    match rc.try_borrow_mut() {
                        Ok(mut inner) => inner.poll_stats_once(&mut emissions),
                        Err(_) => {
                            warn!("skipping stats poll, session is borrowed");
                            return;
                        }
                    }
                    flush(&rc, emissions);
                }
            }),
        ));

        let weak = self.self_weak.clone();
        self.audio_timer = Some(self.scheduler.interval(
            AUDIO_LEVEL_POLL_MS,
            Box::new(move || {
                if let Some(rc) = weak.upgrade() {
                    let mut emissions = Vec::new();
                    match rc.try_borrow_mut() {
                        Ok(mut inner) => inner.poll_audio_once(&mut emissions),
                        Err(_) => {
                            warn!("skipping audio level poll, session is borrowed");
                            return;
                        }
                    }
                    flush(&rc, emissions);
                }
            }),
        ));

        let weak = self.self_weak.clone();
        self.typing_timer = Some(self.scheduler.interval(
            TYPING_PRUNE_MS,
            Box::new(move || {
                if let Some(rc) = weak.upgrade() {
                    let mut emissions = Vec::new();
                    match rc.try_borrow_mut() {
                        Ok(mut inner) => inner.prune_typing_once(&mut emissions),
                        Err(_) => {
                            warn!("skipping typing prune, session is borrowed");
                            return;
                        }
                    }
                    flush(&rc, emissions);
                }
            }),
        ));
    }

    fn poll_stats_once(&mut self, out: &mut Vec<Emission>) {
        let Some(stats) = self.transport.poll_stats() else {
            return;
        };
        telecare_diagnostics::publish(DiagEvent {
            scope: "transport",
            participant: self.local_connection.clone(),
            ts_ms: self.scheduler.now_ms(),
            samples: vec![
                sample!("rtt_ms", stats.round_trip_ms),
                sample!("packet_loss_pct", stats.packet_loss_pct),
                sample!("jitter_ms", stats.jitter_ms),
            ],
        });
        let quality = classify(&stats);
        if self.quality != Some(quality) {
            info!("signal quality is now {quality}");
            self.quality = Some(quality);
            out.push(Emission::Event(SessionEvent::QualityChanged(quality)));
        }
    }

    fn poll_audio_once(&mut self, out: &mut Vec<Emission>) {
        let levels = self.transport.poll_audio_levels();
        let now = self.scheduler.now_ms();
        if let Some(change) = self.speaker.sample(&levels, now) {
            telecare_diagnostics::publish(DiagEvent {
                scope: "speaker",
                participant: change.clone(),
                ts_ms: now,
                samples: vec![sample!(
                    "elected",
                    change.clone().unwrap_or_else(|| "none".to_string())
                )],
            });
            self.pip.set_active_speaker(change.clone());
            out.push(Emission::Event(SessionEvent::ActiveSpeakerChanged(change)));
        }
    }

    fn prune_typing_once(&mut self, out: &mut Vec<Emission>) {
        let now = self.scheduler.now_ms();
        if let Some(names) = self.chat.prune_typing(now) {
            out.push(Emission::Event(SessionEvent::TypingChanged(names)));
        }
    }

    /// Release everything a call can hold: timers, publication, local
    /// media, transport, tiles, chat state, PiP. Identical for hang-up,
    /// remote disconnect, and join failure.
    fn teardown(&mut self) {
        self.stats_timer = None;
        self.audio_timer = None;
        self.typing_timer = None;
        self.publisher.teardown();
        self.transport.disconnect();
        self.pip.clear();
        self.registry.clear();
        self.chat.clear();
        self.speaker.clear();
        self.quality = None;
        self.local_connection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualScheduler, MockMediaProvider, MockPipSurface, MockTransport};
    use std::rc::Rc;

    struct Fixture {
        session: CallSession,
        transport: MockTransport,
        provider: MockMediaProvider,
        scheduler: ManualScheduler,
        statuses: Rc<RefCell<Vec<CallStatus>>>,
    }

    fn signed_token() -> String {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine as _;
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\"}");
        let claims = URL_SAFE_NO_PAD.encode(b"{\"session\":\"session-1\"}");
        format!("{header}.{claims}.signature")
    }

    fn fixture() -> Fixture {
        let transport = MockTransport::new();
        let provider = MockMediaProvider::new();
        let scheduler = ManualScheduler::new();
        let pip = MockPipSurface::new();
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let sink = statuses.clone();
        let session = CallSession::new(
            SessionBackend {
                transport: Rc::new(transport.clone()),
                media: Rc::new(provider.clone()),
                scheduler: Rc::new(scheduler.clone()),
                pip: Rc::new(pip),
            },
            CallSessionOptions {
                display_name: "Sam".to_string(),
                credentials: SessionCredentials::new("session-1", &signed_token(), "app-1"),
                on_status_changed: Callback::from(move |status| sink.borrow_mut().push(status)),
            },
        );
        Fixture {
            session,
            transport,
            provider,
            scheduler,
            statuses,
        }
    }

    fn connect(f: &Fixture) {
        f.session.join();
        f.transport.fire(TransportEvent::Connected {
            connection_id: "conn-self".to_string(),
        });
    }

    #[test]
    fn join_reaches_connected_through_loading() {
        let f = fixture();
        connect(&f);
        assert_eq!(f.session.status(), CallStatus::Connected);
        assert_eq!(
            *f.statuses.borrow(),
            vec![CallStatus::Loading, CallStatus::Connected]
        );
        assert_eq!(f.transport.connect_count(), 1);
        assert!(f.transport.publications().len() == 1);
    }

    #[test]
    fn join_is_reentrancy_guarded() {
        let f = fixture();
        f.session.join();
        f.session.join();
        assert_eq!(f.transport.connect_count(), 1);
        assert_eq!(f.provider.acquire_count(), 1);
    }

    #[test]
    fn invalid_credentials_fail_before_any_device_or_network_call() {
        let transport = MockTransport::new();
        let provider = MockMediaProvider::new();
        let session = CallSession::new(
            SessionBackend {
                transport: Rc::new(transport.clone()),
                media: Rc::new(provider.clone()),
                scheduler: Rc::new(ManualScheduler::new()),
                pip: Rc::new(MockPipSurface::new()),
            },
            CallSessionOptions {
                display_name: "Sam".to_string(),
                credentials: SessionCredentials::new("", &signed_token(), "app-1"),
                on_status_changed: Callback::noop(),
            },
        );
        session.join();
        assert_eq!(session.status(), CallStatus::Error);
        assert!(session.current_error().is_some());
        assert_eq!(transport.connect_count(), 0);
        assert_eq!(provider.acquire_count(), 0);
    }

    #[test]
    fn publish_failure_tears_down_and_errors() {
        let f = fixture();
        f.transport
            .fail_next_publish(crate::error::TransportError::PublishFailed("no".to_string()));
        connect(&f);
        assert_eq!(f.session.status(), CallStatus::Error);
        assert!(f.session.current_error().is_some());
        assert_eq!(f.transport.disconnect_count(), 1);
        assert!(f.provider.acquired_streams()[0].is_stopped());
    }

    #[test]
    fn reconnect_cycle_does_not_republish() {
        let f = fixture();
        connect(&f);
        f.transport.fire(TransportEvent::Reconnecting);
        assert_eq!(f.session.status(), CallStatus::Reconnecting);
        f.transport.fire(TransportEvent::Reconnected);
        assert_eq!(f.session.status(), CallStatus::Connected);
        assert_eq!(f.transport.publications().len(), 1);
    }

    #[test]
    fn error_banner_auto_dismisses() {
        let f = fixture();
        connect(&f);
        f.transport
            .fail_next_signal(crate::error::TransportError::SignalFailed("x".to_string()));
        assert!(f.session.send_chat("hello").is_err());
        assert!(f.session.current_error().is_some());

        f.scheduler.advance(ERROR_DISMISS_MS);
        assert!(f.session.current_error().is_none());
    }

    #[test]
    fn teardown_clears_monitors_but_not_the_error_banner() {
        let f = fixture();
        f.transport
            .fail_next_publish(crate::error::TransportError::PublishFailed("no".to_string()));
        connect(&f);
        // only the error dismiss timer is still armed
        assert_eq!(f.scheduler.pending_timers(), 1);
        assert!(f.session.current_error().is_some());
        f.scheduler.advance(ERROR_DISMISS_MS);
        assert_eq!(f.scheduler.pending_timers(), 0);
    }

    /// Delivers the final event from inside `disconnect()` itself, like
    /// SDKs that confirm the hang-up synchronously.
    #[derive(Clone)]
    struct EchoingDisconnectTransport {
        inner: MockTransport,
    }

    impl SessionTransport for EchoingDisconnectTransport {
        fn connect(
            &self,
            credentials: &SessionCredentials,
            options: TransportOptions,
        ) -> Result<(), crate::error::TransportError> {
            self.inner.connect(credentials, options)
        }

        fn disconnect(&self) {
            self.inner.fire(TransportEvent::Disconnected { reason: None });
            self.inner.disconnect();
        }

        fn connection_id(&self) -> Option<String> {
            self.inner.connection_id()
        }

        fn publish(
            &self,
            request: crate::transport::PublishRequest,
        ) -> Result<Rc<dyn crate::transport::Publication>, crate::error::TransportError> {
            self.inner.publish(request)
        }

        fn send_signal(
            &self,
            kind: &str,
            payload: &str,
        ) -> Result<(), crate::error::TransportError> {
            self.inner.send_signal(kind, payload)
        }

        fn poll_stats(&self) -> Option<crate::transport::TransportStats> {
            self.inner.poll_stats()
        }

        fn poll_audio_levels(&self) -> Vec<(String, f32)> {
            self.inner.poll_audio_levels()
        }
    }

    #[test]
    fn disconnect_echoed_from_inside_leave_still_ends_cleanly() {
        let transport = EchoingDisconnectTransport {
            inner: MockTransport::new(),
        };
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let sink = statuses.clone();
        let session = CallSession::new(
            SessionBackend {
                transport: Rc::new(transport.clone()),
                media: Rc::new(MockMediaProvider::new()),
                scheduler: Rc::new(ManualScheduler::new()),
                pip: Rc::new(MockPipSurface::new()),
            },
            CallSessionOptions {
                display_name: "Sam".to_string(),
                credentials: SessionCredentials::new("session-1", &signed_token(), "app-1"),
                on_status_changed: Callback::from(move |status| sink.borrow_mut().push(status)),
            },
        );
        session.join();
        transport.inner.fire(TransportEvent::Connected {
            connection_id: "conn-self".to_string(),
        });
        assert_eq!(session.status(), CallStatus::Connected);

        // the echoed event arrives while leave() holds the state; it must
        // be dropped, not panic the teardown
        session.leave();
        assert_eq!(session.status(), CallStatus::Ended);
        assert_eq!(
            *statuses.borrow(),
            vec![CallStatus::Loading, CallStatus::Connected, CallStatus::Ended]
        );
    }

    #[test]
    fn speaker_elections_and_device_switches_reach_diagnostics() {
        let rx = telecare_diagnostics::subscribe();
        let f = fixture();
        f.provider.set_devices(vec![
            DeviceDescriptor::new("cam-a", "Front", MediaKind::Video),
            DeviceDescriptor::new("cam-b", "Back", MediaKind::Video),
        ]);
        connect(&f);

        f.transport
            .set_audio_levels(vec![("conn-a".to_string(), 1.0)]);
        f.scheduler.advance(600);
        f.session.switch_device(MediaKind::Video, "cam-b").unwrap();

        let scopes: Vec<_> = rx.try_iter().map(|e| e.scope).collect();
        assert!(scopes.contains(&"speaker"));
        assert!(scopes.contains(&"media"));
    }

    #[test]
    fn switching_to_an_unknown_device_is_rejected_up_front() {
        let f = fixture();
        f.provider.set_devices(vec![DeviceDescriptor::new(
            "cam-a",
            "Front",
            MediaKind::Video,
        )]);
        connect(&f);

        let result = f.session.switch_device(MediaKind::Video, "cam-ghost");
        assert!(matches!(
            result,
            Err(SessionError::Media(MediaError::DeviceNotFound))
        ));
        // the recorded selection still matches the capturing device
        assert_eq!(
            f.session.selected_device(MediaKind::Video).as_deref(),
            Some("cam-a")
        );
        assert!(f.transport.publications()[0].swaps().is_empty());
        assert_eq!(f.provider.acquire_count(), 1);
        assert!(f.session.current_error().is_some());
    }
}
