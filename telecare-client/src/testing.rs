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

//! Deterministic test doubles for the provider, scheduler, and PiP seams.
//!
//! Enabled with the `testing` feature (or automatically for this crate's
//! own unit tests). Events never fire on their own: tests drive the
//! transport with [`MockTransport::fire`] and the clock with
//! [`ManualScheduler::advance`], so every interleaving is reproducible.

use crate::error::{MediaError, SourceSwapError, TransportError};
use crate::media::{LocalMedia, MediaProvider};
use crate::pip::PipSurface;
use crate::scheduler::{Scheduler, TimerHandle};
use crate::transport::{
    Publication, PublishRequest, SessionTransport, TransportCapabilities, TransportEvent,
    TransportOptions, TransportStats,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::{Rc, Weak};
use telecare_types::{Callback, DeviceDescriptor, MediaKind, SessionCredentials};

// === Manual scheduler ===

enum TimerCallback {
    Repeating(Box<dyn FnMut()>),
    Once(Option<Box<dyn FnOnce()>>),
}

struct TimerEntry {
    due: u64,
    period: Option<u64>,
    callback: TimerCallback,
}

#[derive(Default)]
struct SchedulerState {
    now: u64,
    next_id: u64,
    entries: BTreeMap<u64, TimerEntry>,
    cancelled: HashSet<u64>,
}

/// Scheduler whose clock only moves when the test calls
/// [`advance`](ManualScheduler::advance).
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

struct ManualTimerHandle {
    id: u64,
    state: Weak<RefCell<SchedulerState>>,
}

impl TimerHandle for ManualTimerHandle {}

impl Drop for ManualTimerHandle {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.borrow_mut();
            if state.entries.remove(&self.id).is_none() {
                // The entry is temporarily out of the map while its callback
                // runs; remember the cancellation so it is not re-armed.
                state.cancelled.insert(self.id);
            }
        }
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live timers.
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Move the clock forward, firing every timer that comes due, in due
    /// order. Callbacks may schedule or cancel timers while running.
    pub fn advance(&self, delta_ms: u64) {
        let target = self.state.borrow().now + delta_ms;
        loop {
            let next = {
                let state = self.state.borrow();
                state
                    .entries
                    .iter()
                    .filter(|(_, e)| e.due <= target)
                    .min_by_key(|(id, e)| (e.due, **id))
                    .map(|(id, _)| *id)
            };
            let Some(id) = next else { break };

            let mut entry = {
                let mut state = self.state.borrow_mut();
                let entry = state.entries.remove(&id).expect("entry vanished");
                state.now = state.now.max(entry.due);
                entry
            };

            match &mut entry.callback {
                TimerCallback::Repeating(cb) => cb(),
                TimerCallback::Once(cb) => {
                    if let Some(cb) = cb.take() {
                        cb();
                    }
                }
            }

            let mut state = self.state.borrow_mut();
            if state.cancelled.remove(&id) {
                continue;
            }
            if let Some(period) = entry.period {
                entry.due += period;
                state.entries.insert(id, entry);
            }
        }
        self.state.borrow_mut().now = target;
    }
}

impl Scheduler for ManualScheduler {
    fn interval(&self, period_ms: u64, callback: Box<dyn FnMut()>) -> Box<dyn TimerHandle> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + period_ms;
        state.entries.insert(
            id,
            TimerEntry {
                due,
                period: Some(period_ms),
                callback: TimerCallback::Repeating(callback),
            },
        );
        Box::new(ManualTimerHandle {
            id,
            state: Rc::downgrade(&self.state),
        })
    }

    fn timeout(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> Box<dyn TimerHandle> {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay_ms;
        state.entries.insert(
            id,
            TimerEntry {
                due,
                period: None,
                callback: TimerCallback::Once(Some(callback)),
            },
        );
        Box::new(ManualTimerHandle {
            id,
            state: Rc::downgrade(&self.state),
        })
    }

    fn now_ms(&self) -> u64 {
        self.state.borrow().now
    }
}

// === Mock media provider ===

#[derive(Default)]
struct MediaProviderState {
    devices: Vec<DeviceDescriptor>,
    fail_next_acquire: Option<MediaError>,
    acquired: Vec<Rc<LocalMediaState>>,
    next_stream: u64,
}

/// Capture surface double. Hands out [`MockLocalMedia`] handles and records
/// every acquisition.
#[derive(Clone, Default)]
pub struct MockMediaProvider {
    state: Rc<RefCell<MediaProviderState>>,
}

#[derive(Default)]
pub struct LocalMediaState {
    stream_id: String,
    audio_device: Option<String>,
    video_device: Option<String>,
    stopped: RefCell<bool>,
    audio_enabled: RefCell<bool>,
    video_enabled: RefCell<bool>,
}

impl LocalMediaState {
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }
    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }
    pub fn video_device(&self) -> Option<&str> {
        self.video_device.as_deref()
    }
    pub fn audio_device(&self) -> Option<&str> {
        self.audio_device.as_deref()
    }
}

pub struct MockLocalMedia {
    state: Rc<LocalMediaState>,
}

impl LocalMedia for MockLocalMedia {
    fn stream_id(&self) -> String {
        self.state.stream_id.clone()
    }
    fn set_audio_enabled(&self, enabled: bool) {
        *self.state.audio_enabled.borrow_mut() = enabled;
    }
    fn set_video_enabled(&self, enabled: bool) {
        *self.state.video_enabled.borrow_mut() = enabled;
    }
    fn stop(&self) {
        *self.state.stopped.borrow_mut() = true;
    }
}

impl MockMediaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<DeviceDescriptor>) -> Self {
        let provider = Self::default();
        provider.state.borrow_mut().devices = devices;
        provider
    }

    pub fn set_devices(&self, devices: Vec<DeviceDescriptor>) {
        self.state.borrow_mut().devices = devices;
    }

    /// Make the next `acquire` call fail once with the given error.
    pub fn fail_next_acquire(&self, error: MediaError) {
        self.state.borrow_mut().fail_next_acquire = Some(error);
    }

    pub fn acquire_count(&self) -> usize {
        self.state.borrow().acquired.len()
    }

    /// Every stream handed out so far, in acquisition order.
    pub fn acquired_streams(&self) -> Vec<Rc<LocalMediaState>> {
        self.state.borrow().acquired.clone()
    }
}

impl MediaProvider for MockMediaProvider {
    fn enumerate_devices(&self) -> Vec<DeviceDescriptor> {
        self.state.borrow().devices.clone()
    }

    fn acquire(
        &self,
        audio_device: Option<&str>,
        video_device: Option<&str>,
    ) -> Result<Box<dyn LocalMedia>, MediaError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.fail_next_acquire.take() {
            return Err(error);
        }
        state.next_stream += 1;
        let media = Rc::new(LocalMediaState {
            stream_id: format!("local-{}", state.next_stream),
            audio_device: audio_device.map(str::to_string),
            video_device: video_device.map(str::to_string),
            stopped: RefCell::new(false),
            audio_enabled: RefCell::new(true),
            video_enabled: RefCell::new(true),
        });
        state.acquired.push(media.clone());
        Ok(Box::new(MockLocalMedia { state: media }))
    }
}

// === Mock transport ===

#[derive(Default)]
struct TransportState {
    on_event: Option<Callback<TransportEvent>>,
    connection_id: Option<String>,
    connect_count: usize,
    disconnect_count: usize,
    fail_connect: Option<TransportError>,
    fail_publish: Option<TransportError>,
    swap_supported: bool,
    fail_swap: Option<SourceSwapError>,
    capabilities: Option<TransportCapabilities>,
    stats: Option<TransportStats>,
    audio_levels: Vec<(String, f32)>,
    signals: Vec<(String, String)>,
    fail_signal: Option<TransportError>,
    publications: Vec<Rc<PublicationState>>,
    next_publication: u64,
    last_credentials: Option<SessionCredentials>,
}

/// Vendor transport double. Nothing happens until the test calls
/// [`fire`](MockTransport::fire).
#[derive(Clone)]
pub struct MockTransport {
    state: Rc<RefCell<TransportState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        let transport = Self {
            state: Rc::new(RefCell::new(TransportState::default())),
        };
        transport.state.borrow_mut().swap_supported = true;
        transport
    }
}

pub struct PublicationState {
    stream_id: String,
    transport: Weak<RefCell<TransportState>>,
    unpublished: RefCell<bool>,
    audio_enabled: RefCell<bool>,
    video_enabled: RefCell<bool>,
    swaps: RefCell<Vec<(MediaKind, String)>>,
    request: PublishRequest,
}

impl PublicationState {
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }
    pub fn is_unpublished(&self) -> bool {
        *self.unpublished.borrow()
    }
    pub fn audio_enabled(&self) -> bool {
        *self.audio_enabled.borrow()
    }
    pub fn video_enabled(&self) -> bool {
        *self.video_enabled.borrow()
    }
    pub fn swaps(&self) -> Vec<(MediaKind, String)> {
        self.swaps.borrow().clone()
    }
    pub fn request(&self) -> &PublishRequest {
        &self.request
    }
}

struct MockPublication {
    state: Rc<PublicationState>,
}

impl Publication for MockPublication {
    fn stream_id(&self) -> String {
        self.state.stream_id.clone()
    }

    fn set_audio_enabled(&self, enabled: bool) {
        *self.state.audio_enabled.borrow_mut() = enabled;
    }

    fn set_video_enabled(&self, enabled: bool) {
        *self.state.video_enabled.borrow_mut() = enabled;
    }

    fn replace_source(&self, kind: MediaKind, device_id: &str) -> Result<(), SourceSwapError> {
        if let Some(transport) = self.state.transport.upgrade() {
            let state = transport.borrow();
            if let Some(error) = &state.fail_swap {
                return Err(error.clone());
            }
            if !state.swap_supported {
                return Err(SourceSwapError::Unsupported);
            }
        }
        self.state
            .swaps
            .borrow_mut()
            .push((kind, device_id.to_string()));
        Ok(())
    }

    fn unpublish(&self) {
        *self.state.unpublished.borrow_mut() = true;
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a transport event to the connected session, as the vendor
    /// SDK would from its own event loop.
    pub fn fire(&self, event: TransportEvent) {
        let callback = {
            let mut state = self.state.borrow_mut();
            if let TransportEvent::Connected { connection_id } = &event {
                state.connection_id = Some(connection_id.clone());
            }
            if matches!(event, TransportEvent::Disconnected { .. }) {
                state.connection_id = None;
            }
            state.on_event.clone()
        };
        if let Some(callback) = callback {
            callback.emit(event);
        }
    }

    pub fn fail_connect(&self, error: TransportError) {
        self.state.borrow_mut().fail_connect = Some(error);
    }

    pub fn fail_next_publish(&self, error: TransportError) {
        self.state.borrow_mut().fail_publish = Some(error);
    }

    pub fn fail_next_signal(&self, error: TransportError) {
        self.state.borrow_mut().fail_signal = Some(error);
    }

    /// Control the in-place source swap behavior of all publications.
    pub fn set_swap_supported(&self, supported: bool) {
        self.state.borrow_mut().swap_supported = supported;
    }

    pub fn fail_swaps(&self, error: SourceSwapError) {
        self.state.borrow_mut().fail_swap = Some(error);
    }

    pub fn set_capabilities(&self, capabilities: TransportCapabilities) {
        self.state.borrow_mut().capabilities = Some(capabilities);
    }

    pub fn set_stats(&self, stats: TransportStats) {
        self.state.borrow_mut().stats = Some(stats);
    }

    pub fn set_audio_levels(&self, levels: Vec<(String, f32)>) {
        self.state.borrow_mut().audio_levels = levels;
    }

    pub fn connect_count(&self) -> usize {
        self.state.borrow().connect_count
    }

    pub fn disconnect_count(&self) -> usize {
        self.state.borrow().disconnect_count
    }

    pub fn last_credentials(&self) -> Option<SessionCredentials> {
        self.state.borrow().last_credentials.clone()
    }

    /// Signals sent so far as `(kind, payload)` pairs.
    pub fn sent_signals(&self) -> Vec<(String, String)> {
        self.state.borrow().signals.clone()
    }

    /// Every publication created so far, in creation order.
    pub fn publications(&self) -> Vec<Rc<PublicationState>> {
        self.state.borrow().publications.clone()
    }
}

impl SessionTransport for MockTransport {
    fn connect(
        &self,
        credentials: &SessionCredentials,
        options: TransportOptions,
    ) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.fail_connect.take() {
            return Err(error);
        }
        state.connect_count += 1;
        state.last_credentials = Some(credentials.clone());
        state.on_event = Some(options.on_event);
        Ok(())
    }

    fn disconnect(&self) {
        let mut state = self.state.borrow_mut();
        state.disconnect_count += 1;
        state.connection_id = None;
        state.on_event = None;
    }

    fn connection_id(&self) -> Option<String> {
        self.state.borrow().connection_id.clone()
    }

    fn publish(&self, request: PublishRequest) -> Result<Rc<dyn Publication>, TransportError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.fail_publish.take() {
            return Err(error);
        }
        state.next_publication += 1;
        let publication = Rc::new(PublicationState {
            stream_id: format!("pub-{}", state.next_publication),
            transport: Rc::downgrade(&self.state),
            unpublished: RefCell::new(false),
            audio_enabled: RefCell::new(request.audio_enabled),
            video_enabled: RefCell::new(request.video_enabled),
            swaps: RefCell::new(Vec::new()),
            request,
        });
        state.publications.push(publication.clone());
        Ok(Rc::new(MockPublication { state: publication }))
    }

    fn send_signal(&self, kind: &str, payload: &str) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.fail_signal.take() {
            return Err(error);
        }
        state.signals.push((kind.to_string(), payload.to_string()));
        Ok(())
    }

    fn poll_stats(&self) -> Option<TransportStats> {
        self.state.borrow().stats
    }

    fn poll_audio_levels(&self) -> Vec<(String, f32)> {
        self.state.borrow().audio_levels.clone()
    }

    fn capabilities(&self) -> TransportCapabilities {
        self.state
            .borrow()
            .capabilities
            .unwrap_or_default()
    }
}

// === Mock PiP surface ===

/// What happened on the PiP surface, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipCall {
    Enter(String),
    SetSource(String),
    Exit,
}

#[derive(Default)]
struct PipSurfaceState {
    calls: Vec<PipCall>,
    fail_enter: Option<String>,
    current: Option<String>,
}

/// Native PiP surface double.
#[derive(Clone, Default)]
pub struct MockPipSurface {
    state: Rc<RefCell<PipSurfaceState>>,
}

impl MockPipSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_enter(&self, reason: &str) {
        self.state.borrow_mut().fail_enter = Some(reason.to_string());
    }

    pub fn calls(&self) -> Vec<PipCall> {
        self.state.borrow().calls.clone()
    }

    /// The sink currently rendered out-of-window, if any.
    pub fn current_sink(&self) -> Option<String> {
        self.state.borrow().current.clone()
    }
}

impl PipSurface for MockPipSurface {
    fn enter(&self, sink_id: &str) -> Result<(), crate::error::PipError> {
        let mut state = self.state.borrow_mut();
        if let Some(reason) = state.fail_enter.take() {
            return Err(crate::error::PipError::Unavailable(reason));
        }
        state.calls.push(PipCall::Enter(sink_id.to_string()));
        state.current = Some(sink_id.to_string());
        Ok(())
    }

    fn set_source(&self, sink_id: &str) -> Result<(), crate::error::PipError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(PipCall::SetSource(sink_id.to_string()));
        state.current = Some(sink_id.to_string());
        Ok(())
    }

    fn exit(&self) {
        let mut state = self.state.borrow_mut();
        state.calls.push(PipCall::Exit);
        state.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_scheduler_fires_in_due_order() {
        let scheduler = ManualScheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        let _late = scheduler.timeout(200, Box::new(move || o.borrow_mut().push("late")));
        let o = order.clone();
        let _early = scheduler.timeout(100, Box::new(move || o.borrow_mut().push("early")));

        scheduler.advance(250);
        assert_eq!(*order.borrow(), vec!["early", "late"]);
    }

    #[test]
    fn interval_repeats_until_dropped() {
        let scheduler = ManualScheduler::new();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let handle = scheduler.interval(100, Box::new(move || *c.borrow_mut() += 1));

        scheduler.advance(350);
        assert_eq!(*count.borrow(), 3);

        drop(handle);
        scheduler.advance(1000);
        assert_eq!(*count.borrow(), 3);
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn timer_dropped_from_its_own_callback_stays_cancelled() {
        let scheduler = ManualScheduler::new();
        let slot: Rc<RefCell<Option<Box<dyn TimerHandle>>>> = Rc::new(RefCell::new(None));
        let count = Rc::new(RefCell::new(0));

        let c = count.clone();
        let s = slot.clone();
        let handle = scheduler.interval(
            100,
            Box::new(move || {
                *c.borrow_mut() += 1;
                // self-cancel on first fire, as teardown does
                s.borrow_mut().take();
            }),
        );
        *slot.borrow_mut() = Some(handle);

        scheduler.advance(500);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn mock_transport_routes_events_to_listener() {
        let transport = MockTransport::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let creds = SessionCredentials::new("sid", "a.b.c", "app");
        transport
            .connect(
                &creds,
                TransportOptions {
                    on_event: Callback::from(move |event| sink.borrow_mut().push(event)),
                },
            )
            .unwrap();

        transport.fire(TransportEvent::Connected {
            connection_id: "conn-self".to_string(),
        });
        assert_eq!(transport.connection_id().as_deref(), Some("conn-self"));
        assert_eq!(seen.borrow().len(), 1);
    }
}
