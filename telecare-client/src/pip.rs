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

//! Picture-in-picture coordination.
//!
//! Tracks which rendering sinks are eligible for out-of-window display and
//! picks the target by priority: active speaker, then the first remote
//! sink, then the local preview. In follow mode an active-speaker change
//! swaps the source in place rather than exiting and re-entering, so the
//! floating window never flashes.

use crate::error::PipError;
use log::{debug, warn};
use std::rc::Rc;

/// Native out-of-window rendering surface, implemented by the platform
/// binding.
pub trait PipSurface {
    /// Begin rendering the sink out-of-window.
    fn enter(&self, sink_id: &str) -> Result<(), PipError>;
    /// Swap the engaged window's media source without leaving PiP.
    fn set_source(&self, sink_id: &str) -> Result<(), PipError>;
    /// Leave PiP. Safe when not engaged.
    fn exit(&self);
}

#[derive(Clone, Debug)]
struct PipSink {
    connection_id: String,
    sink_id: String,
    local: bool,
}

pub struct PipController {
    surface: Rc<dyn PipSurface>,
    sinks: Vec<PipSink>,
    engaged: bool,
    follow_speaker: bool,
    engaged_connection: Option<String>,
    active_speaker: Option<String>,
}

impl PipController {
    pub fn new(surface: Rc<dyn PipSurface>) -> Self {
        Self {
            surface,
            sinks: Vec::new(),
            engaged: false,
            follow_speaker: false,
            engaged_connection: None,
            active_speaker: None,
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn follow_speaker(&self) -> bool {
        self.follow_speaker
    }

    /// Announce a rendering sink for a participant. Registering again for
    /// the same participant replaces the sink; if PiP is currently showing
    /// that participant the engaged window is moved onto the replacement.
    pub fn register_sink(&mut self, connection_id: &str, sink_id: &str, local: bool) {
        if let Some(existing) = self
            .sinks
            .iter_mut()
            .find(|s| s.connection_id == connection_id)
        {
            existing.sink_id = sink_id.to_string();
            existing.local = local;
        } else {
            self.sinks.push(PipSink {
                connection_id: connection_id.to_string(),
                sink_id: sink_id.to_string(),
                local,
            });
        }
        if self.engaged && self.engaged_connection.as_deref() == Some(connection_id) {
            if let Err(e) = self.surface.set_source(sink_id) {
                warn!("could not move pip onto replacement sink: {e}");
            }
        }
    }

    /// Remove a participant's sink. If it was the engaged target, the window
    /// moves to the next target by priority, or exits when none remains.
    pub fn unregister_sink(&mut self, connection_id: &str) {
        self.sinks.retain(|s| s.connection_id != connection_id);
        if self.engaged && self.engaged_connection.as_deref() == Some(connection_id) {
            match self.resolve_target() {
                Some(next) => {
                    debug!("pip target gone, moving to {}", next.connection_id);
                    self.engaged_connection = Some(next.connection_id.clone());
                    if let Err(e) = self.surface.set_source(&next.sink_id) {
                        warn!("could not move pip to next target: {e}");
                        self.surface.exit();
                        self.disengage();
                    }
                }
                None => {
                    self.surface.exit();
                    self.disengage();
                }
            }
        }
    }

    /// Feed the current active speaker. In follow mode with PiP engaged this
    /// swaps the window's source in place.
    pub fn set_active_speaker(&mut self, connection_id: Option<String>) {
        self.active_speaker = connection_id;
        if !(self.engaged && self.follow_speaker) {
            return;
        }
        let Some(speaker) = self.active_speaker.clone() else {
            return;
        };
        if self.engaged_connection.as_deref() == Some(speaker.as_str()) {
            return;
        }
        let Some(sink) = self
            .sinks
            .iter()
            .find(|s| s.connection_id == speaker)
            .cloned()
        else {
            return;
        };
        if let Err(e) = self.surface.set_source(&sink.sink_id) {
            warn!("follow-speaker source swap failed: {e}");
            return;
        }
        self.engaged_connection = Some(sink.connection_id);
    }

    /// Enable or disable following the active speaker while engaged.
    pub fn set_follow_speaker(&mut self, follow: bool) {
        self.follow_speaker = follow;
        if follow && self.engaged {
            let speaker = self.active_speaker.clone();
            self.set_active_speaker(speaker);
        }
    }

    /// Engage PiP on the best available target, or exit when already
    /// engaged. Returns whether PiP is engaged afterwards.
    pub fn toggle(&mut self) -> Result<bool, PipError> {
        if self.engaged {
            self.surface.exit();
            self.disengage();
            return Ok(false);
        }
        let target = self.resolve_target().ok_or(PipError::NoTarget)?;
        self.surface.enter(&target.sink_id)?;
        self.engaged = true;
        self.engaged_connection = Some(target.connection_id);
        Ok(true)
    }

    /// The platform left PiP on its own (user closed the window). Clears
    /// the engaged flag and disengages follow mode.
    pub fn handle_native_exit(&mut self) {
        self.disengage();
    }

    /// Drop all sinks and leave PiP if engaged. Called on session teardown.
    pub fn clear(&mut self) {
        if self.engaged {
            self.surface.exit();
        }
        self.disengage();
        self.sinks.clear();
        self.active_speaker = None;
    }

    fn disengage(&mut self) {
        self.engaged = false;
        self.engaged_connection = None;
        self.follow_speaker = false;
    }

    fn resolve_target(&self) -> Option<PipSink> {
        if let Some(speaker) = &self.active_speaker {
            if let Some(sink) = self.sinks.iter().find(|s| &s.connection_id == speaker) {
                return Some(sink.clone());
            }
        }
        self.sinks
            .iter()
            .find(|s| !s.local)
            .or_else(|| self.sinks.iter().find(|s| s.local))
            .cloned()
    }
}
