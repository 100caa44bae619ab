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

//! Global broadcast bus for [`SessionEvent`]s.
//!
//! MPMC: any component may emit, any number of UI layers may subscribe.
//! Emission never blocks; when the channel is full the oldest event is
//! dropped in favor of the newest.

use crate::events::SessionEvent;
use async_broadcast::{broadcast, Receiver, Sender};
use once_cell::sync::Lazy;

const EVENT_BUS_CAPACITY: usize = 256;

static SENDER: Lazy<Sender<SessionEvent>> = Lazy::new(|| {
    let (mut s, r) = broadcast(EVENT_BUS_CAPACITY);
    s.set_overflow(true);
    // Without subscribers the channel would otherwise report closed.
    std::mem::forget(r);
    s
});

/// Subscribe to session events. Each subscriber independently receives all
/// future events.
pub fn subscribe_session_events() -> Receiver<SessionEvent> {
    SENDER.new_receiver()
}

/// Emit an event to all subscribers. Non-blocking.
pub fn emit_session_event(event: SessionEvent) {
    let _ = SENDER.try_broadcast(event);
}
