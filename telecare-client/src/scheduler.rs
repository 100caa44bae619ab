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

//! Timer abstraction over the host event loop.
//!
//! The core is single-threaded and callback-driven; all polling (stats,
//! audio levels, typing expiry) and the error auto-dismiss run as timers on
//! the host loop. The session stores the returned handles and drops them on
//! teardown — a timer that outlives its session would fire against
//! destroyed state, which is a correctness bug, so cancellation is tied to
//! handle drop rather than to an explicit call the teardown path could
//! miss.

/// A scheduled timer. Dropping the handle cancels the timer.
pub trait TimerHandle {}

/// Host-provided timer scheduling.
///
/// Platform bindings supply the production implementation (browser timers,
/// an event-loop integration, ...); tests use the deterministic
/// `ManualScheduler` from the `testing` module.
pub trait Scheduler {
    /// Schedule `callback` every `period_ms` milliseconds until the handle
    /// is dropped.
    fn interval(&self, period_ms: u64, callback: Box<dyn FnMut()>) -> Box<dyn TimerHandle>;

    /// Schedule `callback` once, `delay_ms` milliseconds from now, unless
    /// the handle is dropped first.
    fn timeout(&self, delay_ms: u64, callback: Box<dyn FnOnce()>) -> Box<dyn TimerHandle>;

    /// Current wall-clock time in milliseconds. Routed through the
    /// scheduler so tests control the clock the same way they control
    /// timers.
    fn now_ms(&self) -> u64;
}
