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

//! Client-side core for patient-facing telehealth calls.
//!
//! This crate owns everything between the UI and the real-time provider:
//! device inventory and capture, the outbound publication, the call status
//! state machine, the remote participant registry, chat over signaling,
//! network quality and active speaker estimation, and picture-in-picture
//! coordination. The provider SDK itself sits behind the traits in
//! [`transport`], [`media`], [`scheduler`], and [`pip`]; a platform binding
//! implements those and the core never sees vendor types.
//!
//! The entry point is [`CallSession`]:
//!
//! ```ignore
//! let session = CallSession::new(backend, CallSessionOptions {
//!     display_name: patient_name,
//!     credentials,
//!     on_status_changed: Callback::from(move |status| render(status)),
//! });
//! session.join();
//! ```
//!
//! Everything is single-threaded and callback-driven; UI layers observe the
//! session through the status callback and [`event_bus::subscribe_session_events`].

pub mod chat;
pub mod constants;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod media;
pub mod peers;
pub mod pip;
pub mod quality;
pub mod scheduler;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::SessionError;
pub use events::SessionEvent;
pub use session::{CallSession, CallSessionOptions, SessionBackend};
pub use telecare_types::{
    Callback, CallStatus, ChatMessage, DeviceDescriptor, MediaKind, SessionCredentials,
    SignalQuality, StreamKind,
};
