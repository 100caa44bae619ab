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

use std::cell::RefCell;
use std::rc::Rc;
use telecare_client::testing::{
    ManualScheduler, MockMediaProvider, MockPipSurface, MockTransport,
};
use telecare_client::transport::TransportEvent;
use telecare_client::{
    Callback, CallSession, CallSessionOptions, CallStatus, SessionBackend, SessionCredentials,
    StreamKind,
};

/// base64url(`{"alg":"HS256"}`) . base64url(`{"session":"abc"}`) . signature
pub const VALID_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJzZXNzaW9uIjoiYWJjIn0.sig";

pub struct Harness {
    pub session: CallSession,
    pub transport: MockTransport,
    pub provider: MockMediaProvider,
    pub scheduler: ManualScheduler,
    pub pip: MockPipSurface,
    pub statuses: Rc<RefCell<Vec<CallStatus>>>,
}

pub fn harness() -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
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
            pip: Rc::new(pip.clone()),
        },
        CallSessionOptions {
            display_name: "Sam".to_string(),
            credentials: SessionCredentials::new("session-1", VALID_TOKEN, "app-1"),
            on_status_changed: Callback::from(move |status| sink.borrow_mut().push(status)),
        },
    );
    Harness {
        session,
        transport,
        provider,
        scheduler,
        pip,
        statuses,
    }
}

/// Join and drive the transport to `Connected`.
pub fn connect(h: &Harness) {
    h.session.join();
    h.transport.fire(TransportEvent::Connected {
        connection_id: "conn-self".to_string(),
    });
    assert_eq!(h.session.status(), CallStatus::Connected);
}

/// Announce a remote camera stream.
pub fn remote_camera(h: &Harness, connection_id: &str, stream_id: &str) {
    h.transport.fire(TransportEvent::StreamCreated {
        connection_id: connection_id.to_string(),
        stream_id: stream_id.to_string(),
        kind: StreamKind::Camera,
        has_audio: true,
        has_video: true,
    });
}
