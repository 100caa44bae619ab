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

mod common;

use common::{connect, harness};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use telecare_client::error::{ChatError, SessionError};
use telecare_client::transport::{TransportCapabilities, TransportEvent};

#[test]
fn chat_requires_an_active_call() {
    let h = harness();
    assert!(matches!(
        h.session.send_chat("too early"),
        Err(SessionError::NotActive)
    ));
}

#[test]
fn own_message_appears_in_history_without_a_network_round_trip() {
    let h = harness();
    connect(&h);
    let sent = h.session.send_chat("be right there").unwrap();
    assert!(sent.is_own);

    let history = h.session.chat_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "be right there");
    // exactly one signal went out; our own copy never came back through it
    assert_eq!(h.transport.sent_signals().len(), 1);
}

#[test]
fn inbound_json_and_legacy_formats_both_land_in_history() {
    let h = harness();
    connect(&h);

    h.transport.fire(TransportEvent::SignalReceived {
        from_connection_id: "conn-a".to_string(),
        kind: "chat".to_string(),
        payload: r#"{"author":"Ada","content":"hi","type":"text","timestamp":42}"#.to_string(),
    });
    h.transport.fire(TransportEvent::SignalReceived {
        from_connection_id: "conn-b".to_string(),
        kind: "chat".to_string(),
        payload: "Grace: still on the old app".to_string(),
    });

    let history = h.session.chat_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].author, "Ada");
    assert_eq!(history[1].author, "Grace");
    assert_eq!(history[1].content, "still on the old app");
    assert!(history.iter().all(|m| !m.is_own));
}

#[test]
fn own_signal_echoed_by_the_transport_is_dropped() {
    let h = harness();
    connect(&h);
    h.session.send_chat("hello").unwrap();

    // the transport loops our signal back at us
    let (_, payload) = h.transport.sent_signals()[0].clone();
    h.transport.fire(TransportEvent::SignalReceived {
        from_connection_id: "conn-self".to_string(),
        kind: "chat".to_string(),
        payload,
    });
    assert_eq!(h.session.chat_history().len(), 1);
}

#[test]
fn oversize_message_is_rejected_against_the_provider_ceiling() {
    let h = harness();
    h.transport.set_capabilities(TransportCapabilities {
        signal_payload_ceiling: 300,
    });
    connect(&h);

    let result = h.session.send_chat(&"x".repeat(400));
    let Err(SessionError::Chat(ChatError::PayloadTooLarge {
        encoded_size,
        ceiling,
        ..
    })) = result
    else {
        panic!("expected payload rejection");
    };
    assert_eq!(ceiling, 300);
    assert!(encoded_size > 300);
    assert!(h.transport.sent_signals().is_empty());
    assert!(h.session.chat_history().is_empty());
    // the rejection is surfaced as a user-facing banner too
    assert!(h.session.current_error().unwrap().contains("too large"));
}

#[test]
fn large_photo_is_recompressed_under_the_default_ceiling() {
    let h = harness();
    connect(&h);

    // a 1920x1080 photo-ish PNG, far over 8,000 bytes as-is
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(1920, 1080, |x, y| {
        image::Rgb([(x / 8 % 256) as u8, (y / 8 % 256) as u8, 96])
    }));
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    assert!(png.len() > 8_000);

    let message = h
        .session
        .send_chat_attachment("visit-photo.png", "image/png", &png)
        .unwrap();
    let attachment = message.attachment.unwrap();
    assert_eq!(attachment.mime_type, "image/jpeg");

    let (_, payload) = &h.transport.sent_signals()[0];
    assert!(payload.len() <= 8_000, "payload was {} bytes", payload.len());
}

#[test]
fn non_image_files_are_not_recompressed() {
    let h = harness();
    connect(&h);
    let message = h
        .session
        .send_chat_attachment("notes.txt", "text/plain", b"take meds at 9")
        .unwrap();
    let attachment = message.attachment.unwrap();
    assert_eq!(attachment.mime_type, "text/plain");
    assert!(attachment.url.starts_with("data:text/plain;base64,"));
}

#[test]
fn typing_indicator_expires_without_a_stop_signal() {
    let h = harness();
    connect(&h);

    h.transport.fire(TransportEvent::SignalReceived {
        from_connection_id: "conn-a".to_string(),
        kind: "typing".to_string(),
        payload: r#"{"id":"conn-a","name":"Ada"}"#.to_string(),
    });
    assert_eq!(h.session.typing_names(), vec!["Ada".to_string()]);

    // refreshed at 2s: still typing at 4.5s (expiry counts from the refresh)
    h.scheduler.advance(2_000);
    h.transport.fire(TransportEvent::SignalReceived {
        from_connection_id: "conn-a".to_string(),
        kind: "typing".to_string(),
        payload: r#"{"id":"conn-a","name":"Ada"}"#.to_string(),
    });
    h.scheduler.advance(2_500);
    assert_eq!(h.session.typing_names(), vec!["Ada".to_string()]);

    // 3s past the last refresh the prune timer clears it, no signal needed
    h.scheduler.advance(1_000);
    assert!(h.session.typing_names().is_empty());
}

#[test]
fn outbound_typing_refreshes_are_throttled() {
    let h = harness();
    connect(&h);
    h.session.notify_typing();
    h.session.notify_typing();
    h.scheduler.advance(500);
    h.session.notify_typing();
    let typing_signals = h
        .transport
        .sent_signals()
        .iter()
        .filter(|(kind, _)| kind == "typing")
        .count();
    assert_eq!(typing_signals, 1);

    h.scheduler.advance(500);
    h.session.notify_typing();
    let typing_signals = h
        .transport
        .sent_signals()
        .iter()
        .filter(|(kind, _)| kind == "typing")
        .count();
    assert_eq!(typing_signals, 2);
}
