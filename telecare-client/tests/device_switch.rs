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
use telecare_client::error::{MediaError, SessionError, SourceSwapError};
use telecare_client::{DeviceDescriptor, MediaKind};

fn camera(id: &str) -> DeviceDescriptor {
    DeviceDescriptor::new(id, id, MediaKind::Video)
}

#[test]
fn switch_swaps_in_place_when_the_provider_supports_it() {
    let h = harness();
    h.provider
        .set_devices(vec![camera("cam-a"), camera("cam-b")]);
    connect(&h);

    h.session.switch_device(MediaKind::Video, "cam-b").unwrap();
    let publications = h.transport.publications();
    assert_eq!(publications.len(), 1);
    assert_eq!(
        publications[0].swaps(),
        vec![(MediaKind::Video, "cam-b".to_string())]
    );
    assert_eq!(
        h.session.selected_device(MediaKind::Video).as_deref(),
        Some("cam-b")
    );
}

#[test]
fn switch_falls_back_to_republishing_when_swap_is_unsupported() {
    let h = harness();
    h.provider
        .set_devices(vec![camera("cam-a"), camera("cam-b")]);
    h.transport.set_swap_supported(false);
    connect(&h);

    h.session.switch_device(MediaKind::Video, "cam-b").unwrap();

    // exactly one live publication, bound to the new camera
    let publications = h.transport.publications();
    assert_eq!(publications.len(), 2);
    assert!(publications[0].is_unpublished());
    assert!(!publications[1].is_unpublished());
    assert_eq!(
        publications[1].request().video_device.as_deref(),
        Some("cam-b")
    );
    // the replaced local stream was stopped, not leaked
    let streams = h.provider.acquired_streams();
    assert_eq!(streams.len(), 2);
    assert!(streams[0].is_stopped());
    assert!(!streams[1].is_stopped());
}

#[test]
fn mute_state_survives_a_republishing_switch() {
    let h = harness();
    h.provider
        .set_devices(vec![camera("cam-a"), camera("cam-b")]);
    h.transport.set_swap_supported(false);
    connect(&h);

    assert!(!h.session.toggle_audio());
    h.session.switch_device(MediaKind::Video, "cam-b").unwrap();

    assert!(!h.session.audio_enabled());
    let publications = h.transport.publications();
    assert!(!publications[1].audio_enabled());
}

#[test]
fn failed_fallback_restores_the_previous_device() {
    let h = harness();
    h.provider
        .set_devices(vec![camera("cam-a"), camera("cam-b")]);
    h.transport
        .fail_swaps(SourceSwapError::Failed("renegotiation needed".to_string()));
    connect(&h);
    h.session.switch_device(MediaKind::Video, "cam-a").unwrap_or(());

    h.provider.fail_next_acquire(MediaError::DeviceBusy);
    let result = h.session.switch_device(MediaKind::Video, "cam-b");
    assert!(matches!(
        result,
        Err(SessionError::Media(MediaError::DeviceBusy))
    ));
    // the failure is user-visible but the call survives on the old camera
    assert!(h.session.current_error().is_some());
    assert!(h.session.is_connected());
    let live: Vec<_> = h
        .transport
        .publications()
        .into_iter()
        .filter(|p| !p.is_unpublished())
        .collect();
    assert_eq!(live.len(), 1);
}

#[test]
fn chat_keeps_working_across_a_republishing_switch() {
    let h = harness();
    h.provider
        .set_devices(vec![camera("cam-a"), camera("cam-b")]);
    h.transport.set_swap_supported(false);
    connect(&h);
    h.session.send_chat("before switch").unwrap();

    h.session.switch_device(MediaKind::Video, "cam-b").unwrap();
    h.session.send_chat("after switch").unwrap();

    // chat rides signaling, not the publication; the switch loses nothing
    assert_eq!(h.session.chat_history().len(), 2);
    let chats = h
        .transport
        .sent_signals()
        .iter()
        .filter(|(kind, _)| kind == "chat")
        .count();
    assert_eq!(chats, 2);
}

#[test]
fn engaged_pip_on_the_local_tile_follows_a_republish() {
    let h = harness();
    h.provider
        .set_devices(vec![camera("cam-a"), camera("cam-b")]);
    h.transport.set_swap_supported(false);
    connect(&h);
    assert!(h.session.toggle_pip().unwrap());
    assert_eq!(h.pip.current_sink().as_deref(), Some("pub-1"));

    h.session.switch_device(MediaKind::Video, "cam-b").unwrap();
    // the destroyed stream's PiP binding re-resolved to the replacement
    assert!(h.session.is_pip_engaged());
    assert_eq!(h.pip.current_sink().as_deref(), Some("pub-2"));
}

#[test]
fn cycling_devices_walks_the_inventory_round_robin() {
    let h = harness();
    h.provider.set_devices(vec![
        camera("cam-a"),
        camera("cam-b"),
        camera("cam-c"),
    ]);
    connect(&h);

    assert_eq!(
        h.session.cycle_device(MediaKind::Video).unwrap().as_deref(),
        Some("cam-b")
    );
    assert_eq!(
        h.session.cycle_device(MediaKind::Video).unwrap().as_deref(),
        Some("cam-c")
    );
    assert_eq!(
        h.session.cycle_device(MediaKind::Video).unwrap().as_deref(),
        Some("cam-a")
    );
}

#[test]
fn cycling_with_no_devices_is_a_clean_no_op() {
    let h = harness();
    connect(&h);
    assert_eq!(h.session.cycle_device(MediaKind::Video).unwrap(), None);
}
