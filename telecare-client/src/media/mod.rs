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

//! Local media: device enumeration, capture, and the outbound publication.

mod device_inventory;
mod publish_controller;

pub use device_inventory::DeviceInventory;
pub use publish_controller::{PublishController, SwitchOutcome};

use crate::error::MediaError;
use telecare_types::DeviceDescriptor;

/// Platform capture surface (getUserMedia-equivalent), implemented by the
/// platform binding.
pub trait MediaProvider {
    /// List available input hardware. Enumeration being denied or
    /// unsupported yields an empty list, never an error: "no devices" is a
    /// displayable state, not a fault.
    fn enumerate_devices(&self) -> Vec<DeviceDescriptor>;

    /// Acquire a local audio+video stream from the given devices (`None`
    /// selects the platform default). Triggers the platform permission
    /// prompt on first use; the implementation maps the platform's denied /
    /// not-found / in-use signals onto the three [`MediaError`] kinds.
    fn acquire(
        &self,
        audio_device: Option<&str>,
        video_device: Option<&str>,
    ) -> Result<Box<dyn LocalMedia>, MediaError>;
}

/// An acquired local stream. Owned exclusively by the publish controller.
pub trait LocalMedia {
    fn stream_id(&self) -> String;
    fn set_audio_enabled(&self, enabled: bool);
    fn set_video_enabled(&self, enabled: bool);
    /// Stop all tracks and release the hardware. Safe to call twice.
    fn stop(&self);
}
