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

//! Lossy image recompression for chat attachments.
//!
//! Signaling payloads are tiny, so deliverability wins over fidelity:
//! images are scaled down to a bounded edge and re-encoded as JPEG at a
//! fixed quality before they are measured against the payload ceiling.

use crate::constants::{ATTACHMENT_JPEG_QUALITY, MAX_ATTACHMENT_EDGE_PX};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use log::debug;

/// MIME type every recompressed attachment ends up with.
pub const RECOMPRESSED_MIME: &str = "image/jpeg";

/// Decode, bound the longer edge to [`MAX_ATTACHMENT_EDGE_PX`], and
/// re-encode as JPEG. Alpha is flattened since JPEG carries none. Returns
/// the reason text on undecodable input.
pub fn recompress(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let decoded = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let (width, height) = decoded.dimensions();

    let resized = if width.max(height) > MAX_ATTACHMENT_EDGE_PX {
        decoded.resize(
            MAX_ATTACHMENT_EDGE_PX,
            MAX_ATTACHMENT_EDGE_PX,
            FilterType::Triangle,
        )
    } else {
        decoded
    };

    let rgb = resized.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, ATTACHMENT_JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| e.to_string())?;
    debug!(
        "recompressed attachment: {}x{} -> {}x{}, {} -> {} bytes",
        width,
        height,
        rgb.width(),
        rgb.height(),
        bytes.len(),
        out.len()
    );
    Ok(out)
}
