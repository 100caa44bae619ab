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

/// Default signaling payload ceiling in bytes. Providers override this via
/// `TransportCapabilities`; 8,000 matches the reference integration.
pub const DEFAULT_SIGNAL_PAYLOAD_CEILING: usize = 8_000;

/// Longest edge an image attachment is resized to before transmission.
pub const MAX_ATTACHMENT_EDGE_PX: u32 = 400;

/// JPEG quality used when re-encoding image attachments.
pub const ATTACHMENT_JPEG_QUALITY: u8 = 70;

/// Transport statistics polling period.
pub const STATS_POLL_MS: u64 = 5_000;

/// Per-participant audio level sampling period.
pub const AUDIO_LEVEL_POLL_MS: u64 = 150;

/// Typing roster prune period while connected.
pub const TYPING_PRUNE_MS: u64 = 500;

/// A typing indicator expires this long after its last refresh.
pub const TYPING_EXPIRY_MS: u64 = 3_000;

/// Minimum gap between outbound typing indicator refreshes.
pub const TYPING_REFRESH_MS: u64 = 1_000;

/// Transient error banner auto-dismiss delay.
pub const ERROR_DISMISS_MS: u64 = 5_000;

/// Exponential moving average weight given to the previous audio level.
pub const SPEAKER_EMA_PREVIOUS: f32 = 0.7;

/// Exponential moving average weight given to the newest audio level.
pub const SPEAKER_EMA_CURRENT: f32 = 0.3;

/// Smoothed audio level below which nobody counts as speaking.
pub const SPEAKER_MIN_LEVEL: f32 = 0.05;

/// Minimum interval between active speaker changes.
pub const SPEAKER_CHANGE_THROTTLE_MS: u64 = 1_000;

// Network quality thresholds (see quality::classify).
pub const RTT_EXCELLENT_MS: f64 = 100.0;
pub const RTT_GOOD_MS: f64 = 200.0;
pub const RTT_FAIR_MS: f64 = 400.0;
pub const PACKET_LOSS_POOR_PCT: f64 = 5.0;
pub const PACKET_LOSS_GOOD_PCT: f64 = 2.0;
pub const JITTER_HIGH_MS: f64 = 50.0;
