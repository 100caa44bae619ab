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

//! Network quality classification and active speaker detection.

mod speaker_tracker;

pub use speaker_tracker::{rms, SpeakerTracker};

use crate::constants::{
    JITTER_HIGH_MS, PACKET_LOSS_GOOD_PCT, PACKET_LOSS_POOR_PCT, RTT_EXCELLENT_MS, RTT_FAIR_MS,
    RTT_GOOD_MS,
};
use crate::transport::TransportStats;
use telecare_types::SignalQuality;

/// Collapse transport statistics into the 4-level quality indicator.
///
/// Packet loss above 5% is poor no matter what. Otherwise RTT picks the
/// tier, loss above 2% caps it below excellent, and high jitter knocks the
/// result down one further tier. The UI consumes the single enum without
/// knowing which metric drove a degradation.
pub fn classify(stats: &TransportStats) -> SignalQuality {
    if stats.packet_loss_pct > PACKET_LOSS_POOR_PCT {
        return SignalQuality::Poor;
    }

    let mut quality = if stats.round_trip_ms < RTT_EXCELLENT_MS {
        SignalQuality::Excellent
    } else if stats.round_trip_ms < RTT_GOOD_MS {
        SignalQuality::Good
    } else if stats.round_trip_ms < RTT_FAIR_MS {
        SignalQuality::Fair
    } else {
        SignalQuality::Poor
    };

    if quality == SignalQuality::Excellent && stats.packet_loss_pct > PACKET_LOSS_GOOD_PCT {
        quality = SignalQuality::Good;
    }
    if stats.jitter_ms > JITTER_HIGH_MS {
        quality = quality.downgraded();
    }
    quality
}
