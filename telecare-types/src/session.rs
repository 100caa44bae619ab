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

use serde::{Deserialize, Serialize};

/// Lifecycle of one call session instance.
///
/// A session in `Ended` or `Error` holds no resources and may be joined
/// again. "Is the call usable" is exactly `status == Connected`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Idle,
    Loading,
    Connected,
    Reconnecting,
    Ended,
    Error,
}

/// Distinguishes a peer's main camera feed from auxiliary streams such as
/// screen shares. Part of the registry's dedup key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Camera,
    Screen,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StreamKind::Camera => write!(f, "camera"),
            StreamKind::Screen => write!(f, "screen"),
        }
    }
}

/// Four-level connection quality classification consumed uniformly by UI,
/// regardless of which transport metric drove the degradation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SignalQuality {
    /// One tier worse, saturating at `Poor`.
    pub fn downgraded(self) -> Self {
        match self {
            SignalQuality::Excellent => SignalQuality::Good,
            SignalQuality::Good => SignalQuality::Fair,
            SignalQuality::Fair | SignalQuality::Poor => SignalQuality::Poor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downgrade_saturates_at_poor() {
        assert_eq!(SignalQuality::Excellent.downgraded(), SignalQuality::Good);
        assert_eq!(SignalQuality::Good.downgraded(), SignalQuality::Fair);
        assert_eq!(SignalQuality::Fair.downgraded(), SignalQuality::Poor);
        assert_eq!(SignalQuality::Poor.downgraded(), SignalQuality::Poor);
    }
}
