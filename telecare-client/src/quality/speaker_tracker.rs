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

//! Active speaker detection over smoothed per-participant audio levels.
//!
//! Raw levels flicker; an exponential moving average (0.7 previous, 0.3
//! new) steadies them, a minimum threshold keeps background noise from
//! electing a speaker, and changes are throttled to one per second so two
//! people at similar levels do not make the UI thrash.

use crate::constants::{
    SPEAKER_CHANGE_THROTTLE_MS, SPEAKER_EMA_CURRENT, SPEAKER_EMA_PREVIOUS, SPEAKER_MIN_LEVEL,
};
use log::debug;
use std::collections::HashMap;

/// Root mean square of a raw sample buffer, for integrations that analyze
/// audio themselves instead of getting levels from the transport.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

#[derive(Default)]
pub struct SpeakerTracker {
    smoothed: HashMap<String, f32>,
    current: Option<String>,
    last_change_ms: Option<u64>,
}

impl SpeakerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently elected speaker, if any.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Feed one poll of `(connection_id, level)` pairs. Participants absent
    /// from the poll decay as if they reported silence. Returns the new
    /// speaker when the election changed, `None` otherwise.
    pub fn sample(
        &mut self,
        levels: &[(String, f32)],
        now_ms: u64,
    ) -> Option<Option<String>> {
        let polled: HashMap<&str, f32> = levels
            .iter()
            .map(|(id, level)| (id.as_str(), *level))
            .collect();

        for (id, level) in &polled {
            let entry = self.smoothed.entry(id.to_string()).or_insert(0.0);
            *entry = SPEAKER_EMA_PREVIOUS * *entry + SPEAKER_EMA_CURRENT * level;
        }
        for (id, level) in self.smoothed.iter_mut() {
            if !polled.contains_key(id.as_str()) {
                *level *= SPEAKER_EMA_PREVIOUS;
            }
        }

        let candidate = self
            .smoothed
            .iter()
            .filter(|(_, level)| **level > SPEAKER_MIN_LEVEL)
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(id, _)| id.clone());

        if candidate == self.current {
            return None;
        }
        if let Some(last) = self.last_change_ms {
            if now_ms.saturating_sub(last) < SPEAKER_CHANGE_THROTTLE_MS {
                return None;
            }
        }
        debug!("active speaker: {:?} -> {:?}", self.current, candidate);
        self.current = candidate.clone();
        self.last_change_ms = Some(now_ms);
        Some(candidate)
    }

    /// Forget a departed participant. Returns `Some(None)` when they were
    /// the elected speaker, which is a change the caller must surface.
    pub fn remove(&mut self, connection_id: &str) -> Option<Option<String>> {
        self.smoothed.remove(connection_id);
        if self.current.as_deref() == Some(connection_id) {
            self.current = None;
            return Some(None);
        }
        None
    }

    pub fn clear(&mut self) {
        self.smoothed.clear();
        self.current = None;
        self.last_change_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(id: &str, value: f32) -> (String, f32) {
        (id.to_string(), value)
    }

    #[test]
    fn rms_of_buffer() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(rms(&[0.5, 0.5, 0.5]), 0.5);
        let value = rms(&[0.0, 1.0]);
        assert!((value - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn loudest_above_threshold_wins() {
        let mut tracker = SpeakerTracker::new();
        let change = tracker.sample(&[level("a", 0.8), level("b", 0.4)], 0);
        assert_eq!(change, Some(Some("a".to_string())));
        assert_eq!(tracker.current(), Some("a"));
    }

    #[test]
    fn levels_below_threshold_elect_nobody() {
        let mut tracker = SpeakerTracker::new();
        // one poll of 0.1 smooths to 0.03, under the 0.05 floor
        assert_eq!(tracker.sample(&[level("a", 0.1)], 0), None);
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn smoothing_resists_single_poll_spikes() {
        let mut tracker = SpeakerTracker::new();
        for t in 0..10 {
            tracker.sample(&[level("a", 0.8), level("b", 0.0)], t * 150);
        }
        assert_eq!(tracker.current(), Some("a"));
        // one loud poll from b cannot immediately overtake a's average
        let change = tracker.sample(&[level("a", 0.8), level("b", 1.0)], 2_000);
        assert_eq!(change, None);
        assert_eq!(tracker.current(), Some("a"));
    }

    #[test]
    fn changes_are_throttled_to_one_per_second() {
        let mut tracker = SpeakerTracker::new();
        tracker.sample(&[level("a", 1.0)], 0);
        assert_eq!(tracker.current(), Some("a"));

        // b overtakes quickly, but within the throttle window
        for t in 1..=5 {
            tracker.sample(&[level("a", 0.0), level("b", 1.0)], t * 150);
        }
        assert_eq!(tracker.current(), Some("a"));

        // past the window the election flips
        let change = tracker.sample(&[level("a", 0.0), level("b", 1.0)], 1_200);
        assert_eq!(change, Some(Some("b".to_string())));
    }

    #[test]
    fn silence_clears_the_speaker_after_the_throttle() {
        let mut tracker = SpeakerTracker::new();
        tracker.sample(&[level("a", 1.0)], 0);
        // decay to silence; the change to "nobody" obeys the same throttle
        assert_eq!(tracker.sample(&[level("a", 0.0)], 500), None);
        let mut change = None;
        for t in 0..20 {
            if let Some(c) = tracker.sample(&[level("a", 0.0)], 1_000 + t * 150) {
                change = Some(c);
                break;
            }
        }
        assert_eq!(change, Some(None));
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn removing_the_speaker_reports_a_change() {
        let mut tracker = SpeakerTracker::new();
        tracker.sample(&[level("a", 1.0)], 0);
        assert_eq!(tracker.remove("a"), Some(None));
        assert_eq!(tracker.remove("a"), None);
    }
}
