//! Typing Cadence
//!
//! Derives the per-character reveal delay for streamed chunks so text
//! appears to be typed live instead of jumping in whole fragments.
//!
//! The delay adapts to how fast chunks arrive: a chunk that took long to
//! arrive is revealed slowly to bridge the gap to the next one, a burst
//! of chunks is revealed quickly. Both directions are bounded, so the
//! pacing only ever affects timing - never content or order.

use std::time::{Duration, Instant};

/// Pacing bounds for the typing animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TypingConfig {
    /// Lower bound on the per-character delay.
    pub min_delay: Duration,
    /// Upper bound on the per-character delay.
    pub max_delay: Duration,
    /// Fraction of the inter-chunk gap spread over the chunk's
    /// characters.
    pub scale: f64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(2),
            max_delay: Duration::from_millis(8),
            scale: 0.3,
        }
    }
}

impl TypingConfig {
    /// A configuration with no delays, for tests and headless use.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            scale: 0.0,
        }
    }
}

/// Assumed gap before the first chunk of a stream, when there is no
/// previous arrival to measure against.
const FIRST_CHUNK_GAP: Duration = Duration::from_millis(100);

/// Computes per-character delays from chunk arrival cadence.
///
/// One pacer lives per stream session; it carries the previous chunk's
/// arrival timestamp between calls. Zero-length chunks must be skipped
/// by the caller - they are a no-op and do not advance the arrival
/// clock.
#[derive(Debug)]
pub struct TypingPacer {
    config: TypingConfig,
    last_arrival: Option<Instant>,
}

impl TypingPacer {
    /// Create a pacer with the given bounds.
    #[must_use]
    pub fn new(config: TypingConfig) -> Self {
        Self {
            config,
            last_arrival: None,
        }
    }

    /// Per-character delay for a chunk of `chars` characters arriving
    /// at `now`.
    ///
    /// `clamp(min_delay, max_delay, elapsed / chars * scale)` where
    /// `elapsed` is the time since the previous chunk arrived.
    pub fn delay_for(&mut self, chars: usize, now: Instant) -> Duration {
        debug_assert!(chars > 0, "zero-length chunks must be skipped upstream");

        let elapsed = match self.last_arrival {
            Some(prev) => now.saturating_duration_since(prev),
            None => FIRST_CHUNK_GAP,
        };
        self.last_arrival = Some(now);

        let per_char = elapsed.as_secs_f64() / chars.max(1) as f64 * self.config.scale;
        Duration::from_secs_f64(per_char).clamp(self.config.min_delay, self.config.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_chunk_uses_assumed_gap() {
        let mut pacer = TypingPacer::new(TypingConfig::default());
        // 100ms assumed gap over 10 chars * 0.3 = 3ms per character.
        let delay = pacer.delay_for(10, Instant::now());
        assert!(delay >= Duration::from_micros(2900));
        assert!(delay <= Duration::from_micros(3100));
    }

    #[test]
    fn test_fast_arrival_clamps_to_min() {
        let mut pacer = TypingPacer::new(TypingConfig::default());
        let t0 = Instant::now();
        pacer.delay_for(5, t0);

        // Next chunk arrives 1ms later: 1ms / 100 * 0.3 is far below
        // the minimum.
        let delay = pacer.delay_for(100, t0 + Duration::from_millis(1));
        assert_eq!(delay, Duration::from_millis(2));
    }

    #[test]
    fn test_slow_arrival_clamps_to_max() {
        let mut pacer = TypingPacer::new(TypingConfig::default());
        let t0 = Instant::now();
        pacer.delay_for(5, t0);

        // Two seconds for a 3-character chunk would be 200ms per
        // character unclamped.
        let delay = pacer.delay_for(3, t0 + Duration::from_secs(2));
        assert_eq!(delay, Duration::from_millis(8));
    }

    #[test]
    fn test_mid_range_delay_scales_with_gap() {
        let mut pacer = TypingPacer::new(TypingConfig::default());
        let t0 = Instant::now();
        pacer.delay_for(5, t0);

        // 1s gap over 100 chars * 0.3 = 3ms.
        let delay = pacer.delay_for(100, t0 + Duration::from_secs(1));
        assert!(delay >= Duration::from_micros(2900));
        assert!(delay <= Duration::from_micros(3100));
    }

    #[test]
    fn test_instant_config_never_delays() {
        let mut pacer = TypingPacer::new(TypingConfig::instant());
        let t0 = Instant::now();
        assert_eq!(pacer.delay_for(10, t0), Duration::ZERO);
        assert_eq!(pacer.delay_for(1, t0 + Duration::from_secs(5)), Duration::ZERO);
    }

    #[test]
    fn test_non_monotonic_clock_is_safe() {
        let mut pacer = TypingPacer::new(TypingConfig::default());
        let t0 = Instant::now();
        pacer.delay_for(5, t0 + Duration::from_secs(1));

        // An arrival "before" the previous one reads as a zero gap and
        // clamps to the minimum.
        let delay = pacer.delay_for(5, t0);
        assert_eq!(delay, Duration::from_millis(2));
    }
}
