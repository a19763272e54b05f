//! Exponential backoff with jitter for provider bootstrap/refresh retries
//! (§4.1). Pulled out as a pure function so it's testable without a task.

use rand::Rng;
use std::time::Duration;

const BASE: Duration = Duration::from_secs(1);
const CAP: Duration = Duration::from_secs(60);
const JITTER_FRACTION: f64 = 0.20;

/// Delay before retry attempt `attempt` (0-indexed: the delay before the
/// *first* retry, after the first failure, is `attempt = 0`).
///
/// `base * 2^attempt`, capped at `CAP`, then jittered by ±`JITTER_FRACTION`.
pub fn retry_delay(attempt: u32) -> Duration {
    retry_delay_with_rng(attempt, &mut rand::thread_rng())
}

fn retry_delay_with_rng(attempt: u32, rng: &mut impl Rng) -> Duration {
    let exp = attempt.min(6); // 2^6 * 1s == 64s, already past the 60s cap
    let unjittered = BASE.saturating_mul(1u32 << exp).min(CAP);
    let jitter_range = unjittered.as_secs_f64() * JITTER_FRACTION;
    let delta = rng.gen_range(-jitter_range..=jitter_range);
    let jittered = (unjittered.as_secs_f64() + delta).max(0.0);
    Duration::from_secs_f64(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_then_caps() {
        let d0 = retry_delay(0).as_secs_f64();
        let d1 = retry_delay(1).as_secs_f64();
        // within jitter bounds, d1's midpoint (2s) should exceed d0's (1s)
        assert!(d0 < 1.3 && d0 > 0.7);
        assert!(d1 < 2.6 && d1 > 1.4);
    }

    #[test]
    fn delay_never_exceeds_cap_plus_jitter() {
        for attempt in 0..20 {
            let d = retry_delay(attempt);
            assert!(d.as_secs_f64() <= CAP.as_secs_f64() * (1.0 + JITTER_FRACTION) + 0.01);
        }
    }

    #[test]
    fn delay_is_never_negative() {
        for attempt in 0..20 {
            assert!(retry_delay(attempt).as_secs_f64() >= 0.0);
        }
    }
}
