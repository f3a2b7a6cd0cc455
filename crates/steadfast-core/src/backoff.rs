//! Exponential backoff with additive jitter.
//!
//! ```text
//! delay = min(base_delay * exponential_base^attempt + uniform[0, jitter_max], max_delay)
//! ```
//!
//! Delays are computed in whole milliseconds. The ceiling is applied after
//! the jitter is added, so the result never exceeds `max_delay`.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Delay before retrying after `attempt` (0-based, the attempt that just failed).
///
/// Draws jitter from the thread-local RNG.
pub fn backoff_delay(attempt: u32, config: &RetryConfig) -> Duration {
    backoff_delay_with(attempt, config, &mut rand::thread_rng())
}

/// Same as [`backoff_delay`] but draws jitter from the supplied RNG.
pub fn backoff_delay_with<R: Rng>(
    attempt: u32,
    config: &RetryConfig,
    rng: &mut R,
) -> Duration {
    let max_ms = millis(config.max_delay);
    let jitter_ms = millis(config.jitter_max);
    let jitter = if jitter_ms > 0 {
        rng.gen_range(0..=jitter_ms)
    } else {
        0
    };

    let delay = exponential_ms(attempt, config, max_ms)
        .saturating_add(jitter)
        .min(max_ms);
    Duration::from_millis(delay)
}

/// Jitter-free delays for every retry the config allows.
///
/// Element `i` is the delay applied after attempt `i` fails.
pub fn backoff_schedule(config: &RetryConfig) -> Vec<Duration> {
    let max_ms = millis(config.max_delay);
    (0..config.max_retries)
        .map(|attempt| Duration::from_millis(exponential_ms(attempt, config, max_ms)))
        .collect()
}

/// The exponential term, saturated at `max_ms`.
fn exponential_ms(attempt: u32, config: &RetryConfig, max_ms: u64) -> u64 {
    let base_ms = millis(config.base_delay) as f64;
    // 0 * inf is NaN
    if base_ms == 0.0 {
        return 0;
    }
    let factor = config.exponential_base.max(1.0).powf(attempt as f64);
    let raw = base_ms * factor;

    if !raw.is_finite() || raw >= max_ms as f64 {
        max_ms
    } else {
        raw as u64
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(base: u64, max: u64, factor: f64, jitter: u64) -> RetryConfig {
        RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_millis(base),
            max_delay: Duration::from_millis(max),
            exponential_base: factor,
            jitter_max: Duration::from_millis(jitter),
        }
    }

    #[test]
    fn test_no_jitter_is_deterministic() {
        let config = config(100, 1000, 2.0, 0);
        let mut rng = StepRng::new(0, 1);

        assert_eq!(backoff_delay_with(0, &config, &mut rng), Duration::from_millis(100));
        assert_eq!(backoff_delay_with(1, &config, &mut rng), Duration::from_millis(200));
        assert_eq!(backoff_delay_with(2, &config, &mut rng), Duration::from_millis(400));
        assert_eq!(backoff_delay_with(3, &config, &mut rng), Duration::from_millis(800));
        assert_eq!(backoff_delay_with(4, &config, &mut rng), Duration::from_millis(1000));
    }

    #[test]
    fn test_clamp_applies_after_jitter() {
        // 800ms exponential term plus up to 500ms jitter must still respect the ceiling
        let config = config(100, 1000, 2.0, 500);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let delay = backoff_delay_with(3, &config, &mut rng);
            assert!(delay >= Duration::from_millis(800));
            assert!(delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let config = config(100, 10_000, 2.0, 50);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let delay = backoff_delay_with(1, &config, &mut rng);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(250));
        }
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let config = config(1000, 10_000, 2.0, 100);
        assert_eq!(backoff_delay(u32::MAX, &config), Duration::from_millis(10_000));
    }

    #[test]
    fn test_zero_base_stays_zero() {
        let mut rng = StepRng::new(0, 0);

        let huge_factor = config(0, 1000, 1e300, 0);
        for attempt in [0, 1, 2, 10, u32::MAX] {
            assert_eq!(backoff_delay_with(attempt, &huge_factor, &mut rng), Duration::ZERO);
        }

        let doubling = config(0, 1000, 2.0, 0);
        assert_eq!(backoff_delay_with(1100, &doubling, &mut rng), Duration::ZERO);
        assert!(backoff_schedule(&doubling).iter().all(|d| d.is_zero()));

        // Jitter alone still applies on top of a zero base
        let jittered = config(0, 1000, 1e300, 40);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert!(backoff_delay_with(5, &jittered, &mut rng) <= Duration::from_millis(40));
        }
    }

    #[test]
    fn test_default_config_first_retry() {
        let delay = backoff_delay(0, &RetryConfig::default());
        assert!(delay >= Duration::from_millis(1000));
        assert!(delay <= Duration::from_millis(1100));
    }

    #[test]
    fn test_schedule() {
        let config = RetryConfig {
            max_retries: 4,
            ..config(250, 1500, 2.0, 100)
        };
        let schedule: Vec<u64> = backoff_schedule(&config)
            .into_iter()
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(schedule, vec![250, 500, 1000, 1500]);

        assert!(backoff_schedule(&RetryConfig::no_retry()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_delay_within_bounds(
            attempt in 0u32..64,
            base in 0u64..5_000,
            extra in 0u64..60_000,
            factor in 1.0f64..4.0,
            jitter in 0u64..2_000,
            seed in any::<u64>(),
        ) {
            let config = config(base, base + extra, factor, jitter);
            let mut rng = StdRng::seed_from_u64(seed);
            let delay = backoff_delay_with(attempt, &config, &mut rng);
            prop_assert!(delay <= config.max_delay);
        }

        #[test]
        fn prop_monotonic_without_jitter(
            attempt in 0u32..40,
            base in 1u64..5_000,
            extra in 0u64..60_000,
            factor in 1.0f64..4.0,
        ) {
            let config = config(base, base + extra, factor, 0);
            let mut rng = StepRng::new(0, 0);
            let current = backoff_delay_with(attempt, &config, &mut rng);
            let next = backoff_delay_with(attempt + 1, &config, &mut rng);
            prop_assert!(next >= current);
        }

        #[test]
        fn prop_zero_jitter_matches_formula(
            attempt in 0u32..12,
            base in 0u64..1_000,
            extra in 0u64..100_000,
        ) {
            let config = config(base, base + extra, 2.0, 0);
            let mut rng = StepRng::new(0, 0);
            let expected = (base * 2u64.pow(attempt)).min(base + extra);
            prop_assert_eq!(
                backoff_delay_with(attempt, &config, &mut rng),
                Duration::from_millis(expected)
            );
        }
    }
}
