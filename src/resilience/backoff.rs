//! Retry delays.

use std::time::Duration;
use rand::Rng;

/// Delay policy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay every time. Used for dependencies we wait on indefinitely.
    Fixed(Duration),
    /// Doubling delay with up to 10% jitter, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    pub fn fixed_secs(secs: u64) -> Self {
        Backoff::Fixed(Duration::from_secs(secs))
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                calculate_backoff(attempt, base.as_millis() as u64, max.as_millis() as u64)
            }
        }
    }
}

/// Exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let capped = base_ms
        .saturating_mul(2u64.saturating_pow(attempt - 1))
        .min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_grows_and_caps() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);
        assert!(calculate_backoff(1, 100, 2000) >= Duration::from_millis(100));
        assert!(calculate_backoff(2, 100, 2000) >= Duration::from_millis(200));

        let capped = calculate_backoff(20, 100, 1000);
        assert!(capped >= Duration::from_millis(1000));
        assert!(capped < Duration::from_millis(1100));
    }

    #[test]
    fn exponential_policy_doubles_per_attempt() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(10),
            max: Duration::from_millis(50),
        };
        assert!(backoff.delay(1) >= Duration::from_millis(10));
        assert!(backoff.delay(2) >= Duration::from_millis(20));
        assert!(backoff.delay(2) < Duration::from_millis(40));
        let capped = backoff.delay(10);
        assert!(capped >= Duration::from_millis(50));
        assert!(capped < Duration::from_millis(55));
    }

    #[test]
    fn fixed_ignores_attempt() {
        let backoff = Backoff::fixed_secs(10);
        assert_eq!(backoff.delay(1), Duration::from_secs(10));
        assert_eq!(backoff.delay(50), Duration::from_secs(10));
    }
}
