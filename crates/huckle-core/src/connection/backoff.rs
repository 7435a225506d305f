use std::time::Duration;

use rand::Rng;

/// Exponential backoff with a ceiling and multiplicative jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub ceiling: Duration,
    /// Fraction in `[0, 1]`; the delay is scaled by a factor drawn from
    /// `[1 - jitter, 1 + jitter]`.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            ceiling: Duration::from_secs(60),
            jitter: 0.2,
        }
    }
}

impl BackoffPolicy {
    /// Delay before the next attempt after `failures` consecutive failures,
    /// without jitter. Zero failures means no wait.
    pub fn nominal(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .unwrap_or(self.ceiling)
            .min(self.ceiling)
    }

    /// Jittered delay. `unit` is a sample from `[0, 1)`.
    pub fn delay_with(&self, failures: u32, unit: f64) -> Duration {
        let nominal = self.nominal(failures);
        let jitter = self.jitter.clamp(0.0, 1.0);
        let factor = 1.0 - jitter + 2.0 * jitter * unit.clamp(0.0, 1.0);
        nominal.mul_f64(factor).min(self.ceiling)
    }

    pub fn delay<R: Rng + ?Sized>(&self, failures: u32, rng: &mut R) -> Duration {
        self.delay_with(failures, rng.gen::<f64>())
    }
}
