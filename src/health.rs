//! Backend readiness tracking
//!
//! A session probes the health endpoint as soon as it starts and keeps
//! retrying with a growing delay until one probe succeeds. Once ready it
//! never probes again.

use std::time::Duration;

const BASE_DELAY_MS: f64 = 3_000.0;
const BACKOFF_FACTOR: f64 = 1.5;
const MAX_DELAY_MS: f64 = 30_000.0;

/// Delay before the probe that follows failure number `attempt` (1-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(64) as i32;
    let ms = (BASE_DELAY_MS * BACKOFF_FACTOR.powi(exponent)).min(MAX_DELAY_MS);
    Duration::from_millis(ms.round() as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Probing { attempt: u32 },
    Ready,
}

#[derive(Debug, Clone)]
pub struct HealthMonitor {
    state: Readiness,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            state: Readiness::Probing { attempt: 1 },
        }
    }

    pub fn state(&self) -> Readiness {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == Readiness::Ready
    }

    /// Moves to `Ready`; terminal.
    pub fn record_success(&mut self) {
        self.state = Readiness::Ready;
    }

    /// Returns how long to wait before probing again, or `None` once ready.
    pub fn record_failure(&mut self) -> Option<Duration> {
        match self.state {
            Readiness::Ready => None,
            Readiness::Probing { attempt } => {
                let delay = backoff_delay(attempt);
                self.state = Readiness::Probing {
                    attempt: attempt.saturating_add(1),
                };
                Some(delay)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_sequence() {
        let delays: Vec<u64> = (1..=8).map(|a| backoff_delay(a).as_millis() as u64).collect();
        assert_eq!(delays, vec![3_000, 4_500, 6_750, 10_125, 15_188, 22_781, 30_000, 30_000]);
    }

    #[test]
    fn test_backoff_caps_for_huge_attempts() {
        assert_eq!(backoff_delay(u32::MAX), Duration::from_secs(30));
        assert_eq!(backoff_delay(0), Duration::from_secs(3));
    }

    #[test]
    fn test_failures_advance_attempt() {
        let mut monitor = HealthMonitor::new();
        assert_eq!(monitor.state(), Readiness::Probing { attempt: 1 });

        assert_eq!(monitor.record_failure(), Some(Duration::from_millis(3_000)));
        assert_eq!(monitor.record_failure(), Some(Duration::from_millis(4_500)));
        assert_eq!(monitor.state(), Readiness::Probing { attempt: 3 });
    }

    #[test]
    fn test_ready_is_terminal() {
        let mut monitor = HealthMonitor::new();
        monitor.record_failure();
        monitor.record_success();
        assert!(monitor.is_ready());
        assert_eq!(monitor.record_failure(), None);
        assert!(monitor.is_ready());
    }
}
