//! Time source and pacing delay.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

/// Source of wall-clock time and blocking sleep.
///
/// Sessions take the clock as a type parameter so pacing and timing can be
/// observed without waiting in tests.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Pick a whole-second pause uniformly from the closed interval between the
/// two bounds. Reversed bounds are swapped.
pub fn pause_duration<R: Rng + ?Sized>(min_secs: u64, max_secs: u64, rng: &mut R) -> Duration {
    let (lo, hi) = if min_secs <= max_secs {
        (min_secs, max_secs)
    } else {
        (max_secs, min_secs)
    };
    Duration::from_secs(rng.random_range(lo..=hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_pause_degenerate_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            assert_eq!(pause_duration(2, 2, &mut rng), Duration::from_secs(2));
        }
    }

    #[test]
    fn test_pause_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 4];
        for _ in 0..256 {
            let secs = pause_duration(1, 3, &mut rng).as_secs();
            assert!((1..=3).contains(&secs));
            seen[secs as usize] = true;
        }
        assert!(seen[1] && seen[2] && seen[3]);
    }

    #[test]
    fn test_pause_reversed_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..32 {
            let secs = pause_duration(5, 4, &mut rng).as_secs();
            assert!((4..=5).contains(&secs));
        }
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let before = clock.now();
        clock.sleep(Duration::from_millis(5));
        assert!(clock.now() >= before);
    }
}
