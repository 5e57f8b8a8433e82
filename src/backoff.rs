//! # Contention manager
//!
//! On abort, a transaction sleeps for a short randomized delay before the
//! application retries, to reduce the chance that the same two
//! transactions immediately collide again. Encounter-mode transactions back
//! off over a narrower window than commit-mode ones, since commit-mode's
//! deferred writes make its conflict window larger.
use std::time::Duration;

use rand::Rng;

/// Upper bound (exclusive), in microseconds, of the back-off window after
/// an encounter-mode abort.
const ENCOUNTER_BACKOFF_US: u64 = 10;

/// Upper bound (exclusive), in microseconds, of the back-off window after
/// a commit-mode abort.
const COMMIT_BACKOFF_US: u64 = 100;

/// Sleeps for a uniformly random delay in `[0, ENCOUNTER_BACKOFF_US)` µs.
pub(crate) fn backoff_encounter() {
    sleep_random_us(ENCOUNTER_BACKOFF_US);
}

/// Sleeps for a uniformly random delay in `[0, COMMIT_BACKOFF_US)` µs.
pub(crate) fn backoff_commit() {
    sleep_random_us(COMMIT_BACKOFF_US);
}

fn sleep_random_us(bound: u64) {
    // rand::thread_rng() is a cached thread-local generator, so repeated
    // aborts don't pay a fresh-seed cost.
    let micros = rand::thread_rng().gen_range(0..bound);
    std::thread::sleep(Duration::from_micros(micros));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn encounter_backoff_stays_within_its_window() {
        let start = Instant::now();
        backoff_encounter();
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[test]
    fn commit_backoff_stays_within_its_window() {
        let start = Instant::now();
        backoff_commit();
        assert!(start.elapsed() < Duration::from_millis(5));
    }
}
