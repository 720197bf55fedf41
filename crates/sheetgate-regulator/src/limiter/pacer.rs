use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

/// Longest spacing between two admissions, whatever the configured floor.
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-key admission pacer.
///
/// Hands out admission slots strictly spaced by `1 / rate` seconds, with no
/// burst allowance: a key never admits more than `rate × window` calls in any
/// rolling window. Waiters line up on a FIFO gate and only the head of the
/// line sleeps; a slot is consumed when the sleep completes, so a waiter that
/// gives up leaves the schedule untouched.
#[derive(Debug)]
pub struct RatePacer {
    state: Mutex<PacerState>,
    gate: AsyncMutex<()>,
    ceiling: f64,
    floor: f64,
}

#[derive(Debug)]
struct PacerState {
    rate: f64,
    interval: Duration,
    next_free: Instant,
}

impl RatePacer {
    /// `rate` is the catalog default and also the ceiling; `floor` bounds
    /// damping from below.
    ///
    /// A floor above `rate` is clamped down to it; the pacer never runs faster
    /// than its catalog default.
    pub fn new(rate: f64, floor: f64) -> Self {
        let floor = if floor.is_finite() && floor > 0.0 { floor } else { 0.1 };
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { floor };
        let floor = floor.min(rate);
        Self {
            state: Mutex::new(PacerState {
                rate,
                interval: interval_for(rate),
                next_free: Instant::now(),
            }),
            gate: AsyncMutex::new(()),
            ceiling: rate,
            floor,
        }
    }

    /// Current issuance rate in permits per second.
    pub fn rate(&self) -> f64 {
        self.lock().rate
    }

    /// Catalog default this pacer started at.
    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Claim the next slot right away and return the instant it opens. The
    /// slot counts as used whether or not the caller waits for it.
    pub fn reserve(&self) -> Instant {
        let mut st = self.lock();
        let now = Instant::now();
        let at = st.next_free.max(now);
        st.next_free = at + st.interval;
        at
    }

    /// Wait for a permit. Returns how long the caller was held back.
    ///
    /// Cancel-safe: dropping the future before it resolves consumes no slot,
    /// and the next waiter in line takes over.
    pub async fn acquire(&self) -> Duration {
        let start = Instant::now();
        let _turn = self.gate.lock().await;
        while let Err(opens_at) = self.try_admit() {
            tokio::time::sleep_until(opens_at).await;
        }
        start.elapsed()
    }

    // Consume the current slot if it is open, otherwise report when it opens.
    fn try_admit(&self) -> Result<(), Instant> {
        let mut st = self.lock();
        let now = Instant::now();
        if st.next_free > now {
            return Err(st.next_free);
        }
        st.next_free = now + st.interval;
        Ok(())
    }

    /// Lower the rate towards `permits_per_sec`. The rate only ever moves
    /// down, never below the floor. Returns the resulting rate.
    pub fn damp(&self, permits_per_sec: f64) -> f64 {
        let mut st = self.lock();
        if !permits_per_sec.is_finite() {
            return st.rate;
        }
        let rate = permits_per_sec.min(st.rate).max(self.floor);
        st.rate = rate;
        st.interval = interval_for(rate);
        rate
    }

    // Poisoned means a panic while holding the lock; the state is still a
    // valid schedule, so keep going with it.
    fn lock(&self) -> MutexGuard<'_, PacerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn interval_for(rate: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / rate)
        .map(|d| d.min(MAX_INTERVAL))
        .unwrap_or(MAX_INTERVAL)
}
