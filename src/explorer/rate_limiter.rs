use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Sliding-window limiter shared by every upstream call.
///
/// At most `max_requests` dispatches fall inside any `window`. Waiters queue
/// on a FIFO mutex and sleep until the oldest dispatch leaves the window, so
/// nobody spins and nobody starves. Dropping an `acquire()` future before it
/// resolves records nothing.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    dispatched: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            dispatched: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    pub fn per_second(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Waits until one more request may be dispatched and records it.
    pub async fn acquire(&self) {
        // Held across the sleep: later callers wait their turn behind us.
        let mut dispatched = self.dispatched.lock().await;

        loop {
            let now = Instant::now();
            while let Some(&oldest) = dispatched.front() {
                if now.duration_since(oldest) >= self.window {
                    dispatched.pop_front();
                } else {
                    break;
                }
            }

            if dispatched.len() < self.max_requests {
                dispatched.push_back(now);
                return;
            }

            if let Some(&oldest) = dispatched.front() {
                log::debug!(
                    "Rate limit of {} per {:?} reached, waiting {:?}",
                    self.max_requests,
                    self.window,
                    (oldest + self.window).saturating_duration_since(now)
                );
                sleep_until(oldest + self.window).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_burst_is_immediate() {
        let limiter = RateLimiter::per_second(5);
        let started = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn five_k_acquires_take_at_least_k_minus_one_seconds() {
        for k in 2..=4u32 {
            let limiter = RateLimiter::per_second(5);
            let started = Instant::now();

            for _ in 0..(5 * k) {
                limiter.acquire().await;
            }

            assert!(
                started.elapsed() >= Duration::from_secs(u64::from(k - 1)),
                "k={k} finished in {:?}",
                started.elapsed()
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_exceed_the_window() {
        let limiter = Arc::new(RateLimiter::per_second(5));
        let started = Instant::now();

        let handles: Vec<_> = (0..15)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut stamps = Vec::new();
        for handle in handles {
            stamps.push(handle.await.unwrap());
        }
        stamps.sort();

        for (i, stamp) in stamps.iter().enumerate().skip(5) {
            assert!(stamp.duration_since(stamps[i - 5]) >= Duration::from_secs(1));
        }
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_acquire_consumes_no_slot() {
        let limiter = RateLimiter::per_second(1);
        limiter.acquire().await;

        // Gives up while waiting for the second slot.
        let waited = tokio::time::timeout(Duration::from_millis(100), limiter.acquire()).await;
        assert!(waited.is_err());

        let started = Instant::now();
        limiter.acquire().await;
        // Only the first dispatch is in the window, so this waits for it to age out.
        assert!(started.elapsed() <= Duration::from_secs(1));
        assert_eq!(limiter.dispatched.lock().await.len(), 1);
    }
}
