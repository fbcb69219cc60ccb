use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Sliding-window limiter: at most `max_calls` admissions in any `window`.
///
/// Callers that find the window full wait for the oldest admission to age out.
/// The mutex is held across that wait, so waiters are admitted in arrival order.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        let max_calls = max_calls.max(1);
        Self {
            max_calls,
            window,
            calls: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    /// Waits until a slot is free, records the admission, and returns how long it waited.
    pub async fn acquire(&self) -> Duration {
        let started = Instant::now();
        let mut calls = self.calls.lock().await;

        loop {
            let now = Instant::now();
            while let Some(&oldest) = calls.front() {
                if now.duration_since(oldest) >= self.window {
                    calls.pop_front();
                } else {
                    break;
                }
            }

            if calls.len() < self.max_calls {
                calls.push_back(now);
                return now.duration_since(started);
            }

            if let Some(&oldest) = calls.front() {
                sleep_until(oldest + self.window).await;
            }
        }
    }

    #[cfg(test)]
    async fn in_window(&self) -> usize {
        let calls = self.calls.lock().await;
        let now = Instant::now();
        calls
            .iter()
            .filter(|&&at| now.duration_since(at) < self.window)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::{Duration, Instant};

    use super::SlidingWindowLimiter;

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_limit_without_waiting() {
        let limiter = SlidingWindowLimiter::new(25, Duration::from_secs(1));
        let start = Instant::now();

        for _ in 0..25 {
            assert_eq!(limiter.acquire().await, Duration::ZERO);
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_window().await, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn twenty_sixth_call_waits_for_window_to_free() {
        let limiter = SlidingWindowLimiter::new(25, Duration::from_secs(1));
        let start = Instant::now();

        let mut admitted_at = Vec::new();
        for _ in 0..30 {
            limiter.acquire().await;
            admitted_at.push(start.elapsed());
        }

        assert_eq!(admitted_at.len(), 30);
        assert!(admitted_at[..25].iter().all(|at| *at == Duration::ZERO));
        assert!(admitted_at[25..].iter().all(|at| *at >= Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_exceed_limit_per_window() {
        let limiter = Arc::new(SlidingWindowLimiter::new(5, Duration::from_millis(100)));
        let start = Instant::now();

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut admitted_at = Vec::new();
        for handle in handles {
            admitted_at.push(handle.await.unwrap());
        }
        admitted_at.sort();

        for (i, at) in admitted_at.iter().enumerate() {
            let in_window = admitted_at[i..]
                .iter()
                .take_while(|later| **later - *at < Duration::from_millis(100))
                .count();
            assert!(in_window <= 5, "{in_window} admissions inside one window");
        }
        assert!(admitted_at[10] >= Duration::from_millis(200));
    }
}
