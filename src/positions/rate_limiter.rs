use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Token bucket pacing outbound position queries.
///
/// Tokens refill continuously at `capacity / period`; an acquire that finds
/// the bucket empty sleeps until one token has accumulated.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    period_secs: f64,
    bucket: Mutex<(f64, Instant)>,
}

impl RateLimiter {
    pub fn per_minute(requests: u32) -> Self {
        let capacity = f64::from(requests.max(1));
        Self {
            capacity,
            period_secs: 60.0,
            bucket: Mutex::new((capacity, Instant::now())),
        }
    }

    pub async fn acquire(&self) {
        let refill_rate = self.capacity / self.period_secs;
        loop {
            let mut guard = self.bucket.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            *tokens = (*tokens + now.duration_since(*last).as_secs_f64() * refill_rate)
                .min(self.capacity);
            *last = now;
            if *tokens >= 1.0 {
                *tokens -= 1.0;
                return;
            }
            let wait = (1.0 - *tokens) / refill_rate;
            drop(guard);
            tokio::time::sleep(Duration::from_secs_f64(wait.max(0.001))).await;
        }
    }
}
