//! Sliding-window rate limiter.
//!
//! Remembers when each of the most recent calls started. A call that would
//! push the count within the trailing window above the ceiling sleeps until
//! the oldest recorded call leaves the window. Callers are delayed, never
//! rejected.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Current limiter occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub max_calls: usize,
    pub window_ms: u64,
    pub calls_in_window: usize,
    /// Time until a slot frees up, if the window is full.
    pub next_available_in_ms: Option<u64>,
}

/// Blocks callers so that at most `max_calls` start in any trailing window.
pub struct SlidingWindowLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Limits to `calls_per_minute` calls in any 60 second window.
    pub fn per_minute(calls_per_minute: u32) -> Self {
        Self::new(calls_per_minute as usize, Duration::from_secs(60))
    }

    /// A zero ceiling is treated as one.
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    fn prune(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = calls.front() {
            if now.duration_since(oldest) >= self.window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Waits for a slot and records the call.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut calls = self.calls.lock().await;
                let now = Instant::now();
                self.prune(&mut calls, now);
                if calls.len() < self.max_calls {
                    calls.push_back(now);
                    return;
                }
                match calls.front() {
                    Some(&oldest) => self.window.saturating_sub(now.duration_since(oldest)),
                    None => continue,
                }
            };
            // The lock is released while sleeping.
            debug!(wait_ms = wait.as_millis() as u64, "Rate limited, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn status(&self) -> RateLimitStatus {
        let mut calls = self.calls.lock().await;
        let now = Instant::now();
        self.prune(&mut calls, now);
        let next_available_in_ms = if calls.len() < self.max_calls {
            None
        } else {
            calls.front().map(|oldest| {
                self.window
                    .saturating_sub(now.duration_since(*oldest))
                    .as_millis() as u64
            })
        };
        RateLimitStatus {
            max_calls: self.max_calls,
            window_ms: self.window.as_millis() as u64,
            calls_in_window: calls.len(),
            next_available_in_ms,
        }
    }
}
