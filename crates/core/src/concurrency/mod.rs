//! Concurrency substrate: rate limiting, bounded batches and retries.
//!
//! Jobs themselves each run on their own task; these primitives bound the
//! work a job fans out to, such as downloading its assets.

mod pool;
mod rate_limiter;
mod retry;

pub use pool::{BatchError, ItemFailure, PoolStatus, WorkerPool};
pub use rate_limiter::{RateLimitStatus, SlidingWindowLimiter};
pub use retry::{retry_with_backoff, RetryConfig, Transient};
