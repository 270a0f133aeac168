//! Sliding-window rate limiting logic and state management.

mod decision;
mod key;
mod limiter;
mod log;
mod store;
mod sweeper;

pub use decision::Decision;
pub use key::RequestKey;
pub use limiter::{RateLimitConfig, SlidingWindowLimiter};
pub use log::TimestampLog;
pub use store::{GlobalLockLogStore, LogStore, ShardedLogStore};
pub use sweeper::{Sweeper, SweeperHandle};
