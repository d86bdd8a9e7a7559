//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples protocol logic from system time. Request
//! deadlines are measured on a monotonic clock; outbound records are stamped
//! with wall-clock UTC. Both come from the environment so a simulation can
//! control them.
//!
//! The environment is implemented twice:
//!
//! 1. `SimEnv` (r7k-harness): Turmoil's virtual time and a fixed UTC epoch
//! 2. [`SystemEnv`]: the real clocks
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Isolation: Implementations must not share global state

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Abstract environment providing time and async sleep.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Type representing a point in time.
    ///
    /// Must support:
    /// - `Copy` - Lightweight to pass around
    /// - `Ord` - Can be compared (for timeout logic)
    /// - `Sub<Output = Duration>` - Can compute elapsed time
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Returns the current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code sleeps; state machines take `now` as a parameter.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Returns the current UTC time, used to stamp outbound records.
    fn wall_clock(&self) -> DateTime<Utc>;
}

/// Production environment backed by the system clocks and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_env_time_moves_forward() {
        let env = SystemEnv;
        let start = env.now();
        env.sleep(Duration::from_millis(5)).await;

        assert!(env.now() - start >= Duration::from_millis(5));
        assert!(env.wall_clock().timestamp() > 1_600_000_000);
    }
}
