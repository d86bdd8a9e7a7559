//! Turmoil-based Environment implementation for deterministic testing.

use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use r7k_core::env::Environment;

/// Wall clock at simulation start: 2024-01-01T00:00:00Z
const DEFAULT_EPOCH_SECS: i64 = 1_704_067_200;

/// Simulation environment using Turmoil's virtual time.
///
/// - **Virtual Time**: `now()` returns Turmoil's simulated time, which can be
///   advanced instantly via `tokio::time::sleep()`.
///
/// - **Fixed wall clock**: `wall_clock()` is a fixed UTC epoch plus the
///   virtual time elapsed since the environment was created, so record
///   timestamps are identical on every run.
///
/// # Panics
///
/// `new()`, `with_epoch()` and `now()` panic if called outside a Turmoil
/// simulation (or a tokio runtime).
#[derive(Clone, Copy, Debug)]
pub struct SimEnv {
    origin: Instant,
    epoch: DateTime<Utc>,
}

impl SimEnv {
    /// Create an environment whose wall clock starts at 2024-01-01 UTC
    pub fn new() -> Self {
        Self::with_epoch(DateTime::UNIX_EPOCH + TimeDelta::seconds(DEFAULT_EPOCH_SECS))
    }

    /// Create an environment whose wall clock starts at `epoch`
    pub fn with_epoch(epoch: DateTime<Utc>) -> Self {
        Self { origin: tokio::time::Instant::now().into_std(), epoch }
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        // Use tokio's Instant which works with turmoil
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.now() - self.origin).unwrap_or_else(|_| TimeDelta::zero());
        self.epoch + elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_env_time_advances() {
        let mut sim = turmoil::Builder::new().build();

        sim.client("test", async {
            let env = SimEnv::new();

            let start = env.now();
            env.sleep(Duration::from_secs(5)).await;
            let end = env.now();

            assert_eq!(end - start, Duration::from_secs(5));

            Ok(())
        });

        sim.run().expect("simulation failed");
    }

    #[test]
    fn sim_env_wall_clock_follows_virtual_time() {
        let mut sim = turmoil::Builder::new().build();

        sim.client("test", async {
            let env = SimEnv::new();
            assert_eq!(env.wall_clock().timestamp(), DEFAULT_EPOCH_SECS);

            env.sleep(Duration::from_millis(2500)).await;

            let elapsed = env.wall_clock() - (DateTime::UNIX_EPOCH + TimeDelta::seconds(DEFAULT_EPOCH_SECS));
            assert_eq!(elapsed, TimeDelta::milliseconds(2500));

            Ok(())
        });

        sim.run().expect("simulation failed");
    }
}
