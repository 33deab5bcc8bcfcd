//! Virtual-time environment.
//!
//! [`SimEnv`] implements [`Environment`] over a shared virtual clock. Time
//! only moves when a test calls [`SimEnv::advance`] or something awaits
//! [`Environment::sleep`], which completes immediately after advancing.

use std::{
    fmt,
    ops::{Add, Sub},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chatline_core::Environment;
use chrono::{DateTime, TimeDelta, Utc};

/// Point in virtual time, measured from the start of the simulation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time since the start of the simulation.
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl fmt::Debug for SimInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T+{:?}", self.0)
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs)
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

/// Deterministic environment with a virtual clock.
///
/// Clones share the clock.
#[derive(Clone)]
pub struct SimEnv {
    elapsed: Arc<Mutex<Duration>>,
    epoch: DateTime<Utc>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }
}

impl fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimEnv").field("now", &self.now()).field("epoch", &self.epoch).finish()
    }
}

impl SimEnv {
    /// Create an environment whose wall clock starts at `epoch`.
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self { elapsed: Arc::new(Mutex::new(Duration::ZERO)), epoch }
    }

    /// Move virtual time forward and return the new instant.
    pub fn advance(&self, by: Duration) -> SimInstant {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += by;
        SimInstant(*elapsed)
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(*self.elapsed.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let elapsed = self.now().elapsed();
        TimeDelta::from_std(elapsed).map_or(self.epoch, |delta| self.epoch + delta)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_clock() {
        let env = SimEnv::default();
        let other = env.clone();

        env.advance(Duration::from_secs(3));
        assert_eq!(other.now().elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn instant_arithmetic() {
        let start = SimInstant::default();
        let later = start + Duration::from_millis(1500);

        assert_eq!(later - start, Duration::from_millis(1500));
        assert_eq!(start - later, Duration::ZERO);
        assert!(later > start);
    }

    #[test]
    fn wall_clock_follows_virtual_time() {
        let env = SimEnv::default();
        env.advance(Duration::from_secs(90));

        assert_eq!(env.wall_clock().timestamp(), 90);
    }

    #[tokio::test]
    async fn sleep_advances_without_waiting() {
        let env = SimEnv::default();
        env.sleep(Duration::from_secs(5)).await;

        assert_eq!(env.now().elapsed(), Duration::from_secs(5));
    }
}
