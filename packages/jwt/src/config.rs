//! Engine configuration

use std::time::{SystemTime, UNIX_EPOCH};

/// Time source for `iat` at generation and expiry checks at verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// Wall clock
    #[default]
    System,
    /// Fixed instant in milliseconds since the Unix epoch
    Fixed(i64),
}

impl Clock {
    /// Current time in milliseconds since the Unix epoch
    #[must_use]
    pub fn now_millis(&self) -> i64 {
        match self {
            Clock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
                .unwrap_or(0),
            Clock::Fixed(millis) => *millis,
        }
    }

    /// Current time in whole seconds since the Unix epoch
    #[must_use]
    pub fn now_secs(&self) -> i64 {
        self.now_millis().div_euclid(1000)
    }
}

/// PBES2 parameters
///
/// `iterations` and `salt_len` apply to generation. The ceilings bound the
/// `p2c` accepted at verification; the synchronous ceiling is lower because
/// the derivation then runs on the caller's thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pbes2Config {
    /// `p2c` written into generated tokens
    pub iterations: u32,
    /// Random salt bytes appended after `alg ‖ 0x00`
    pub salt_len: usize,
    /// Largest `p2c` verified synchronously
    pub max_sync_iterations: u32,
    /// Largest `p2c` verified at all
    pub max_async_iterations: u32,
}

impl Pbes2Config {
    /// Default parameters
    #[must_use]
    pub fn standard() -> Self {
        Self {
            iterations: 1024,
            salt_len: 8,
            max_sync_iterations: 2048,
            max_async_iterations: 100_000,
        }
    }

    /// Costlier derivation for generated tokens
    ///
    /// Tokens generated with this preset are above the synchronous ceiling
    /// and must be verified with `verify_async`.
    #[must_use]
    pub fn high_security() -> Self {
        Self {
            iterations: 10_000,
            salt_len: 16,
            max_sync_iterations: 2048,
            max_async_iterations: 100_000,
        }
    }

    /// Set the generation iteration count
    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the random salt length
    #[must_use]
    pub fn with_salt_len(mut self, salt_len: usize) -> Self {
        self.salt_len = salt_len;
        self
    }

    /// Set both verification ceilings
    #[must_use]
    pub fn with_limits(mut self, max_sync_iterations: u32, max_async_iterations: u32) -> Self {
        self.max_sync_iterations = max_sync_iterations;
        self.max_async_iterations = max_async_iterations;
        self
    }
}

impl Default for Pbes2Config {
    fn default() -> Self {
        Self::standard()
    }
}

/// Configuration of a [`Jose`](crate::Jose) engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoseConfig {
    /// PBES2 parameters
    pub pbes2: Pbes2Config,
    /// Time source
    pub clock: Clock,
}

impl JoseConfig {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the PBES2 parameters
    #[must_use]
    pub fn with_pbes2(mut self, pbes2: Pbes2Config) -> Self {
        self.pbes2 = pbes2;
        self
    }

    /// Replace the time source
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Freeze time at `millis` since the Unix epoch
    #[must_use]
    pub fn with_fixed_time(self, millis: i64) -> Self {
        self.with_clock(Clock::Fixed(millis))
    }
}
