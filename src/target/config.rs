// src/target/config.rs

use derive_builder::Builder;
use std::time::Duration;

/// How long a target may run before it is considered stuck.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Configuration for running a target
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct Config {
    /// Upper bound for `Target::wait_for_completion`
    #[builder(default = "DEFAULT_TIMEOUT")]
    pub(crate) timeout: Duration,
}

impl Config {
    pub fn new(timeout: Duration) -> Self {
        Config { timeout }
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
