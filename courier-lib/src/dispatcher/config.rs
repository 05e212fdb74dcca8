use serde::{Deserialize, Serialize};

use crate::ErrorKind;
use crate::types::Result;

/// Default number of asynchronous calls running at the same time
const DEFAULT_MAX_REQUESTS: usize = 64;

/// Default number of asynchronous calls running at the same time per host
const DEFAULT_MAX_REQUESTS_PER_HOST: usize = 5;

/// Admission limits of a [`Dispatcher`](super::Dispatcher)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Maximum number of asynchronous calls running concurrently.
    /// Calls above this limit wait in the ready queue.
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Maximum number of asynchronous calls running concurrently against
    /// one host. Running upgrade calls do not count against this limit.
    #[serde(default = "default_max_requests_per_host")]
    pub max_requests_per_host: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            max_requests_per_host: DEFAULT_MAX_REQUESTS_PER_HOST,
        }
    }
}

const fn default_max_requests() -> usize {
    DEFAULT_MAX_REQUESTS
}

const fn default_max_requests_per_host() -> usize {
    DEFAULT_MAX_REQUESTS_PER_HOST
}

impl DispatcherConfig {
    /// Check that both limits are at least one
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidLimit`] naming the first offending limit.
    pub fn validate(&self) -> Result<()> {
        check_limit("max_requests", self.max_requests)?;
        check_limit("max_requests_per_host", self.max_requests_per_host)
    }
}

pub(super) fn check_limit(name: &'static str, value: usize) -> Result<()> {
    if value < 1 {
        return Err(ErrorKind::InvalidLimit { name, value });
    }
    Ok(())
}
