use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default timeout for each phase of an exchange
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-hop timeouts carried through the interceptor chain.
///
/// These are plain data: the stage performing the blocking operation is
/// responsible for enforcing them. A stage can override them for the
/// rest of the chain via [`Chain::with_connect_timeout`](crate::chain::Chain::with_connect_timeout)
/// and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Time allowed to acquire a connection
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub connect: Duration,

    /// Time allowed to wait for response data
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub read: Duration,

    /// Time allowed to send the request
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub write: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: DEFAULT_TIMEOUT,
            read: DEFAULT_TIMEOUT,
            write: DEFAULT_TIMEOUT,
        }
    }
}

const fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl Timeouts {
    /// Upper bound for a whole exchange once the connection is established
    #[must_use]
    pub fn exchange_deadline(&self) -> Duration {
        self.read.saturating_add(self.write)
    }
}
