use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ErrorKind;
use crate::types::Result;

/// The scheduling identity of a request: its lowercased host name.
///
/// Calls sharing a `HostKey` share one per-host concurrency budget in the
/// [`Dispatcher`](crate::Dispatcher). The port is deliberately not part of the
/// key, so `example.com:8080` and `example.com` count against the same limit.
///
/// ```
/// use courier_lib::HostKey;
/// use url::Url;
///
/// let url = Url::parse("https://Cdn.Example.com:8443/a.js").unwrap();
/// let key = HostKey::try_from(&url).unwrap();
/// assert_eq!(key.as_str(), "cdn.example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct HostKey(String);

impl HostKey {
    /// The host name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&Url> for HostKey {
    type Error = ErrorKind;

    fn try_from(url: &Url) -> Result<Self> {
        url.host_str()
            .filter(|host| !host.is_empty())
            .map(HostKey::from)
            .ok_or(ErrorKind::InvalidUrlHost)
    }
}

impl From<&str> for HostKey {
    fn from(host: &str) -> Self {
        HostKey(host.to_ascii_lowercase())
    }
}

impl From<String> for HostKey {
    fn from(host: String) -> Self {
        HostKey::from(host.as_str())
    }
}

impl AsRef<str> for HostKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
