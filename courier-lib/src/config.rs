//! File-based client configuration.
//!
//! ```toml
//! user_agent = "my-app/1.0"
//! max_retries = 2
//! retry_wait_time = "500ms"
//! cache_max_age = "5m"
//!
//! [dispatcher]
//! max_requests = 32
//! max_requests_per_host = 4
//!
//! [timeouts]
//! connect = "5s"
//! read = "30s"
//! ```
//!
//! Every key is optional and falls back to the [`ClientBuilder`] default.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::MemoryCache;
use crate::client::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT_TIME, DEFAULT_USER_AGENT};
use crate::types::Result;
use crate::{ClientBuilder, DispatcherConfig, ErrorKind, Timeouts};

/// Serializable settings for a [`Client`](crate::Client)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Admission limits of the dispatcher
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Timeouts every chain starts out with
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Maximum number of retries per call
    #[serde(default = "default_max_retries")]
    pub max_retries: u64,

    /// Wait time before the first retry
    #[serde(default = "default_retry_wait_time", with = "humantime_serde")]
    pub retry_wait_time: Duration,

    /// User-agent sent with requests that do not set one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Enables an in-memory response cache keeping entries this long
    #[serde(default, with = "humantime_serde")]
    pub cache_max_age: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            timeouts: Timeouts::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_wait_time: DEFAULT_RETRY_WAIT_TIME,
            user_agent: default_user_agent(),
            cache_max_age: None,
        }
    }
}

const fn default_max_retries() -> u64 {
    DEFAULT_MAX_RETRIES
}

const fn default_retry_wait_time() -> Duration {
    DEFAULT_RETRY_WAIT_TIME
}

fn default_user_agent() -> String {
    String::from(DEFAULT_USER_AGENT)
}

impl ClientConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::ReadConfig`] if the file cannot be read.
    /// - [`ErrorKind::ParseConfig`] if it is not valid configuration.
    /// - [`ErrorKind::InvalidLimit`] if a dispatcher limit is zero.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).map_err(|e| ErrorKind::ReadConfig(path.to_path_buf(), e))?;
        contents.parse()
    }
}

impl FromStr for ClientConfig {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.dispatcher.validate()?;
        Ok(config)
    }
}

impl From<ClientConfig> for ClientBuilder {
    fn from(config: ClientConfig) -> Self {
        let builder = ClientBuilder::builder()
            .dispatcher_config(config.dispatcher)
            .timeouts(config.timeouts)
            .max_retries(config.max_retries)
            .retry_wait_time(config.retry_wait_time)
            .user_agent(config.user_agent);
        match config.cache_max_age {
            Some(max_age) => builder.cache(Arc::new(MemoryCache::new(max_age))).build(),
            None => builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ClientConfig = "".parse().unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let config: ClientConfig = r#"
            user_agent = "my-app/1.0"
            max_retries = 2
            retry_wait_time = "500ms"
            cache_max_age = "5m"

            [dispatcher]
            max_requests = 32
            max_requests_per_host = 4

            [timeouts]
            connect = "5s"
            read = "30s"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.user_agent, "my-app/1.0");
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_wait_time, Duration::from_millis(500));
        assert_eq!(config.cache_max_age, Some(Duration::from_secs(300)));
        assert_eq!(
            config.dispatcher,
            DispatcherConfig {
                max_requests: 32,
                max_requests_per_host: 4,
            }
        );
        assert_eq!(config.timeouts.connect, Duration::from_secs(5));
        assert_eq!(config.timeouts.read, Duration::from_secs(30));
        assert_eq!(config.timeouts.write, Timeouts::default().write);
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let err = "[dispatcher]\nmax_requests = 0"
            .parse::<ClientConfig>()
            .unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidLimit { name: "max_requests", value: 0 }));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = "max_request = 3".parse::<ClientConfig>().unwrap_err();
        assert!(matches!(err, ErrorKind::ParseConfig(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_retries = 7").unwrap();

        let config = ClientConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.max_retries, 7);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = ClientConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ErrorKind::ReadConfig(p, _) if p == path));
    }

    #[tokio::test]
    async fn test_into_client() {
        let config: ClientConfig = "cache_max_age = \"1m\"\n[dispatcher]\nmax_requests = 8"
            .parse()
            .unwrap();

        let client = ClientBuilder::from(config).client().unwrap();

        assert_eq!(client.dispatcher().max_requests(), 8);
        assert!(client.cache().is_some());
    }
}
