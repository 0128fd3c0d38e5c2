//! Feed configuration and endpoint derivation

use std::time::Duration;

use tracker_core::{TrackerError, TrackerResult};
use url::Url;

/// Default API base URL (matches the local dev backend)
const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Path of the signals websocket endpoint on the API host
const FEED_PATH: &str = "/ws/signals";

/// Fixed delay before reconnecting after a recoverable closure
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Fixed keepalive interval while the channel is open
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for [`SignalFeed`](crate::SignalFeed)
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// HTTP(S) base URL of the tracker API; the websocket endpoint is
    /// derived from it by scheme substitution
    pub api_url: String,
    /// Delay before retrying after a recoverable closure.
    /// Fixed policy of 5 seconds; not intended as a tuning knob.
    pub reconnect_delay: Duration,
    /// Keepalive ping interval while open.
    /// Fixed policy of 30 seconds; not intended as a tuning knob.
    pub heartbeat_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_url: std::env::var("TRACKER_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            reconnect_delay: RECONNECT_DELAY,
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }
}

impl FeedConfig {
    /// Configuration pointing at an explicit API base URL
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            reconnect_delay: RECONNECT_DELAY,
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }

    /// Derive the websocket endpoint from the API base URL.
    ///
    /// Rewrites `http` to `ws` (`https` to `wss`), appends the signals
    /// path, and carries the bearer token as a query parameter. The
    /// token-in-URL transport is observed backend behavior: URLs pass
    /// through intermediary logs in plaintext, so the full endpoint must
    /// never be logged.
    pub fn feed_url(&self, token: &str) -> TrackerResult<Url> {
        let mut url = Url::parse(&self.api_url).map_err(|e| {
            TrackerError::config(format!("invalid api url '{}': {}", self.api_url, e))
        })?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(TrackerError::config(format!(
                    "unsupported api url scheme '{}'",
                    other
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| TrackerError::config(format!("cannot rewrite scheme to '{}'", scheme)))?;

        let path = format!("{}{}", url.path().trim_end_matches('/'), FEED_PATH);
        url.set_path(&path);
        url.set_query(None);
        url.query_pairs_mut().append_pair("token", token);

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_url_http() {
        let config = FeedConfig::new("http://localhost:8000");
        let url = config.feed_url("tok1").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/signals?token=tok1");
    }

    #[test]
    fn test_feed_url_https() {
        let config = FeedConfig::new("https://api.example.com");
        let url = config.feed_url("tok1").unwrap();
        assert_eq!(url.as_str(), "wss://api.example.com/ws/signals?token=tok1");
    }

    #[test]
    fn test_feed_url_preserves_base_path() {
        let config = FeedConfig::new("https://example.com/api/");
        let url = config.feed_url("t").unwrap();
        assert_eq!(url.as_str(), "wss://example.com/api/ws/signals?token=t");
    }

    #[test]
    fn test_feed_url_encodes_token() {
        let config = FeedConfig::new("http://localhost:8000");
        let url = config.feed_url("a b&c").unwrap();
        assert_eq!(url.query(), Some("token=a+b%26c"));
    }

    #[test]
    fn test_feed_url_rejects_bad_base() {
        let config = FeedConfig::new("not a url");
        assert!(config.feed_url("t").is_err());

        let config = FeedConfig::new("ftp://example.com");
        assert!(config.feed_url("t").is_err());
    }
}
