//! Configuration for the stream processor.
//!
//! Loaded from a TOML file or built in code:
//!
//! ```toml
//! sdk_key = "sdk-123"
//! stream_uri = "https://stream.example.com"
//! base_uri = "https://app.example.com"
//! # optional
//! proxy = "http://proxy.internal:3128"
//! connect_timeout_secs = 10
//! request_timeout_secs = 30
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transport::StreamRequest;

/// Path of the event stream, relative to the stream URI.
pub const STREAM_PATH: &str = "/flags";

/// Stream processor configuration.
#[derive(Clone, Deserialize)]
pub struct StreamConfig {
    /// SDK key, sent as the `Authorization` header.
    pub sdk_key: String,
    /// Base URI of the streaming service.
    pub stream_uri: String,
    /// Base URI for out-of-band flag requests.
    pub base_uri: String,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Optional outbound proxy URL.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Connect timeout in seconds (default: 10).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Timeout for out-of-band flag requests in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_user_agent() -> String {
    format!("flagstream/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl StreamConfig {
    /// Create a configuration with default timeouts and user agent.
    pub fn new(sdk_key: &str, stream_uri: &str, base_uri: &str) -> Self {
        Self {
            sdk_key: sdk_key.to_string(),
            stream_uri: stream_uri.to_string(),
            base_uri: base_uri.to_string(),
            user_agent: default_user_agent(),
            proxy: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Route all requests through a proxy.
    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("sdk_key", &self.sdk_key),
            ("stream_uri", &self.stream_uri),
            ("base_uri", &self.base_uri),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Full URL of the event stream.
    pub fn stream_url(&self) -> String {
        format!("{}{}", self.stream_uri.trim_end_matches('/'), STREAM_PATH)
    }

    /// Headers sent with the stream and with flag requests.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Authorization".to_string(), self.sdk_key.clone()),
            ("User-Agent".to_string(), self.user_agent.clone()),
        ]
    }

    /// What the transport needs to open the stream.
    pub fn stream_request(&self) -> StreamRequest {
        StreamRequest {
            url: self.stream_url(),
            headers: self.headers(),
            proxy: self.proxy.clone(),
        }
    }

    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl std::fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConfig")
            .field("sdk_key", &"[REDACTED]")
            .field("stream_uri", &self.stream_uri)
            .field("base_uri", &self.base_uri)
            .field("user_agent", &self.user_agent)
            .field("proxy", &self.proxy)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// Configuration parsed but is unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
sdk_key = "sdk-123"
stream_uri = "https://stream.test/"
base_uri = "https://app.test"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = StreamConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.user_agent.starts_with("flagstream/"));
        assert!(config.proxy.is_none());
    }

    #[test]
    fn stream_request_has_url_and_headers() {
        let config = StreamConfig::from_toml_str(MINIMAL)
            .unwrap()
            .with_user_agent("test-agent/1.0")
            .with_proxy("http://proxy.test:3128");

        let request = config.stream_request();
        assert_eq!(request.url, "https://stream.test/flags");
        assert_eq!(request.header("Authorization"), Some("sdk-123"));
        assert_eq!(request.header("User-Agent"), Some("test-agent/1.0"));
        assert_eq!(request.proxy.as_deref(), Some("http://proxy.test:3128"));
    }

    #[test]
    fn empty_sdk_key_is_rejected() {
        let result = StreamConfig::from_toml_str(
            r#"
sdk_key = ""
stream_uri = "https://stream.test"
base_uri = "https://app.test"
"#,
        );
        match result {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("sdk_key")),
            other => panic!("Expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn missing_field_is_parse_error() {
        let result = StreamConfig::from_toml_str(r#"sdk_key = "sdk-123""#);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn debug_redacts_sdk_key() {
        let config = StreamConfig::new("sdk-secret", "https://stream.test", "https://app.test");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sdk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = StreamConfig::from_file(file.path()).unwrap();
        assert_eq!(config.sdk_key, "sdk-123");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = StreamConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
