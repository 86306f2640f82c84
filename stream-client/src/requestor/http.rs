//! HttpRequestor - out-of-band flag requests over HTTP.

use super::{FetchError, Requestor};
use crate::config::StreamConfig;
use async_trait::async_trait;

/// Path of the full flag set, relative to the base URI.
pub const LATEST_FLAGS_PATH: &str = "/sdk/latest-flags";

/// Fetches flags from `<base_uri>/sdk/latest-flags[/<key>]`.
///
/// The key is sent as a single percent-encoded path segment.
pub struct HttpRequestor {
    client: reqwest::Client,
    base_uri: reqwest::Url,
    headers: Vec<(String, String)>,
}

impl HttpRequestor {
    /// Build a requestor from the stream configuration.
    pub fn new(config: &StreamConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| FetchError::Request(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let base_uri = reqwest::Url::parse(&config.base_uri)
            .map_err(|e| FetchError::Request(format!("invalid base URI: {}", e)))?;
        if base_uri.cannot_be_a_base() {
            return Err(FetchError::Request(format!(
                "invalid base URI: {}",
                config.base_uri
            )));
        }

        Ok(Self {
            client,
            base_uri,
            headers: config.headers(),
        })
    }

    /// URL of the full flag set.
    pub fn all_flags_url(&self) -> String {
        self.url_for(None).to_string()
    }

    /// URL of a single flag.
    pub fn flag_url(&self, key: &str) -> String {
        self.url_for(Some(key)).to_string()
    }

    fn url_for(&self, key: Option<&str>) -> reqwest::Url {
        let mut url = self.base_uri.clone();
        // Always Ok: base URIs that cannot be a base are rejected in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(LATEST_FLAGS_PATH.split('/').filter(|s| !s.is_empty()));
            if let Some(key) = key {
                segments.push(key);
            }
        }
        url
    }

    async fn get(&self, url: reqwest::Url) -> Result<String, FetchError> {
        let mut request = self
            .client
            .get(url.clone())
            .header("Accept", "application/json");
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Flag request to {} returned {}", url, status);
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))
    }
}

#[async_trait]
impl Requestor for HttpRequestor {
    async fn request_all_flags(&self) -> Result<String, FetchError> {
        self.get(self.url_for(None)).await
    }

    async fn request_flag(&self, key: &str) -> Result<String, FetchError> {
        self.get(self.url_for(Some(key))).await
    }
}
