// src/session.rs
use crate::types::{RaptorError, ScraperConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;

/// HTTP client shared by the scraper collectors.
#[derive(Clone)]
pub struct Session {
    pub client: Client,
}

impl Session {
    pub fn new(config: &ScraperConfig) -> Result<Self, RaptorError> {
        let mut client_builder = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10).min(config.timeout()));

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| RaptorError::ConfigError(format!("Invalid proxy URL: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder
            .build()
            .map_err(|e| RaptorError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Session { client })
    }

    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, String)],
    ) -> Result<reqwest::Response, RaptorError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| RaptorError::NetworkError(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| RaptorError::NetworkError(format!("Invalid header value: {}", e)))?;
            header_map.insert(name, value);
        }

        self.client
            .get(url)
            .headers(header_map)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RaptorError::NetworkError(format!("request to {} timed out", url))
                } else {
                    RaptorError::NetworkError(e.to_string())
                }
            })
    }

    /// GET returning the body of a 2xx response; anything else is an error.
    pub async fn get_text(&self, url: &str, headers: &[(&str, String)]) -> Result<String, RaptorError> {
        let response = self.get_with_headers(url, headers).await?;

        if !response.status().is_success() {
            return Err(RaptorError::NetworkError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| RaptorError::NetworkError(e.to_string()))
    }
}
