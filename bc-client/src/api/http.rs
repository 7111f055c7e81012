//! reqwest-backed transport collaborator
//!
//! Thin glue between the [`Transport`] boundary and an actual HTTP stack:
//! joins relative URLs onto the service base URL, attaches the bearer token
//! supplied by a [`TokenProvider`], and maps the response back. Retry,
//! timeout, and token-refresh policy all live behind the trait seams.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

use super::transport::{Request, Response, Transport};

/// Supplies an opaque bearer token per call; refresh and caching are the
/// provider's concern.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String>;
}

/// Fixed token, for service-to-service setups and tests
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// HTTP transport over a service base URL
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            tokens,
        }
    }

    fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.base_url, url)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let url = self.absolute_url(&request.url);
        log::debug!("{} {}", request.method, url);

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .unwrap_or(reqwest::Method::GET);
        let mut builder = self
            .client
            .request(method, &url)
            .bearer_auth(self.tokens.bearer_token().await?)
            .header("Accept", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        let body = response.bytes().await?.to_vec();
        log::debug!("{} {} -> {} ({} bytes)", request.method, url, status, body.len());

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let transport = HttpTransport::new(
            "https://api.businesscentral.dynamics.com/v2.0/prod/api/v2.0",
            Arc::new(StaticToken::new("t")),
        );
        assert_eq!(
            transport.absolute_url("customers"),
            "https://api.businesscentral.dynamics.com/v2.0/prod/api/v2.0/customers"
        );
    }

    #[test]
    fn test_absolute_urls_pass_through() {
        let transport =
            HttpTransport::new("https://api/base", Arc::new(StaticToken::new("t")));
        assert_eq!(
            transport.absolute_url("https://api/other/pictures(1)/content"),
            "https://api/other/pictures(1)/content"
        );
    }
}
