//! HTTP transport for network-based API calls

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::request::{ApiRequest, HttpResponse};

/// Issues a single HTTP request.
///
/// Any received response, whatever its status, is `Ok`; only failures before
/// a response (connect, timeout, body read) are `Err`.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> ClientResult<HttpResponse>;
}

#[async_trait]
impl<T: RequestTransport + ?Sized> RequestTransport for Arc<T> {
    async fn execute(&self, request: &ApiRequest) -> ClientResult<HttpResponse> {
        (**self).execute(request).await
    }
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    debug_traffic: bool,
}

impl ReqwestTransport {
    /// Create a transport from configuration.
    ///
    /// A cookie store is enabled so the refresh endpoint can identify the
    /// session from the ambient cookie.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            debug_traffic: config.debug_traffic,
        })
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl RequestTransport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> ClientResult<HttpResponse> {
        let url = self.url(&request.path);
        let mut builder = self.client.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        if self.debug_traffic {
            // headers are left out so the credential never reaches the log
            debug!(method = %request.method, url = %url, body = ?request.body, "HTTP request");
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        if self.debug_traffic {
            debug!(method = %request.method, url = %url, status = status.as_u16(), body = %body, "HTTP response");
        }

        Ok(HttpResponse {
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
    fn test_url_join() {
        let transport =
            ReqwestTransport::new(&ClientConfig::new("http://localhost:3000/")).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:3000");
        assert_eq!(transport.url("/orders/42"), "http://localhost:3000/orders/42");
        assert_eq!(transport.url("orders"), "http://localhost:3000/orders");
    }
}
