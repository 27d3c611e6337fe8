//! HTTP transport client implementation
//!
//! Implements the Transport trait on top of reqwest. Response bodies are
//! streamed, not buffered, so body read failures reach the caller.

use crate::body::ResponseBody;
use crate::error::{Result, TransportError};
use crate::traits::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use futures::StreamExt;
use http::{HeaderName, HeaderValue, Method};
use reqwest::Client as ReqwestClient;
use std::collections::HashMap;
use std::time::Duration;

/// HTTP transport implementation
///
/// Handles HTTP requests with:
/// - Request and connect timeouts
/// - Connection pooling
/// - Streamed response bodies
///
/// Retrying is left to the caller.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: ReqwestClient,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a new HTTP transport with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create a new HTTP transport with custom configuration
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// Wrap an existing reqwest client
    pub fn from_client(client: ReqwestClient) -> Self {
        Self {
            client,
            timeout: HttpTransportConfig::default().timeout,
        }
    }

    /// Request timeout applied to every call
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn build_request(&self, request: HttpRequest) -> Result<reqwest::Request> {
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes()).map_err(|_| {
            TransportError::InvalidRequest(format!("Unsupported HTTP method: {}", request.method))
        })?;

        let mut builder = self.client.request(method, &request.url);

        for (key, value) in &request.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                TransportError::InvalidRequest(format!("Invalid header name '{}': {}", key, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidRequest(format!("Invalid header value for '{}': {}", key, e))
            })?;
            builder = builder.header(name, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        builder.build().map_err(TransportError::from)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let operation = request.operation.clone().unwrap_or_default();
        let method = request.method.clone();
        let url = request.url.clone();

        let built = self.build_request(request)?;
        tracing::debug!(%method, %url, %operation, "sending HTTP request");

        let response = self.client.execute(built).await.map_err(|e| {
            tracing::debug!(%method, %url, %operation, error = %e, "HTTP request failed");
            TransportError::from(e)
        })?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string(), v.to_string());
            }
        }
        tracing::debug!(%method, %url, %operation, status, "received HTTP response");

        let body = ResponseBody::from_stream(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| TransportError::Body(e.to_string()))),
        );

        Ok(HttpResponse::new(status, headers, body))
    }
}

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 10,
        }
    }
}
