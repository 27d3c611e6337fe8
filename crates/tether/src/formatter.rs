//! Request formatters
//!
//! A formatter is the last hook to touch an outgoing request, after the
//! body, content type and configured headers are in place. Authentication
//! is the usual job.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tether_transport::HttpRequest;

/// Header carrying credentials unless a formatter is told otherwise
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Mutates an outgoing request just before it is sent.
///
/// Runs once per attempt, so it must be idempotent.
pub trait RequestFormatter: Send + Sync {
    /// Adjust the request in place
    fn format(&self, request: &mut HttpRequest);
}

impl<F> RequestFormatter for F
where
    F: Fn(&mut HttpRequest) + Send + Sync,
{
    fn format(&self, request: &mut HttpRequest) {
        self(request)
    }
}

/// Sets a fixed credential header.
#[derive(Clone)]
pub struct AuthFormatter {
    header: String,
    auth: String,
}

impl AuthFormatter {
    /// Send `auth` verbatim in the `Authorization` header
    pub fn new(auth: impl Into<String>) -> Self {
        Self {
            header: AUTHORIZATION_HEADER.to_string(),
            auth: auth.into(),
        }
    }

    /// Send the credential under a different header name
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }
}

impl RequestFormatter for AuthFormatter {
    fn format(&self, request: &mut HttpRequest) {
        request.set_header(&self.header, &self.auth);
    }
}

impl fmt::Debug for AuthFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthFormatter")
            .field("header", &self.header)
            .field("auth", &"***")
            .finish()
    }
}

/// HTTP basic authentication from an application id and secret.
#[derive(Clone)]
pub struct BasicAuthFormatter {
    header: String,
    credentials: String,
}

impl BasicAuthFormatter {
    /// Encode `app_id:app_secret` for the `Authorization` header
    pub fn new(app_id: impl AsRef<str>, app_secret: impl AsRef<str>) -> Self {
        let raw = format!("{}:{}", app_id.as_ref(), app_secret.as_ref());
        Self {
            header: AUTHORIZATION_HEADER.to_string(),
            credentials: format!("Basic {}", STANDARD.encode(raw)),
        }
    }

    /// Send the credential under a different header name
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }
}

impl RequestFormatter for BasicAuthFormatter {
    fn format(&self, request: &mut HttpRequest) {
        request.set_header(&self.header, &self.credentials);
    }
}

impl fmt::Debug for BasicAuthFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthFormatter")
            .field("header", &self.header)
            .field("credentials", &"***")
            .finish()
    }
}

/// Sets extra headers, then hands the request to an optional inner formatter.
#[derive(Clone, Default)]
pub struct HeaderFormatter {
    headers: HashMap<String, String>,
    inner: Option<Arc<dyn RequestFormatter>>,
}

impl HeaderFormatter {
    /// Create a formatter with no headers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header to set on every request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Run `inner` after the headers are applied
    pub fn then(mut self, inner: impl RequestFormatter + 'static) -> Self {
        self.inner = Some(Arc::new(inner));
        self
    }
}

impl RequestFormatter for HeaderFormatter {
    fn format(&self, request: &mut HttpRequest) {
        for (key, value) in &self.headers {
            request.set_header(key, value);
        }
        if let Some(inner) = &self.inner {
            inner.format(request);
        }
    }
}

impl fmt::Debug for HeaderFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderFormatter")
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("inner", &self.inner.is_some())
            .finish()
    }
}
