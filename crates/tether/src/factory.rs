//! Request factory
//!
//! Stamps every spec it creates with the caller's identity so the receiving
//! service can tell who is calling.

use crate::request::RequestSpec;

/// Header identifying the calling service
pub const X_REQUEST_SOURCE_HEADER: &str = "x-request-source";

/// Creates [`RequestSpec`]s preconfigured for one calling service.
#[derive(Debug, Clone)]
pub struct RequestFactory {
    request_source: String,
}

impl RequestFactory {
    /// Create a factory for the service named `request_source`
    pub fn new(request_source: impl Into<String>) -> Self {
        Self {
            request_source: request_source.into(),
        }
    }

    /// Name sent in the `x-request-source` header
    pub fn request_source(&self) -> &str {
        &self.request_source
    }

    /// Create a spec for an arbitrary method
    pub fn request(&self, method: impl Into<String>, url: impl Into<String>) -> RequestSpec {
        RequestSpec::new(method, url).header(X_REQUEST_SOURCE_HEADER, &self.request_source)
    }

    /// Create a GET spec
    pub fn get(&self, url: impl Into<String>) -> RequestSpec {
        self.request("GET", url)
    }

    /// Create a POST spec
    pub fn post(&self, url: impl Into<String>) -> RequestSpec {
        self.request("POST", url)
    }

    /// Create a PUT spec
    pub fn put(&self, url: impl Into<String>) -> RequestSpec {
        self.request("PUT", url)
    }

    /// Create a PATCH spec
    pub fn patch(&self, url: impl Into<String>) -> RequestSpec {
        self.request("PATCH", url)
    }

    /// Create a DELETE spec
    pub fn delete(&self, url: impl Into<String>) -> RequestSpec {
        self.request("DELETE", url)
    }
}
