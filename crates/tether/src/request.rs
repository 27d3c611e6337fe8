//! Request specifications
//!
//! A [`RequestSpec`] is a plain description of one logical call: where to
//! send it, what to send, which status codes count as acceptable and how
//! hard to try. It holds no connection state and can be executed any number
//! of times.

use crate::formatter::RequestFormatter;
use crate::payload::PayloadDescriptor;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tether_core::RetrySchedule;
use tether_core::retry::{DEFAULT_DELAY_BETWEEN_TRIES, DEFAULT_NUM_TRIES};
use tether_transport::HttpRequest;

/// Response bodies longer than this many characters are truncated in the
/// trail unless debug logging is on
pub const DEFAULT_RESPONSE_LOG_LIMIT: usize = 2000;

/// A request body, serialized to JSON once per execution
pub type RequestBody = Arc<dyn erased_serde::Serialize + Send + Sync>;

/// Description of a retried request.
#[derive(Clone)]
pub struct RequestSpec {
    /// Target URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Body to serialize as JSON
    pub body: Option<RequestBody>,
    /// Headers applied to every attempt
    pub headers: HashMap<String, String>,
    /// Final hook applied to every attempt
    pub formatter: Option<Arc<dyn RequestFormatter>>,
    /// Logical name of the call
    pub operation: Option<String>,
    /// Acceptable status codes and how to read their bodies
    pub valid_responses: HashMap<u16, Option<PayloadDescriptor>>,
    /// Total number of attempts
    pub num_tries: u32,
    /// Pause before every attempt after the first
    pub delay_between_tries: Duration,
    /// Character limit for response bodies written to the trail
    pub response_log_limit: usize,
}

impl RequestSpec {
    /// Create a spec with the default status whitelist (200, 201 and 204, no
    /// payload), one attempt and a 500ms delay.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let valid_responses = [200, 201, 204]
            .into_iter()
            .map(|code| (code, None))
            .collect();

        Self {
            url: url.into(),
            method: method.into(),
            body: None,
            headers: HashMap::new(),
            formatter: None,
            operation: None,
            valid_responses,
            num_tries: DEFAULT_NUM_TRIES,
            delay_between_tries: DEFAULT_DELAY_BETWEEN_TRIES,
            response_log_limit: DEFAULT_RESPONSE_LOG_LIMIT,
        }
    }

    /// Replace the target URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Replace the HTTP method
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Name the call for diagnostics
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Replace every header, including any set by a factory
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Send `body` as JSON
    pub fn body<T>(mut self, body: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    /// Apply `formatter` to every attempt
    pub fn formatter(mut self, formatter: impl RequestFormatter + 'static) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    /// Replace the whole status whitelist
    pub fn valid_responses(mut self, responses: HashMap<u16, Option<PayloadDescriptor>>) -> Self {
        self.valid_responses = responses;
        self
    }

    /// Accept `status` and read its body with `descriptor`
    pub fn valid_response(mut self, status: u16, descriptor: PayloadDescriptor) -> Self {
        self.valid_responses.insert(status, Some(descriptor));
        self
    }

    /// Accept `status` without reading its body
    pub fn valid_status(mut self, status: u16) -> Self {
        self.valid_responses.insert(status, None);
        self
    }

    /// Total number of attempts, at least one is always made
    pub fn num_tries(mut self, num_tries: u32) -> Self {
        self.num_tries = num_tries;
        self
    }

    /// Pause before every attempt after the first
    pub fn delay_between_tries(mut self, delay: Duration) -> Self {
        self.delay_between_tries = delay;
        self
    }

    /// Character limit for response bodies written to the trail
    pub fn response_log_limit(mut self, limit: usize) -> Self {
        self.response_log_limit = limit;
        self
    }

    /// The attempt schedule this spec describes
    pub fn schedule(&self) -> RetrySchedule {
        RetrySchedule::new(self.num_tries, self.delay_between_tries)
    }

    /// Serialize the body, if any, to JSON bytes
    pub fn serialize_body(&self) -> Result<Option<Vec<u8>>, serde_json::Error> {
        self.body
            .as_ref()
            .map(|body| serde_json::to_vec(&**body))
            .transpose()
    }

    /// Build the request for one attempt.
    ///
    /// Order: body and `Content-Type`, then configured headers, then the
    /// formatter, so later steps win.
    pub fn build_request(&self, body: Option<Vec<u8>>) -> HttpRequest {
        let mut request = HttpRequest::new(&self.method, &self.url);

        if let Some(body) = body {
            request.set_header("Content-Type", "application/json");
            request.body = Some(body);
        }
        for (key, value) in &self.headers {
            request.set_header(key, value);
        }
        if let Some(formatter) = &self.formatter {
            formatter.format(&mut request);
        }
        request.operation = self.operation.clone();

        request
    }

    /// Whitelist rendered for diagnostics, sorted by status
    pub fn describe_valid_responses(&self) -> String {
        let mut codes: Vec<_> = self.valid_responses.iter().collect();
        codes.sort_by_key(|(code, _)| **code);

        let parts: Vec<String> = codes
            .into_iter()
            .map(|(code, descriptor)| match descriptor {
                Some(descriptor) => format!("{}: {}", code, descriptor.describe()),
                None => code.to_string(),
            })
            .collect();
        format!("[{}]", parts.join(", "))
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("operation", &self.operation)
            .field("has_body", &self.body.is_some())
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("has_formatter", &self.formatter.is_some())
            .field("valid_responses", &self.describe_valid_responses())
            .field("num_tries", &self.num_tries)
            .field("delay_between_tries", &self.delay_between_tries)
            .field("response_log_limit", &self.response_log_limit)
            .finish()
    }
}
