//! The retrying request executor
//!
//! [`Executor::execute`] runs one [`RequestSpec`] to completion and reports
//! everything that happened on a fresh [`Outcome`]. Each attempt ends in one
//! of three ways:
//!
//! - **Succeeded**: the status is whitelisted and its payload, if any, was
//!   read, decoded and validated
//! - **Retry**: transport error, unexpected status, or an unreadable,
//!   undecodable or invalid payload
//! - **Abort**: the service answered 401 or 403
//!
//! Attempts are strictly sequential and separated by the configured fixed delay.
//! The status code of every response received is recorded, so a failed
//! outcome carries the last status seen.

use crate::error::Result;
use crate::observability::{attempt_span, log_finished};
use crate::payload::PayloadDescriptor;
use crate::request::RequestSpec;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tether_core::{LayeredConfig, LogSink, LoggingSettings, Outcome, StdoutSink};
use tether_transport::{HttpResponse, HttpTransport, Transport};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// How a single attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Succeeded,
    Retry,
    Abort,
}

/// Body shape services use to explain a rejected request
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

/// Executes request specs against a shared transport.
///
/// Cloning is cheap; clones share the transport and the sink.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    settings: LoggingSettings,
    sink: Arc<dyn LogSink>,
}

impl Executor {
    /// Create an executor over `transport`, writing trails to stdout
    pub fn new(transport: Arc<dyn Transport>, settings: LoggingSettings) -> Self {
        Self {
            transport,
            settings,
            sink: Arc::new(StdoutSink),
        }
    }

    /// Create an executor over a default [`HttpTransport`]
    pub fn http(settings: LoggingSettings) -> Result<Self> {
        let transport = HttpTransport::new()?;
        Ok(Self::new(Arc::new(transport), settings))
    }

    /// Create an executor over a default [`HttpTransport`], taking its
    /// logging settings from the layered config at `path`
    ///
    /// # Errors
    ///
    /// Fails if either config file exists but cannot be read or parsed, or
    /// if the transport cannot be built.
    pub fn from_config_file(path: impl Into<PathBuf>) -> Result<Self> {
        let config = LayeredConfig::load(path)?;
        Self::http(LoggingSettings::from_provider(&config))
    }

    /// Write trails to `sink` instead of stdout
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Settings every outcome created by this executor starts with
    pub fn settings(&self) -> &LoggingSettings {
        &self.settings
    }

    /// Run `spec` to completion.
    ///
    /// Never fails: the returned outcome says whether the call succeeded,
    /// with the last status code and response message seen and a trail of
    /// every attempt. The outcome is not flushed.
    pub async fn execute(&self, spec: &RequestSpec) -> Outcome {
        let started = Instant::now();
        let mut outcome = Outcome::with_sink(self.settings.clone(), Arc::clone(&self.sink));
        outcome.debug(format!(
            "Request called for method: {}, url: {}",
            spec.method, spec.url
        ));

        let body = match spec.serialize_body() {
            Ok(body) => body,
            Err(err) => {
                outcome.error(format!("Error serializing request body. err: {}", err));
                log_finished(
                    spec.operation.as_deref(),
                    &spec.url,
                    false,
                    0,
                    0,
                    started.elapsed(),
                );
                return outcome;
            }
        };
        if let Some(body) = &body {
            outcome.debug(format!(
                "Request body to send: {}",
                String::from_utf8_lossy(body)
            ));
        }

        let schedule = spec.schedule();
        let mut attempts = 0;
        let mut step = Step::Retry;
        while schedule.has_remaining(attempts) {
            schedule.wait_before(attempts).await;

            let span =
                attempt_span(spec.operation.as_deref(), &spec.method, &spec.url, attempts);
            step = self
                .attempt(spec, body.clone(), &mut outcome)
                .instrument(span)
                .await;
            attempts += 1;

            if step != Step::Retry {
                break;
            }
        }

        match step {
            Step::Succeeded => outcome.succeed(),
            Step::Abort => outcome.fail(),
            Step::Retry => {
                outcome.error(format!(
                    "Unable to get a good response for url: {}",
                    spec.url
                ));
                outcome.fail();
            }
        }

        log_finished(
            spec.operation.as_deref(),
            &spec.url,
            outcome.was_successful(),
            outcome.status_code(),
            attempts,
            started.elapsed(),
        );
        outcome
    }

    /// Run `spec` in the background, merge its outcome into `parent`, then
    /// flush `parent`.
    ///
    /// `parent` is usually a child created with
    /// [`Outcome::create_child`], so the call's trail reaches the caller's
    /// tree once it is done. Must be called within a Tokio runtime.
    pub fn execute_async(&self, spec: RequestSpec, mut parent: Outcome) -> JoinHandle<()> {
        let executor = self.clone();
        tokio::spawn(async move {
            let outcome = executor.execute(&spec).await;
            parent.merge_with_result(outcome);
            if let Some(report) = parent.flush().wait().await {
                tracing::trace!(delivery = ?report.delivery, "async request outcome flushed");
            }
        })
    }

    async fn attempt(
        &self,
        spec: &RequestSpec,
        body: Option<Vec<u8>>,
        outcome: &mut Outcome,
    ) -> Step {
        let request = spec.build_request(body);
        outcome.debug_message("Starting request");

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                outcome.error(format!(
                    "Error doing request. method: {} url: {} err: {}",
                    spec.method, spec.url, err
                ));
                return Step::Retry;
            }
        };
        outcome.debug_message("Finished request");

        let status = response.status;
        outcome.set_status_code(status);

        let descriptor = match spec.valid_responses.get(&status) {
            Some(descriptor) => descriptor,
            None => return self.reject(spec, response, outcome).await,
        };
        outcome.debug(format!("Good status code returned. status code: {}", status));

        match descriptor {
            None => Step::Succeeded,
            Some(PayloadDescriptor::RawBytes(slot)) => match response.body.bytes().await {
                Ok(bytes) => {
                    slot.fill(bytes);
                    Step::Succeeded
                }
                Err(err) => {
                    outcome.error(format!(
                        "Bad response body returned for url: {} err: {}",
                        spec.url, err
                    ));
                    Step::Retry
                }
            },
            Some(PayloadDescriptor::Typed(typed)) => {
                let bytes = match response.body.bytes().await {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        outcome.error(format!(
                            "Bad response body returned for url: {} err: {}",
                            spec.url, err
                        ));
                        return Step::Retry;
                    }
                };

                let staged = match typed.decode(&bytes) {
                    Ok(staged) => staged,
                    Err(err) => {
                        outcome.error(format!(
                            "Bad response body returned for url: {} body: {} err: {}",
                            spec.url,
                            String::from_utf8_lossy(&bytes),
                            err
                        ));
                        return Step::Retry;
                    }
                };
                self.log_body(spec, &bytes, outcome);

                if let Err(err) = staged.validate() {
                    outcome.error(format!(
                        "Expected response body returned invalid payload with error: {}",
                        err
                    ));
                    return Step::Retry;
                }
                staged.commit();
                Step::Succeeded
            }
        }
    }

    /// Record a non-whitelisted response and decide whether to try again.
    async fn reject(
        &self,
        spec: &RequestSpec,
        response: HttpResponse,
        outcome: &mut Outcome,
    ) -> Step {
        let status = response.status;
        let text = match response.body.text().await {
            Ok(text) => text,
            Err(err) => {
                outcome.debug(format!("Could not read response body. err: {}", err));
                String::new()
            }
        };

        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .map(|body| body.error)
            .filter(|error| !error.is_empty())
            .unwrap_or_else(|| text.clone());
        outcome.set_response_message(message);
        outcome.info(format!(
            "Bad response code returned for url: {} valid http responses: {} http response code returned: {} response body: {}",
            spec.url,
            spec.describe_valid_responses(),
            status,
            text
        ));

        if status == 401 || status == 403 {
            outcome.debug("Authentication rejected, not retrying");
            Step::Abort
        } else {
            Step::Retry
        }
    }

    fn log_body(&self, spec: &RequestSpec, body: &[u8], outcome: &mut Outcome) {
        let text = String::from_utf8_lossy(body);
        if self.settings.debug {
            outcome.debug(format!("Response body returned: {}", text));
        } else if text.chars().count() > spec.response_log_limit {
            let shown: String = text.chars().take(spec.response_log_limit).collect();
            outcome.info(format!(
                "Response body returned (first {} characters, enable debug logging for the rest): {}",
                spec.response_log_limit, shown
            ));
        } else {
            outcome.info(format!("Response body returned: {}", text));
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("settings", &self.settings)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}
