//! # Tether
//!
//! Server-to-server requests with:
//! - A fixed number of attempts and a fixed delay between them
//! - Per-status response payload descriptors
//! - Early exit on authentication failures (401/403)
//! - A tree-structured diagnostic trail per call, built on [`Outcome`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use serde::Deserialize;
//! use tether::{Executor, PayloadDescriptor, RequestFactory};
//! use tether_core::LoggingSettings;
//!
//! #[derive(Debug, Deserialize)]
//! struct Account {
//!     id: u64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = Executor::http(LoggingSettings::default())?;
//!     let factory = RequestFactory::new("billing");
//!
//!     let (account, slot) = PayloadDescriptor::json::<Account>();
//!     let spec = factory
//!         .get("https://accounts.internal/v1/accounts/7")
//!         .operation("load-account")
//!         .valid_response(200, account)
//!         .num_tries(3)
//!         .delay_between_tries(Duration::from_millis(250));
//!
//!     let outcome = executor.execute(&spec).await;
//!     if outcome.was_successful() {
//!         println!("{:?}", slot.take());
//!     }
//!     outcome.flush().wait().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use error::{Error, Result};
pub use executor::Executor;
pub use factory::{RequestFactory, X_REQUEST_SOURCE_HEADER};
pub use formatter::{AuthFormatter, BasicAuthFormatter, HeaderFormatter, RequestFormatter};
pub use payload::{Payload, PayloadDescriptor, PayloadError, PayloadSlot};
pub use request::{RequestBody, RequestSpec, DEFAULT_RESPONSE_LOG_LIMIT};

pub mod error;
pub mod executor;
pub mod factory;
pub mod formatter;
pub mod observability;
pub mod payload;
pub mod request;

// Re-export the crates callers need alongside the executor
pub use tether_core;
pub use tether_transport;
