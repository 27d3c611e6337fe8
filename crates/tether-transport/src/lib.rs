//! Transport abstraction layer for tether
//!
//! Provides a trait-based transport abstraction so that the request executor
//! can be driven by a real HTTP client or by an in-memory stand-in.
//!
//! # Architecture
//!
//! - **Transport trait**: Generic interface for any transport implementation
//! - **HTTP transport**: Client via reqwest
//! - **Response bodies**: Lazily read, individually fallible
//! - **Error handling**: One error type across transports

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Usage
//!
//! ```ignore
//! use tether_transport::{HttpRequest, HttpTransport, Transport};
//!
//! let transport = HttpTransport::new()?;
//! let request = HttpRequest::new("GET", "https://accounts.internal/v1/users/42");
//! let response = transport.send(request).await?;
//! let body = response.body.text().await?;
//! ```

pub mod body;
pub mod error;
pub mod http;
pub mod traits;

// Re-export commonly used types
pub use body::ResponseBody;
pub use error::{Result, TransportError};
pub use http::{HttpTransport, HttpTransportConfig};
pub use traits::{HttpRequest, HttpResponse, Transport};
