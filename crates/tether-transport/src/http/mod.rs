//! HTTP transport implementation
//!
//! Provides a reqwest-based client that implements the Transport trait.

pub mod client;

pub use client::{HttpTransport, HttpTransportConfig};
