//! Scripted transport for executor tests
//!
//! Replays a queue of canned replies and records every request it is given,
//! with the (possibly paused) Tokio clock reading at the time of the call.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tether_transport::{HttpRequest, HttpResponse, ResponseBody, Transport, TransportError};
use tokio::time::Instant;

/// One canned reply
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with a status and a readable body
    Status(u16, Bytes),
    /// Respond with a status whose body fails mid-read
    BrokenBody(u16),
    /// Fail to get a response at all
    Unreachable,
}

impl Reply {
    pub fn status(status: u16, body: impl Into<Bytes>) -> Self {
        Self::Status(status, body.into())
    }

    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self::Status(status, Bytes::from(value.to_string()))
    }
}

#[derive(Default)]
struct Recorded {
    script: VecDeque<Reply>,
    requests: Vec<HttpRequest>,
    sent_at: Vec<Instant>,
}

/// A transport that answers from a script
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<Recorded>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        let transport = Self::default();
        transport.state.lock().unwrap().script.extend(replies);
        transport
    }

    /// A transport whose every call fails
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn sent_at(&self) -> Vec<Instant> {
        self.state.lock().unwrap().sent_at.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> tether_transport::Result<HttpResponse> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request);
            state.sent_at.push(Instant::now());
            state.script.pop_front().unwrap_or(Reply::Unreachable)
        };

        match reply {
            Reply::Status(status, body) => Ok(HttpResponse::with_status(status, body)),
            Reply::BrokenBody(status) => Ok(HttpResponse::with_status(
                status,
                ResponseBody::failing("connection reset while reading body"),
            )),
            Reply::Unreachable => Err(TransportError::Connection(
                "connection refused".to_string(),
            )),
        }
    }
}
