//! Retry state machine tests against a scripted transport

mod common;

use common::{Reply, ScriptedTransport};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tether::{
    AuthFormatter, Executor, Payload, PayloadDescriptor, PayloadError, RequestFactory, RequestSpec,
};
use tether_core::{Level, LoggingSettings, MemorySink, Outcome};

const URL: &str = "https://accounts.internal/v1/accounts/7";

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Account {
    id: u64,
    name: String,
}

impl Payload for Account {
    fn validate(&self) -> Result<(), PayloadError> {
        if self.name.is_empty() {
            return Err(PayloadError::new("account name is empty"));
        }
        Ok(())
    }
}

struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("cannot serialize"))
    }
}

fn executor(transport: &ScriptedTransport, settings: LoggingSettings) -> Executor {
    Executor::new(Arc::new(transport.clone()), settings).with_sink(Arc::new(MemorySink::new()))
}

fn spec() -> RequestSpec {
    RequestFactory::new("billing").get(URL)
}

fn has_message(outcome: &Outcome, needle: &str) -> bool {
    outcome.messages().iter().any(|m| m.contains(needle))
}

#[tokio::test(start_paused = true)]
async fn test_transport_errors_use_every_attempt() {
    let transport = ScriptedTransport::unreachable();
    let spec = spec().num_tries(3).delay_between_tries(Duration::from_millis(100));

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec)
        .await;

    assert!(!outcome.was_successful());
    assert_eq!(outcome.level(), Level::Error);
    assert_eq!(transport.calls(), 3);
    assert!(has_message(&outcome, "connection refused"));
    assert!(has_message(
        &outcome,
        &format!("Unable to get a good response for url: {}", URL)
    ));

    let sent_at = transport.sent_at();
    assert_eq!(sent_at[1] - sent_at[0], Duration::from_millis(100));
    assert_eq!(sent_at[2] - sent_at[0], Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_zero_tries_still_makes_one_attempt() {
    let transport = ScriptedTransport::unreachable();
    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec().num_tries(0))
        .await;

    assert!(!outcome.was_successful());
    assert_eq!(transport.calls(), 1);
}

#[rstest]
#[case(401)]
#[case(403)]
#[tokio::test(start_paused = true)]
async fn test_auth_rejection_stops_retrying(#[case] status: u16) {
    let transport = ScriptedTransport::new([
        Reply::json(status, json!({"error": "not allowed"})),
        Reply::status(200, ""),
    ]);

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec().num_tries(3))
        .await;

    assert!(!outcome.was_successful());
    assert_eq!(transport.calls(), 1);
    assert_eq!(outcome.status_code(), status);
    assert_eq!(outcome.response_message(), "not allowed");
    assert_eq!(outcome.level(), Level::Info);
    assert!(!has_message(&outcome, "Unable to get a good response"));
}

#[tokio::test]
async fn test_whitelisted_status_without_payload_succeeds() {
    let transport = ScriptedTransport::new([Reply::status(204, "ignored, never read")]);

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec())
        .await;

    assert!(outcome.was_successful());
    assert_eq!(outcome.status_code(), 204);
    assert_eq!(outcome.level(), Level::None);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_error_body_becomes_response_message() {
    let transport = ScriptedTransport::new([Reply::json(500, json!({"error": "boom"}))]);

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec())
        .await;

    assert!(!outcome.was_successful());
    assert_eq!(outcome.status_code(), 500);
    assert_eq!(outcome.response_message(), "boom");
    assert!(has_message(&outcome, "http response code returned: 500"));
    assert!(has_message(&outcome, "valid http responses: [200, 201, 204]"));
}

#[tokio::test]
async fn test_non_json_error_body_is_kept_verbatim() {
    let transport = ScriptedTransport::new([Reply::status(502, "bad gateway")]);

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec())
        .await;

    assert_eq!(outcome.status_code(), 502);
    assert_eq!(outcome.response_message(), "bad gateway");
}

#[tokio::test(start_paused = true)]
async fn test_retry_then_typed_success() {
    let transport = ScriptedTransport::new([
        Reply::json(500, json!({"error": "warming up"})),
        Reply::json(200, json!({"id": 7, "name": "acme"})),
    ]);
    let (account, slot) = PayloadDescriptor::json::<Account>();

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec().valid_response(200, account).num_tries(3))
        .await;

    assert!(outcome.was_successful());
    assert_eq!(transport.calls(), 2);
    assert_eq!(outcome.status_code(), 200);
    assert_eq!(outcome.response_message(), "warming up");
    assert_eq!(
        slot.take(),
        Some(Account {
            id: 7,
            name: "acme".to_string()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_status_recorded_for_last_response_seen() {
    let transport = ScriptedTransport::new([Reply::status(500, "down"), Reply::Unreachable]);

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec().num_tries(2))
        .await;

    assert!(!outcome.was_successful());
    assert_eq!(transport.calls(), 2);
    assert_eq!(outcome.status_code(), 500);
}

#[tokio::test(start_paused = true)]
async fn test_validation_failure_consumes_an_attempt() {
    let transport = ScriptedTransport::new([
        Reply::json(200, json!({"id": 7, "name": ""})),
        Reply::json(200, json!({"id": 7, "name": "acme"})),
    ]);
    let (account, slot) = PayloadDescriptor::validated::<Account>();

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec().valid_response(200, account).num_tries(2))
        .await;

    assert!(outcome.was_successful());
    assert_eq!(transport.calls(), 2);
    assert_eq!(outcome.level(), Level::Error);
    assert!(has_message(&outcome, "account name is empty"));
    assert_eq!(slot.take().map(|a| a.name), Some("acme".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_payload_is_never_delivered() {
    let transport = ScriptedTransport::new([
        Reply::json(200, json!({"id": 7, "name": ""})),
        Reply::json(200, json!({"id": 8, "name": ""})),
    ]);
    let (account, slot) = PayloadDescriptor::validated::<Account>();

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec().valid_response(200, account).num_tries(2))
        .await;

    assert!(!outcome.was_successful());
    assert_eq!(transport.calls(), 2);
    assert!(!slot.is_filled());
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_body_is_retried() {
    let transport = ScriptedTransport::new([
        Reply::status(200, "<html>maintenance</html>"),
        Reply::json(200, json!({"id": 7, "name": "acme"})),
    ]);
    let (account, slot) = PayloadDescriptor::json::<Account>();

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec().valid_response(200, account).num_tries(2))
        .await;

    assert!(outcome.was_successful());
    assert!(has_message(&outcome, "<html>maintenance</html>"));
    assert!(slot.is_filled());
}

#[tokio::test(start_paused = true)]
async fn test_raw_body_read_failure_is_retried() {
    let transport = ScriptedTransport::new([
        Reply::BrokenBody(200),
        Reply::status(200, "raw payload"),
    ]);
    let (raw, slot) = PayloadDescriptor::raw_bytes();

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec().valid_response(200, raw).num_tries(2))
        .await;

    assert!(outcome.was_successful());
    assert_eq!(transport.calls(), 2);
    assert!(has_message(&outcome, "connection reset while reading body"));
    assert_eq!(slot.take().as_deref(), Some(b"raw payload".as_slice()));
}

#[tokio::test]
async fn test_serialization_failure_makes_no_attempt() {
    let transport = ScriptedTransport::new([Reply::status(200, "")]);

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec().num_tries(3).body(Unserializable))
        .await;

    assert!(!outcome.was_successful());
    assert_eq!(transport.calls(), 0);
    assert_eq!(outcome.level(), Level::Error);
    assert!(has_message(&outcome, "cannot serialize"));
}

#[tokio::test]
async fn test_long_body_is_truncated_in_trail() {
    let transport = ScriptedTransport::new([Reply::json(200, json!("abcdefghij"))]);
    let (value, _slot) = PayloadDescriptor::json::<serde_json::Value>();

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec().valid_response(200, value).response_log_limit(5))
        .await;

    assert!(outcome.was_successful());
    assert_eq!(outcome.level(), Level::Info);
    assert!(has_message(&outcome, "(first 5 characters"));
    assert!(has_message(&outcome, ": \"abcd  "));
    assert!(!has_message(&outcome, "abcdefghij"));
}

#[tokio::test]
async fn test_debug_logging_shows_whole_body() {
    let transport = ScriptedTransport::new([Reply::json(200, json!("abcdefghij"))]);
    let (value, _slot) = PayloadDescriptor::json::<serde_json::Value>();

    let outcome = executor(&transport, LoggingSettings::verbose())
        .execute(&spec().valid_response(200, value).response_log_limit(5))
        .await;

    assert!(outcome.was_successful());
    assert!(has_message(&outcome, "[Debug] Response body returned: \"abcdefghij\""));
    assert!(has_message(&outcome, "[Message] Starting request"));
}

#[tokio::test(start_paused = true)]
async fn test_every_attempt_is_fully_formatted() {
    let transport = ScriptedTransport::new([Reply::status(503, ""), Reply::status(201, "")]);
    let spec = spec()
        .method("POST")
        .body(json!({"name": "acme"}))
        .header("x-tenant", "acme")
        .formatter(AuthFormatter::new("Bearer abc"))
        .operation("create-account")
        .num_tries(2);

    let outcome = executor(&transport, LoggingSettings::default())
        .execute(&spec)
        .await;

    assert!(outcome.was_successful());
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    for request in requests {
        assert_eq!(request.method, "POST");
        assert_eq!(request.body.as_deref(), Some(br#"{"name":"acme"}"#.as_slice()));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("x-request-source"), Some("billing"));
        assert_eq!(request.header("x-tenant"), Some("acme"));
        assert_eq!(request.header("authorization"), Some("Bearer abc"));
        assert_eq!(request.operation.as_deref(), Some("create-account"));
    }
}

#[tokio::test]
async fn test_merged_outcomes_keep_latest_status() {
    let transport = ScriptedTransport::new([
        Reply::json(500, json!({"error": "boom"})),
        Reply::status(200, ""),
    ]);
    let executor = executor(&transport, LoggingSettings::default());

    let first = executor.execute(&spec()).await;
    let second = executor.execute(&spec()).await;

    let mut parent = Outcome::with_sink(LoggingSettings::default(), Arc::new(MemorySink::new()));
    parent.merge_with_result(first);
    parent.merge_with_result(second);

    assert_eq!(parent.status_code(), 200);
    assert_eq!(parent.level(), Level::Error);
}
