//! Response payload descriptors
//!
//! A [`RequestSpec`](crate::RequestSpec) maps each acceptable status code to
//! an optional [`PayloadDescriptor`] saying how that response's body is to be
//! read. Decoded values land in a [`PayloadSlot`] the caller kept when the
//! descriptor was created, and only once the value has passed validation.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// A decoded payload that can check its own contents.
///
/// Used with [`PayloadDescriptor::validated`]. A failed check consumes the
/// attempt, as a malformed body would.
pub trait Payload {
    /// Check the decoded value, returning a description of the first problem.
    fn validate(&self) -> Result<(), PayloadError>;
}

/// A payload failed its own validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PayloadError(String);

impl PayloadError {
    /// Create a validation error with the given description
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Shared destination for a decoded response payload.
///
/// Cloning a slot yields another handle to the same storage.
pub struct PayloadSlot<T> {
    value: Arc<Mutex<Option<T>>>,
}

impl<T> PayloadSlot<T> {
    fn new() -> Self {
        Self {
            value: Arc::new(Mutex::new(None)),
        }
    }

    /// Remove and return the delivered value, if any.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    /// Whether a value has been delivered and not yet taken.
    pub fn is_filled(&self) -> bool {
        self.lock().is_some()
    }

    pub(crate) fn fill(&self, value: T) {
        *self.lock() = Some(value);
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone> PayloadSlot<T> {
    /// Clone out the delivered value, leaving it in place.
    pub fn get(&self) -> Option<T> {
        self.lock().clone()
    }
}

impl<T> Clone for PayloadSlot<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> fmt::Debug for PayloadSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadSlot")
            .field("filled", &self.is_filled())
            .finish()
    }
}

/// A decoded value waiting for validation before it is delivered.
pub(crate) trait StagedPayload: Send {
    fn validate(&self) -> Result<(), PayloadError>;

    fn commit(self: Box<Self>);
}

type Validator<T> = fn(&T) -> Result<(), PayloadError>;

struct Staged<T> {
    value: T,
    slot: PayloadSlot<T>,
    validator: Option<Validator<T>>,
}

impl<T: Send> StagedPayload for Staged<T> {
    fn validate(&self) -> Result<(), PayloadError> {
        match self.validator {
            Some(check) => check(&self.value),
            None => Ok(()),
        }
    }

    fn commit(self: Box<Self>) {
        let Staged { value, slot, .. } = *self;
        slot.fill(value);
    }
}

type Decoder =
    dyn Fn(&[u8]) -> Result<Box<dyn StagedPayload>, serde_json::Error> + Send + Sync;

/// A JSON-decoded payload bound to its destination slot.
#[derive(Clone)]
pub struct TypedDescriptor {
    type_name: &'static str,
    decode: Arc<Decoder>,
}

impl TypedDescriptor {
    /// Fully qualified name of the decoded type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn decode(&self, body: &[u8]) -> Result<Box<dyn StagedPayload>, serde_json::Error> {
        (self.decode)(body)
    }
}

/// How the body of an acceptable response is read.
#[derive(Clone)]
pub enum PayloadDescriptor {
    /// Deliver the body unparsed.
    RawBytes(PayloadSlot<Bytes>),
    /// Decode the body as JSON into a typed value.
    Typed(TypedDescriptor),
}

impl PayloadDescriptor {
    /// Deliver the raw response bytes.
    pub fn raw_bytes() -> (Self, PayloadSlot<Bytes>) {
        let slot = PayloadSlot::new();
        (Self::RawBytes(slot.clone()), slot)
    }

    /// Decode the body as JSON into `T`.
    pub fn json<T>() -> (Self, PayloadSlot<T>)
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self::typed::<T>(None)
    }

    /// Decode the body as JSON into `T`, then run [`Payload::validate`].
    pub fn validated<T>() -> (Self, PayloadSlot<T>)
    where
        T: Payload + DeserializeOwned + Send + 'static,
    {
        let check: Validator<T> = |value| value.validate();
        Self::typed(Some(check))
    }

    fn typed<T>(validator: Option<Validator<T>>) -> (Self, PayloadSlot<T>)
    where
        T: DeserializeOwned + Send + 'static,
    {
        let slot = PayloadSlot::new();
        let target = slot.clone();
        let decode = move |body: &[u8]| -> Result<Box<dyn StagedPayload>, serde_json::Error> {
            let value: T = serde_json::from_slice(body)?;
            Ok(Box::new(Staged {
                value,
                slot: target.clone(),
                validator,
            }))
        };

        let descriptor = TypedDescriptor {
            type_name: std::any::type_name::<T>(),
            decode: Arc::new(decode),
        };
        (Self::Typed(descriptor), slot)
    }

    /// Short name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::RawBytes(_) => "raw bytes",
            Self::Typed(typed) => short_type_name(typed.type_name),
        }
    }
}

impl fmt::Debug for PayloadDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RawBytes(_) => f.write_str("RawBytes"),
            Self::Typed(typed) => f.debug_tuple("Typed").field(&typed.type_name).finish(),
        }
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

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

    fn typed(descriptor: &PayloadDescriptor) -> &TypedDescriptor {
        match descriptor {
            PayloadDescriptor::Typed(typed) => typed,
            other => panic!("expected typed descriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_json_descriptor_delivers_on_commit() {
        let (descriptor, slot) = PayloadDescriptor::json::<Account>();
        let staged = typed(&descriptor)
            .decode(br#"{"id":7,"name":"acme"}"#)
            .unwrap();

        assert!(!slot.is_filled());
        staged.validate().unwrap();
        staged.commit();

        assert_eq!(
            slot.get(),
            Some(Account {
                id: 7,
                name: "acme".to_string()
            })
        );
        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_decode_failure_leaves_slot_empty() {
        let (descriptor, slot) = PayloadDescriptor::json::<Account>();
        assert!(typed(&descriptor).decode(b"not json").is_err());
        assert!(!slot.is_filled());
    }

    #[test]
    fn test_validated_descriptor_runs_payload_check() {
        let (descriptor, slot) = PayloadDescriptor::validated::<Account>();
        let staged = typed(&descriptor)
            .decode(br#"{"id":7,"name":""}"#)
            .unwrap();

        let err = staged.validate().unwrap_err();
        assert_eq!(err.to_string(), "account name is empty");
        assert!(!slot.is_filled());
    }

    #[test]
    fn test_json_descriptor_skips_validation() {
        let (descriptor, _slot) = PayloadDescriptor::json::<Account>();
        let staged = typed(&descriptor)
            .decode(br#"{"id":7,"name":""}"#)
            .unwrap();
        assert!(staged.validate().is_ok());
    }

    #[test]
    fn test_describe() {
        let (raw, _) = PayloadDescriptor::raw_bytes();
        let (json, _) = PayloadDescriptor::json::<Account>();
        let (list, _) = PayloadDescriptor::json::<Vec<u32>>();

        assert_eq!(raw.describe(), "raw bytes");
        assert_eq!(json.describe(), "Account");
        assert_eq!(list.describe(), "Vec<u32>");
    }
}
