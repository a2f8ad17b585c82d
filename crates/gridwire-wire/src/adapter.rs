//! Per-binding codec adapters.
//!
//! A [`WireAdapter`] pairs the two decoders that turn protocol values into an
//! asset's typed topic and message. The adapter is chosen once when a view is
//! bound to a connection; no type lookup happens at call time.
//!
//! Decoders report an absent value as `Ok(None)`. Callers treat that as a
//! protocol error rather than a payload.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Failure to decode a protocol value into a domain type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    /// Creates a decode error with a description of the mismatch.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Decoder from a raw protocol value to `X`.
pub type DecodeFn<X> = Arc<dyn Fn(&Value) -> Result<Option<X>, DecodeError> + Send + Sync>;

/// Topic and message decoders bound to one asset.
pub struct WireAdapter<T, M> {
    decode_topic: DecodeFn<T>,
    decode_message: DecodeFn<M>,
}

impl<T, M> WireAdapter<T, M> {
    /// Builds an adapter from explicit decoder functions.
    pub fn new<FT, FM>(decode_topic: FT, decode_message: FM) -> Self
    where
        FT: Fn(&Value) -> Result<Option<T>, DecodeError> + Send + Sync + 'static,
        FM: Fn(&Value) -> Result<Option<M>, DecodeError> + Send + Sync + 'static,
    {
        Self {
            decode_topic: Arc::new(decode_topic),
            decode_message: Arc::new(decode_message),
        }
    }

    /// Decodes a topic value.
    ///
    /// # Errors
    ///
    /// Propagates the decoder's [`DecodeError`].
    pub fn decode_topic(&self, raw: &Value) -> Result<Option<T>, DecodeError> {
        (self.decode_topic)(raw)
    }

    /// Decodes a message value.
    ///
    /// # Errors
    ///
    /// Propagates the decoder's [`DecodeError`].
    pub fn decode_message(&self, raw: &Value) -> Result<Option<M>, DecodeError> {
        (self.decode_message)(raw)
    }
}

impl<T, M> WireAdapter<T, M>
where
    T: DeserializeOwned + 'static,
    M: DeserializeOwned + 'static,
{
    /// Adapter that deserialises both values with serde.
    ///
    /// JSON `null` decodes to an absent value.
    #[must_use]
    pub fn json() -> Self {
        Self::new(decode_json::<T>, decode_json::<M>)
    }
}

fn decode_json<X: DeserializeOwned + 'static>(raw: &Value) -> Result<Option<X>, DecodeError> {
    if raw.is_null() {
        return Ok(None);
    }
    <X as Deserialize<'_>>::deserialize(raw)
        .map(Some)
        .map_err(|error| DecodeError::new(error.to_string()))
}

impl<T, M> Clone for WireAdapter<T, M> {
    fn clone(&self) -> Self {
        Self {
            decode_topic: Arc::clone(&self.decode_topic),
            decode_message: Arc::clone(&self.decode_message),
        }
    }
}

impl<T, M> fmt::Debug for WireAdapter<T, M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("WireAdapter").finish_non_exhaustive()
    }
}
