//! Request decoding: raw bytes → structured request.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty request")]
    Empty,
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Turns the bytes received on a connection into a request value.
pub trait RequestDecoder: Send + Sync + 'static {
    type Request: Send + 'static;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Request, DecodeError>;
}

/// Passes the received bytes through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl RequestDecoder for RawDecoder {
    type Request = Vec<u8>;

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(bytes.to_vec())
    }
}

/// Deserializes a JSON document into `T`.
#[derive(Debug)]
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> RequestDecoder for JsonDecoder<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Request = T;

    fn decode(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}
