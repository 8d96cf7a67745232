//! Backend API surface
//!
//! Every backend call is a JSON POST of a request struct to a fixed path.
//! [`ApiRequest`] ties each request type to its path and response type so
//! a [`Transport`] can stay generic. Transports move bytes; they never see
//! key material in the clear.

mod messages;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub use messages::*;

pub trait ApiRequest: Serialize + Send + Sync {
    /// Path relative to the API base url, e.g. `/projects/create`
    const PATH: &'static str;
    type Response: DeserializeOwned + Serialize + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("HTTP status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Default(#[from] anyhow::Error),
}

impl TransportError {
    /// Map an HTTP status and body onto the error kinds callers branch on
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => TransportError::Unauthorized(message),
            404 => TransportError::NotFound(message),
            409 => TransportError::Conflict(message),
            _ => TransportError::Status { status, message },
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send<R: ApiRequest>(&self, request: &R) -> Result<R::Response, TransportError>;
}
