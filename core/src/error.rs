//! Error types for request execution.
//!
//! # Design
//! Every failure reaches the caller through the completion's `Result`; none
//! is thrown across the async boundary. `NetworkError` wraps the leaf cause
//! together with the `NetworkResponse` observed when it happened, so callers
//! can inspect the request that was sent or the body that failed to decode.
//!
//! Timeouts get first-class treatment: `is_timeout()` answers for both the
//! mock simulator's `StubError` and transport-level timeouts, and the stub
//! error carries its duration as data rather than only in its message.

use std::io;

use thiserror::Error;

use crate::http::NetworkResponse;

pub type Result<T, E = NetworkError> = std::result::Result<T, E>;

/// Classification of a `NetworkError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RequestBuild,
    EmptyBody,
    Decode,
    Transport,
    Timeout,
    Cancelled,
}

/// Errors delivered to completion callbacks.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The descriptor could not be turned into a request. Nothing was sent.
    #[error("failed to build request: {source}")]
    Build {
        source: BuildError,
        response: NetworkResponse,
    },

    /// A response arrived without a body.
    #[error("response data is nil")]
    DataIsNil(NetworkResponse),

    /// The body did not match the expected type.
    #[error("failed to decode response: {source}")]
    Decode {
        source: DecodeError,
        response: NetworkResponse,
    },

    /// The underlying transport failed.
    #[error("transport error: {source}")]
    Transport {
        source: TransportError,
        response: NetworkResponse,
    },

    /// The mock simulator gave up waiting.
    #[error("{source}")]
    Timeout {
        source: StubError,
        response: NetworkResponse,
    },

    /// The request was abandoned before producing a result.
    #[error("request was cancelled")]
    Cancelled,
}

impl NetworkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NetworkError::Build { .. } => ErrorKind::RequestBuild,
            NetworkError::DataIsNil(_) => ErrorKind::EmptyBody,
            NetworkError::Decode { .. } => ErrorKind::Decode,
            NetworkError::Transport { source, .. } if source.is_timeout() => ErrorKind::Timeout,
            NetworkError::Transport { .. } => ErrorKind::Transport,
            NetworkError::Timeout { .. } => ErrorKind::Timeout,
            NetworkError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    /// Duration carried by a simulated timeout.
    pub fn timeout_seconds(&self) -> Option<u64> {
        match self {
            NetworkError::Timeout { source, .. } => Some(source.seconds()),
            _ => None,
        }
    }

    /// The response observed when the failure happened, if any.
    pub fn response(&self) -> Option<&NetworkResponse> {
        match self {
            NetworkError::Build { response, .. }
            | NetworkError::DataIsNil(response)
            | NetworkError::Decode { response, .. }
            | NetworkError::Transport { response, .. }
            | NetworkError::Timeout { response, .. } => Some(response),
            NetworkError::Cancelled => None,
        }
    }
}

/// Failure to turn a descriptor into a concrete request.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("url {0:?} cannot carry a path")]
    CannotBeABase(String),

    #[error("parameter encoding failed: {0}")]
    Encoding(String),

    #[error("parameter serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to decode a response body.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

impl DecodeError {
    /// True when the body was not valid JSON at all, as opposed to valid JSON
    /// of the wrong shape.
    pub fn is_syntax(&self) -> bool {
        match self {
            DecodeError::Json(err) => {
                matches!(err.classify(), serde_json::error::Category::Syntax | serde_json::error::Category::Eof)
            }
            DecodeError::Custom(_) => false,
        }
    }
}

/// Failure reported by a `Transport`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        TransportError::Other(err.into())
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Reqwest(err) => err.is_timeout(),
            TransportError::Other(err) => err
                .downcast_ref::<io::Error>()
                .is_some_and(|err| err.kind() == io::ErrorKind::TimedOut),
        }
    }
}

/// Errors synthesized by the mock simulator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StubError {
    #[error("stub timeout for {0} seconds")]
    Timeout(u64),
}

impl StubError {
    pub fn seconds(&self) -> u64 {
        match self {
            StubError::Timeout(secs) => *secs,
        }
    }

    pub fn kind(&self) -> io::ErrorKind {
        match self {
            StubError::Timeout(_) => io::ErrorKind::TimedOut,
        }
    }

    /// Structured details, keyed the way stub errors have always been keyed.
    pub fn user_info(&self) -> (&'static str, String) {
        ("StubInfo", format!("Timeout for {} seconds", self.seconds()))
    }
}

impl From<StubError> for io::Error {
    fn from(err: StubError) -> Self {
        io::Error::new(err.kind(), err)
    }
}
