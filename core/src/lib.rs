//! Configurable HTTP request execution with typed JSON decoding and
//! deterministic mock responses.
//!
//! # Overview
//! A caller describes an endpoint with a `Requestable` type. Executing it
//! builds a concrete `HttpRequest`, runs the configuration's hooks around a
//! single attempt on either the real `Transport` or the mock simulator,
//! decodes the body into the caller's type and delivers the result exactly
//! once on the configuration's `CallbackQueue`.
//!
//! # Design
//! - `Configuration` is a struct of shared function values passed around as
//!   `Arc<Configuration>`; it is never locked.
//! - The mock simulator reproduces timeouts, slow responses and malformed
//!   payloads on tokio timers, and its responses go through the same
//!   `process` / `did_receive` hooks as real ones.
//! - Completions are consumed by value, so a result can be delivered at
//!   most once.
//! - Callback, future and stream entry points live on `RequestableExt`.

pub mod adapters;
pub mod config;
pub mod decode;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod mock;
pub mod params;
pub mod pipeline;
pub mod queue;
pub mod transport;

#[cfg(test)]
mod testing;

pub use adapters::{ResponseFuture, ResponseStream};
pub use config::Configuration;
pub use decode::{Decoder, JsonDecoder, KeyStrategy};
pub use descriptor::{RequestDescriptor, Requestable, RequestableExt};
pub use error::{BuildError, DecodeError, ErrorKind, NetworkError, Result, StubError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, NetworkResponse};
pub use mock::{Behavior, MockPolicy, MockSimulator};
pub use params::{JsonEncoding, ParameterEncoding, Params, UrlEncoding};
pub use pipeline::{Completion, RequestHandle};
pub use queue::CallbackQueue;
pub use transport::{ReqwestTransport, Transport, TransportResponse, TransportSettings};
