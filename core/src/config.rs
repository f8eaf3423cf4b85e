//! Hooks, decoder, mock policy and transport shared by many requests.
//!
//! # Design
//! `Configuration` is a struct of reference-counted function values. It is
//! shared through `Arc<Configuration>` and never mutated in place: each
//! `execute` captures the `Arc` its descriptor hands out at call time.
//! Swapping a descriptor's configuration only affects requests started
//! afterwards, and nothing serialises concurrent swaps. Last writer wins.
//!
//! Hook order for one execution:
//! `prepare` → `will_send` → (transport | simulator) → `process` →
//! `did_receive` → decode → `map_error` (failures only) → completion.

use std::fmt;
use std::sync::Arc;

use crate::decode::{Decoder, JsonDecoder};
use crate::error::NetworkError;
use crate::http::{HttpRequest, NetworkResponse};
use crate::mock::{MockPolicy, MockSimulator};
use crate::queue::CallbackQueue;
use crate::transport::{ReqwestTransport, Transport};

pub type Prepare = Arc<dyn Fn(HttpRequest) -> HttpRequest + Send + Sync>;
pub type WillSend = Arc<dyn Fn(&HttpRequest) + Send + Sync>;
pub type DidReceive = Arc<dyn Fn(&NetworkResponse) + Send + Sync>;
pub type Process = Arc<dyn Fn(NetworkResponse) -> NetworkResponse + Send + Sync>;
pub type MapError = Arc<dyn Fn(NetworkError) -> NetworkError + Send + Sync>;

#[derive(Clone)]
pub struct Configuration {
    pub mock_policy: MockPolicy,
    /// Transforms the built request before it is sent.
    pub prepare: Prepare,
    /// Observes the prepared request.
    pub will_send: WillSend,
    /// Observes the processed response.
    pub did_receive: DidReceive,
    /// Transforms the raw response before decoding.
    pub process: Process,
    /// Runs on every failure right before it is delivered.
    pub map_error: MapError,
    pub decoder: Arc<dyn Decoder>,
    pub simulator: MockSimulator,
    pub transport: Arc<dyn Transport>,
    pub callback_queue: CallbackQueue,
}

impl Configuration {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            mock_policy: MockPolicy::Never,
            prepare: Arc::new(|request: HttpRequest| request),
            will_send: Arc::new(|_: &HttpRequest| {}),
            did_receive: Arc::new(|_: &NetworkResponse| {}),
            process: Arc::new(|response: NetworkResponse| response),
            map_error: Arc::new(|error: NetworkError| error),
            decoder: Arc::new(JsonDecoder::default()),
            simulator: MockSimulator::default(),
            transport,
            callback_queue: CallbackQueue::main(),
        }
    }

    pub fn with_mock_policy(mut self, mock_policy: MockPolicy) -> Self {
        self.mock_policy = mock_policy;
        self
    }

    pub fn with_prepare<F>(mut self, prepare: F) -> Self
    where
        F: Fn(HttpRequest) -> HttpRequest + Send + Sync + 'static,
    {
        self.prepare = Arc::new(prepare);
        self
    }

    pub fn with_will_send<F>(mut self, will_send: F) -> Self
    where
        F: Fn(&HttpRequest) + Send + Sync + 'static,
    {
        self.will_send = Arc::new(will_send);
        self
    }

    pub fn with_did_receive<F>(mut self, did_receive: F) -> Self
    where
        F: Fn(&NetworkResponse) + Send + Sync + 'static,
    {
        self.did_receive = Arc::new(did_receive);
        self
    }

    pub fn with_process<F>(mut self, process: F) -> Self
    where
        F: Fn(NetworkResponse) -> NetworkResponse + Send + Sync + 'static,
    {
        self.process = Arc::new(process);
        self
    }

    pub fn with_map_error<F>(mut self, map_error: F) -> Self
    where
        F: Fn(NetworkError) -> NetworkError + Send + Sync + 'static,
    {
        self.map_error = Arc::new(map_error);
        self
    }

    pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn with_simulator(mut self, simulator: MockSimulator) -> Self {
        self.simulator = simulator;
        self
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_callback_queue(mut self, callback_queue: CallbackQueue) -> Self {
        self.callback_queue = callback_queue;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestTransport::default()))
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("mock_policy", &self.mock_policy)
            .field("callback_queue", &self.callback_queue)
            .finish_non_exhaustive()
    }
}
