//! The request execution pipeline.
//!
//! # Design
//! `execute` runs one attempt per call:
//!
//! 1. build the concrete request from the descriptor (failures are delivered
//!    as `NetworkError::Build` and nothing is sent);
//! 2. apply `prepare`, then let `will_send` observe the result;
//! 3. dispatch to the mock simulator when the policy has a constructor,
//!    otherwise to the transport;
//! 4. run `process` then `did_receive` on whatever response came back;
//! 5. decode the body;
//! 6. hand the result to the completion on the callback queue.
//!
//! Steps 3–5 run on a spawned tokio task: on the caller's runtime when
//! there is one, otherwise on the crate's own `netkit-io` runtime. Only the
//! transport path returns a `RequestHandle`; cancelling it drops the
//! in-flight send and suppresses the completion. Cancelled requests skip the
//! response hooks and `map_error`. Mock timers cannot be cancelled.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Configuration;
use crate::decode::decode;
use crate::descriptor::Requestable;
use crate::error::{NetworkError, Result, TransportError};
use crate::http::NetworkResponse;
use crate::queue;
use crate::transport::TransportResponse;

/// A completion callback that can only be invoked once.
pub struct Completion<T> {
    callback: Box<dyn FnOnce(Result<T>) + Send + 'static>,
}

impl<T> Completion<T> {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn complete(self, result: Result<T>) {
        (self.callback)(result)
    }
}

/// Cancels an in-flight transport request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: Uuid,
    token: CancellationToken,
}

impl RequestHandle {
    /// Identifier recorded on the request's tracing span.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stop the request. If the completion has not run yet, it never will.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Execute the request described by `descriptor`. May be called with or
/// without a Tokio runtime.
pub fn execute<R, T>(descriptor: &R, completion: Completion<T>) -> Option<RequestHandle>
where
    R: Requestable + ?Sized,
    T: DeserializeOwned + Send + 'static,
{
    let config = descriptor.configuration();
    let id = Uuid::new_v4();

    let request = match descriptor.as_request() {
        Ok(request) => request,
        Err(source) => {
            warn!(%id, error = %source, "failed to build request");
            let error = NetworkError::Build {
                source,
                response: NetworkResponse::empty(),
            };
            deliver(&config, None, completion, Err(error));
            return None;
        }
    };

    let request = (config.prepare)(request);
    let span = debug_span!("request", %id, method = %request.method, url = %request.url);
    span.in_scope(|| (config.will_send)(&request));

    let runtime = match queue::runtime_handle() {
        Ok(runtime) => runtime,
        Err(err) => {
            span.in_scope(|| warn!(error = %err, "no runtime to run the request on"));
            let error = NetworkError::Transport {
                source: TransportError::other(err),
                response: NetworkResponse::new(Some(request), None, None),
            };
            deliver(&config, None, completion, Err(error));
            return None;
        }
    };

    match config.mock_policy.mock_constructor().cloned() {
        Some(constructor) => {
            let behavior = constructor(&request);
            span.in_scope(|| debug!(?behavior, "dispatching to mock simulator"));
            runtime.spawn(
                async move {
                    let result = match config.simulator.run(&request, behavior).await {
                        Ok(response) => receive(&config, response),
                        Err(source) => {
                            debug!(seconds = source.seconds(), "mock request timed out");
                            Err(NetworkError::Timeout {
                                source,
                                response: NetworkResponse::new(Some(request), None, None),
                            })
                        }
                    };
                    deliver(&config, None, completion, result);
                }
                .instrument(span),
            );
            None
        }
        None => {
            let token = CancellationToken::new();
            let handle = RequestHandle {
                id,
                token: token.clone(),
            };
            span.in_scope(|| debug!("dispatching to transport"));
            runtime.spawn(
                async move {
                    let sent = tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            debug!("request cancelled before a response arrived");
                            return;
                        }
                        sent = config.transport.send(request.clone()) => sent,
                    };
                    if token.is_cancelled() {
                        debug!("request cancelled as its response arrived");
                        return;
                    }
                    let result = match sent {
                        Ok(TransportResponse { response, data }) => {
                            debug!(
                                status = response.status,
                                content_type = response.header("content-type"),
                                "transport responded"
                            );
                            receive(
                                &config,
                                NetworkResponse::new(Some(request), Some(response), data),
                            )
                        }
                        Err(source) => {
                            debug!(error = %source, "transport failed");
                            Err(NetworkError::Transport {
                                source,
                                response: NetworkResponse::new(Some(request), None, None),
                            })
                        }
                    };
                    deliver(&config, Some(token), completion, result);
                }
                .instrument(span),
            );
            Some(handle)
        }
    }
}

/// Response hooks and decoding, shared by the transport and mock paths.
fn receive<T: DeserializeOwned>(config: &Configuration, response: NetworkResponse) -> Result<T> {
    let response = (config.process)(response);
    (config.did_receive)(&response);

    let Some(data) = response.data.clone() else {
        return Err(NetworkError::DataIsNil(response));
    };
    decode(config.decoder.as_ref(), &data).map_err(|source| NetworkError::Decode { source, response })
}

fn deliver<T: Send + 'static>(
    config: &Configuration,
    token: Option<CancellationToken>,
    completion: Completion<T>,
    result: Result<T>,
) {
    if token.as_ref().is_some_and(CancellationToken::is_cancelled) {
        debug!("dropping result of cancelled request");
        return;
    }
    let result = result.map_err(|error| (config.map_error)(error));
    config.callback_queue.dispatch(move || {
        if token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            debug!("dropping result of cancelled request");
            return;
        }
        completion.complete(result);
    });
}
