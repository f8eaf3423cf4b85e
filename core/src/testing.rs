//! Transports and helpers shared by the unit tests.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportResponse};

/// Wait for a completion to report back, failing the test after 5 seconds.
pub(crate) async fn recv<T>(rx: oneshot::Receiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("completion did not fire in time")
        .expect("completion was dropped")
}

/// Answers every request with a canned response and records what it saw.
#[derive(Clone)]
pub(crate) struct StubTransport {
    status: u16,
    data: Option<Bytes>,
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<HttpRequest>>>,
}

impl StubTransport {
    pub(crate) fn ok(status: u16, data: Option<&'static [u8]>) -> Self {
        Self {
            status,
            data: data.map(Bytes::from_static),
            calls: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<HttpRequest> {
        self.last.lock().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(request);
        Ok(TransportResponse {
            response: HttpResponse {
                status: self.status,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
            },
            data: self.data.clone(),
        })
    }
}

/// Always fails with a connection error.
pub(crate) struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn send(&self, _request: HttpRequest) -> Result<TransportResponse, TransportError> {
        Err(TransportError::other(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

/// Never answers. Records when a send starts and when its future is dropped.
#[derive(Clone, Default)]
pub(crate) struct PendingTransport {
    started: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

impl PendingTransport {
    pub(crate) fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for PendingTransport {
    async fn send(&self, _request: HttpRequest) -> Result<TransportResponse, TransportError> {
        self.started.store(true, Ordering::SeqCst);
        let _flag = DropFlag(Arc::clone(&self.dropped));
        futures::future::pending::<()>().await;
        unreachable!("pending transport never resolves")
    }
}
