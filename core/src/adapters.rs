//! Future and stream shapes over the callback pipeline.
//!
//! Both adapters park the completion in a oneshot channel. Dropping either
//! one cancels the underlying transport request; mock requests run to
//! completion regardless.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream};
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;

use crate::descriptor::Requestable;
use crate::error::{NetworkError, Result};
use crate::pipeline::{self, Completion, RequestHandle};

fn start<R, T>(descriptor: &R) -> (oneshot::Receiver<Result<T>>, Option<RequestHandle>)
where
    R: Requestable + ?Sized,
    T: DeserializeOwned + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let handle = pipeline::execute(
        descriptor,
        Completion::new(move |result| {
            let _ = sender.send(result);
        }),
    );
    (receiver, handle)
}

/// Resolves exactly once with the request's result.
///
/// Resolves to `NetworkError::Cancelled` if the request was cancelled
/// through `cancel` before it produced a result.
#[must_use = "futures do nothing unless polled; dropping this cancels the request"]
pub struct ResponseFuture<T> {
    receiver: oneshot::Receiver<Result<T>>,
    handle: Option<RequestHandle>,
}

impl<T> ResponseFuture<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub(crate) fn start<R: Requestable + ?Sized>(descriptor: &R) -> Self {
        let (receiver, handle) = start(descriptor);
        Self { receiver, handle }
    }
}

impl<T> ResponseFuture<T> {
    pub fn handle(&self) -> Option<&RequestHandle> {
        self.handle.as_ref()
    }

    pub fn cancel(&self) {
        if let Some(handle) = &self.handle {
            handle.cancel();
        }
    }
}

impl<T> Future for ResponseFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(outcome) => outcome,
        };
        self.handle = None;
        Poll::Ready(outcome.unwrap_or(Err(NetworkError::Cancelled)))
    }
}

impl<T> Drop for ResponseFuture<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

/// Yields at most one item: the value or the error. Ends without an item if
/// the request was cancelled.
#[must_use = "streams do nothing unless polled; dropping this cancels the request"]
pub struct ResponseStream<T> {
    receiver: Option<oneshot::Receiver<Result<T>>>,
    handle: Option<RequestHandle>,
}

impl<T> ResponseStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub(crate) fn start<R: Requestable + ?Sized>(descriptor: &R) -> Self {
        let (receiver, handle) = start(descriptor);
        Self {
            receiver: Some(receiver),
            handle,
        }
    }
}

impl<T> ResponseStream<T> {
    pub fn cancel(&self) {
        if let Some(handle) = &self.handle {
            handle.cancel();
        }
    }
}

impl<T> Stream for ResponseStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Poll::Ready(None);
        };
        let outcome = match Pin::new(receiver).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(outcome) => outcome,
        };
        self.receiver = None;
        self.handle = None;
        Poll::Ready(outcome.ok())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.receiver {
            Some(_) => (0, Some(1)),
            None => (0, Some(0)),
        }
    }
}

impl<T> FusedStream for ResponseStream<T> {
    fn is_terminated(&self) -> bool {
        self.receiver.is_none()
    }
}

impl<T> Drop for ResponseStream<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}
