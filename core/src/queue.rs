//! The designated context completions run on.
//!
//! # Design
//! A `CallbackQueue` is a dedicated, named OS thread draining boxed jobs in
//! FIFO order. Every completion, whether it comes from the real transport,
//! the mock simulator or an early build failure, is dispatched here, so
//! callers get one threading contract regardless of path and never run on
//! the thread that called `execute`.
//!
//! A panicking job is caught and logged; the queue keeps serving later jobs.
//!
//! Request tasks run on the caller's Tokio runtime when there is one. Calls
//! made outside any runtime fall back to a lazily built, process-wide
//! `netkit-io` runtime.

use std::fmt;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use once_cell::sync::Lazy;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc;
use tracing::{error, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub const MAIN_QUEUE_NAME: &str = "netkit-main";

static MAIN: Lazy<CallbackQueue> = Lazy::new(|| {
    CallbackQueue::new(MAIN_QUEUE_NAME).unwrap_or_else(|err| {
        panic!("failed to spawn the {MAIN_QUEUE_NAME} callback thread: {err}")
    })
});

pub const IO_THREAD_NAME: &str = "netkit-io";

static FALLBACK: Lazy<Result<Runtime, String>> = Lazy::new(|| {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name(IO_THREAD_NAME)
        .enable_all()
        .build()
        .map_err(|err| err.to_string())
});

/// The runtime request tasks are spawned on.
pub(crate) fn runtime_handle() -> io::Result<Handle> {
    if let Ok(handle) = Handle::try_current() {
        return Ok(handle);
    }
    match &*FALLBACK {
        Ok(runtime) => Ok(runtime.handle().clone()),
        Err(err) => Err(io::Error::new(
            io::ErrorKind::Other,
            format!("failed to start the {IO_THREAD_NAME} runtime: {err}"),
        )),
    }
}

#[derive(Clone)]
pub struct CallbackQueue {
    name: Arc<str>,
    sender: mpsc::UnboundedSender<Job>,
}

impl CallbackQueue {
    /// Spawn a new queue thread called `name`.
    pub fn new(name: &str) -> io::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let thread_name = name.to_string();
        thread::Builder::new().name(thread_name.clone()).spawn(move || {
            while let Some(job) = receiver.blocking_recv() {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!(queue = %thread_name, "completion panicked");
                }
            }
        })?;
        Ok(Self {
            name: Arc::from(name),
            sender,
        })
    }

    /// The process-wide default queue.
    pub fn main() -> Self {
        MAIN.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.sender.send(Box::new(job)).is_err() {
            warn!(queue = %self.name, "callback queue is gone, dropping completion");
        }
    }
}

impl Default for CallbackQueue {
    fn default() -> Self {
        Self::main()
    }
}

impl fmt::Debug for CallbackQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackQueue").field("name", &self.name).finish()
    }
}
