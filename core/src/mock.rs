//! Mock responses without a network.
//!
//! # Design
//! A `MockPolicy::Custom` constructor inspects the exact request the
//! pipeline would send and picks a `Behavior`. Deciding what happens is
//! separated from making it happen: `plan` is a pure function of the
//! behavior, the request timeout and a random source, and `MockSimulator`
//! only sleeps on tokio timers according to the plan. Seeding the simulator
//! makes random delays reproducible.
//!
//! Simulated timers are not cancellable. Once a mock plan starts it runs to
//! completion.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::StubError;
use crate::http::{HttpRequest, NetworkResponse};

/// Picks the mock behavior for a prepared request.
pub type MockConstructor = Arc<dyn Fn(&HttpRequest) -> Behavior + Send + Sync>;

#[derive(Clone, Default)]
pub enum MockPolicy {
    /// Every request goes to the real transport.
    #[default]
    Never,
    /// Every request is answered by the simulator.
    Custom(MockConstructor),
}

impl MockPolicy {
    pub fn custom<F>(constructor: F) -> Self
    where
        F: Fn(&HttpRequest) -> Behavior + Send + Sync + 'static,
    {
        MockPolicy::Custom(Arc::new(constructor))
    }

    pub fn is_mock_enabled(&self) -> bool {
        matches!(self, MockPolicy::Custom(_))
    }

    pub fn mock_constructor(&self) -> Option<&MockConstructor> {
        match self {
            MockPolicy::Never => None,
            MockPolicy::Custom(constructor) => Some(constructor),
        }
    }
}

impl fmt::Debug for MockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockPolicy::Never => f.write_str("Never"),
            MockPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How the simulator answers one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// Wait a whole number of seconds drawn from `0..=bound`, then respond
    /// with `payload`. Draws at or past the request timeout time out instead,
    /// and the failure fires when the timeout elapses rather than after the
    /// drawn delay.
    RandomDelayInSeconds { bound: u64, payload: Bytes },
    /// Fail once the request timeout elapses.
    Timeout,
    /// Respond with `payload` right away. Meant for exercising decode failures.
    WrongFormat(Bytes),
}

impl Behavior {
    pub fn random_delay(bound: u64, payload: impl Into<Bytes>) -> Self {
        Behavior::RandomDelayInSeconds {
            bound,
            payload: payload.into(),
        }
    }

    pub fn wrong_format(payload: impl Into<Bytes>) -> Self {
        Behavior::WrongFormat(payload.into())
    }
}

/// What the simulator will do for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    Respond { delay: Duration, payload: Bytes },
    TimedOut { after: Duration, seconds: u64 },
}

/// Decide the outcome of `behavior` for a request whose timeout is
/// `timeout_secs` whole seconds. A random delay draws exactly one value from
/// `rng`.
pub fn plan<R: Rng + ?Sized>(behavior: Behavior, timeout_secs: u64, rng: &mut R) -> MockOutcome {
    let timed_out = MockOutcome::TimedOut {
        after: Duration::from_secs(timeout_secs),
        seconds: timeout_secs,
    };
    match behavior {
        Behavior::Timeout => timed_out,
        Behavior::RandomDelayInSeconds { bound, payload } => {
            let delay = rng.gen_range(0..=bound);
            if delay >= timeout_secs {
                timed_out
            } else {
                MockOutcome::Respond {
                    delay: Duration::from_secs(delay),
                    payload,
                }
            }
        }
        Behavior::WrongFormat(payload) => MockOutcome::Respond {
            delay: Duration::ZERO,
            payload,
        },
    }
}

/// Runs mock plans on tokio timers.
#[derive(Clone)]
pub struct MockSimulator {
    rng: Arc<Mutex<StdRng>>,
}

impl MockSimulator {
    pub fn from_entropy() -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub fn plan(&self, behavior: Behavior, timeout_secs: u64) -> MockOutcome {
        let mut rng = self.rng.lock();
        plan(behavior, timeout_secs, &mut *rng)
    }

    /// Produce the simulated response for `request`.
    ///
    /// The response carries the request and the payload but no protocol
    /// metadata.
    pub async fn run(
        &self,
        request: &HttpRequest,
        behavior: Behavior,
    ) -> Result<NetworkResponse, StubError> {
        match self.plan(behavior, request.timeout_secs()) {
            MockOutcome::Respond { delay, payload } => {
                debug!(delay_secs = delay.as_secs(), "mock response scheduled");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(NetworkResponse::new(Some(request.clone()), None, Some(payload)))
            }
            MockOutcome::TimedOut { after, seconds } => {
                debug!(seconds, "mock timeout scheduled");
                tokio::time::sleep(after).await;
                Err(StubError::Timeout(seconds))
            }
        }
    }
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl fmt::Debug for MockSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSimulator").finish_non_exhaustive()
    }
}
