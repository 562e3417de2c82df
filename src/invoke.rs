//! Timed, panic-safe invocation of binding methods.

use crate::binding::{BindingMethod, ScenarioContext};
use crate::outcome::ExecutionFailure;
use crate::value::{Arguments, Value};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

type MonotonicClock = dyn Fn() -> Duration + Send + Sync;

/// Value returned by a successful call and the time it took.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Value returned by the body.
    pub value: Value,
    /// Time spent inside the call.
    pub duration: Duration,
}

/// Calls binding methods, measuring only the call itself.
///
/// Errors returned by the body and panics raised inside it both become an
/// [`ExecutionFailure`]; the body is never called twice.
#[derive(Clone)]
pub struct Invoker {
    clock: Arc<MonotonicClock>,
}

impl Invoker {
    /// Invoker timed by the system monotonic clock.
    #[must_use]
    pub fn new() -> Self {
        let start = Instant::now();
        Self::with_clock(move || start.elapsed())
    }

    /// Invoker timed by `clock`, which must never go backwards.
    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> Duration + Send + Sync + 'static,
    {
        Self {
            clock: Arc::new(clock),
        }
    }

    /// Call `method` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionFailure`] when the body returns an error or panics.
    pub fn invoke(
        &self,
        method: &BindingMethod,
        ctx: &mut ScenarioContext,
        args: &Arguments,
    ) -> Result<Invocation, ExecutionFailure> {
        let started = (self.clock)();
        let result = catch_unwind(AssertUnwindSafe(|| method.call(ctx, args)));
        let duration = (self.clock)().saturating_sub(started);
        let error = match result {
            Ok(Ok(value)) => return Ok(Invocation { value, duration }),
            Ok(Err(error)) => error,
            Err(payload) => anyhow::anyhow!("panicked: {}", panic_message(payload.as_ref())),
        };
        Err(ExecutionFailure {
            binding: method.identity().clone(),
            error,
            duration,
        })
    }
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
