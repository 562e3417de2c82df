//! Tracing of step invocations and outcomes.
//!
//! The engine reports every invocation and every outcome through a
//! [`StepTracer`]. [`LogTracer`] turns them into `tracing` events; formatting
//! and collection are left to whatever subscriber the host installs.

use crate::binding::MethodIdentity;
use crate::config::BindingConfig;
use crate::outcome::Outcome;
use crate::value::Arguments;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Receives binding identities, arguments, durations and outcomes.
#[cfg_attr(test, mockall::automock)]
pub trait StepTracer: Send + Sync {
    /// Called right before a step implementation or transformation is
    /// invoked.
    fn trace_invocation(&self, binding: &MethodIdentity, arguments: &Arguments);

    /// Called once per request with its final outcome.
    fn trace_outcome(&self, text: &str, outcome: &Outcome);
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Tracer emitting `tracing` events.
#[derive(Debug, Clone)]
pub struct LogTracer {
    trace_timings: bool,
    min_traced_duration: Duration,
    trace_successful_steps: bool,
}

impl LogTracer {
    /// Build a tracer honouring the timing and success settings of `config`.
    #[must_use]
    pub const fn new(config: &BindingConfig) -> Self {
        Self {
            trace_timings: config.trace_timings(),
            min_traced_duration: config.min_traced_duration(),
            trace_successful_steps: config.trace_successful_steps(),
        }
    }

    fn should_trace_timing(&self, duration: Duration) -> bool {
        self.trace_timings && duration >= self.min_traced_duration
    }
}

impl Default for LogTracer {
    fn default() -> Self {
        Self::new(&BindingConfig::default())
    }
}

impl StepTracer for LogTracer {
    fn trace_invocation(&self, binding: &MethodIdentity, arguments: &Arguments) {
        debug!(binding = %binding, arguments = ?arguments.as_slice(), "invoking step");
    }

    fn trace_outcome(&self, text: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Success(success) => {
                if self.trace_successful_steps {
                    debug!(binding = %success.binding, step = text, "step succeeded");
                }
                if self.should_trace_timing(success.duration) {
                    info!(
                        binding = %success.binding,
                        duration_ms = millis(success.duration),
                        "step timing"
                    );
                }
            }
            Outcome::BindingFailure(failure) => {
                warn!(step = text, kind = ?failure.kind(), error = %failure, "step binding failed");
            }
            Outcome::ExecutionFailure(failure) => {
                error!(
                    binding = %failure.binding,
                    step = text,
                    duration_ms = millis(failure.duration),
                    error = %failure.error,
                    "step execution failed"
                );
                if self.should_trace_timing(failure.duration) {
                    info!(
                        binding = %failure.binding,
                        duration_ms = millis(failure.duration),
                        "step timing"
                    );
                }
            }
        }
    }
}

/// Tracer that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentTracer;

impl StepTracer for SilentTracer {
    fn trace_invocation(&self, _binding: &MethodIdentity, _arguments: &Arguments) {}

    fn trace_outcome(&self, _text: &str, _outcome: &Outcome) {}
}
