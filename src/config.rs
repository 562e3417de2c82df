//! Runtime configuration for the binding engine.

use crate::culture::{Culture, EnvProvider, SystemLocale};
use anyhow::Context;
use std::time::Duration;

/// Default lower bound for reporting step timings.
pub const DEFAULT_MIN_TRACED_DURATION: Duration = Duration::from_millis(100);
/// Environment variable enabling step timing traces.
pub const STEPBIND_TRACE_TIMINGS_ENV: &str = "STEPBIND_TRACE_TIMINGS";
/// Environment variable overriding the timing threshold, in milliseconds.
pub const STEPBIND_MIN_TRACED_DURATION_ENV: &str = "STEPBIND_MIN_TRACED_DURATION_MS";
/// Environment variable toggling traces for successful steps.
pub const STEPBIND_TRACE_SUCCESSFUL_STEPS_ENV: &str = "STEPBIND_TRACE_SUCCESSFUL_STEPS";

/// Settings shared by every step executed through one engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingConfig {
    culture: Culture,
    trace_timings: bool,
    min_traced_duration: Duration,
    trace_successful_steps: bool,
}

impl BindingConfig {
    /// Invariant culture, timings off, successful steps traced.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            culture: Culture::invariant(),
            trace_timings: false,
            min_traced_duration: DEFAULT_MIN_TRACED_DURATION,
            trace_successful_steps: true,
        }
    }

    /// Build a configuration from `STEPBIND_*` environment variables, using
    /// the system locale when no culture is configured.
    ///
    /// # Errors
    ///
    /// Returns an error when a boolean or duration variable cannot be parsed.
    pub fn from_env(env: &impl EnvProvider, system: &impl SystemLocale) -> anyhow::Result<Self> {
        let mut config = Self::new().with_culture(Culture::resolve(env, system));
        if let Some(raw) = env.var(STEPBIND_TRACE_TIMINGS_ENV) {
            config.trace_timings = parse_flag(STEPBIND_TRACE_TIMINGS_ENV, &raw)?;
        }
        if let Some(raw) = env.var(STEPBIND_MIN_TRACED_DURATION_ENV) {
            let millis: u64 = raw.trim().parse().with_context(|| {
                format!("{STEPBIND_MIN_TRACED_DURATION_ENV} must be a whole number of milliseconds, got '{raw}'")
            })?;
            config.min_traced_duration = Duration::from_millis(millis);
        }
        if let Some(raw) = env.var(STEPBIND_TRACE_SUCCESSFUL_STEPS_ENV) {
            config.trace_successful_steps = parse_flag(STEPBIND_TRACE_SUCCESSFUL_STEPS_ENV, &raw)?;
        }
        Ok(config)
    }

    /// Use `culture` for number and date parsing.
    #[must_use]
    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = culture;
        self
    }

    /// Use the culture named by `tag`, e.g. `de-DE`.
    ///
    /// # Errors
    ///
    /// Returns an error when `tag` is not a valid culture tag.
    pub fn with_culture_tag(self, tag: &str) -> anyhow::Result<Self> {
        let culture = Culture::from_tag(tag)?;
        Ok(self.with_culture(culture))
    }

    /// Enable or disable timing traces.
    #[must_use]
    pub const fn with_trace_timings(mut self, enabled: bool) -> Self {
        self.trace_timings = enabled;
        self
    }

    /// Only trace timings at or above `threshold`.
    #[must_use]
    pub const fn with_min_traced_duration(mut self, threshold: Duration) -> Self {
        self.min_traced_duration = threshold;
        self
    }

    /// Enable or disable traces for successful steps.
    #[must_use]
    pub const fn with_trace_successful_steps(mut self, enabled: bool) -> Self {
        self.trace_successful_steps = enabled;
        self
    }

    /// Culture used for primitive conversion.
    #[must_use]
    pub const fn culture(&self) -> &Culture {
        &self.culture
    }

    /// Whether timing traces are enabled.
    #[must_use]
    pub const fn trace_timings(&self) -> bool {
        self.trace_timings
    }

    /// Minimum duration worth tracing.
    #[must_use]
    pub const fn min_traced_duration(&self) -> Duration {
        self.min_traced_duration
    }

    /// Whether successful steps are traced.
    #[must_use]
    pub const fn trace_successful_steps(&self) -> bool {
        self.trace_successful_steps
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_flag(name: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{name} must be a boolean flag, got '{other}'"),
    }
}
