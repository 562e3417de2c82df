//! Stub culture providers for tests.
//!
//! These implement the culture-resolution traits so tests can inject a
//! deterministic environment and system locale.

use stepbind::culture::{EnvProvider, STEPBIND_CULTURE_ENV, SystemLocale};
use std::collections::HashMap;

/// Stub environment holding an explicit set of variables.
#[derive(Debug, Default, Clone)]
pub struct StubEnv {
    vars: HashMap<String, String>,
}

impl StubEnv {
    /// Environment where `STEPBIND_CULTURE` is `culture`.
    pub fn with_culture(culture: impl Into<String>) -> Self {
        Self::default().with_var(STEPBIND_CULTURE_ENV, culture)
    }

    /// Add or replace one variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvProvider for StubEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Stub system locale provider.
#[derive(Debug, Default, Clone)]
pub struct StubSystemLocale {
    /// Locale reported by the stub, if any.
    pub locale: Option<String>,
}

impl StubSystemLocale {
    /// Create a stub reporting `locale`.
    pub fn with_locale(locale: impl Into<String>) -> Self {
        Self {
            locale: Some(locale.into()),
        }
    }
}

impl SystemLocale for StubSystemLocale {
    fn system_locale(&self) -> Option<String> {
        self.locale.clone()
    }
}
