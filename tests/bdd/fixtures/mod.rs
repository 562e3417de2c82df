//! Scenario state for the behaviour suite.
//!
//! Non-Clone types live in `RefCell<Option<T>>`, Clone types in `Slot<T>`.

// The `#[fixture]` macro generates types that cannot have doc comments attached
#![allow(
    missing_docs,
    reason = "Generated fixture types cannot have doc comments attached"
)]

use rstest::fixture;
use rstest_bdd::Slot;
use std::cell::RefCell;
use stepbind::{Outcome, RegistryBuilder, ScenarioContext, StepEngine};
use test_support::CallRecorder;

/// Combined world for all behaviour scenarios.
#[derive(Default)]
pub struct TestWorld {
    // Binding state (non-Clone)
    /// Bindings registered so far; frozen into `engine` on first execution.
    pub builder: RefCell<Option<RegistryBuilder>>,
    /// Engine built from `builder`.
    pub engine: RefCell<Option<StepEngine>>,
    /// Per-scenario instances shared by the executed steps.
    pub context: RefCell<ScenarioContext>,
    /// Outcome of the most recently executed step.
    pub outcome: RefCell<Option<Outcome>>,

    // Binding state (Clone)
    /// Recorder shared by recording bindings.
    pub recorder: Slot<CallRecorder>,
    /// Culture tag the engine is configured with.
    pub culture_tag: Slot<String>,

    // Culture resolution state
    /// Value of the culture environment variable, if set.
    pub culture_env: Slot<String>,
    /// Other environment variables visible to configuration loading.
    pub env_vars: RefCell<Vec<(String, String)>>,
    /// Locale reported by the stubbed system.
    pub system_locale: Slot<String>,
    /// Culture tag resolved by configuration loading.
    pub resolved_culture: Slot<String>,
    /// Error text captured when configuration loading fails.
    pub config_error: Slot<String>,
}

impl TestWorld {
    /// Run `register` against the pending registry builder.
    pub fn register(&self, register: impl FnOnce(&mut RegistryBuilder)) {
        let mut builder = self.builder.borrow_mut();
        register(builder.get_or_insert_with(RegistryBuilder::new));
    }

    /// Recorder shared by this scenario's recording bindings.
    pub fn recorder(&self) -> CallRecorder {
        if let Some(recorder) = self.recorder.get() {
            return recorder;
        }
        let recorder = CallRecorder::new();
        self.recorder.set(recorder.clone());
        recorder
    }
}

/// Fixture providing a fresh `TestWorld` for each scenario.
#[fixture]
pub fn world() -> TestWorld {
    TestWorld::default()
}

/// Helper extensions for `RefCell<Option<T>>`.
pub trait RefCellOptionExt<T> {
    /// Set the value inside the `RefCell`.
    fn set_value(&self, value: T);
    /// Returns `true` if the `RefCell` contains `Some`.
    fn is_some(&self) -> bool;
    /// Borrow the inner value immutably and apply a function.
    fn with_ref<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R>;
}

impl<T> RefCellOptionExt<T> for RefCell<Option<T>> {
    fn set_value(&self, value: T) {
        *self.borrow_mut() = Some(value);
    }

    fn is_some(&self) -> bool {
        self.borrow().is_some()
    }

    fn with_ref<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.borrow().as_ref().map(f)
    }
}
