//! Recording step bodies for asserting what the engine invoked.

use std::sync::{Arc, Mutex, PoisonError};
use stepbind::{BindingMethod, MethodIdentity, Value};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// The invoked method.
    pub binding: MethodIdentity,
    /// Converted arguments in parameter order.
    pub arguments: Vec<Value>,
}

/// Shared log of invocations, cloneable into many binding bodies.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binding method on `owner::method` that records its call and returns
    /// [`Value::Unit`].
    pub fn method(&self, owner: &str, method: &str) -> BindingMethod {
        self.returning(owner, method, Value::Unit)
    }

    /// Binding method that records its call and returns a clone of `value`.
    pub fn returning(&self, owner: &str, method: &str, value: Value) -> BindingMethod {
        let identity = MethodIdentity::new(owner, method);
        let calls = Arc::clone(&self.calls);
        let recorded = identity.clone();
        BindingMethod::new(identity, move |_, args| {
            calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(RecordedCall {
                    binding: recorded.clone(),
                    arguments: args.as_slice().to_vec(),
                });
            Ok(value.clone())
        })
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls to methods named `method`.
    pub fn calls_to(&self, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.binding.method() == method)
            .count()
    }
}
