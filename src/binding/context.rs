//! Per-scenario binding instances.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use thiserror::Error;

/// Error raised when a stored binding instance has an unexpected type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("binding instance for {type_name} is not available")]
pub struct ContextError {
    /// Name of the requested binding type.
    pub type_name: &'static str,
}

/// Binding instances owned by one running scenario.
///
/// Steps of a scenario run strictly in sequence and share this context, so a
/// value stored by one step is visible to the next. Instances are created on
/// first use and dropped with the scenario.
///
/// # Examples
///
/// ```
/// use stepbind::binding::ScenarioContext;
///
/// #[derive(Default)]
/// struct Calculator {
///     entered: Vec<i32>,
/// }
///
/// let mut ctx = ScenarioContext::new();
/// ctx.instance::<Calculator>().expect("calculator").entered.push(50);
/// ctx.instance::<Calculator>().expect("calculator").entered.push(70);
/// assert_eq!(ctx.get::<Calculator>().map(|c| c.entered.len()), Some(2));
/// ```
#[derive(Default)]
pub struct ScenarioContext {
    instances: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl ScenarioContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the instance of `T`, creating it with `T::default()` on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] if the slot for `T` holds another type.
    pub fn instance<T: Default + Send + 'static>(&mut self) -> Result<&mut T, ContextError> {
        self.instances
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .ok_or(ContextError {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Store `value`, replacing any previous instance of `T`.
    pub fn insert<T: Send + 'static>(&mut self, value: T) {
        self.instances.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Borrow the instance of `T` if one exists.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.instances
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Number of instantiated bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no binding has been instantiated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl std::fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("instances", &self.instances.len())
            .finish()
    }
}
