//! Stepbind: step matching and argument binding for behaviour-driven tests.
//!
//! Given one line of scenario text, optionally followed by a text block or a
//! data table, the engine finds the single registered step definition that
//! matches, lines its declared parameters up with the regex captures and
//! extra arguments, converts each raw value (built-in culture-aware parsing
//! or user-registered transformations, which may chain), invokes the step and
//! reports exactly one [`Outcome`](outcome::Outcome).
//!
//! Bindings are registered explicitly through
//! [`RegistryBuilder`](registry::RegistryBuilder); the frozen registry and the
//! [`StepEngine`](engine::StepEngine) are shared between scenario threads,
//! while each scenario owns a [`ScenarioContext`](binding::ScenarioContext).

pub mod binding;
pub mod config;
pub mod convert;
pub mod culture;
pub mod engine;
pub mod invoke;
pub mod matcher;
pub mod outcome;
pub mod reconcile;
pub mod registry;
pub mod skeleton;
pub mod table;
pub mod tracer;
pub mod value;

pub use binding::{
    BindingMethod, MethodIdentity, Parameter, ScenarioContext, StepArgumentTransformation,
    StepCategory, StepDefinition,
};
pub use config::BindingConfig;
pub use engine::{StepEngine, StepRequest};
pub use outcome::{BindingFailure, BindingFailureKind, ExecutionFailure, Outcome};
pub use registry::{BindingRegistry, RegistryBuilder};
pub use table::Table;
pub use value::{Arguments, ParamType, Value};
