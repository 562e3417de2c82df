//! Executing step requests end to end.
//!
//! [`StepEngine::execute`] drives one request through matching,
//! reconciliation, conversion and invocation and always returns exactly one
//! [`Outcome`]. The engine holds no per-scenario state; everything a
//! scenario accumulates lives in the [`ScenarioContext`] passed in.

use crate::binding::{ScenarioContext, StepCategory, StepDefinition};
use crate::config::BindingConfig;
use crate::convert::{ConvertError, Converter};
use crate::invoke::Invoker;
use crate::matcher::match_step;
use crate::outcome::{BindingFailure, ExecutionFailure, Outcome, StepStage, StepSuccess};
use crate::reconcile::reconcile;
use crate::registry::BindingRegistry;
use crate::table::Table;
use crate::tracer::{LogTracer, StepTracer};
use crate::value::Arguments;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// A step to execute: category, text and optional extra arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRequest {
    category: StepCategory,
    text: String,
    text_block: Option<String>,
    table: Option<Table>,
}

impl StepRequest {
    /// Request for `text` under `category`.
    #[must_use]
    pub fn new(category: StepCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
            text_block: None,
            table: None,
        }
    }

    /// `Given` request.
    #[must_use]
    pub fn given(text: impl Into<String>) -> Self {
        Self::new(StepCategory::Given, text)
    }

    /// `When` request.
    #[must_use]
    pub fn when(text: impl Into<String>) -> Self {
        Self::new(StepCategory::When, text)
    }

    /// `Then` request.
    #[must_use]
    pub fn then(text: impl Into<String>) -> Self {
        Self::new(StepCategory::Then, text)
    }

    /// Attach a multi-line text block.
    #[must_use]
    pub fn with_text_block(mut self, text_block: impl Into<String>) -> Self {
        self.text_block = Some(text_block.into());
        self
    }

    /// Attach a data table.
    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    /// Keyword category.
    #[must_use]
    pub const fn category(&self) -> StepCategory {
        self.category
    }

    /// Step text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Attached text block.
    #[must_use]
    pub fn text_block(&self) -> Option<&str> {
        self.text_block.as_deref()
    }

    /// Attached table.
    #[must_use]
    pub const fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }
}

/// A matched definition with its fully converted arguments.
#[derive(Debug, Clone)]
pub struct ResolvedBinding {
    /// The definition to invoke.
    pub definition: Arc<StepDefinition>,
    /// Arguments in declaration order.
    pub arguments: Arguments,
}

/// Why a request could not be resolved to a ready-to-call binding.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Matching, reconciliation or conversion failed.
    #[error(transparent)]
    Binding(#[from] BindingFailure),
    /// A transformation failed while converting arguments.
    #[error(transparent)]
    Execution(#[from] ExecutionFailure),
}

impl From<ResolveError> for Outcome {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::Binding(failure) => Self::BindingFailure(failure),
            ResolveError::Execution(failure) => Self::ExecutionFailure(failure),
        }
    }
}

fn enter(stage: StepStage, request: &StepRequest) {
    trace!(stage = %stage, step = request.text(), "step stage");
}

/// Executes step requests against a frozen registry.
///
/// The engine is `Send + Sync`; share it between scenario threads with an
/// `Arc` and give each scenario its own [`ScenarioContext`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use stepbind::binding::{
///     BindingMethod, MethodIdentity, Parameter, ScenarioContext, StepCategory, StepDefinition,
/// };
/// use stepbind::config::BindingConfig;
/// use stepbind::engine::{StepEngine, StepRequest};
/// use stepbind::registry::RegistryBuilder;
/// use stepbind::value::{ParamType, Value};
///
/// #[derive(Default)]
/// struct Basket {
///     cukes: i32,
/// }
///
/// let mut builder = RegistryBuilder::new();
/// builder.register_step(
///     StepDefinition::new(
///         StepCategory::Given,
///         r"I have (\d+) cukes in my belly",
///         [Parameter::plain(ParamType::I32)],
///         BindingMethod::new(MethodIdentity::new("Basket", "have_cukes"), |ctx, args| {
///             ctx.instance::<Basket>()?.cukes = args.get::<i32>(0)?;
///             Ok(Value::Unit)
///         }),
///     )
///     .expect("valid pattern"),
/// );
/// let engine = StepEngine::new(Arc::new(builder.build()), BindingConfig::default());
///
/// let mut ctx = ScenarioContext::new();
/// let outcome = engine.execute(&mut ctx, &StepRequest::given("I have 42 cukes in my belly"));
/// assert!(outcome.is_success());
/// assert_eq!(ctx.get::<Basket>().map(|b| b.cukes), Some(42));
/// ```
#[derive(Clone)]
pub struct StepEngine {
    registry: Arc<BindingRegistry>,
    config: BindingConfig,
    tracer: Arc<dyn StepTracer>,
    invoker: Invoker,
}

impl StepEngine {
    /// Engine logging through [`LogTracer`].
    #[must_use]
    pub fn new(registry: Arc<BindingRegistry>, config: BindingConfig) -> Self {
        let tracer = Arc::new(LogTracer::new(&config));
        Self {
            registry,
            config,
            tracer,
            invoker: Invoker::new(),
        }
    }

    /// Replace the tracer.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<dyn StepTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Replace the invoker, e.g. to control timing.
    #[must_use]
    pub fn with_invoker(mut self, invoker: Invoker) -> Self {
        self.invoker = invoker;
        self
    }

    /// Registry the engine resolves against.
    #[must_use]
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Execute `request`, invoking at most one step implementation.
    pub fn execute(&self, ctx: &mut ScenarioContext, request: &StepRequest) -> Outcome {
        let outcome = self.run(ctx, request);
        enter(outcome.stage(), request);
        self.tracer.trace_outcome(request.text(), &outcome);
        outcome
    }

    fn run(&self, ctx: &mut ScenarioContext, request: &StepRequest) -> Outcome {
        let resolved = match self.resolve(ctx, request) {
            Ok(resolved) => resolved,
            Err(error) => return error.into(),
        };
        enter(StepStage::Invoking, request);
        let method = resolved.definition.method();
        self.tracer
            .trace_invocation(method.identity(), &resolved.arguments);
        match self.invoker.invoke(method, ctx, &resolved.arguments) {
            Ok(invocation) => Outcome::Success(StepSuccess {
                binding: method.identity().clone(),
                value: invocation.value,
                duration: invocation.duration,
            }),
            Err(failure) => Outcome::ExecutionFailure(failure),
        }
    }

    /// Match `request` and convert its arguments without invoking the step.
    ///
    /// Transformations still run, so `ctx` may change.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Binding`] when matching, reconciliation or
    /// conversion fails and [`ResolveError::Execution`] when a
    /// transformation fails.
    pub fn resolve(
        &self,
        ctx: &mut ScenarioContext,
        request: &StepRequest,
    ) -> Result<ResolvedBinding, ResolveError> {
        enter(StepStage::Received, request);
        enter(StepStage::Matching, request);
        let candidate = match_step(&self.registry, request)?;
        enter(StepStage::Matched, request);
        let definition = candidate.definition;

        enter(StepStage::Reconciling, request);
        let raw = reconcile(
            &self.registry,
            &definition,
            candidate.captures,
            request.text_block(),
            request.table(),
        )?;

        enter(StepStage::Converting, request);
        let mut converter = Converter::new(&self.registry, self.config.culture(), &self.invoker)
            .with_tracer(self.tracer.as_ref());
        let mut values = Vec::with_capacity(raw.len());
        for (argument, parameter) in raw.into_iter().zip(definition.parameters()) {
            let value = converter
                .convert_raw(ctx, argument, parameter.ty())
                .map_err(|error| match error {
                    ConvertError::Unconvertible {
                        value,
                        target,
                        reason,
                    } => ResolveError::Binding(BindingFailure::Conversion {
                        binding: definition.identity().clone(),
                        value,
                        target,
                        reason,
                    }),
                    ConvertError::Execution(failure) => ResolveError::Execution(failure),
                })?;
            values.push(value);
        }
        Ok(ResolvedBinding {
            definition,
            arguments: Arguments::new(values),
        })
    }
}

impl std::fmt::Debug for StepEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
