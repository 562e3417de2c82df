//! Step definitions, argument transformations and their invocation handles.
//!
//! Bindings are registered explicitly: whatever discovers step
//! implementations (attribute macros, a plugin loader, hand-written setup)
//! turns each one into a [`StepDefinition`] or [`StepArgumentTransformation`]
//! and hands it to the [`RegistryBuilder`](crate::registry::RegistryBuilder).
//! Every binding carries a [`BindingMethod`], a shareable closure that the
//! invoker calls with the scenario's [`ScenarioContext`] and the converted
//! [`Arguments`](crate::value::Arguments).

mod context;
mod pattern;

pub use context::{ContextError, ScenarioContext};
pub use pattern::{PatternError, StepPattern};

use crate::value::{Arguments, ParamType, Value};
use std::fmt;
use std::sync::Arc;

/// Keyword category of a step (`And`/`But` are resolved by the caller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepCategory {
    /// Preconditions.
    Given,
    /// Actions.
    When,
    /// Outcomes.
    Then,
    /// Matches every category.
    Any,
}

impl StepCategory {
    /// Whether a definition registered for `self` applies to a step of
    /// category `requested`.
    #[must_use]
    pub const fn accepts(self, requested: Self) -> bool {
        matches!(self, Self::Any)
            || matches!(requested, Self::Any)
            || (self as u8) == (requested as u8)
    }
}

impl fmt::Display for StepCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::Any => "Step",
        };
        f.write_str(name)
    }
}

/// Which raw input a declared parameter consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// The next regex capture (or run of captures for compound types).
    Plain,
    /// The multi-line text block attached to the step.
    TextBlock,
    /// The data table attached to the step.
    Table,
}

/// A declared parameter of a step implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: Option<String>,
    ty: ParamType,
    kind: ParamKind,
}

impl Parameter {
    /// Parameter fed from regex captures.
    #[must_use]
    pub const fn plain(ty: ParamType) -> Self {
        Self {
            name: None,
            ty,
            kind: ParamKind::Plain,
        }
    }

    /// Parameter receiving the text block as a string.
    #[must_use]
    pub const fn text_block() -> Self {
        Self::text_block_of(ParamType::Text)
    }

    /// Parameter receiving the text block converted to `ty`.
    #[must_use]
    pub const fn text_block_of(ty: ParamType) -> Self {
        Self {
            name: None,
            ty,
            kind: ParamKind::TextBlock,
        }
    }

    /// Parameter receiving the data table unchanged.
    #[must_use]
    pub const fn table() -> Self {
        Self::table_of(ParamType::Table)
    }

    /// Parameter receiving the data table converted to `ty`, typically a
    /// collection produced by a table transformation.
    #[must_use]
    pub const fn table_of(ty: ParamType) -> Self {
        Self {
            name: None,
            ty,
            kind: ParamKind::Table,
        }
    }

    /// Attach a descriptive name used in diagnostics.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declared name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Required type.
    #[must_use]
    pub const fn ty(&self) -> ParamType {
        self.ty
    }

    /// Consumed input.
    #[must_use]
    pub const fn kind(&self) -> ParamKind {
        self.kind
    }
}

/// Identity of a bound method: the owning binding type and method name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodIdentity {
    owner: String,
    method: String,
}

impl MethodIdentity {
    /// Identify `method` on `owner`.
    pub fn new(owner: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
        }
    }

    /// Owning binding type name.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for MethodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.method)
    }
}

/// Signature shared by step and transformation bodies.
pub type BindingFn =
    dyn Fn(&mut ScenarioContext, &Arguments) -> anyhow::Result<Value> + Send + Sync;

/// Invocation handle captured at registration time.
#[derive(Clone)]
pub struct BindingMethod {
    identity: MethodIdentity,
    body: Arc<BindingFn>,
}

impl BindingMethod {
    /// Wrap `body` under the given identity.
    pub fn new<F>(identity: MethodIdentity, body: F) -> Self
    where
        F: Fn(&mut ScenarioContext, &Arguments) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            identity,
            body: Arc::new(body),
        }
    }

    /// Identity used in diagnostics and traces.
    #[must_use]
    pub const fn identity(&self) -> &MethodIdentity {
        &self.identity
    }

    /// Run the body. Callers outside the invoker get no timing or panic
    /// capture.
    ///
    /// # Errors
    ///
    /// Propagates whatever error the body returns.
    pub fn call(&self, ctx: &mut ScenarioContext, args: &Arguments) -> anyhow::Result<Value> {
        (self.body)(ctx, args)
    }
}

impl fmt::Debug for BindingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingMethod")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// A registered step: category, pattern, declared parameters and body.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    category: StepCategory,
    pattern: StepPattern,
    parameters: Vec<Parameter>,
    method: BindingMethod,
}

impl StepDefinition {
    /// Compile `pattern` and build a definition.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when the pattern is not a valid regex.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepbind::binding::{BindingMethod, MethodIdentity, Parameter, StepCategory, StepDefinition};
    /// use stepbind::value::{ParamType, Value};
    ///
    /// let def = StepDefinition::new(
    ///     StepCategory::Given,
    ///     "I have entered (\\d+) into the calculator",
    ///     [Parameter::plain(ParamType::I32)],
    ///     BindingMethod::new(MethodIdentity::new("CalculatorSteps", "enter"), |_ctx, _args| {
    ///         Ok(Value::Unit)
    ///     }),
    /// )
    /// .expect("valid pattern");
    /// assert!(!def.requires_table());
    /// ```
    pub fn new(
        category: StepCategory,
        pattern: &str,
        parameters: impl IntoIterator<Item = Parameter>,
        method: BindingMethod,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            category,
            pattern: StepPattern::new(pattern)?,
            parameters: parameters.into_iter().collect(),
            method,
        })
    }

    /// Keyword category.
    #[must_use]
    pub const fn category(&self) -> StepCategory {
        self.category
    }

    /// Compiled pattern.
    #[must_use]
    pub const fn pattern(&self) -> &StepPattern {
        &self.pattern
    }

    /// Declared parameters in order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Invocation handle.
    #[must_use]
    pub const fn method(&self) -> &BindingMethod {
        &self.method
    }

    /// Identity of the bound method.
    #[must_use]
    pub const fn identity(&self) -> &MethodIdentity {
        self.method.identity()
    }

    /// Whether any parameter consumes the data table.
    #[must_use]
    pub fn requires_table(&self) -> bool {
        self.has_kind(ParamKind::Table)
    }

    /// Whether any parameter consumes the text block.
    #[must_use]
    pub fn requires_text_block(&self) -> bool {
        self.has_kind(ParamKind::TextBlock)
    }

    fn has_kind(&self, kind: ParamKind) -> bool {
        self.parameters.iter().any(|p| p.kind() == kind)
    }
}

/// A registered converter from raw step input to a richer type.
#[derive(Debug, Clone)]
pub struct StepArgumentTransformation {
    pattern: Option<StepPattern>,
    inputs: Vec<ParamType>,
    output: ParamType,
    method: BindingMethod,
}

impl StepArgumentTransformation {
    /// Build a transformation selected purely by its output type.
    pub fn new(
        output: ParamType,
        inputs: impl IntoIterator<Item = ParamType>,
        method: BindingMethod,
    ) -> Self {
        Self {
            pattern: None,
            inputs: inputs.into_iter().collect(),
            output,
            method,
        }
    }

    /// Gate the transformation on `pattern`; its captures become the inputs.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when the pattern is not a valid regex.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, PatternError> {
        self.pattern = Some(StepPattern::new(pattern)?);
        Ok(self)
    }

    /// Optional gating pattern.
    #[must_use]
    pub const fn pattern(&self) -> Option<&StepPattern> {
        self.pattern.as_ref()
    }

    /// Input types in order.
    #[must_use]
    pub fn inputs(&self) -> &[ParamType] {
        &self.inputs
    }

    /// Produced type.
    #[must_use]
    pub const fn output(&self) -> ParamType {
        self.output
    }

    /// Invocation handle.
    #[must_use]
    pub const fn method(&self) -> &BindingMethod {
        &self.method
    }

    /// Identity of the bound method.
    #[must_use]
    pub const fn identity(&self) -> &MethodIdentity {
        self.method.identity()
    }

    /// Whether the single input is a data table.
    #[must_use]
    pub fn consumes_table(&self) -> bool {
        matches!(self.inputs.as_slice(), [ParamType::Table])
    }

    /// Number of plain (non-table) inputs, or `None` when any input is a
    /// table.
    #[must_use]
    pub fn plain_arity(&self) -> Option<usize> {
        (!self.inputs.contains(&ParamType::Table)).then_some(self.inputs.len())
    }
}
