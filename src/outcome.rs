//! Step outcomes and the failure taxonomy.
//!
//! Every request produces exactly one [`Outcome`]. A [`BindingFailure`] means
//! the engine could not work out what to call or how to call it; an
//! [`ExecutionFailure`] means it called a step implementation or
//! transformation and that call failed. Neither is ever retried.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros. `#[expect]` cannot be used because the
// lint does not fire on every toolchain.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use crate::binding::{MethodIdentity, StepCategory};
use crate::skeleton::StepSkeleton;
use crate::value::{ParamType, Value};
use itertools::Itertools;
use miette::Diagnostic;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Reasons the engine could not resolve or prepare a step invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum BindingFailure {
    /// No definition matched the step text and shape.
    #[error("no binding matches {category} step '{text}'")]
    #[diagnostic(code(stepbind::binding::undefined))]
    Undefined {
        /// Requested category.
        category: StepCategory,
        /// Step text as written.
        text: String,
        /// Proposed binding that would match.
        suggestion: Box<StepSkeleton>,
        /// Rendered suggestion.
        #[help]
        help: String,
    },
    /// More than one definition survived matching and shape pruning.
    #[error("step '{text}' is ambiguous between {}", .candidates.iter().join(", "))]
    #[diagnostic(
        code(stepbind::binding::ambiguous),
        help("make the patterns more specific or distinguish them by table/text block parameters")
    )]
    Ambiguous {
        /// Step text as written.
        text: String,
        /// Identities of every surviving candidate, in registration order.
        candidates: Vec<MethodIdentity>,
    },
    /// Declared parameters do not line up with the raw inputs.
    #[error("binding {binding} declares {expected} argument slots but the step supplies {actual}")]
    #[diagnostic(
        code(stepbind::binding::parameter_mismatch),
        help("each capture group, text block and table must map to exactly one parameter")
    )]
    ParameterCountMismatch {
        /// The matched definition.
        binding: MethodIdentity,
        /// Raw input slots the declared parameters consume.
        expected: usize,
        /// Raw input slots the step supplied.
        actual: usize,
    },
    /// A raw value could not be converted into the declared parameter type.
    #[error("cannot convert '{value}' to {target} for {binding}: {reason}")]
    #[diagnostic(
        code(stepbind::binding::conversion),
        help("register a step argument transformation producing the target type")
    )]
    Conversion {
        /// The matched definition.
        binding: MethodIdentity,
        /// Raw value, rendered for display.
        value: String,
        /// Required type.
        target: ParamType,
        /// Why conversion failed.
        reason: String,
    },
}

/// Discriminant of [`BindingFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingFailureKind {
    /// See [`BindingFailure::Undefined`].
    Undefined,
    /// See [`BindingFailure::Ambiguous`].
    Ambiguous,
    /// See [`BindingFailure::ParameterCountMismatch`].
    ParameterCountMismatch,
    /// See [`BindingFailure::Conversion`].
    ConversionError,
}

impl BindingFailure {
    /// Build an undefined-step failure with a suggested binding.
    #[must_use]
    pub fn undefined(
        category: StepCategory,
        text: &str,
        has_text_block: bool,
        has_table: bool,
    ) -> Self {
        let suggestion = StepSkeleton::for_step(category, text, has_text_block, has_table);
        Self::Undefined {
            category,
            text: text.to_owned(),
            help: format!("add a binding such as: {suggestion}"),
            suggestion: Box::new(suggestion),
        }
    }

    /// Which failure this is.
    #[must_use]
    pub const fn kind(&self) -> BindingFailureKind {
        match self {
            Self::Undefined { .. } => BindingFailureKind::Undefined,
            Self::Ambiguous { .. } => BindingFailureKind::Ambiguous,
            Self::ParameterCountMismatch { .. } => BindingFailureKind::ParameterCountMismatch,
            Self::Conversion { .. } => BindingFailureKind::ConversionError,
        }
    }

    /// Terminal stage reached by this failure.
    #[must_use]
    pub const fn stage(&self) -> StepStage {
        match self {
            Self::Undefined { .. } => StepStage::Undefined,
            Self::Ambiguous { .. } => StepStage::Ambiguous,
            Self::ParameterCountMismatch { .. } => StepStage::ParameterMismatch,
            Self::Conversion { .. } => StepStage::ConversionError,
        }
    }
}

/// A step implementation or transformation was invoked and failed.
#[derive(Debug, Error, Diagnostic)]
#[error("binding {binding} failed")]
#[diagnostic(code(stepbind::execution::failed))]
pub struct ExecutionFailure {
    /// The invoked method.
    pub binding: MethodIdentity,
    /// Error returned by the body, or the panic message.
    #[source]
    pub error: anyhow::Error,
    /// Time spent inside the call.
    pub duration: Duration,
}

/// Result of a successful step invocation.
#[derive(Debug, Clone)]
pub struct StepSuccess {
    /// The invoked step implementation.
    pub binding: MethodIdentity,
    /// Value returned by the implementation.
    pub value: Value,
    /// Time spent inside the call.
    pub duration: Duration,
}

/// Final result of executing one step request.
#[derive(Debug)]
pub enum Outcome {
    /// The step implementation ran and returned normally.
    Success(StepSuccess),
    /// The engine could not resolve or prepare the invocation.
    BindingFailure(BindingFailure),
    /// A step implementation or transformation failed.
    ExecutionFailure(ExecutionFailure),
}

impl Outcome {
    /// Whether the step succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Kind of binding failure, if this is one.
    #[must_use]
    pub const fn binding_failure_kind(&self) -> Option<BindingFailureKind> {
        match self {
            Self::BindingFailure(failure) => Some(failure.kind()),
            _ => None,
        }
    }

    /// Identity of the invoked (or matched) binding when one is known.
    #[must_use]
    pub const fn binding(&self) -> Option<&MethodIdentity> {
        match self {
            Self::Success(success) => Some(&success.binding),
            Self::ExecutionFailure(failure) => Some(&failure.binding),
            Self::BindingFailure(
                BindingFailure::ParameterCountMismatch { binding, .. }
                | BindingFailure::Conversion { binding, .. },
            ) => Some(binding),
            Self::BindingFailure(_) => None,
        }
    }

    /// Time spent invoking, when something was invoked.
    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        match self {
            Self::Success(success) => Some(success.duration),
            Self::ExecutionFailure(failure) => Some(failure.duration),
            Self::BindingFailure(_) => None,
        }
    }

    /// Terminal stage of the request.
    #[must_use]
    pub const fn stage(&self) -> StepStage {
        match self {
            Self::Success(_) => StepStage::Succeeded,
            Self::BindingFailure(failure) => failure.stage(),
            Self::ExecutionFailure(_) => StepStage::ExecutionFailed,
        }
    }
}

impl From<BindingFailure> for Outcome {
    fn from(failure: BindingFailure) -> Self {
        Self::BindingFailure(failure)
    }
}

impl From<ExecutionFailure> for Outcome {
    fn from(failure: ExecutionFailure) -> Self {
        Self::ExecutionFailure(failure)
    }
}

/// Stages a step request moves through.
///
/// ```text
/// Received -> Matching -> Undefined | Ambiguous | Matched
/// Matched -> Reconciling -> ParameterMismatch | Converting
/// Converting -> ConversionError | ExecutionFailed | Invoking
/// Invoking -> Succeeded | ExecutionFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStage {
    /// Request accepted.
    Received,
    /// Running patterns and shape pruning.
    Matching,
    /// Exactly one candidate survived.
    Matched,
    /// Mapping raw inputs onto declared parameters.
    Reconciling,
    /// Converting raw inputs into parameter types.
    Converting,
    /// Calling the step implementation.
    Invoking,
    /// Terminal: no candidate.
    Undefined,
    /// Terminal: several candidates.
    Ambiguous,
    /// Terminal: parameter count mismatch.
    ParameterMismatch,
    /// Terminal: conversion failure.
    ConversionError,
    /// Terminal: the implementation returned normally.
    Succeeded,
    /// Terminal: the implementation or a transformation failed.
    ExecutionFailed,
}

impl StepStage {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Undefined
                | Self::Ambiguous
                | Self::ParameterMismatch
                | Self::ConversionError
                | Self::Succeeded
                | Self::ExecutionFailed
        )
    }
}

impl fmt::Display for StepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Matching => "matching",
            Self::Matched => "matched",
            Self::Reconciling => "reconciling",
            Self::Converting => "converting",
            Self::Invoking => "invoking",
            Self::Undefined => "undefined",
            Self::Ambiguous => "ambiguous",
            Self::ParameterMismatch => "parameter-mismatch",
            Self::ConversionError => "conversion-error",
            Self::Succeeded => "succeeded",
            Self::ExecutionFailed => "execution-failed",
        };
        f.write_str(name)
    }
}
