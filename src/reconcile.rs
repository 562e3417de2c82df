//! Mapping declared parameters onto raw step inputs.

use crate::binding::{ParamKind, StepDefinition};
use crate::outcome::BindingFailure;
use crate::registry::BindingRegistry;
use crate::table::Table;

/// Raw input assigned to one declared parameter, before conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawArgument {
    /// A single capture, or the text block.
    Text(String),
    /// Consecutive captures feeding a multi-input transformation.
    Compound(Vec<String>),
    /// The data table.
    Table(Table),
}

impl RawArgument {
    /// Render the raw input for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Compound(parts) => format!("({})", parts.join(", ")),
            Self::Table(table) => format!("<table with {} rows>", table.row_count()),
        }
    }
}

/// Assign captures, text block and table to the declared parameters of
/// `definition`, in declaration order.
///
/// A plain parameter takes as many captures as
/// [`BindingRegistry::capture_arity`] reports for its type.
///
/// # Errors
///
/// Returns [`BindingFailure::ParameterCountMismatch`] when a parameter has
/// nothing to consume or an input is left over. Counts are in raw slots:
/// every capture, the text block and the table each count as one.
pub fn reconcile(
    registry: &BindingRegistry,
    definition: &StepDefinition,
    captures: Vec<String>,
    text_block: Option<&str>,
    table: Option<&Table>,
) -> Result<Vec<RawArgument>, BindingFailure> {
    let actual = captures.len() + usize::from(text_block.is_some()) + usize::from(table.is_some());
    let expected = definition
        .parameters()
        .iter()
        .map(|parameter| match parameter.kind() {
            ParamKind::Plain => registry.capture_arity(parameter.ty()),
            ParamKind::TextBlock | ParamKind::Table => 1,
        })
        .sum::<usize>();
    let mismatch = || BindingFailure::ParameterCountMismatch {
        binding: definition.identity().clone(),
        expected,
        actual,
    };

    let mut remaining = captures.into_iter();
    let mut pending_text = text_block;
    let mut pending_table = table;
    let mut arguments = Vec::with_capacity(definition.parameters().len());
    for parameter in definition.parameters() {
        let argument = match parameter.kind() {
            ParamKind::Plain => {
                let arity = registry.capture_arity(parameter.ty());
                let taken: Vec<String> = remaining.by_ref().take(arity).collect();
                if taken.len() != arity {
                    return Err(mismatch());
                }
                let mut parts = taken.into_iter();
                match (parts.next(), parts.next()) {
                    (Some(single), None) => RawArgument::Text(single),
                    (first, second) => {
                        RawArgument::Compound(first.into_iter().chain(second).chain(parts).collect())
                    }
                }
            }
            ParamKind::TextBlock => {
                RawArgument::Text(pending_text.take().ok_or_else(mismatch)?.to_owned())
            }
            ParamKind::Table => RawArgument::Table(pending_table.take().ok_or_else(mismatch)?.clone()),
        };
        arguments.push(argument);
    }
    if remaining.next().is_some() || pending_text.is_some() || pending_table.is_some() {
        return Err(mismatch());
    }
    Ok(arguments)
}
