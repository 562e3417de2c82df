//! Step matching and shape pruning.

use crate::binding::StepDefinition;
use crate::engine::StepRequest;
use crate::outcome::BindingFailure;
use crate::registry::{BindingRegistry, Candidate};
use tracing::trace;

/// Whether `definition` can take the extra arguments supplied with the step.
fn shape_fits(definition: &StepDefinition, request: &StepRequest) -> bool {
    (!definition.requires_table() || request.table().is_some())
        && (!definition.requires_text_block() || request.text_block().is_some())
}

/// Keep only candidates consuming the supplied input when any of them does.
fn prefer_consumers(
    candidates: &mut Vec<Candidate>,
    supplied: bool,
    consumes: impl Fn(&StepDefinition) -> bool,
) {
    if supplied && candidates.iter().any(|c| consumes(c.definition.as_ref())) {
        candidates.retain(|c| consumes(c.definition.as_ref()));
    }
}

/// Table and text-block requirements of a definition.
fn shape(definition: &StepDefinition) -> (bool, bool) {
    (definition.requires_table(), definition.requires_text_block())
}

/// The first group of textual matches sharing one shape, if it has several members.
fn shared_shape(unfit: Vec<Candidate>) -> Option<Vec<Candidate>> {
    let twin = unfit
        .iter()
        .map(|c| shape(&c.definition))
        .find(|wanted| unfit.iter().filter(|c| shape(&c.definition) == *wanted).count() > 1)?;
    Some(
        unfit
            .into_iter()
            .filter(|c| shape(&c.definition) == twin)
            .collect(),
    )
}

fn ambiguous(
    request: &StepRequest,
    candidates: impl IntoIterator<Item = Candidate>,
) -> BindingFailure {
    BindingFailure::Ambiguous {
        text: request.text().to_owned(),
        candidates: candidates
            .into_iter()
            .map(|c| c.definition.identity().clone())
            .collect(),
    }
}

/// Find the single definition that should handle `request`.
///
/// Candidates are definitions whose category accepts the request and whose
/// pattern matches the whole text. Those needing a table or text block the
/// request lacks are dropped; when the request supplies one and some
/// candidate consumes it, candidates that would ignore it are dropped too.
/// If pruning drops every candidate but several textual matches share one
/// shape, the step is still ambiguous.
///
/// # Errors
///
/// Returns [`BindingFailure::Undefined`] when nothing survives and
/// [`BindingFailure::Ambiguous`] when more than one candidate does.
pub fn match_step(
    registry: &BindingRegistry,
    request: &StepRequest,
) -> Result<Candidate, BindingFailure> {
    let (mut candidates, unfit): (Vec<Candidate>, Vec<Candidate>) = registry
        .candidates_for(request.category(), request.text())
        .into_iter()
        .partition(|c| shape_fits(&c.definition, request));
    prefer_consumers(&mut candidates, request.table().is_some(), StepDefinition::requires_table);
    prefer_consumers(
        &mut candidates,
        request.text_block().is_some(),
        StepDefinition::requires_text_block,
    );
    trace!(
        text = request.text(),
        survivors = candidates.len(),
        pruned = unfit.len(),
        "matched step candidates"
    );

    let mut survivors = candidates.into_iter();
    match (survivors.next(), survivors.next()) {
        (None, _) => Err(shared_shape(unfit).map_or_else(
            || {
                BindingFailure::undefined(
                    request.category(),
                    request.text(),
                    request.text_block().is_some(),
                    request.table().is_some(),
                )
            },
            |twins| ambiguous(request, twins),
        )),
        (Some(only), None) => Ok(only),
        (Some(first), Some(second)) => {
            Err(ambiguous(request, [first, second].into_iter().chain(survivors)))
        }
    }
}
