//! Error formatting helpers for stable test assertions.

use std::error::Error;

/// Messages of `e` and each of its sources, outermost first.
pub fn error_messages(e: &(dyn Error + 'static)) -> Vec<String> {
    let mut current: Option<&(dyn Error + 'static)> = Some(e);
    std::iter::from_fn(|| {
        let err = current?;
        current = err.source();
        Some(err.to_string())
    })
    .collect()
}

/// Join [`error_messages`] with `": "`.
///
/// Execution failures name the binding in their own message while the
/// source carries what the step body reported, so the joined chain reads
/// `binding Owner::method failed: <body error>`.
pub fn display_error_chain(e: &(dyn Error + 'static)) -> String {
    error_messages(e).join(": ")
}
