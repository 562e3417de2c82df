//! Shared fixtures for the stepbind integration and behaviour suites.
//!
//! Provides the sample bindings used across suites, a recorder for asserting
//! which bodies ran with which arguments, and stub culture providers.

pub mod bindings;
pub mod culture_stubs;
pub mod error;
pub mod recorder;

pub use culture_stubs::{StubEnv, StubSystemLocale};
pub use error::{display_error_chain, error_messages};
pub use recorder::{CallRecorder, RecordedCall};
