//! Step definitions for behaviour scenarios.
//!
//! Each module contains the steps for one area. Steps are registered via
//! `#[given]`, `#[when]`, and `#[then]` attribute macros.

mod binding;
mod culture;
