//! Data models for the field-ops backend.
//!
//! Field names follow the data service's JSON contract so the same types serve
//! the HTTP handlers and the remote client.

mod leader;
mod person;
mod procedure;

pub use leader::*;
pub use person::*;
pub use procedure::*;
