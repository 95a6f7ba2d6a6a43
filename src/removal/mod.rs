//! Leader removal workflow.
//!
//! Models the removal dialog a directory UI drives: it loads the leader's
//! contact count and the eligible successors, checks the operator's intent
//! locally, then calls one of the bulk procedures through an injected
//! [`LeaderDataService`].

mod http;
mod service;
mod workflow;

pub use http::*;
pub use service::*;
pub use workflow::*;

/// Literal the operator must type to confirm a removal.
pub const CONFIRMATION_KEYWORD: &str = "EXCLUIR";
