//! Request and response shapes of the bulk remote procedures.
//!
//! Field names are the procedures' parameter names, which is why the remove
//! procedure keeps its `p_` prefixes.

use serde::{Deserialize, Serialize};

/// What happens to a removed leader's contacts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemovalMode {
    DeleteContacts,
    #[default]
    TransferContacts,
}

impl RemovalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalMode::DeleteContacts => "delete_contacts",
            RemovalMode::TransferContacts => "transfer_contacts",
        }
    }
}

/// Options of a bulk delegation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegateOptions {
    #[serde(default)]
    pub deactivate_from: bool,
    #[serde(default = "default_true")]
    pub transfer_tags: bool,
    #[serde(default = "default_true")]
    pub transfer_projects: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DelegateOptions {
    fn default() -> Self {
        Self {
            deactivate_from: false,
            transfer_tags: true,
            transfer_projects: true,
        }
    }
}

/// Input of `delegate_people`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegatePeopleRequest {
    pub from_leader: String,
    pub to_leader: String,
    #[serde(default)]
    pub opts: DelegateOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

/// Output of `delegate_people`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DelegatePeopleResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DelegatePeopleResponse {
    pub fn moved(count: i64) -> Self {
        Self {
            ok: true,
            moved_count: Some(count),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            moved_count: None,
            error: Some(reason.into()),
        }
    }
}

/// Input of `remove_leader`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoveLeaderRequest {
    pub p_leader_id: String,
    pub p_mode: RemovalMode,
    pub p_target_leader_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_operation_id: Option<String>,
}

/// Output of `remove_leader`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RemoveLeaderResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub people_processed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemoveLeaderResponse {
    pub fn processed(count: i64) -> Self {
        Self {
            ok: true,
            people_processed: Some(count),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            people_processed: None,
            error: Some(reason.into()),
        }
    }
}
