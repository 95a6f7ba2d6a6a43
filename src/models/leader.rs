//! Leader model and directory views.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a leader account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaderStatus {
    Active,
    Pending,
    Inactive,
    Invited,
}

impl LeaderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderStatus::Active => "ACTIVE",
            LeaderStatus::Pending => "PENDING",
            LeaderStatus::Inactive => "INACTIVE",
            LeaderStatus::Invited => "INVITED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(LeaderStatus::Active),
            "PENDING" => Some(LeaderStatus::Pending),
            "INACTIVE" => Some(LeaderStatus::Inactive),
            "INVITED" => Some(LeaderStatus::Invited),
            _ => None,
        }
    }
}

/// A leader owning a set of contacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Leader {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub status: LeaderStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Tab of the leader directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeaderTab {
    #[default]
    Active,
    Pending,
}

impl LeaderTab {
    /// Statuses listed under this tab.
    pub fn statuses(&self) -> &'static [LeaderStatus] {
        match self {
            LeaderTab::Active => &[LeaderStatus::Active],
            LeaderTab::Pending => &[LeaderStatus::Pending, LeaderStatus::Invited],
        }
    }
}

/// Directory row: a leader and how many contacts it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderDirectoryEntry {
    #[serde(flatten)]
    pub leader: Leader,
    pub people_count: i64,
}

/// Request body for creating a leader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeaderRequest {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_status")]
    pub status: LeaderStatus,
}

fn default_status() -> LeaderStatus {
    LeaderStatus::Pending
}

/// Request body for changing a leader's status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLeaderStatusRequest {
    pub status: LeaderStatus,
}
