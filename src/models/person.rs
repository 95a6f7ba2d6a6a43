//! Contact ("person") model.

use serde::{Deserialize, Serialize};

/// A tracked constituent, owned by exactly one leader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub id: String,
    pub full_name: String,
    pub owner_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub project_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePersonRequest {
    pub full_name: String,
    pub owner_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub project_ids: Vec<String>,
}

/// Query string selecting contacts by owning leader.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerQuery {
    pub owner_id: String,
}

/// Number of contacts owned by a leader.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeopleCount {
    pub count: i64,
}
