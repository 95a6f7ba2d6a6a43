//! Data-service seam used by the removal workflow.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    DelegatePeopleRequest, DelegatePeopleResponse, Leader, LeaderStatus, RemoveLeaderRequest,
    RemoveLeaderResponse,
};

/// Failure talking to the data service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("{message} ({code}, HTTP {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

/// Remote operations the removal workflow depends on.
#[async_trait]
pub trait LeaderDataService: Send + Sync {
    /// Number of contacts owned by a leader.
    async fn count_people(&self, owner_id: &str) -> Result<i64, ServiceError>;

    /// Active leaders other than `exclude`.
    async fn list_active_leaders(&self, exclude: &str) -> Result<Vec<Leader>, ServiceError>;

    async fn delegate_people(
        &self,
        request: &DelegatePeopleRequest,
    ) -> Result<DelegatePeopleResponse, ServiceError>;

    async fn remove_leader(
        &self,
        request: &RemoveLeaderRequest,
    ) -> Result<RemoveLeaderResponse, ServiceError>;

    async fn update_leader_status(
        &self,
        leader_id: &str,
        status: LeaderStatus,
    ) -> Result<(), ServiceError>;
}

/// Result of a bulk procedure, decided from its raw `{ok, ...}` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureOutcome {
    Success { count: i64 },
    Failure { reason: Option<String> },
}

impl ProcedureOutcome {
    fn decide(ok: bool, count: Option<i64>, error: Option<String>, count_field: &str) -> Self {
        match (ok, count) {
            (true, Some(count)) => ProcedureOutcome::Success { count },
            (true, None) => {
                tracing::warn!("Procedure reported ok without {}", count_field);
                ProcedureOutcome::Failure {
                    reason: Some(format!("malformed response: missing {}", count_field)),
                }
            }
            (false, _) => ProcedureOutcome::Failure { reason: error },
        }
    }
}

impl From<DelegatePeopleResponse> for ProcedureOutcome {
    fn from(response: DelegatePeopleResponse) -> Self {
        ProcedureOutcome::decide(response.ok, response.moved_count, response.error, "moved_count")
    }
}

impl From<RemoveLeaderResponse> for ProcedureOutcome {
    fn from(response: RemoveLeaderResponse) -> Self {
        ProcedureOutcome::decide(response.ok, response.people_processed, response.error, "people_processed")
    }
}
