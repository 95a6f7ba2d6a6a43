//! Removal dialog state machine.
//!
//! `Closed -> Loading -> Ready -> Submitting -> Closed` on success, or back
//! to `Ready` with the error kept for display. Nothing is retried; the
//! operator resubmits.
//!
//! Remote work runs outside the workflow borrow: [`RemovalWorkflow::begin_open`]
//! and [`RemovalWorkflow::begin_submit`] hand out a pending job, and its
//! result is applied with `finish_loading` / `finish_submit`. While a job is
//! out the dialog is observably `Loading` or `Submitting`. `open` and
//! `submit` run both halves in one call.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use super::service::{LeaderDataService, ProcedureOutcome};
use super::CONFIRMATION_KEYWORD;
use crate::config::Config;
use crate::models::{
    DelegateOptions, DelegatePeopleRequest, Leader, LeaderStatus, RemovalMode,
    RemoveLeaderRequest,
};

/// Called once the dialog has closed after a successful removal.
pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

/// Options sent with every transfer: the source is deactivated, tags travel, projects stay.
pub const TRANSFER_OPTIONS: DelegateOptions = DelegateOptions {
    deactivate_from: true,
    transfer_tags: true,
    transfer_projects: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Loading,
    Ready,
    Submitting,
}

/// What the operator has chosen so far. Lives only while the dialog is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalIntent {
    pub mode: RemovalMode,
    pub target_leader_id: Option<String>,
    pub confirm_text: String,
    /// Sent with the procedure call so a resubmission can be deduplicated.
    pub operation_id: Uuid,
}

impl Default for RemovalIntent {
    fn default() -> Self {
        Self {
            mode: RemovalMode::default(),
            target_leader_id: None,
            confirm_text: String::new(),
            operation_id: Uuid::new_v4(),
        }
    }
}

/// Operator-facing result of a completed removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalSummary {
    pub leader_id: String,
    pub mode: RemovalMode,
    /// Contacts moved (transfer) or deleted (delete).
    pub people_processed: i64,
    pub message: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemovalError {
    #[error("No leader selected for removal")]
    NoLeader,

    #[error("Type {} to confirm the removal", CONFIRMATION_KEYWORD)]
    ConfirmationMismatch,

    #[error("Select the leader who will receive the contacts")]
    MissingTarget,

    #[error("Contacts cannot be transferred to the leader being removed")]
    SelfTransfer,

    #[error("The dialog is still loading")]
    StillLoading,

    #[error("A removal is already in progress")]
    AlreadySubmitting,

    #[error("{}", remote_failure_message(.0.as_deref()))]
    Remote(Option<String>),
}

impl RemovalError {
    /// Raised locally, before any remote call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RemovalError::ConfirmationMismatch
                | RemovalError::MissingTarget
                | RemovalError::SelfTransfer
        )
    }
}

fn remote_failure_message(reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!("Failed to remove leader: {}", reason),
        _ => "Failed to remove leader".to_string(),
    }
}

/// Remote reads for an open dialog.
pub struct PendingLoad {
    service: Arc<dyn LeaderDataService>,
    leader_id: String,
    dialog: Uuid,
    with_count: bool,
    with_candidates: bool,
}

/// What a [`PendingLoad`] fetched. `None` fields were not requested or failed.
#[derive(Debug)]
pub struct LoadedDetails {
    dialog: Uuid,
    people_count: Option<i64>,
    candidates: Option<Vec<Leader>>,
}

impl PendingLoad {
    pub async fn run(self) -> LoadedDetails {
        let count = async {
            if !self.with_count {
                return None;
            }
            match self.service.count_people(&self.leader_id).await {
                Ok(count) => Some(count),
                Err(e) => {
                    tracing::warn!(leader = %self.leader_id, "Failed to load contact count: {}", e);
                    None
                }
            }
        };
        let candidates = async {
            if !self.with_candidates {
                return None;
            }
            match self.service.list_active_leaders(&self.leader_id).await {
                // Never offer the leader as its own successor.
                Ok(leaders) => Some(
                    leaders
                        .into_iter()
                        .filter(|candidate| candidate.id != self.leader_id)
                        .collect::<Vec<_>>(),
                ),
                Err(e) => {
                    tracing::warn!(leader = %self.leader_id, "Failed to load active leaders: {}", e);
                    None
                }
            }
        };

        let (people_count, candidates) = tokio::join!(count, candidates);
        LoadedDetails {
            dialog: self.dialog,
            people_count,
            candidates,
        }
    }
}

/// A confirmed removal, ready to be sent.
pub struct PendingSubmission {
    service: Arc<dyn LeaderDataService>,
    leader: Leader,
    mode: RemovalMode,
    target_leader_id: Option<String>,
    operation_id: Uuid,
}

/// Result of a [`PendingSubmission`], applied with [`RemovalWorkflow::finish_submit`].
#[derive(Debug)]
pub struct SubmissionOutcome {
    operation_id: Uuid,
    result: Result<RemovalSummary, RemovalError>,
}

impl PendingSubmission {
    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    pub async fn run(self) -> SubmissionOutcome {
        let result = match self.mode {
            RemovalMode::TransferContacts => self.transfer_contacts().await,
            RemovalMode::DeleteContacts => self.delete_contacts().await,
        };
        SubmissionOutcome {
            operation_id: self.operation_id,
            result,
        }
    }

    async fn transfer_contacts(&self) -> Result<RemovalSummary, RemovalError> {
        let leader = &self.leader;
        let to_leader = self
            .target_leader_id
            .clone()
            .ok_or(RemovalError::MissingTarget)?;

        let request = DelegatePeopleRequest {
            from_leader: leader.id.clone(),
            to_leader,
            opts: TRANSFER_OPTIONS,
            operation_id: Some(self.operation_id.to_string()),
        };

        let response = self
            .service
            .delegate_people(&request)
            .await
            .map_err(|e| RemovalError::Remote(Some(e.to_string())))?;

        let moved = match ProcedureOutcome::from(response) {
            ProcedureOutcome::Success { count } => count,
            ProcedureOutcome::Failure { reason } => return Err(RemovalError::Remote(reason)),
        };

        // Second, independent write; the procedure already committed.
        if let Err(e) = self
            .service
            .update_leader_status(&leader.id, LeaderStatus::Inactive)
            .await
        {
            tracing::warn!(leader = %leader.id, "Failed to mark removed leader inactive: {}", e);
        }

        Ok(RemovalSummary {
            leader_id: leader.id.clone(),
            mode: RemovalMode::TransferContacts,
            people_processed: moved,
            message: format!(
                "Leader {} removed. {} contact(s) transferred.",
                leader.email, moved
            ),
        })
    }

    async fn delete_contacts(&self) -> Result<RemovalSummary, RemovalError> {
        let leader = &self.leader;
        let request = RemoveLeaderRequest {
            p_leader_id: leader.id.clone(),
            p_mode: RemovalMode::DeleteContacts,
            p_target_leader_id: None,
            p_operation_id: Some(self.operation_id.to_string()),
        };

        let response = self
            .service
            .remove_leader(&request)
            .await
            .map_err(|e| RemovalError::Remote(Some(e.to_string())))?;

        match ProcedureOutcome::from(response) {
            ProcedureOutcome::Success { count } => Ok(RemovalSummary {
                leader_id: leader.id.clone(),
                mode: RemovalMode::DeleteContacts,
                people_processed: count,
                message: format!(
                    "Leader {} removed. {} contact(s) deleted.",
                    leader.email, count
                ),
            }),
            ProcedureOutcome::Failure { reason } => Err(RemovalError::Remote(reason)),
        }
    }
}

/// Leader removal dialog backed by a [`LeaderDataService`].
pub struct RemovalWorkflow {
    service: Arc<dyn LeaderDataService>,
    refresh_delay: Duration,
    on_removed: RefreshCallback,
    state: ModalState,
    leader: Option<Leader>,
    intent: RemovalIntent,
    people_count: Option<i64>,
    candidates: Vec<Leader>,
    candidates_requested: bool,
    error: Option<String>,
}

impl RemovalWorkflow {
    pub fn new(
        service: Arc<dyn LeaderDataService>,
        refresh_delay: Duration,
        on_removed: RefreshCallback,
    ) -> Self {
        Self {
            service,
            refresh_delay,
            on_removed,
            state: ModalState::Closed,
            leader: None,
            intent: RemovalIntent::default(),
            people_count: None,
            candidates: Vec::new(),
            candidates_requested: false,
            error: None,
        }
    }

    /// Workflow using the configured refresh delay.
    pub fn from_config(
        service: Arc<dyn LeaderDataService>,
        config: &Config,
        on_removed: RefreshCallback,
    ) -> Self {
        Self::new(service, config.refresh_delay, on_removed)
    }

    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn leader(&self) -> Option<&Leader> {
        self.leader.as_ref()
    }

    pub fn intent(&self) -> &RemovalIntent {
        &self.intent
    }

    /// Contacts owned by the leader, for display only. `None` if the count could not be loaded.
    pub fn people_count(&self) -> Option<i64> {
        self.people_count
    }

    /// Active leaders offered as transfer targets.
    pub fn candidates(&self) -> &[Leader] {
        &self.candidates
    }

    /// Message of the last failed submission.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Open the dialog for `leader` in the default mode and wait for its details.
    pub async fn open(&mut self, leader: Leader) {
        let load = self.begin_open(leader, RemovalMode::default());
        let loaded = load.run().await;
        self.finish_loading(loaded);
    }

    /// Enter `Loading` for `leader`. Successors are only fetched in transfer mode.
    pub fn begin_open(&mut self, leader: Leader, mode: RemovalMode) -> PendingLoad {
        self.reset();
        self.state = ModalState::Loading;
        self.intent.mode = mode;

        let with_candidates = mode == RemovalMode::TransferContacts;
        self.candidates_requested = with_candidates;
        let load = PendingLoad {
            service: Arc::clone(&self.service),
            leader_id: leader.id.clone(),
            dialog: self.intent.operation_id,
            with_count: true,
            with_candidates,
        };
        self.leader = Some(leader);
        load
    }

    /// Apply loaded details. Ignored if the dialog was closed in the meantime.
    pub fn finish_loading(&mut self, loaded: LoadedDetails) {
        if self.state == ModalState::Closed || loaded.dialog != self.intent.operation_id {
            tracing::debug!("Discarding details loaded for a closed dialog");
            return;
        }

        if loaded.people_count.is_some() {
            self.people_count = loaded.people_count;
        }
        match loaded.candidates {
            Some(candidates) => self.candidates = candidates,
            // Let the next switch to transfer mode try again.
            None => self.candidates_requested = !self.candidates.is_empty(),
        }
        if self.state == ModalState::Loading {
            self.state = ModalState::Ready;
        }
    }

    /// Change the mode. Returns the successor load still owed when switching to transfer.
    pub fn set_mode(&mut self, mode: RemovalMode) -> Option<PendingLoad> {
        self.intent.mode = mode;

        if mode != RemovalMode::TransferContacts
            || self.candidates_requested
            || !matches!(self.state, ModalState::Loading | ModalState::Ready)
        {
            return None;
        }
        let leader = self.leader.as_ref()?;
        self.candidates_requested = true;
        Some(PendingLoad {
            service: Arc::clone(&self.service),
            leader_id: leader.id.clone(),
            dialog: self.intent.operation_id,
            with_count: false,
            with_candidates: true,
        })
    }

    /// Change the mode and load successors if they are needed now.
    pub async fn switch_mode(&mut self, mode: RemovalMode) {
        if let Some(load) = self.set_mode(mode) {
            let loaded = load.run().await;
            self.finish_loading(loaded);
        }
    }

    pub fn select_target(&mut self, target_leader_id: Option<String>) {
        self.intent.target_leader_id = target_leader_id.filter(|id| !id.trim().is_empty());
    }

    pub fn set_confirm_text(&mut self, text: impl Into<String>) {
        self.intent.confirm_text = text.into();
    }

    /// Close without removing; the intent is discarded. No effect while submitting.
    pub fn cancel(&mut self) {
        if self.state != ModalState::Submitting {
            self.reset();
        }
    }

    /// Check the intent without touching the network.
    pub fn validate(&self) -> Result<(), RemovalError> {
        let leader = self.leader.as_ref().ok_or(RemovalError::NoLeader)?;

        if self.intent.confirm_text != CONFIRMATION_KEYWORD {
            return Err(RemovalError::ConfirmationMismatch);
        }

        if self.intent.mode == RemovalMode::TransferContacts {
            match self.intent.target_leader_id.as_deref() {
                None => return Err(RemovalError::MissingTarget),
                Some(target) if target == leader.id => return Err(RemovalError::SelfTransfer),
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Run the removal the operator confirmed.
    ///
    /// On success the dialog closes and the refresh callback fires after the
    /// configured delay. On failure the dialog stays open with the error set.
    pub async fn submit(&mut self) -> Result<RemovalSummary, RemovalError> {
        let pending = self.begin_submit()?;
        let outcome = pending.run().await;
        self.finish_submit(outcome)
    }

    /// Validate and enter `Submitting`.
    pub fn begin_submit(&mut self) -> Result<PendingSubmission, RemovalError> {
        match self.state {
            ModalState::Submitting => return Err(RemovalError::AlreadySubmitting),
            ModalState::Loading => return Err(RemovalError::StillLoading),
            ModalState::Closed | ModalState::Ready => {}
        }
        let Some(leader) = self.leader.clone() else {
            return Err(RemovalError::NoLeader);
        };
        if let Err(e) = self.validate() {
            self.error = Some(e.to_string());
            return Err(e);
        }

        self.state = ModalState::Submitting;
        self.error = None;

        Ok(PendingSubmission {
            service: Arc::clone(&self.service),
            leader,
            mode: self.intent.mode,
            target_leader_id: self.intent.target_leader_id.clone(),
            operation_id: self.intent.operation_id,
        })
    }

    /// Apply the result of a submission started by [`Self::begin_submit`].
    pub fn finish_submit(
        &mut self,
        outcome: SubmissionOutcome,
    ) -> Result<RemovalSummary, RemovalError> {
        if self.state != ModalState::Submitting || outcome.operation_id != self.intent.operation_id
        {
            tracing::warn!(
                operation_id = %outcome.operation_id,
                "Submission finished for a dialog that is not submitting it"
            );
            return outcome.result;
        }

        match outcome.result {
            Ok(summary) => {
                tracing::info!(
                    leader = %summary.leader_id,
                    mode = summary.mode.as_str(),
                    people = summary.people_processed,
                    "Leader removed"
                );
                self.reset();
                self.schedule_refresh();
                Ok(summary)
            }
            Err(e) => {
                if let Some(leader) = &self.leader {
                    tracing::error!(leader = %leader.id, "Leader removal failed: {}", e);
                }
                self.state = ModalState::Ready;
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn schedule_refresh(&self) {
        let on_removed = Arc::clone(&self.on_removed);
        let delay = self.refresh_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_removed();
        });
    }

    fn reset(&mut self) {
        self.state = ModalState::Closed;
        self.leader = None;
        self.intent = RemovalIntent::default();
        self.people_count = None;
        self.candidates.clear();
        self.candidates_requested = false;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DelegatePeopleResponse, RemoveLeaderResponse};
    use crate::removal::ServiceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Count(String),
        ListActive(String),
        Delegate(DelegatePeopleRequest),
        Remove(RemoveLeaderRequest),
        UpdateStatus(String, LeaderStatus),
    }

    struct FakeService {
        calls: Mutex<Vec<Call>>,
        leaders: Vec<Leader>,
        delegate: Mutex<Result<DelegatePeopleResponse, String>>,
        remove: Mutex<Result<RemoveLeaderResponse, String>>,
        fail_status_update: bool,
    }

    impl FakeService {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                leaders: vec![leader("leader-1"), leader("leader-2"), leader("leader-3")],
                delegate: Mutex::new(Ok(DelegatePeopleResponse::moved(7))),
                remove: Mutex::new(Ok(RemoveLeaderResponse::processed(3))),
                fail_status_update: false,
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn procedure_calls(&self) -> Vec<Call> {
            self.calls()
                .into_iter()
                .filter(|c| matches!(c, Call::Delegate(_) | Call::Remove(_)))
                .collect()
        }
    }

    #[async_trait]
    impl LeaderDataService for FakeService {
        async fn count_people(&self, owner_id: &str) -> Result<i64, ServiceError> {
            self.calls.lock().unwrap().push(Call::Count(owner_id.to_string()));
            Ok(7)
        }

        async fn list_active_leaders(&self, exclude: &str) -> Result<Vec<Leader>, ServiceError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::ListActive(exclude.to_string()));
            Ok(self
                .leaders
                .iter()
                .filter(|l| l.id != exclude)
                .cloned()
                .collect())
        }

        async fn delegate_people(
            &self,
            request: &DelegatePeopleRequest,
        ) -> Result<DelegatePeopleResponse, ServiceError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Delegate(request.clone()));
            self.delegate
                .lock()
                .unwrap()
                .clone()
                .map_err(ServiceError::Transport)
        }

        async fn remove_leader(
            &self,
            request: &RemoveLeaderRequest,
        ) -> Result<RemoveLeaderResponse, ServiceError> {
            self.calls.lock().unwrap().push(Call::Remove(request.clone()));
            self.remove
                .lock()
                .unwrap()
                .clone()
                .map_err(ServiceError::Transport)
        }

        async fn update_leader_status(
            &self,
            leader_id: &str,
            status: LeaderStatus,
        ) -> Result<(), ServiceError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::UpdateStatus(leader_id.to_string(), status));
            if self.fail_status_update {
                return Err(ServiceError::Transport("connection reset".to_string()));
            }
            Ok(())
        }
    }

    fn leader(id: &str) -> Leader {
        Leader {
            id: id.to_string(),
            email: format!("{}@example.org", id),
            display_name: None,
            status: LeaderStatus::Active,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    const DELAY: Duration = Duration::from_millis(10);

    fn workflow(service: Arc<FakeService>) -> (RemovalWorkflow, Arc<AtomicUsize>) {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&refreshes);
        let workflow = RemovalWorkflow::new(
            service,
            DELAY,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (workflow, refreshes)
    }

    async fn settle() {
        tokio::time::sleep(DELAY * 5).await;
    }

    #[tokio::test]
    async fn test_open_loads_count_and_excludes_self() {
        let service = Arc::new(FakeService::new());
        let (mut workflow, _) = workflow(Arc::clone(&service));
        assert_eq!(workflow.state(), ModalState::Closed);

        workflow.open(leader("leader-1")).await;

        assert_eq!(workflow.state(), ModalState::Ready);
        assert_eq!(workflow.people_count(), Some(7));
        assert_eq!(workflow.intent().mode, RemovalMode::TransferContacts);
        let ids: Vec<&str> = workflow.candidates().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["leader-2", "leader-3"]);
        assert!(service
            .calls()
            .contains(&Call::ListActive("leader-1".to_string())));
    }

    #[tokio::test]
    async fn test_transfer_scenario() {
        let service = Arc::new(FakeService::new());
        let (mut workflow, refreshes) = workflow(Arc::clone(&service));

        workflow.open(leader("leader-1")).await;
        workflow.set_mode(RemovalMode::TransferContacts);
        workflow.select_target(Some("leader-2".to_string()));
        workflow.set_confirm_text("EXCLUIR");
        let operation_id = workflow.intent().operation_id;

        let summary = workflow.submit().await.unwrap();
        assert!(summary.message.contains('7'));
        assert_eq!(summary.people_processed, 7);
        assert_eq!(workflow.state(), ModalState::Closed);
        assert!(workflow.leader().is_none());

        let calls = service.procedure_calls();
        assert_eq!(calls.len(), 1);
        let Call::Delegate(request) = &calls[0] else {
            panic!("expected delegate call, got {:?}", calls[0]);
        };
        assert_eq!(request.from_leader, "leader-1");
        assert_eq!(request.to_leader, "leader-2");
        assert_eq!(
            request.opts,
            DelegateOptions {
                deactivate_from: true,
                transfer_tags: true,
                transfer_projects: false,
            }
        );
        assert_eq!(request.operation_id, Some(operation_id.to_string()));
        assert!(service.calls().contains(&Call::UpdateStatus(
            "leader-1".to_string(),
            LeaderStatus::Inactive
        )));

        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        settle().await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_scenario() {
        let service = Arc::new(FakeService::new());
        let (mut workflow, refreshes) = workflow(Arc::clone(&service));

        workflow.open(leader("leader-1")).await;
        workflow.set_mode(RemovalMode::DeleteContacts);
        workflow.set_confirm_text("EXCLUIR");

        let summary = workflow.submit().await.unwrap();
        assert!(summary.message.contains('3'));
        assert_eq!(summary.mode, RemovalMode::DeleteContacts);

        let calls = service.procedure_calls();
        let Call::Remove(request) = &calls[0] else {
            panic!("expected remove call, got {:?}", calls[0]);
        };
        assert_eq!(request.p_leader_id, "leader-1");
        assert_eq!(request.p_mode, RemovalMode::DeleteContacts);
        assert_eq!(request.p_target_leader_id, None);
        // Delete mode has no follow-up status write.
        assert!(!service
            .calls()
            .iter()
            .any(|c| matches!(c, Call::UpdateStatus(..))));

        settle().await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrong_confirmation_never_calls_remote() {
        for mode in [RemovalMode::TransferContacts, RemovalMode::DeleteContacts] {
            for text in ["excluir", "", "EXCLUIR ", "Excluir", "DELETE"] {
                let service = Arc::new(FakeService::new());
                let (mut workflow, refreshes) = workflow(Arc::clone(&service));
                workflow.open(leader("leader-1")).await;
                workflow.set_mode(mode);
                workflow.select_target(Some("leader-2".to_string()));
                workflow.set_confirm_text(text);

                let err = workflow.submit().await.unwrap_err();
                assert_eq!(err, RemovalError::ConfirmationMismatch);
                assert!(err.is_validation());
                assert_eq!(workflow.state(), ModalState::Ready);
                assert!(workflow.error().unwrap().contains(CONFIRMATION_KEYWORD));
                assert!(service.procedure_calls().is_empty());
                settle().await;
                assert_eq!(refreshes.load(Ordering::SeqCst), 0);
            }
        }
    }

    #[tokio::test]
    async fn test_transfer_requires_target() {
        let service = Arc::new(FakeService::new());
        let (mut workflow, _) = workflow(Arc::clone(&service));
        workflow.open(leader("leader-1")).await;
        workflow.set_confirm_text("EXCLUIR");

        workflow.select_target(Some("  ".to_string()));
        assert_eq!(workflow.submit().await, Err(RemovalError::MissingTarget));

        workflow.select_target(Some("leader-1".to_string()));
        assert_eq!(workflow.submit().await, Err(RemovalError::SelfTransfer));

        assert!(service.procedure_calls().is_empty());
    }

    #[tokio::test]
    async fn test_delegate_not_ok_keeps_modal_open() {
        let service = Arc::new(FakeService::new());
        *service.delegate.lock().unwrap() = Ok(DelegatePeopleResponse {
            ok: false,
            moved_count: None,
            error: None,
        });
        let (mut workflow, refreshes) = workflow(Arc::clone(&service));
        workflow.open(leader("leader-1")).await;
        workflow.select_target(Some("leader-2".to_string()));
        workflow.set_confirm_text("EXCLUIR");

        let err = workflow.submit().await.unwrap_err();
        assert_eq!(err, RemovalError::Remote(None));
        assert_eq!(workflow.state(), ModalState::Ready);
        assert_eq!(workflow.error(), Some("Failed to remove leader"));
        assert_eq!(workflow.leader().unwrap().id, "leader-1");
        assert!(!service
            .calls()
            .iter()
            .any(|c| matches!(c, Call::UpdateStatus(..))));

        settle().await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_network_error_then_retry_reuses_operation_id() {
        let service = Arc::new(FakeService::new());
        *service.delegate.lock().unwrap() = Err("connection refused".to_string());
        let (mut workflow, refreshes) = workflow(Arc::clone(&service));
        workflow.open(leader("leader-1")).await;
        workflow.select_target(Some("leader-2".to_string()));
        workflow.set_confirm_text("EXCLUIR");

        let err = workflow.submit().await.unwrap_err();
        assert!(matches!(err, RemovalError::Remote(Some(_))));
        assert!(workflow.error().unwrap().contains("connection refused"));
        assert_eq!(workflow.state(), ModalState::Ready);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);

        *service.delegate.lock().unwrap() = Ok(DelegatePeopleResponse::moved(2));
        workflow.submit().await.unwrap();

        let ids: Vec<Option<String>> = service
            .procedure_calls()
            .into_iter()
            .map(|c| match c {
                Call::Delegate(request) => request.operation_id,
                other => panic!("unexpected call {:?}", other),
            })
            .collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1]);

        settle().await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_update_failure_is_not_fatal() {
        let mut fake = FakeService::new();
        fake.fail_status_update = true;
        let service = Arc::new(fake);
        let (mut workflow, _) = workflow(Arc::clone(&service));
        workflow.open(leader("leader-1")).await;
        workflow.select_target(Some("leader-3".to_string()));
        workflow.set_confirm_text("EXCLUIR");

        let summary = workflow.submit().await.unwrap();
        assert_eq!(summary.people_processed, 7);
        assert_eq!(workflow.state(), ModalState::Closed);
    }

    #[tokio::test]
    async fn test_remove_failure_message_includes_reason() {
        let service = Arc::new(FakeService::new());
        *service.remove.lock().unwrap() = Ok(RemoveLeaderResponse::failed("Leader x not found"));
        let (mut workflow, _) = workflow(Arc::clone(&service));
        workflow.open(leader("leader-1")).await;
        workflow.set_mode(RemovalMode::DeleteContacts);
        workflow.set_confirm_text("EXCLUIR");

        let err = workflow.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to remove leader: Leader x not found");
    }

    fn list_active_calls(service: &FakeService) -> usize {
        service
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::ListActive(_)))
            .count()
    }

    #[tokio::test]
    async fn test_delete_mode_skips_successor_load() {
        let service = Arc::new(FakeService::new());
        let (mut workflow, _) = workflow(Arc::clone(&service));

        let load = workflow.begin_open(leader("leader-1"), RemovalMode::DeleteContacts);
        workflow.finish_loading(load.run().await);
        assert_eq!(workflow.state(), ModalState::Ready);
        assert_eq!(workflow.people_count(), Some(7));
        assert!(workflow.candidates().is_empty());
        assert_eq!(list_active_calls(&service), 0);

        workflow.switch_mode(RemovalMode::TransferContacts).await;
        assert_eq!(list_active_calls(&service), 1);
        assert_eq!(workflow.candidates().len(), 2);

        // Already loaded: switching back and forth fetches nothing new.
        assert!(workflow.set_mode(RemovalMode::DeleteContacts).is_none());
        workflow.switch_mode(RemovalMode::TransferContacts).await;
        assert_eq!(list_active_calls(&service), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_loading_discards_late_details() {
        let service = Arc::new(FakeService::new());
        let (mut workflow, _) = workflow(Arc::clone(&service));

        let load = workflow.begin_open(leader("leader-1"), RemovalMode::TransferContacts);
        assert_eq!(workflow.state(), ModalState::Loading);
        assert_eq!(workflow.leader().unwrap().id, "leader-1");
        workflow.set_confirm_text("EXCLUIR");
        assert!(matches!(
            workflow.begin_submit(),
            Err(RemovalError::StillLoading)
        ));

        workflow.cancel();
        assert_eq!(workflow.state(), ModalState::Closed);

        workflow.finish_loading(load.run().await);
        assert_eq!(workflow.state(), ModalState::Closed);
        assert!(workflow.leader().is_none());
        assert!(workflow.candidates().is_empty());
        assert_eq!(workflow.people_count(), None);
    }

    #[tokio::test]
    async fn test_second_submit_rejected_while_first_in_flight() {
        let service = Arc::new(FakeService::new());
        let (mut workflow, refreshes) = workflow(Arc::clone(&service));
        workflow.open(leader("leader-1")).await;
        workflow.select_target(Some("leader-2".to_string()));
        workflow.set_confirm_text("EXCLUIR");

        let pending = workflow.begin_submit().unwrap();
        assert_eq!(workflow.state(), ModalState::Submitting);
        assert_eq!(pending.operation_id(), workflow.intent().operation_id);

        assert!(matches!(
            workflow.begin_submit(),
            Err(RemovalError::AlreadySubmitting)
        ));
        assert_eq!(
            workflow.submit().await,
            Err(RemovalError::AlreadySubmitting)
        );

        // Cancel is ignored while submitting.
        workflow.cancel();
        assert_eq!(workflow.state(), ModalState::Submitting);

        let summary = workflow.finish_submit(pending.run().await).unwrap();
        assert_eq!(summary.people_processed, 7);
        assert_eq!(workflow.state(), ModalState::Closed);
        assert_eq!(service.procedure_calls().len(), 1);

        settle().await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_without_leader_and_cancel() {
        let service = Arc::new(FakeService::new());
        let (mut workflow, _) = workflow(Arc::clone(&service));
        assert_eq!(workflow.submit().await, Err(RemovalError::NoLeader));

        workflow.open(leader("leader-1")).await;
        workflow.set_confirm_text("EXCLUIR");
        let first_operation = workflow.intent().operation_id;
        workflow.cancel();
        assert_eq!(workflow.state(), ModalState::Closed);
        assert_eq!(workflow.intent().confirm_text, "");
        assert_ne!(workflow.intent().operation_id, first_operation);
        assert!(service.procedure_calls().is_empty());
    }
}
