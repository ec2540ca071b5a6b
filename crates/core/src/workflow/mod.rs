//! Upload → analyze → commit state machine.
//!
//! ```text
//! Idle ──submit──▶ Uploading ──ok──▶ Analyzing ──ok──▶ Success
//!                      │                  │
//!                      └──err──▶ Failed ◀─┘
//! ```
//!
//! `Success` and `Failed` accept a fresh `submit`. A `submit` while
//! `Uploading` or `Analyzing` is rejected, never queued.

pub mod error;

use crate::domain::normalize;
use crate::service::{AnalysisService, SelectedFile};
use crate::storage::SnapshotStore;
use error::{Stage, TransportError, WorkflowError};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::Instrument;

const ACCEPTED_EXTENSIONS: [&str; 2] = [".csv", ".xlsx"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum WorkflowState {
    Idle,
    Uploading,
    Analyzing,
    Success,
    Failed { message: String },
}

impl WorkflowState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, WorkflowState::Uploading | WorkflowState::Analyzing)
    }
}

pub struct WorkflowController<S> {
    service: S,
    store: Arc<SnapshotStore>,
    business_id: u64,
    state: Mutex<WorkflowState>,
}

impl<S: AnalysisService> WorkflowController<S> {
    pub fn new(service: S, store: Arc<SnapshotStore>, business_id: u64) -> Self {
        Self {
            service,
            store,
            business_id,
            state: Mutex::new(WorkflowState::Idle),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Runs one full workflow. On `Ok` the snapshot is committed and the
    /// caller should navigate to the results view.
    pub async fn submit(&self, file: Option<SelectedFile>) -> Result<(), WorkflowError> {
        let file = self.begin(file)?;
        let in_flight = InFlight {
            state: &self.state,
            settled: false,
        };
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("workflow", %run_id, business_id = self.business_id);

        let result = self.run(&file).instrument(span.clone()).await;
        span.in_scope(|| match &result {
            Ok(()) => {
                in_flight.settle(WorkflowState::Success);
                tracing::info!("analysis committed");
            }
            Err(err) => {
                let message = err.user_message();
                tracing::warn!(error = %err, %message, "workflow failed");
                in_flight.settle(WorkflowState::Failed { message });
            }
        });
        result.map_err(WorkflowError::from)
    }

    /// Guards and enters `Uploading` atomically. Rejections leave the state
    /// untouched.
    fn begin(&self, file: Option<SelectedFile>) -> Result<SelectedFile, WorkflowError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_in_flight() {
            tracing::debug!(state = ?*state, "submit rejected; already in progress");
            return Err(WorkflowError::AlreadyInProgress);
        }

        let file = file.ok_or_else(|| WorkflowError::Validation("no file selected".to_string()))?;
        if !ACCEPTED_EXTENSIONS
            .iter()
            .any(|ext| file.file_name.ends_with(ext))
        {
            return Err(WorkflowError::Validation(format!(
                "unsupported file type: {}; expected .csv or .xlsx",
                file.file_name
            )));
        }

        *state = WorkflowState::Uploading;
        Ok(file)
    }

    async fn run(&self, file: &SelectedFile) -> Result<(), TransportError> {
        tracing::info!(file_name = %file.file_name, size = file.bytes.len(), "uploading");
        self.service.upload(self.business_id, file).await?;

        self.set_state(WorkflowState::Analyzing);
        tracing::info!("analyzing");
        let raw = self.service.analyze(self.business_id).await?;

        self.store.commit(normalize(&raw));
        Ok(())
    }

    fn set_state(&self, next: WorkflowState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Owns the in-flight state of one run. If the run's future is dropped
/// before it settles, the state moves to `Failed` so a later `submit` is
/// not rejected forever.
struct InFlight<'a> {
    state: &'a Mutex<WorkflowState>,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, next: WorkflowState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let stage = match *state {
            WorkflowState::Uploading => Stage::Upload,
            _ => Stage::Analyze,
        };
        tracing::warn!(state = ?*state, "workflow dropped before completion");
        *state = WorkflowState::Failed {
            message: stage.fallback_message().to_string(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ColorToken, Level};
    use crate::present::{ResultPresenter, ResultsPage};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Scripted service. When `gate` is set, `analyze` parks until released.
    struct FakeService {
        upload_result: Result<(), TransportError>,
        analyze_result: Result<Value, TransportError>,
        uploads: AtomicUsize,
        analyses: AtomicUsize,
        gate: Option<Gate>,
    }

    struct Gate {
        entered: Notify,
        release: Notify,
    }

    impl FakeService {
        fn ok(payload: Value) -> Self {
            Self {
                upload_result: Ok(()),
                analyze_result: Ok(payload),
                uploads: AtomicUsize::new(0),
                analyses: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(mut self) -> Self {
            self.gate = Some(Gate {
                entered: Notify::new(),
                release: Notify::new(),
            });
            self
        }

        fn calls(&self) -> (usize, usize) {
            (
                self.uploads.load(Ordering::SeqCst),
                self.analyses.load(Ordering::SeqCst),
            )
        }
    }

    #[async_trait::async_trait]
    impl AnalysisService for FakeService {
        async fn upload(&self, _business_id: u64, _file: &SelectedFile) -> Result<(), TransportError> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            self.upload_result.clone()
        }

        async fn analyze(&self, _business_id: u64) -> Result<Value, TransportError> {
            self.analyses.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            self.analyze_result.clone()
        }
    }

    fn csv() -> Option<SelectedFile> {
        Some(SelectedFile::new("q1.csv", b"revenue,expenses,assets,liabilities\n".to_vec()))
    }

    fn controller(service: FakeService) -> WorkflowController<FakeService> {
        WorkflowController::new(service, Arc::new(SnapshotStore::in_memory()), 1)
    }

    fn analyze_failure(status: u16, detail: &str) -> TransportError {
        TransportError {
            stage: Stage::Analyze,
            status: Some(status),
            server_message: Some(detail.to_string()),
            detail: format!("status={status}"),
        }
    }

    #[tokio::test]
    async fn successful_run_commits_and_shows_all_clear_warnings() {
        let ctl = controller(FakeService::ok(json!({
            "risk": {"score": 820, "category": "Low Risk"},
            "warnings": []
        })));

        ctl.submit(csv()).await.unwrap();

        assert_eq!(ctl.state(), WorkflowState::Success);
        assert_eq!(ctl.store().latest().unwrap().risk.score, 820.0);

        let presenter = ResultPresenter::new(&Default::default()).unwrap();
        let ResultsPage::Dashboard { dashboard } = ResultsPage::load(ctl.store(), &presenter) else {
            panic!("expected dashboard");
        };
        assert!(dashboard.warnings.is_all_clear());
    }

    #[tokio::test]
    async fn missing_file_is_rejected_without_network() {
        let ctl = controller(FakeService::ok(json!({})));

        let err = ctl.submit(None).await.unwrap_err();

        assert_eq!(err, WorkflowError::Validation("no file selected".to_string()));
        assert_eq!(err.user_message(), "no file selected");
        assert_eq!(ctl.state(), WorkflowState::Idle);
        assert_eq!(ctl.service.calls(), (0, 0));
        assert!(ctl.store().latest().is_none());
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected_locally() {
        let ctl = controller(FakeService::ok(json!({})));

        let err = ctl
            .submit(Some(SelectedFile::new("statement.pdf", vec![1, 2, 3])))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(ctl.state(), WorkflowState::Idle);
        assert_eq!(ctl.service.calls(), (0, 0));
    }

    #[tokio::test]
    async fn analyze_failure_surfaces_the_server_message() {
        let mut service = FakeService::ok(json!({}));
        service.analyze_result = Err(analyze_failure(500, "model unavailable"));
        let ctl = controller(service);

        let err = ctl.submit(csv()).await.unwrap_err();

        assert_eq!(err.user_message(), "model unavailable");
        assert_eq!(
            ctl.state(),
            WorkflowState::Failed {
                message: "model unavailable".to_string()
            }
        );
        assert!(ctl.store().latest().is_none());
    }

    #[tokio::test]
    async fn upload_failure_skips_analysis() {
        let mut service = FakeService::ok(json!({}));
        service.upload_result = Err(TransportError {
            stage: Stage::Upload,
            status: None,
            server_message: None,
            detail: "timed out".to_string(),
        });
        let ctl = controller(service);

        let err = ctl.submit(csv()).await.unwrap_err();

        assert_eq!(ctl.service.calls(), (1, 0));
        let WorkflowState::Failed { message } = ctl.state() else {
            panic!("expected failed state");
        };
        assert_eq!(message, err.user_message());
        assert!(!message.contains("timed out"));
    }

    #[tokio::test]
    async fn critical_warning_is_classified_critical() {
        let ctl = controller(FakeService::ok(json!({
            "warnings": [{"type": "Liquidity", "severity": "Critical", "message": "Cash reserves below 1 month"}]
        })));
        ctl.submit(csv()).await.unwrap();

        let presenter = ResultPresenter::new(&Default::default()).unwrap();
        let vm = presenter.present(&ctl.store().latest().unwrap());
        let first = &vm.warnings.items()[0];
        assert_eq!(first.classification.color, ColorToken::Red);
        assert_eq!(first.classification.level, Level::Critical);
    }

    #[tokio::test]
    async fn submit_while_analyzing_is_rejected_and_run_completes() {
        let ctl = controller(FakeService::ok(json!({"risk": {"score": 640}})).gated());
        let gate = ctl.service.gate.as_ref().unwrap();

        let first = ctl.submit(csv());
        let second = async {
            gate.entered.notified().await;
            assert_eq!(ctl.state(), WorkflowState::Analyzing);

            let err = ctl.submit(csv()).await.unwrap_err();
            assert_eq!(err, WorkflowError::AlreadyInProgress);
            assert_eq!(ctl.state(), WorkflowState::Analyzing);

            gate.release.notify_one();
        };

        let (first, ()) = tokio::join!(first, second);
        first.unwrap();

        assert_eq!(ctl.state(), WorkflowState::Success);
        assert_eq!(ctl.service.calls(), (1, 1));
        assert_eq!(ctl.store().latest().unwrap().risk.score, 640.0);
    }

    #[tokio::test]
    async fn dropped_submit_does_not_block_the_next_one() {
        let ctl = controller(FakeService::ok(json!({"risk": {"score": 760}})).gated());
        let gate = ctl.service.gate.as_ref().unwrap();

        // Abandon the run while it is parked inside `analyze`.
        tokio::select! {
            _ = ctl.submit(csv()) => panic!("gated submit should not finish"),
            _ = gate.entered.notified() => {}
        }
        assert_eq!(
            ctl.state(),
            WorkflowState::Failed {
                message: "Analysis failed. Please try again.".to_string()
            }
        );
        assert!(ctl.store().latest().is_none());

        gate.release.notify_one();
        ctl.submit(csv()).await.unwrap();
        assert_eq!(ctl.state(), WorkflowState::Success);
        assert_eq!(ctl.service.calls(), (2, 2));
        assert_eq!(ctl.store().latest().unwrap().risk.score, 760.0);
    }

    #[tokio::test]
    async fn failed_state_accepts_a_fresh_submit() {
        let mut service = FakeService::ok(json!({"risk": {"score": 700}}));
        service.analyze_result = Err(analyze_failure(503, "busy"));
        let ctl = controller(service);
        ctl.submit(csv()).await.unwrap_err();
        assert!(matches!(ctl.state(), WorkflowState::Failed { .. }));

        // No auto-reset: a new submit runs the whole sequence again.
        ctl.submit(csv()).await.unwrap_err();
        assert_eq!(ctl.service.calls(), (2, 2));
    }
}
