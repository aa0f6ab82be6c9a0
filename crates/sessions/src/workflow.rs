//! Session processing workflow
//!
//! Drives one upload-and-process attempt against the agent backend as an
//! explicit state machine. Remote failures land in the per-session error
//! state instead of propagating; there are no automatic retries. A new
//! attempt requires an explicit [`SessionWorkflow::reset`].

use std::time::Duration;

use agent_client::ResultsResponse;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::gateway::Gateway;

/// Where a session currently sits in its processing lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Idle,
    Uploading,
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl Stage {
    /// Terminal stages end the attempt; only a reset leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    /// Stages with a remote call in flight or about to be issued.
    pub fn is_active(&self) -> bool {
        matches!(self, Stage::Uploading | Stage::Uploaded | Stage::Processing)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Idle
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::Uploading => write!(f, "uploading"),
            Stage::Uploaded => write!(f, "uploaded"),
            Stage::Processing => write!(f, "processing"),
            Stage::Completed => write!(f, "completed"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Stage::Idle),
            "uploading" => Ok(Stage::Uploading),
            "uploaded" => Ok(Stage::Uploaded),
            "processing" => Ok(Stage::Processing),
            "completed" => Ok(Stage::Completed),
            "failed" => Ok(Stage::Failed),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// Configuration for a session workflow
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Poll the status endpoint after starting processing instead of
    /// trusting the inline process response alone
    pub poll_for_completion: bool,
    /// Delay between status polls in milliseconds
    pub poll_interval_ms: u64,
    /// Status polls allowed before the attempt is declared failed
    pub poll_max_attempts: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            poll_for_completion: false,
            poll_interval_ms: 2000,
            poll_max_attempts: 150,
        }
    }
}

impl WorkflowConfig {
    /// Trust the inline process response (the default)
    pub fn synchronous() -> Self {
        Self::default()
    }

    /// Poll status until the backend reports a terminal state
    pub fn polling() -> Self {
        Self {
            poll_for_completion: true,
            ..Self::default()
        }
    }

    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    pub fn with_poll_max_attempts(mut self, attempts: u32) -> Self {
        self.poll_max_attempts = attempts;
        self
    }
}

/// Events emitted as a workflow attempt advances
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    Started { file_count: usize },
    StageChanged { stage: Stage },
    SessionCreated { session_id: String },
    StatusPolled { attempt: u32, status: String },
    Completed { session_id: String },
    Failed { error: String },
}

#[derive(Debug, Default)]
struct WorkflowState {
    session_id: Option<String>,
    stage: Stage,
    error: Option<String>,
    results: Option<ResultsResponse>,
    /// Bumped on every reset; replies carrying an older epoch are dropped.
    epoch: u64,
}

/// Upload-and-process state machine for one agent session
///
/// All methods take `&self`; state lives behind a mutex that is never
/// held across a gateway call, so `reset` can run while an attempt is
/// waiting on the backend.
pub struct SessionWorkflow<G: Gateway> {
    gateway: G,
    config: WorkflowConfig,
    state: Mutex<WorkflowState>,
    event_sender: Option<mpsc::Sender<WorkflowEvent>>,
}

impl<G: Gateway> SessionWorkflow<G> {
    pub fn new(gateway: G, config: WorkflowConfig) -> Self {
        Self {
            gateway,
            config,
            state: Mutex::new(WorkflowState::default()),
            event_sender: None,
        }
    }

    /// Attach a channel for progress events. Undeliverable events are
    /// dropped rather than failing the workflow.
    pub fn with_event_sender(mut self, sender: mpsc::Sender<WorkflowEvent>) -> Self {
        self.event_sender = Some(sender);
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub async fn stage(&self) -> Stage {
        self.state.lock().await.stage
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state.lock().await.session_id.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    async fn emit(&self, event: WorkflowEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event).await;
        }
    }

    /// Run one upload-and-process attempt with the given files.
    ///
    /// Ignored unless the workflow is idle; terminal stages require a
    /// `reset` first. Returns the stage the attempt ended in.
    pub async fn start(&self, files: Vec<(String, Vec<u8>)>) -> Stage {
        if files.is_empty() {
            debug!("Ignoring start request with no files");
            return self.stage().await;
        }

        let file_count = files.len();
        let issued = {
            let mut state = self.state.lock().await;
            if state.stage != Stage::Idle {
                debug!("Ignoring start request while stage is {}", state.stage);
                return state.stage;
            }
            state.stage = Stage::Uploading;
            state.error = None;
            state.epoch
        };

        self.emit(WorkflowEvent::Started { file_count }).await;
        self.emit(WorkflowEvent::StageChanged {
            stage: Stage::Uploading,
        })
        .await;

        let response = match self.gateway.upload_files(files).await {
            Ok(response) => response,
            Err(e) => {
                return self
                    .fail_attempt(issued, format!("Upload failed: {}", e))
                    .await;
            }
        };

        {
            let mut state = self.state.lock().await;
            if state.epoch != issued {
                debug!("Discarding upload reply from superseded attempt");
                return state.stage;
            }
            state.session_id = Some(response.session_id.clone());
            state.stage = Stage::Uploaded;
        }
        let session_id = response.session_id;
        debug!("Upload complete, session {}", session_id);

        self.emit(WorkflowEvent::SessionCreated {
            session_id: session_id.clone(),
        })
        .await;
        self.emit(WorkflowEvent::StageChanged {
            stage: Stage::Uploaded,
        })
        .await;

        // Uploaded chains straight into Processing.
        {
            let mut state = self.state.lock().await;
            if state.epoch != issued {
                return state.stage;
            }
            state.stage = Stage::Processing;
        }
        self.emit(WorkflowEvent::StageChanged {
            stage: Stage::Processing,
        })
        .await;

        let processed = match self.gateway.process(&session_id).await {
            Ok(response) => response,
            Err(e) => {
                return self
                    .fail_attempt(issued, format!("Processing failed: {}", e))
                    .await;
            }
        };

        match processed.status.as_str() {
            "completed" => self.complete_attempt(issued, &session_id).await,
            "failed" => self.fail_attempt(issued, processed.message).await,
            other if self.config.poll_for_completion => {
                debug!("Processing still running ({}), polling status", other);
                self.poll_until_terminal(issued, &session_id).await
            }
            other => {
                self.fail_attempt(issued, format!("Processing ended with status '{}'", other))
                    .await
            }
        }
    }

    async fn poll_until_terminal(&self, issued: u64, session_id: &str) -> Stage {
        for attempt in 1..=self.config.poll_max_attempts {
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;

            {
                let state = self.state.lock().await;
                if state.epoch != issued {
                    debug!("Stopping status polls for superseded attempt");
                    return state.stage;
                }
            }

            let status = match self.gateway.get_status(session_id).await {
                Ok(status) => status,
                Err(e) => {
                    return self
                        .fail_attempt(issued, format!("Status check failed: {}", e))
                        .await;
                }
            };

            match status.status.as_str() {
                "completed" => return self.complete_attempt(issued, session_id).await,
                "failed" => {
                    let error = status
                        .error_message
                        .unwrap_or_else(|| "Processing failed".to_string());
                    return self.fail_attempt(issued, error).await;
                }
                other => {
                    debug!("Session {} still {} (poll {})", session_id, other, attempt);
                    self.emit(WorkflowEvent::StatusPolled {
                        attempt,
                        status: other.to_string(),
                    })
                    .await;
                }
            }
        }

        self.fail_attempt(
            issued,
            format!(
                "Processing did not finish within {} status checks",
                self.config.poll_max_attempts
            ),
        )
        .await
    }

    async fn complete_attempt(&self, issued: u64, session_id: &str) -> Stage {
        {
            let mut state = self.state.lock().await;
            if state.epoch != issued {
                debug!("Discarding completion from superseded attempt");
                return state.stage;
            }
            state.stage = Stage::Completed;
            state.error = None;
        }

        self.emit(WorkflowEvent::StageChanged {
            stage: Stage::Completed,
        })
        .await;
        self.emit(WorkflowEvent::Completed {
            session_id: session_id.to_string(),
        })
        .await;

        // Completion fetches final results once; later reads hit the cache.
        let _ = self.fetch_results(issued, session_id).await;
        Stage::Completed
    }

    async fn fail_attempt(&self, issued: u64, error: String) -> Stage {
        {
            let mut state = self.state.lock().await;
            if state.epoch != issued {
                debug!("Discarding failure from superseded attempt");
                return state.stage;
            }
            state.stage = Stage::Failed;
            state.error = Some(error.clone());
        }
        warn!("Session attempt failed: {}", error);

        self.emit(WorkflowEvent::StageChanged {
            stage: Stage::Failed,
        })
        .await;
        self.emit(WorkflowEvent::Failed { error }).await;
        Stage::Failed
    }

    async fn fetch_results(&self, issued: u64, session_id: &str) -> Option<ResultsResponse> {
        match self.gateway.get_results(session_id).await {
            Ok(results) => {
                let mut state = self.state.lock().await;
                if state.epoch != issued {
                    debug!("Discarding results from superseded attempt");
                    return None;
                }
                state.results = Some(results.clone());
                state.error = None;
                Some(results)
            }
            Err(e) => {
                let mut state = self.state.lock().await;
                if state.epoch != issued {
                    return None;
                }
                warn!("Failed to fetch results for session {}: {}", session_id, e);
                state.error = Some(format!("Failed to fetch results: {}", e));
                None
            }
        }
    }

    /// Final results of the completed attempt.
    ///
    /// The fetch triggered at completion fills the cache; this re-fetches
    /// only when that fetch failed and the stage is still Completed.
    pub async fn results(&self) -> Option<ResultsResponse> {
        let (cached, issued, session_id) = {
            let state = self.state.lock().await;
            if state.stage != Stage::Completed {
                return None;
            }
            (
                state.results.clone(),
                state.epoch,
                state.session_id.clone(),
            )
        };
        if cached.is_some() {
            return cached;
        }
        let session_id = session_id?;
        self.fetch_results(issued, &session_id).await
    }

    /// Return to Idle, discarding the session id, error, and cached
    /// results in one step. Replies still in flight for the discarded
    /// attempt are dropped when they land.
    pub async fn reset(&self) {
        {
            let mut state = self.state.lock().await;
            state.epoch += 1;
            state.session_id = None;
            state.stage = Stage::Idle;
            state.error = None;
            state.results = None;
        }
        debug!("Workflow reset to idle");
        self.emit(WorkflowEvent::StageChanged { stage: Stage::Idle })
            .await;
    }
}
