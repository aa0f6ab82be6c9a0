//! Agent Client - typed interface to the sports-load analysis backend
//!
//! This crate provides a typed HTTP client for the agent's REST API.
//! It is used by:
//! - **sessions**: the workflow/chat orchestration layer drives upload,
//!   processing, and conversation through it
//! - **acwr CLI**: one-shot commands (status, results, downloads) call it
//!   directly
//!
//! # Architecture
//!
//! ```text
//! CLI / sessions  -->  AgentClient  -->  agent backend (localhost:8000)
//!                      (this crate)      (FastAPI service)
//! ```
//!
//! The backend owns all session state and computation. This client never
//! retries; callers decide how failures surface.

mod types;

pub use types::*;

use tracing::debug;

/// Default agent backend URL
pub const DEFAULT_AGENT_API_URL: &str = "http://localhost:8000";

/// Client for communicating with the sports-load agent backend
#[derive(Debug, Clone)]
pub struct AgentClient {
    base_url: String,
    client: reqwest::Client,
}

/// Error types for agent client operations
#[derive(Debug, thiserror::Error)]
pub enum AgentClientError {
    #[error("Agent backend not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        source: reqwest::Error,
    },

    #[error("Agent backend returned error {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Failed to parse agent backend response: {0}")]
    ParseError(#[from] reqwest::Error),
}

impl AgentClient {
    /// Create a new client connecting to the default URL (localhost:8000)
    pub fn new() -> Self {
        Self::with_url(DEFAULT_AGENT_API_URL)
    }

    /// Create a new client connecting to a specific URL
    ///
    /// Only the connect phase is bounded. Processing runs the whole
    /// pipeline inside the request, so an overall request timeout would
    /// cut legitimate long calls short.
    pub fn with_url(url: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the agent backend is running and healthy
    pub async fn health_check(&self) -> Result<HealthResponse, AgentClientError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        Ok(resp.json().await?)
    }

    /// Check if the agent backend is reachable (returns false if not)
    pub async fn is_running(&self) -> bool {
        match self.health_check().await {
            Ok(h) => h.status == "healthy",
            Err(_) => false,
        }
    }

    // ============= Session Pipeline Endpoints =============

    /// Upload training-load files, creating a new server-side session.
    ///
    /// Takes `(filename, bytes)` pairs so callers control file reading;
    /// every file lands in one multipart form under the `files` field.
    pub async fn upload_files(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<UploadResponse, AgentClientError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, bytes) in files {
            let part = reqwest::multipart::Part::bytes(bytes).file_name(name);
            form = form.part("files", part);
        }

        let resp = self
            .client
            .post(format!("{}/api/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        let upload: UploadResponse = resp.json().await?;
        debug!("Uploaded {} file(s) as session {}", upload.uploaded_files.len(), upload.session_id);
        Ok(upload)
    }

    /// Run the processing pipeline for an uploaded session.
    ///
    /// The backend executes the full pipeline inside this call, so the
    /// response already carries the terminal status on a synchronous
    /// deployment. Polling deployments return a non-terminal status here
    /// and report progress via [`get_status`](Self::get_status).
    pub async fn process(&self, session_id: &str) -> Result<ProcessResponse, AgentClientError> {
        let resp = self
            .client
            .post(format!("{}/api/process/{}", self.base_url, session_id))
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        Ok(resp.json().await?)
    }

    /// Get the current processing status of a session
    pub async fn get_status(&self, session_id: &str) -> Result<StatusResponse, AgentClientError> {
        let resp = self
            .client
            .get(format!("{}/api/status/{}", self.base_url, session_id))
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        Ok(resp.json().await?)
    }

    /// Fetch the final results of a completed (or failed) session
    pub async fn get_results(&self, session_id: &str) -> Result<ResultsResponse, AgentClientError> {
        let resp = self
            .client
            .get(format!("{}/api/results/{}", self.base_url, session_id))
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        Ok(resp.json().await?)
    }

    /// Delete a session and its server-side files
    pub async fn delete_session(&self, session_id: &str) -> Result<MessageResponse, AgentClientError> {
        let resp = self
            .client
            .delete(format!("{}/api/session/{}", self.base_url, session_id))
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        Ok(resp.json().await?)
    }

    // ============= Chat Endpoints =============

    /// Send one chat turn to the analysis agent
    pub async fn send_chat(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatResponse, AgentClientError> {
        let req = ChatRequest {
            message: message.to_string(),
        };

        let resp = self
            .client
            .post(format!("{}/api/chat/{}", self.base_url, session_id))
            .json(&req)
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        let chat: ChatResponse = resp.json().await?;
        debug!(
            "Chat reply for {}: {} tool call(s), {} generated file(s)",
            session_id,
            chat.tool_calls.len(),
            chat.generated_files.len()
        );
        Ok(chat)
    }

    /// Fetch the server-side conversation history for a session
    pub async fn get_chat_history(
        &self,
        session_id: &str,
    ) -> Result<ChatHistoryResponse, AgentClientError> {
        let resp = self
            .client
            .get(format!("{}/api/chat/{}/history", self.base_url, session_id))
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        Ok(resp.json().await?)
    }

    /// Clear the server-side conversation history for a session
    pub async fn clear_chat_history(
        &self,
        session_id: &str,
    ) -> Result<MessageResponse, AgentClientError> {
        let resp = self
            .client
            .delete(format!("{}/api/chat/{}/history", self.base_url, session_id))
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        Ok(resp.json().await?)
    }

    // ============= Token Accounting Endpoints =============

    /// Get global token usage statistics
    pub async fn get_token_stats(&self) -> Result<TokenStats, AgentClientError> {
        let resp = self
            .client
            .get(format!("{}/api/token-stats", self.base_url))
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        Ok(resp.json().await?)
    }

    /// Get token usage statistics scoped to one session
    pub async fn get_session_token_stats(
        &self,
        session_id: &str,
    ) -> Result<TokenStats, AgentClientError> {
        let resp = self
            .client
            .get(format!("{}/api/token-stats/{}", self.base_url, session_id))
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        Ok(resp.json().await?)
    }

    // ============= Artifact Endpoints =============

    /// Resolve an artifact reference against this client's base URL.
    ///
    /// References arrive as server-relative paths like
    /// `/api/download/{session}/{file}`; absolute URLs pass through
    /// untouched.
    pub fn artifact_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else if reference.starts_with('/') {
            format!("{}{}", self.base_url, reference)
        } else {
            format!("{}/{}", self.base_url, reference)
        }
    }

    /// Download an artifact by its reference (relative path or full URL)
    pub async fn download_path(&self, reference: &str) -> Result<Vec<u8>, AgentClientError> {
        let url = self.artifact_url(reference);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AgentClientError::NotReachable {
                url: self.base_url.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentClientError::ApiError { status, body });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    /// Download one artifact of a session by filename
    pub async fn download_artifact(
        &self,
        session_id: &str,
        filename: &str,
    ) -> Result<Vec<u8>, AgentClientError> {
        self.download_path(&format!("/api/download/{}/{}", session_id, filename))
            .await
    }
}

impl Default for AgentClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = AgentClient::new();
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_client_custom_url_trims_trailing_slash() {
        let client = AgentClient::with_url("http://192.168.1.50:9000/");
        assert_eq!(client.base_url, "http://192.168.1.50:9000");
    }

    #[test]
    fn test_artifact_url_resolves_relative_path() {
        let client = AgentClient::with_url("http://localhost:8000");
        assert_eq!(
            client.artifact_url("/api/download/s1/chart.png"),
            "http://localhost:8000/api/download/s1/chart.png"
        );
    }

    #[test]
    fn test_artifact_url_without_leading_slash() {
        let client = AgentClient::with_url("http://localhost:8000");
        assert_eq!(
            client.artifact_url("outputs/report.csv"),
            "http://localhost:8000/outputs/report.csv"
        );
    }

    #[test]
    fn test_artifact_url_passes_through_absolute() {
        let client = AgentClient::with_url("http://localhost:8000");
        assert_eq!(
            client.artifact_url("https://cdn.example.com/chart.png"),
            "https://cdn.example.com/chart.png"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_reports_not_reachable() {
        // Port 1 on loopback refuses connections, no server needed.
        let client = AgentClient::with_url("http://127.0.0.1:1");

        assert!(!client.is_running().await);
        match client.health_check().await {
            Err(AgentClientError::NotReachable { url, .. }) => {
                assert_eq!(url, "http://127.0.0.1:1");
            }
            other => panic!("expected NotReachable, got {:?}", other),
        }
    }
}
