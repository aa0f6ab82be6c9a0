//! Type definitions for the sports-load agent API responses
//!
//! These types mirror the JSON payloads of the agent's FastAPI backend.
//! All field names are snake_case on the wire; optional fields default so
//! older backend versions that omit them still deserialize.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Response from the file upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub uploaded_files: Vec<String>,
    pub message: String,
}

/// Response from the process endpoint
///
/// `status` is the pipeline's processing status (`pending`, `processing`,
/// `completed`, `failed`), not a transport status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

/// Response from the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub session_id: String,
    pub status: String,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Response from the results endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsResponse {
    pub session_id: String,
    pub status: String,
    #[serde(default)]
    pub report_markdown: Option<String>,
    #[serde(default)]
    pub visualization_files: Vec<String>,
    #[serde(default)]
    pub processed_csv_path: Option<String>,
    #[serde(default)]
    pub processed_excel_path: Option<String>,
    #[serde(default)]
    pub token_usage: HashMap<String, i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ============= Chat Types =============

/// Request body for a chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// One tool invocation the agent made while answering a turn
///
/// `result` is whatever the backend stringified from the tool's return
/// value. It is frequently a Python-dict repr rather than valid JSON, so
/// callers must treat it as opaque text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    #[serde(default)]
    pub args: HashMap<String, serde_json::Value>,
    pub result: String,
}

/// Response from the chat endpoint
///
/// A reply can carry both a usable `response` and an `error` (for example
/// when the agent hit its tool-iteration limit mid-answer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(default)]
    pub generated_files: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One entry in the server-side conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Response from the chat history endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    pub session_id: String,
    pub history: Vec<ChatHistoryEntry>,
}

/// Generic `{ "message": ... }` acknowledgement (clear history, delete session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============= Token Accounting Types =============

/// Per-model token usage breakdown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelUsage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
    #[serde(default)]
    pub call_count: i64,
}

/// Token usage aggregation record (global or scoped to one session)
///
/// Timestamps stay as strings: the backend emits naive ISO-8601 without an
/// offset, which stricter datetime parsing would reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenStats {
    pub tracker_name: String,
    #[serde(default)]
    pub total_prompt_tokens: i64,
    #[serde(default)]
    pub total_completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
    #[serde(default)]
    pub total_cached_tokens: i64,
    #[serde(default)]
    pub total_reasoning_tokens: i64,
    #[serde(default)]
    pub call_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_updated_at: Option<String>,
    #[serde(default)]
    pub by_model: HashMap<String, ModelUsage>,
}
