//! Session orchestration for the sports-load analysis client
//!
//! Coordinates everything between user intent and the remote agent API:
//! - Upload-process-results workflow as an explicit state machine
//! - Conversation log with optimistic appends and an in-flight guard
//! - Extraction of downloadable artifact references from tool output
//! - Deduplicated, session-scoped artifact registry
//!
//! Key concepts:
//! - Remote failures never panic; they land in per-session error state
//! - No automatic retries anywhere; reset or resend is the caller's call
//! - Every outbound call is tagged with an epoch so replies that outlive
//!   a reset or session switch are discarded instead of corrupting state

pub mod artifacts;
pub mod chat;
pub mod gateway;
pub mod workflow;

pub use artifacts::{extract_artifacts, ArtifactRegistry};
pub use chat::{ChatMessage, ChatSession, MessageRole, SendOutcome};
pub use gateway::Gateway;
pub use workflow::{SessionWorkflow, Stage, WorkflowConfig, WorkflowEvent};
