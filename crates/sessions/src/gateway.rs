//! Gateway seam between session orchestration and the remote agent API
//!
//! The workflow and chat components are generic over this trait so tests
//! can script remote behavior without a running backend. The production
//! implementation is [`agent_client::AgentClient`].

use async_trait::async_trait;

use agent_client::{
    AgentClient, AgentClientError, ChatHistoryResponse, ChatResponse, MessageResponse,
    ProcessResponse, ResultsResponse, StatusResponse, UploadResponse,
};

/// The slice of the agent API the session layer drives
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn upload_files(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<UploadResponse, AgentClientError>;

    async fn process(&self, session_id: &str) -> Result<ProcessResponse, AgentClientError>;

    async fn get_status(&self, session_id: &str) -> Result<StatusResponse, AgentClientError>;

    async fn get_results(&self, session_id: &str) -> Result<ResultsResponse, AgentClientError>;

    async fn send_chat(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatResponse, AgentClientError>;

    async fn get_chat_history(
        &self,
        session_id: &str,
    ) -> Result<ChatHistoryResponse, AgentClientError>;

    async fn clear_chat_history(
        &self,
        session_id: &str,
    ) -> Result<MessageResponse, AgentClientError>;
}

#[async_trait]
impl Gateway for AgentClient {
    async fn upload_files(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<UploadResponse, AgentClientError> {
        AgentClient::upload_files(self, files).await
    }

    async fn process(&self, session_id: &str) -> Result<ProcessResponse, AgentClientError> {
        AgentClient::process(self, session_id).await
    }

    async fn get_status(&self, session_id: &str) -> Result<StatusResponse, AgentClientError> {
        AgentClient::get_status(self, session_id).await
    }

    async fn get_results(&self, session_id: &str) -> Result<ResultsResponse, AgentClientError> {
        AgentClient::get_results(self, session_id).await
    }

    async fn send_chat(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatResponse, AgentClientError> {
        AgentClient::send_chat(self, session_id, message).await
    }

    async fn get_chat_history(
        &self,
        session_id: &str,
    ) -> Result<ChatHistoryResponse, AgentClientError> {
        AgentClient::get_chat_history(self, session_id).await
    }

    async fn clear_chat_history(
        &self,
        session_id: &str,
    ) -> Result<MessageResponse, AgentClientError> {
        AgentClient::clear_chat_history(self, session_id).await
    }
}

#[async_trait]
impl<T: Gateway + ?Sized> Gateway for std::sync::Arc<T> {
    async fn upload_files(
        &self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<UploadResponse, AgentClientError> {
        (**self).upload_files(files).await
    }

    async fn process(&self, session_id: &str) -> Result<ProcessResponse, AgentClientError> {
        (**self).process(session_id).await
    }

    async fn get_status(&self, session_id: &str) -> Result<StatusResponse, AgentClientError> {
        (**self).get_status(session_id).await
    }

    async fn get_results(&self, session_id: &str) -> Result<ResultsResponse, AgentClientError> {
        (**self).get_results(session_id).await
    }

    async fn send_chat(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<ChatResponse, AgentClientError> {
        (**self).send_chat(session_id, message).await
    }

    async fn get_chat_history(
        &self,
        session_id: &str,
    ) -> Result<ChatHistoryResponse, AgentClientError> {
        (**self).get_chat_history(session_id).await
    }

    async fn clear_chat_history(
        &self,
        session_id: &str,
    ) -> Result<MessageResponse, AgentClientError> {
        (**self).clear_chat_history(session_id).await
    }
}
