//! Remote assistant runtime integration.
//!
//! The assistant runtime owns conversation threads and executes runs against
//! them. Runs are asynchronous jobs: they are created, polled, and may stop in
//! `requires_action` until the tool outputs they asked for are submitted.

mod client;
mod types;

pub use client::OpenAiAssistantClient;
pub use types::{
    AssistantDefinition, AssistantInfo, Message, MessageRole, Run, RunStatus, RunStep,
    StepDetails, Thread, ToolCall, ToolOutput,
};

#[cfg(test)]
pub use types::{
    FunctionCall, MessageContent, MessageCreation, RequiredAction, RunError, TextContent,
    ToolCallBatch,
};

use async_trait::async_trait;

use crate::error::AssistantError;

/// Operations the orchestrator needs from the assistant runtime.
///
/// Lists come back newest first.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn create_thread(&self) -> Result<Thread, AssistantError>;

    /// Append a user message to a thread
    async fn create_message(&self, thread_id: &str, content: &str)
    -> Result<Message, AssistantError>;

    async fn list_messages(&self, thread_id: &str, limit: u32)
    -> Result<Vec<Message>, AssistantError>;

    async fn retrieve_message(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<Message, AssistantError>;

    /// Start a run of the configured assistant on a thread
    async fn create_run(&self, thread_id: &str) -> Result<Run, AssistantError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError>;

    async fn list_runs(&self, thread_id: &str) -> Result<Vec<Run>, AssistantError>;

    async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
        limit: u32,
    ) -> Result<Vec<RunStep>, AssistantError>;

    /// Resume a run blocked in `requires_action`. All outputs go in one batch.
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, AssistantError>;

    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<AssistantInfo, AssistantError>;
}
