//! Wire types for the assistant runtime (threads, messages, runs, run steps).

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::tools::FunctionToolDefinition;

/// Conversation thread
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// Author of a thread message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Thread message
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    /// Run that authored the message (assistant messages only)
    #[serde(default)]
    pub run_id: Option<String>,
}

impl Message {
    /// First non-blank text item of the message
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|item| match item {
            MessageContent::Text { text } if !text.value.trim().is_empty() => {
                Some(text.value.as_str())
            }
            _ => None,
        })
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

/// One content item of a message. Only text carries a reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: TextContent,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub value: String,
}

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
    /// Any status this service does not model; polled like a transient state
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Terminal states never change again
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }

    /// States that block new runs on the same thread
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::RequiresAction
        )
    }
}

/// Error recorded on a failed run
#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl RunError {
    pub fn is_rate_limit(&self) -> bool {
        self.code.as_deref() == Some("rate_limit_exceeded")
            || self.message.to_lowercase().contains("rate_limit")
    }
}

/// Action a run is blocked on
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequiredAction {
    SubmitToolOutputs { submit_tool_outputs: ToolCallBatch },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallBatch {
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// One execution of the assistant against a thread
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    #[allow(dead_code)]
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
}

impl Run {
    /// Tool calls the run is waiting on; empty unless `requires_action`
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        match &self.required_action {
            Some(RequiredAction::SubmitToolOutputs {
                submit_tool_outputs,
            }) => &submit_tool_outputs.tool_calls,
            None => &[],
        }
    }

    /// Whether the run failed because of provider rate limiting
    pub fn failed_on_rate_limit(&self) -> bool {
        self.status == RunStatus::Failed
            && self.last_error.as_ref().is_some_and(RunError::is_rate_limit)
    }

    /// Human-readable summary used in degraded replies and logs
    pub fn failure_details(&self) -> String {
        let mut details = format!("Status: {}", self.status);
        if let Some(error) = &self.last_error {
            details.push_str(&format!(", Error: {}", error.message));
            if let Some(code) = &error.code {
                details.push_str(&format!(", Code: {}", code));
            }
        }
        details
    }
}

/// Function invocation requested by a run
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    pub arguments: String,
}

/// Result submitted back for one tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    /// JSON-encoded result
    pub output: String,
}

/// Execution trace entry of a run
#[derive(Debug, Clone, Deserialize)]
pub struct RunStep {
    #[allow(dead_code)]
    pub id: String,
    pub step_details: StepDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDetails {
    MessageCreation {
        message_creation: MessageCreation,
    },
    /// Tool calls made by the run; their results already went back as outputs
    ToolCalls {},
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreation {
    pub message_id: String,
}

/// Paginated list envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    #[allow(dead_code)]
    pub has_more: bool,
}

/// Assistant provisioning request
#[derive(Debug, Clone, Serialize)]
pub struct AssistantDefinition {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<FunctionToolDefinition>,
}

/// Provisioned assistant
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantInfo {
    pub id: String,
}
