//! Assistant provisioning at startup.

use tracing::info;

use crate::assistant::{AssistantApi, AssistantDefinition};
use crate::config::AssistantConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::tools::function_tool_definitions;

const ASSISTANT_NAME: &str = "IntelliTour: WhatsApp Travel and Tourism Assistant";

const ASSISTANT_INSTRUCTIONS: &str = "You're a helpful WhatsApp assistant that assists travelers \
with queries related to tourism and travel. Use the provided tools to respond to user \
queries. If you don't know the answer, say so politely and suggest contacting the host. \
If a query is outside the travel/tourism scope, remind the user to stay within the travel and \
tourism scope only. Be friendly and funny.";

/// The assistant this service drives: persona plus every registered tool
pub fn assistant_definition(model: &str) -> AssistantDefinition {
    AssistantDefinition {
        name: ASSISTANT_NAME.to_string(),
        instructions: ASSISTANT_INSTRUCTIONS.to_string(),
        model: model.to_string(),
        tools: function_tool_definitions(),
    }
}

/// The configured assistant id, or a freshly provisioned one when
/// `auto_create` is set
pub async fn resolve_assistant_id(
    config: &AssistantConfig,
    assistant: &dyn AssistantApi,
) -> ServiceResult<String> {
    if !config.assistant_id.trim().is_empty() {
        return Ok(config.assistant_id.trim().to_string());
    }

    if !config.auto_create {
        return Err(ServiceError::Config {
            message: "assistant.assistant_id is not set and assistant.auto_create is disabled"
                .to_string(),
        });
    }

    let created = assistant
        .create_assistant(&assistant_definition(&config.model))
        .await?;
    info!(assistant_id = %created.id, model = %config.model, "Provisioned assistant");

    Ok(created.id)
}
