//! HTTP client for the OpenAI Assistants API (v2).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::AssistantApi;
use super::types::{
    AssistantDefinition, AssistantInfo, ListResponse, Message, Run, RunStep, Thread, ToolOutput,
};
use crate::config::AssistantConfig;
use crate::error::AssistantError;

/// Maximum page size accepted by the list endpoints
const MAX_PAGE_SIZE: u32 = 100;

/// Assistants API client
pub struct OpenAiAssistantClient {
    client: Client,
    base_url: String,
    api_key: String,
    assistant_id: String,
}

impl OpenAiAssistantClient {
    /// Create a new assistant client
    pub fn new(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("intellitour-service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssistantError::Connection {
                url: config.base_url.clone(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            assistant_id: config.assistant_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AssistantError> {
        let url = self.url(path);
        debug!(url = %url, "Assistant API GET");

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AssistantError::Connection {
                url: url.clone(),
                source: e,
            })?;

        decode(&url, response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, AssistantError> {
        let url = self.url(path);
        debug!(url = %url, "Assistant API POST");

        let response = self
            .authorized(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| AssistantError::Connection {
                url: url.clone(),
                source: e,
            })?;

        decode(&url, response).await
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistantClient {
    async fn create_thread(&self) -> Result<Thread, AssistantError> {
        self.post("/threads", &serde_json::json!({})).await
    }

    async fn create_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<Message, AssistantError> {
        self.post(
            &format!("/threads/{}/messages", thread_id),
            &serde_json::json!({ "role": "user", "content": content }),
        )
        .await
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<Message>, AssistantError> {
        let page: ListResponse<Message> = self
            .get(&format!(
                "/threads/{}/messages?limit={}&order=desc",
                thread_id,
                limit.min(MAX_PAGE_SIZE)
            ))
            .await?;
        Ok(page.data)
    }

    async fn retrieve_message(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<Message, AssistantError> {
        self.get(&format!("/threads/{}/messages/{}", thread_id, message_id))
            .await
    }

    async fn create_run(&self, thread_id: &str) -> Result<Run, AssistantError> {
        self.post(
            &format!("/threads/{}/runs", thread_id),
            &serde_json::json!({ "assistant_id": self.assistant_id }),
        )
        .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        self.get(&format!("/threads/{}/runs/{}", thread_id, run_id))
            .await
    }

    async fn list_runs(&self, thread_id: &str) -> Result<Vec<Run>, AssistantError> {
        let page: ListResponse<Run> = self
            .get(&format!("/threads/{}/runs?limit=20&order=desc", thread_id))
            .await?;
        Ok(page.data)
    }

    async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
        limit: u32,
    ) -> Result<Vec<RunStep>, AssistantError> {
        let page: ListResponse<RunStep> = self
            .get(&format!(
                "/threads/{}/runs/{}/steps?limit={}&order=desc",
                thread_id,
                run_id,
                limit.min(MAX_PAGE_SIZE)
            ))
            .await?;
        Ok(page.data)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, AssistantError> {
        self.post(
            &format!("/threads/{}/runs/{}/submit_tool_outputs", thread_id, run_id),
            &serde_json::json!({ "tool_outputs": outputs }),
        )
        .await
    }

    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<AssistantInfo, AssistantError> {
        let body = serde_json::to_value(definition)
            .map_err(|source| AssistantError::InvalidResponse { source })?;
        self.post("/assistants", &body).await
    }
}

/// Error envelope returned by the API on non-2xx responses
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, AssistantError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| AssistantError::Connection {
            url: url.to_string(),
            source: e,
        })?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &body));
    }

    serde_json::from_slice(&body).map_err(|source| AssistantError::InvalidResponse { source })
}

fn api_error(status: u16, body: &[u8]) -> AssistantError {
    match serde_json::from_slice::<ApiErrorEnvelope>(body) {
        Ok(envelope) => AssistantError::Api {
            status,
            code: envelope.error.code.or(envelope.error.error_type),
            message: envelope.error.message,
        },
        Err(_) => AssistantError::Api {
            status,
            code: None,
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}
