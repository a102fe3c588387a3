use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Assistant(#[from] AssistantError),

    #[error("Database error")]
    Database(#[from] DatabaseError),

    #[error("{0}")]
    Lookup(#[from] LookupError),

    #[error("Run {run_id} timed out after {waited_secs} seconds")]
    RunTimeout { run_id: String, waited_secs: u64 },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors from the remote assistant runtime
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Connection failed to assistant API at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Assistant API error (status {status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Invalid response from assistant API")]
    InvalidResponse {
        #[source]
        source: serde_json::Error,
    },
}

impl AssistantError {
    /// Whether the remote service rejected the call because of rate limiting
    pub fn is_rate_limit(&self) -> bool {
        match self {
            AssistantError::Api {
                status,
                code,
                message,
            } => {
                *status == 429
                    || code.as_deref() == Some("rate_limit_exceeded")
                    || message.to_lowercase().contains("rate_limit")
            }
            _ => false,
        }
    }
}

/// Database errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),

    #[error("Query failed")]
    Query(#[source] rusqlite::Error),

    #[error("Migration failed: {message}")]
    Migration { message: String },
}

/// Errors from the flight, hotel, weather and places providers
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Unresolved { message: String },

    #[error("Missing credentials for {provider}")]
    MissingCredentials { provider: &'static str },
}

/// Failure to turn a tool call into a capability invocation
#[derive(Error, Debug)]
pub enum ToolCallError {
    #[error("Unknown function call: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for {tool}: {source}")]
    MalformedArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    /// True when the error (or its cause) is a rate limit from the assistant runtime
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ServiceError::Assistant(e) if e.is_rate_limit())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Assistant(e) if e.is_rate_limit() => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Assistant(_) | ServiceError::Lookup(_) => StatusCode::BAD_GATEWAY,
            ServiceError::RunTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Assistant(AssistantError::Connection { .. }) => "assistant_connection",
            ServiceError::Assistant(e) if e.is_rate_limit() => "rate_limit_exceeded",
            ServiceError::Assistant(AssistantError::Api { .. }) => "assistant_api",
            ServiceError::Assistant(AssistantError::InvalidResponse { .. }) => {
                "assistant_invalid_response"
            }
            ServiceError::Database(_) => "database_error",
            ServiceError::Lookup(_) => "lookup_error",
            ServiceError::RunTimeout { .. } => "run_timeout",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(code),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
