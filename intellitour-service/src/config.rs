use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Rotation counts messages from a single list page, which holds at most 100
const MAX_THREAD_MESSAGES: usize = 99;

/// Service configuration, loaded once at startup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub amadeus: AmadeusConfig,

    #[serde(default)]
    pub google_maps: GoogleMapsConfig,
}

impl AppConfig {
    /// Load configuration from `.env`, an optional config file and `INTELLITOUR__*` env vars
    pub fn load() -> ServiceResult<Self> {
        // A missing .env file is normal in deployed environments
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Failed to load .env file");
            }
        }

        let config: Self = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("INTELLITOUR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot honor
    pub fn validate(&self) -> ServiceResult<()> {
        let max = self.conversation.max_thread_messages;
        if max == 0 || max > MAX_THREAD_MESSAGES {
            return Err(ServiceError::Config {
                message: format!(
                    "conversation.max_thread_messages must be between 1 and {}, got {}",
                    MAX_THREAD_MESSAGES, max
                ),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Location of the user -> thread registry database
    pub fn thread_db_path(&self) -> PathBuf {
        self.data_dir.join("user_threads.db")
    }
}

/// Remote assistant runtime configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Assistant that runs are created against
    #[serde(default)]
    pub assistant_id: String,

    /// Model used when the assistant is provisioned at startup
    #[serde(default = "default_assistant_model")]
    pub model: String,

    #[serde(default = "default_assistant_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Create the assistant at startup when no `assistant_id` is configured
    #[serde(default)]
    pub auto_create: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_assistant_url(),
            api_key: String::new(),
            assistant_id: String::new(),
            model: default_assistant_model(),
            request_timeout_secs: default_assistant_timeout_secs(),
            auto_create: false,
        }
    }
}

/// Run polling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,

    /// Give up on a run that is still not terminal after this long
    #[serde(default = "default_poll_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause after submitting tool outputs before polling again
    #[serde(default = "default_post_submit_delay_ms")]
    pub post_submit_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            timeout_secs: default_poll_timeout_secs(),
            post_submit_delay_ms: default_post_submit_delay_ms(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn post_submit_delay(&self) -> Duration {
        Duration::from_millis(self.post_submit_delay_ms)
    }
}

/// Retry policy for rate-limited assistant calls
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles after each attempt
    #[serde(default = "default_retry_base_delay_secs")]
    pub base_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            base_delay_secs: default_retry_base_delay_secs(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.base_delay_secs)
    }
}

/// Conversation thread management
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Rotate to a fresh thread once a thread holds more messages than this
    #[serde(default = "default_max_thread_messages")]
    pub max_thread_messages: usize,

    /// Attempts at reading the assistant reply after a run completes
    #[serde(default = "default_reply_attempts")]
    pub reply_attempts: u32,

    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,

    /// Recent messages scanned when the run steps don't point at the reply
    #[serde(default = "default_reply_scan_limit")]
    pub reply_scan_limit: u32,

    /// Recent messages scanned for a partial reply after a failed run
    #[serde(default = "default_partial_scan_limit")]
    pub partial_scan_limit: u32,

    #[serde(default = "default_run_step_limit")]
    pub run_step_limit: u32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_thread_messages: default_max_thread_messages(),
            reply_attempts: default_reply_attempts(),
            reply_delay_ms: default_reply_delay_ms(),
            reply_scan_limit: default_reply_scan_limit(),
            partial_scan_limit: default_partial_scan_limit(),
            run_step_limit: default_run_step_limit(),
        }
    }
}

impl ConversationConfig {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }
}

/// OpenWeatherMap configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_url(),
            api_key: String::new(),
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

/// Amadeus self-service API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AmadeusConfig {
    #[serde(default = "default_amadeus_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_secret: String,

    #[serde(default = "default_amadeus_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self {
            base_url: default_amadeus_url(),
            api_key: String::new(),
            api_secret: String::new(),
            timeout_secs: default_amadeus_timeout_secs(),
        }
    }
}

/// Google Maps Platform configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleMapsConfig {
    #[serde(default = "default_google_maps_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GoogleMapsConfig {
    fn default() -> Self {
        Self {
            base_url: default_google_maps_url(),
            api_key: String::new(),
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

// ==================== Default Value Functions ====================

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_assistant_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_assistant_model() -> String {
    "gpt-4.1".to_string()
}

fn default_assistant_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_poll_timeout_secs() -> u64 {
    60
}

fn default_post_submit_delay_ms() -> u64 {
    1000
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_secs() -> u64 {
    2
}

fn default_max_thread_messages() -> usize {
    50
}

fn default_reply_attempts() -> u32 {
    5
}

fn default_reply_delay_ms() -> u64 {
    500
}

fn default_reply_scan_limit() -> u32 {
    10
}

fn default_partial_scan_limit() -> u32 {
    5
}

fn default_run_step_limit() -> u32 {
    20
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_amadeus_url() -> String {
    "https://test.api.amadeus.com".to_string()
}

fn default_amadeus_timeout_secs() -> u64 {
    30
}

fn default_google_maps_url() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_lookup_timeout_secs() -> u64 {
    10
}
