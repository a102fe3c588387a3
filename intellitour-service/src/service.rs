//! Conversation service: drives the remote assistant for each user message.

mod dispatcher;
mod orchestrator;
mod poller;
mod retry;
mod setup;
mod thread_registry;

pub use setup::resolve_assistant_id;

use std::sync::Arc;
use tracing::info;

use crate::assistant::AssistantApi;
use crate::config::AppConfig;
use crate::db::ThreadStore;
use crate::i18n::I18n;
use crate::lookups::TravelLookups;
use thread_registry::ThreadRegistry;

/// Main service coordinator
pub struct TravelAssistantService {
    config: AppConfig,
    threads: ThreadRegistry,
    assistant: Arc<dyn AssistantApi>,
    lookups: Arc<dyn TravelLookups>,
    i18n: I18n,
}

impl TravelAssistantService {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn ThreadStore>,
        assistant: Arc<dyn AssistantApi>,
        lookups: Arc<dyn TravelLookups>,
    ) -> Self {
        info!(
            poll_interval_secs = config.polling.interval_secs,
            poll_timeout_secs = config.polling.timeout_secs,
            max_thread_messages = config.conversation.max_thread_messages,
            "Initializing travel assistant service"
        );

        Self {
            config,
            threads: ThreadRegistry::new(store),
            assistant,
            lookups,
            i18n: I18n::new(),
        }
    }

    pub fn i18n(&self) -> &I18n {
        &self.i18n
    }
}
