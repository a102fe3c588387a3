//! Conversation turn: thread management, run lifecycle and reply retrieval.

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::assistant::{Run, RunStatus, StepDetails};
use crate::db::RotationReason;
use crate::error::{ServiceError, ServiceResult};

use super::TravelAssistantService;
use super::retry::with_backoff;
use super::thread_registry::UserSession;

const LOCALE: &str = "en";

/// How a run ended, from the user's point of view
enum TurnOutcome {
    Reply(String),
    RateLimited,
}

impl TravelAssistantService {
    /// Produce the reply text for one incoming user message.
    ///
    /// Never fails: every error path ends in a user-facing string.
    pub async fn generate_response(&self, message: &str, user_id: &str, display_name: &str) -> String {
        let session = self.threads.session(user_id).await;
        info!(user_id = %user_id, display_name = %display_name, "Generating response");

        let thread_id = match session.get_or_create(self.assistant.as_ref()).await {
            Ok(thread_id) => thread_id,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Could not resolve user thread");
                return self.i18n.get(LOCALE, "reply-unavailable", None);
            }
        };
        let thread_id = self.ensure_thread_capacity(&session, thread_id).await;

        match self.converse(&thread_id, message).await {
            Ok(TurnOutcome::Reply(reply)) => reply,
            Ok(TurnOutcome::RateLimited) => self.recover_from_rate_limit(&session, &thread_id).await,
            Err(e) if e.is_rate_limit() => {
                warn!(user_id = %user_id, error = %e, "Rate limit outlasted retries");
                self.recover_from_rate_limit(&session, &thread_id).await
            }
            Err(ServiceError::RunTimeout { run_id, waited_secs }) => {
                error!(user_id = %user_id, run_id = %run_id, waited_secs, "Run timed out");
                self.i18n.get(LOCALE, "reply-timeout", None)
            }
            Err(e) => {
                error!(user_id = %user_id, thread_id = %thread_id, error = %e, "Conversation turn failed");
                self.i18n.get(LOCALE, "reply-unavailable", None)
            }
        }
    }

    /// Rotate past threads that have grown beyond the message limit.
    /// Failures keep the current thread.
    async fn ensure_thread_capacity(&self, session: &UserSession<'_>, thread_id: String) -> String {
        let limit = self.config.conversation.max_thread_messages;
        let messages = match self
            .assistant
            .list_messages(&thread_id, (limit + 1) as u32)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!(thread_id = %thread_id, error = %e, "Could not check thread size, keeping thread");
                return thread_id;
            }
        };

        if messages.len() <= limit {
            return thread_id;
        }

        info!(
            thread_id = %thread_id,
            message_count = messages.len(),
            limit,
            "Thread over message limit"
        );
        match session
            .rotate(&thread_id, RotationReason::MessageLimit, self.assistant.as_ref())
            .await
        {
            Ok(rotated) => rotated,
            Err(e) => {
                warn!(thread_id = %thread_id, error = %e, "Thread rotation failed, keeping thread");
                thread_id
            }
        }
    }

    async fn converse(&self, thread_id: &str, message: &str) -> ServiceResult<TurnOutcome> {
        self.drain_active_runs(thread_id).await?;

        let retry = &self.config.retry;
        with_backoff(retry, "create_message", || {
            self.assistant.create_message(thread_id, message)
        })
        .await?;

        let run = with_backoff(retry, "create_run", || self.assistant.create_run(thread_id)).await?;
        info!(thread_id = %thread_id, run_id = %run.id, "Started run");

        let run = self.poll_run(thread_id, &run.id).await?;

        if run.status == RunStatus::Completed {
            let reply = match self.retrieve_reply(thread_id, &run.id).await {
                Some(reply) => reply,
                None => {
                    error!(thread_id = %thread_id, run_id = %run.id, "No assistant reply after run completed");
                    self.i18n.get(LOCALE, "reply-no-response", None)
                }
            };
            return Ok(TurnOutcome::Reply(reply));
        }

        if run.failed_on_rate_limit() {
            warn!(thread_id = %thread_id, run_id = %run.id, details = %run.failure_details(), "Run rate limited");
            return Ok(TurnOutcome::RateLimited);
        }

        Ok(TurnOutcome::Reply(self.recover_failed_run(thread_id, &run).await))
    }

    /// Give the user a fresh thread after a rate limit
    async fn recover_from_rate_limit(&self, session: &UserSession<'_>, thread_id: &str) -> String {
        match session
            .rotate(thread_id, RotationReason::RateLimit, self.assistant.as_ref())
            .await
        {
            Ok(_) => self.i18n.get(LOCALE, "reply-rate-limit-new-thread", None),
            Err(e) => {
                error!(user_id = %session.user_id(), error = %e, "Could not rotate rate-limited thread");
                self.i18n.get(LOCALE, "reply-high-demand", None)
            }
        }
    }

    /// Partial reply written by the failed run, or an error message
    async fn recover_failed_run(&self, thread_id: &str, run: &Run) -> String {
        let details = run.failure_details();
        error!(thread_id = %thread_id, run_id = %run.id, details = %details, "Run did not complete");

        let limit = self.config.conversation.partial_scan_limit;
        match self.latest_reply_from_messages(thread_id, &run.id, limit).await {
            Ok(Some(partial)) => {
                info!(run_id = %run.id, "Recovered partial reply from failed run");
                partial
            }
            Ok(None) => self
                .i18n
                .format(LOCALE, "reply-run-failed", &[("details", details.as_str())]),
            Err(e) => {
                warn!(run_id = %run.id, error = %e, "Could not look for a partial reply");
                self.i18n
                    .format(LOCALE, "reply-run-failed", &[("details", details.as_str())])
            }
        }
    }

    /// The reply written by a completed run. The message store is
    /// eventually consistent, so reads are retried.
    async fn retrieve_reply(&self, thread_id: &str, run_id: &str) -> Option<String> {
        let conversation = &self.config.conversation;

        for attempt in 0..conversation.reply_attempts.max(1) {
            if attempt > 0 {
                sleep(conversation.reply_delay()).await;
                debug!(run_id = %run_id, attempt = attempt + 1, "Retrying reply retrieval");
            }

            match self.reply_from_run_steps(thread_id, run_id).await {
                Ok(Some(reply)) => return Some(reply),
                Ok(None) => {}
                Err(e) => warn!(run_id = %run_id, attempt = attempt + 1, error = %e, "Run step lookup failed"),
            }

            match self
                .latest_reply_from_messages(thread_id, run_id, conversation.reply_scan_limit)
                .await
            {
                Ok(Some(reply)) => return Some(reply),
                Ok(None) => {}
                Err(e) => warn!(run_id = %run_id, attempt = attempt + 1, error = %e, "Message scan failed"),
            }
        }

        None
    }

    /// Follow the run's message-creation steps to the message it wrote
    async fn reply_from_run_steps(&self, thread_id: &str, run_id: &str) -> ServiceResult<Option<String>> {
        let steps = self
            .assistant
            .list_run_steps(thread_id, run_id, self.config.conversation.run_step_limit)
            .await?;

        for step in steps {
            let StepDetails::MessageCreation { message_creation } = step.step_details else {
                continue;
            };
            let message = self
                .assistant
                .retrieve_message(thread_id, &message_creation.message_id)
                .await?;
            if !message.is_assistant() {
                continue;
            }
            if let Some(text) = message.text() {
                debug!(run_id = %run_id, message_id = %message.id, "Reply found through run steps");
                return Ok(Some(text.to_string()));
            }
        }

        Ok(None)
    }

    /// Newest assistant text among recent messages. Messages stamped with a
    /// different run belong to an earlier turn and are skipped.
    async fn latest_reply_from_messages(
        &self,
        thread_id: &str,
        run_id: &str,
        limit: u32,
    ) -> ServiceResult<Option<String>> {
        let messages = self.assistant.list_messages(thread_id, limit).await?;

        Ok(messages
            .iter()
            .filter(|m| m.is_assistant())
            .filter(|m| m.run_id.as_deref().is_none_or(|id| id == run_id))
            .find_map(|m| m.text())
            .map(str::to_string))
    }
}
