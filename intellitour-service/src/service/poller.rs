//! Run polling state machine.

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::assistant::{Run, RunStatus};
use crate::error::{ServiceError, ServiceResult};

use super::TravelAssistantService;
use super::retry::with_backoff;

impl TravelAssistantService {
    /// Poll a run until it reaches a terminal state.
    ///
    /// Tool calls requested along the way are dispatched and submitted. A
    /// failed dispatch is treated as transient unless the run has failed in
    /// the meantime. Returns `RunTimeout` once the configured timeout passes
    /// without a terminal state. Rate-limited status reads are retried
    /// with backoff rather than ending the turn.
    pub(crate) async fn poll_run(&self, thread_id: &str, run_id: &str) -> ServiceResult<Run> {
        let polling = &self.config.polling;
        let started = Instant::now();

        loop {
            let run = self.fetch_run(thread_id, run_id).await?;
            let mut submitted = false;
            debug!(run_id = %run_id, status = %run.status, "Polled run");

            match run.status {
                RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired => {
                    info!(
                        thread_id = %thread_id,
                        run_id = %run_id,
                        status = %run.status,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Run finished"
                    );
                    return Ok(run);
                }
                RunStatus::RequiresAction => {
                    match self.dispatch_tool_calls(thread_id, &run).await {
                        Ok(submitted_run) => {
                            debug!(run_id = %run_id, status = %submitted_run.status, "Tool outputs submitted");
                            sleep(polling.post_submit_delay()).await;
                            submitted = true;
                        }
                        Err(e) => {
                            warn!(run_id = %run_id, error = %e, "Tool dispatch failed");
                            let current = self.fetch_run(thread_id, run_id).await?;
                            if current.status == RunStatus::Failed {
                                return Ok(current);
                            }
                        }
                    }
                }
                RunStatus::Queued | RunStatus::InProgress => {}
                RunStatus::Unknown => {
                    warn!(run_id = %run_id, "Run reported an unrecognized status, still polling");
                }
            }

            if started.elapsed() >= polling.timeout() {
                warn!(
                    thread_id = %thread_id,
                    run_id = %run_id,
                    timeout_secs = polling.timeout_secs,
                    "Run timed out"
                );
                return Err(ServiceError::RunTimeout {
                    run_id: run_id.to_string(),
                    waited_secs: polling.timeout_secs,
                });
            }

            // A successful submission already paused
            if !submitted {
                sleep(polling.interval()).await;
            }
        }
    }

    /// Wait out any run still active on a thread before starting a new one
    pub(crate) async fn drain_active_runs(&self, thread_id: &str) -> ServiceResult<()> {
        let runs = with_backoff(&self.config.retry, "list_runs", || {
            self.assistant.list_runs(thread_id)
        })
        .await?;

        for run in runs.into_iter().filter(|r| r.status.is_active()) {
            info!(thread_id = %thread_id, run_id = %run.id, status = %run.status, "Waiting for active run");
            match self.poll_run(thread_id, &run.id).await {
                Ok(_) => {}
                Err(ServiceError::RunTimeout { run_id, .. }) => {
                    warn!(thread_id = %thread_id, run_id = %run_id, "Active run did not finish, continuing");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    async fn fetch_run(&self, thread_id: &str, run_id: &str) -> ServiceResult<Run> {
        let run = with_backoff(&self.config.retry, "retrieve_run", || {
            self.assistant.retrieve_run(thread_id, run_id)
        })
        .await?;
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeAssistant, FakeLookups, Poll, RunPlan, build_service};
    use std::sync::Arc;
    use std::time::Duration;

    async fn start(assistant: &FakeAssistant, plan: RunPlan) -> (String, String) {
        use crate::assistant::AssistantApi;

        assistant.push_plan(plan);
        let thread = assistant.create_thread().await.unwrap();
        let run = assistant.create_run(&thread.id).await.unwrap();
        (thread.id, run.id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_completed() {
        let assistant = Arc::new(FakeAssistant::new());
        let service = build_service(assistant.clone(), Arc::new(FakeLookups::default()));
        let (thread_id, run_id) = start(
            &assistant,
            RunPlan::new([Poll::Queued, Poll::InProgress, Poll::Completed]),
        )
        .await;

        let started = Instant::now();
        let run = service.poll_run(&thread_id, &run_id).await.unwrap();

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(assistant.polls(&run_id), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_while_in_progress() {
        let assistant = Arc::new(FakeAssistant::new());
        let service = build_service(assistant.clone(), Arc::new(FakeLookups::default()));
        let (thread_id, run_id) = start(&assistant, RunPlan::new([Poll::InProgress])).await;

        let err = service.poll_run(&thread_id, &run_id).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::RunTimeout { ref run_id, waited_secs: 60 } if run_id.starts_with("run_")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_keeps_polling() {
        let assistant = Arc::new(FakeAssistant::new());
        let service = build_service(assistant.clone(), Arc::new(FakeLookups::default()));
        let (thread_id, run_id) = start(
            &assistant,
            RunPlan::new([Poll::Unknown, Poll::Unknown, Poll::Expired]),
        )
        .await;

        let run = service.poll_run(&thread_id, &run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requires_action_dispatches_then_completes() {
        let assistant = Arc::new(FakeAssistant::new());
        let lookups = Arc::new(FakeLookups::default());
        let service = build_service(assistant.clone(), lookups.clone());
        let (thread_id, run_id) = start(
            &assistant,
            RunPlan::new([
                Poll::RequiresAction(vec![("call_1", "get_weather", r#"{"city":"Nairobi"}"#)]),
                Poll::InProgress,
                Poll::Completed,
            ]),
        )
        .await;

        let run = service.poll_run(&thread_id, &run_id).await.unwrap();

        assert_eq!(run.status, RunStatus::Completed);
        let submissions = assistant.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].0, run_id);
        assert_eq!(submissions[0].1[0].tool_call_id, "call_1");
        assert_eq!(lookups.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_submission_returns_failed_run() {
        let assistant = Arc::new(FakeAssistant::new().failing_submissions());
        let service = build_service(assistant.clone(), Arc::new(FakeLookups::default()));
        let (thread_id, run_id) = start(
            &assistant,
            RunPlan::new([
                Poll::RequiresAction(vec![("call_1", "get_weather", r#"{"city":"Nairobi"}"#)]),
                Poll::Failed {
                    code: "server_error",
                    message: "tool outputs rejected",
                },
            ]),
        )
        .await;

        let run = service.poll_run(&thread_id, &run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(assistant.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_submission_keeps_polling_interval() {
        let assistant = Arc::new(FakeAssistant::new().failing_submissions());
        let service = build_service(assistant.clone(), Arc::new(FakeLookups::default()));
        let (thread_id, run_id) = start(
            &assistant,
            RunPlan::new([Poll::RequiresAction(vec![(
                "call_1",
                "get_weather",
                r#"{"city":"Nairobi"}"#,
            )])]),
        )
        .await;

        let started = Instant::now();
        let err = service.poll_run(&thread_id, &run_id).await.unwrap_err();

        assert!(matches!(err, ServiceError::RunTimeout { .. }));
        assert_eq!(started.elapsed(), Duration::from_secs(60));
        // One status read plus one re-check per 2s interval
        assert_eq!(assistant.polls(&run_id), 62);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requires_action_without_calls_waits_between_polls() {
        let assistant = Arc::new(FakeAssistant::new());
        let service = build_service(assistant.clone(), Arc::new(FakeLookups::default()));
        let (thread_id, run_id) =
            start(&assistant, RunPlan::new([Poll::RequiresAction(vec![])])).await;

        let err = service.poll_run(&thread_id, &run_id).await.unwrap_err();

        assert!(matches!(err, ServiceError::RunTimeout { .. }));
        assert_eq!(assistant.polls(&run_id), 62);
        assert!(assistant.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_status_read_is_retried() {
        let assistant = Arc::new(FakeAssistant::new().rate_limit_nth_poll(2));
        let service = build_service(assistant.clone(), Arc::new(FakeLookups::default()));
        let (thread_id, run_id) = start(
            &assistant,
            RunPlan::new([Poll::InProgress, Poll::InProgress, Poll::Completed]),
        )
        .await;

        let run = service.poll_run(&thread_id, &run_id).await.unwrap();

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(assistant.polls(&run_id), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_active_runs() {
        use crate::assistant::AssistantApi;

        let assistant = Arc::new(FakeAssistant::new());
        let service = build_service(assistant.clone(), Arc::new(FakeLookups::default()));
        let thread = assistant.create_thread().await.unwrap();
        let active = assistant.seed_run(
            &thread.id,
            RunPlan::new([Poll::InProgress, Poll::Completed]),
        );

        service.drain_active_runs(&thread.id).await.unwrap();

        let run = assistant.retrieve_run(&thread.id, &active).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(assistant.polls(&active), 3);
    }
}
