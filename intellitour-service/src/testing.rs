//! In-memory doubles for the assistant runtime, the travel providers and
//! the thread store.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::assistant::{
    AssistantApi, AssistantDefinition, AssistantInfo, FunctionCall, Message, MessageContent,
    MessageCreation, MessageRole, RequiredAction, Run, RunError, RunStatus, RunStep, StepDetails,
    TextContent, Thread, ToolCall, ToolCallBatch, ToolOutput,
};
use crate::config::AppConfig;
use crate::db::{RotationReason, ThreadStore};
use crate::error::{AssistantError, LookupError, ServiceResult};
use crate::lookups::{
    FlightOffer, HotelSummary, NearbyPlace, PlaceCandidate, PlaceDetails, PlacePhoto,
    TravelLookups, WeatherReport,
};
use crate::service::TravelAssistantService;
use crate::tools::{
    Capability, FlightOfferArgs, HotelArgs, LocationDetailsArgs, LocationSearchArgs,
    NearbySearchArgs, PlacePhotoArgs, StreetViewArgs, WeatherArgs,
};

/// What one `retrieve_run` call reports
#[derive(Debug, Clone)]
pub enum Poll {
    Queued,
    InProgress,
    Unknown,
    Completed,
    Expired,
    /// (tool_call_id, function name, JSON arguments)
    RequiresAction(Vec<(&'static str, &'static str, &'static str)>),
    Failed {
        code: &'static str,
        message: &'static str,
    },
}

impl Poll {
    fn status(&self) -> RunStatus {
        match self {
            Poll::Queued => RunStatus::Queued,
            Poll::InProgress => RunStatus::InProgress,
            Poll::Unknown => RunStatus::Unknown,
            Poll::Completed => RunStatus::Completed,
            Poll::Expired => RunStatus::Expired,
            Poll::RequiresAction(_) => RunStatus::RequiresAction,
            Poll::Failed { .. } => RunStatus::Failed,
        }
    }

    fn to_run(&self, id: &str, thread_id: &str) -> Run {
        let last_error = match self {
            Poll::Failed { code, message } => Some(RunError {
                code: Some(code.to_string()),
                message: message.to_string(),
            }),
            _ => None,
        };
        let required_action = match self {
            Poll::RequiresAction(calls) => Some(RequiredAction::SubmitToolOutputs {
                submit_tool_outputs: ToolCallBatch {
                    tool_calls: calls
                        .iter()
                        .map(|(id, name, arguments)| ToolCall {
                            id: id.to_string(),
                            function: FunctionCall {
                                name: name.to_string(),
                                arguments: arguments.to_string(),
                            },
                        })
                        .collect(),
                },
            }),
            _ => None,
        };

        Run {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            status: self.status(),
            last_error,
            required_action,
        }
    }
}

/// Scripted lifecycle of one run. Each poll advances one state; the last
/// state repeats forever.
#[derive(Debug, Clone)]
pub struct RunPlan {
    polls: VecDeque<Poll>,
    reply: Option<String>,
    hidden_reads: u32,
    with_steps: bool,
}

impl RunPlan {
    pub fn new(polls: impl IntoIterator<Item = Poll>) -> Self {
        let polls: VecDeque<Poll> = polls.into_iter().collect();
        assert!(!polls.is_empty(), "a run plan needs at least one state");
        Self {
            polls,
            reply: None,
            hidden_reads: 0,
            with_steps: true,
        }
    }

    /// Assistant text written to the thread once the run reaches a terminal state
    pub fn reply(mut self, text: &str) -> Self {
        self.reply = Some(text.to_string());
        self
    }

    /// Keep the reply out of the first `reads` step and message listings
    pub fn hidden_for_reads(mut self, reads: u32) -> Self {
        self.hidden_reads = reads;
        self
    }

    /// Publish the reply without a message-creation run step
    pub fn without_steps(mut self) -> Self {
        self.with_steps = false;
        self
    }

    fn current(&self) -> &Poll {
        &self.polls[0]
    }

    fn advance(&mut self) -> Poll {
        if self.polls.len() > 1 {
            self.polls.pop_front().unwrap_or(Poll::Completed)
        } else {
            self.polls[0].clone()
        }
    }
}

struct StoredMessage {
    message: Message,
    hidden_reads: u32,
}

struct FakeRun {
    thread_id: String,
    plan: RunPlan,
    polls: u32,
    published: bool,
    steps: Vec<RunStep>,
}

#[derive(Default)]
struct AssistantState {
    next_id: u64,
    thread_ids: Vec<String>,
    messages: HashMap<String, Vec<StoredMessage>>,
    run_ids: Vec<String>,
    runs: HashMap<String, FakeRun>,
    plans: VecDeque<RunPlan>,
    submissions: Vec<(String, Vec<ToolOutput>)>,
    created_assistants: Vec<AssistantDefinition>,
    create_message_failures: u32,
    status_reads: u32,
    rate_limited_read: Option<u32>,
}

impl AssistantState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }

    fn add_run(&mut self, thread_id: &str, plan: RunPlan) -> String {
        let id = self.id("run");
        self.run_ids.push(id.clone());
        self.runs.insert(
            id.clone(),
            FakeRun {
                thread_id: thread_id.to_string(),
                plan,
                polls: 0,
                published: false,
                steps: Vec::new(),
            },
        );
        id
    }

    fn add_message(
        &mut self,
        thread_id: &str,
        role: MessageRole,
        text: &str,
        run_id: Option<&str>,
        hidden_reads: u32,
    ) -> Message {
        let message = Message {
            id: self.id("msg"),
            role,
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: text.to_string(),
                },
            }],
            run_id: run_id.map(str::to_string),
        };
        self.messages
            .entry(thread_id.to_string())
            .or_default()
            .push(StoredMessage {
                message: message.clone(),
                hidden_reads,
            });
        message
    }

    /// Write the run's reply to its thread the first time it is seen settled
    fn publish(&mut self, run_id: &str) {
        let Some(run) = self.runs.get(run_id) else {
            return;
        };
        if run.published {
            return;
        }
        let thread_id = run.thread_id.clone();
        let plan = run.plan.clone();

        let step = plan.reply.as_deref().map(|reply| {
            let message = self.add_message(
                &thread_id,
                MessageRole::Assistant,
                reply,
                Some(run_id),
                plan.hidden_reads,
            );
            RunStep {
                id: format!("step_{}", message.id),
                step_details: StepDetails::MessageCreation {
                    message_creation: MessageCreation {
                        message_id: message.id,
                    },
                },
            }
        });

        if let Some(run) = self.runs.get_mut(run_id) {
            run.published = true;
            if plan.with_steps {
                run.steps.extend(step);
            }
        }
    }

    fn hidden(&mut self, thread_id: &str, message_id: &str) -> bool {
        let Some(stored) = self
            .messages
            .get_mut(thread_id)
            .and_then(|messages| messages.iter_mut().find(|m| m.message.id == message_id))
        else {
            return false;
        };
        if stored.hidden_reads > 0 {
            stored.hidden_reads -= 1;
            true
        } else {
            false
        }
    }
}

/// Scripted assistant runtime
pub struct FakeAssistant {
    state: Mutex<AssistantState>,
    thread_delay: Option<Duration>,
    thread_limit: Option<usize>,
    failing_submissions: bool,
}

impl FakeAssistant {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AssistantState::default()),
            thread_delay: None,
            thread_limit: None,
            failing_submissions: false,
        }
    }

    pub fn with_thread_delay(mut self, delay: Duration) -> Self {
        self.thread_delay = Some(delay);
        self
    }

    /// Refuse thread creation once `limit` threads exist
    pub fn thread_limit(mut self, limit: usize) -> Self {
        self.thread_limit = Some(limit);
        self
    }

    pub fn failing_submissions(mut self) -> Self {
        self.failing_submissions = true;
        self
    }

    /// Reject the next `count` message creations with a rate limit
    pub fn rate_limit_create_message(self, count: u32) -> Self {
        self.state.lock().unwrap().create_message_failures = count;
        self
    }

    /// Reject the `n`-th `retrieve_run` call (counting from 1) with a rate limit
    pub fn rate_limit_nth_poll(self, n: u32) -> Self {
        self.state.lock().unwrap().rate_limited_read = Some(n);
        self
    }

    /// Plan for the next run created through `create_run`
    pub fn push_plan(&self, plan: RunPlan) {
        self.state.lock().unwrap().plans.push_back(plan);
    }

    /// A run already active on a thread
    pub fn seed_run(&self, thread_id: &str, plan: RunPlan) -> String {
        self.state.lock().unwrap().add_run(thread_id, plan)
    }

    pub fn seed_messages(&self, thread_id: &str, count: usize) {
        let mut state = self.state.lock().unwrap();
        for i in 0..count {
            state.add_message(
                thread_id,
                MessageRole::User,
                &format!("Earlier message {}", i + 1),
                None,
                0,
            );
        }
    }

    pub fn threads_created(&self) -> usize {
        self.state.lock().unwrap().thread_ids.len()
    }

    pub fn thread_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().thread_ids.clone()
    }

    /// User-authored texts on a thread, oldest first
    pub fn user_messages(&self, thread_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .messages
            .get(thread_id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.message.role == MessageRole::User)
                    .filter_map(|m| m.message.text().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn polls(&self, run_id: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.runs.get(run_id).map_or(0, |run| run.polls)
    }

    pub fn submissions(&self) -> Vec<(String, Vec<ToolOutput>)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn created_assistants(&self) -> Vec<AssistantDefinition> {
        self.state.lock().unwrap().created_assistants.clone()
    }
}

pub fn rate_limit_error() -> AssistantError {
    AssistantError::Api {
        status: 429,
        code: Some("rate_limit_exceeded".to_string()),
        message: "Rate limit reached".to_string(),
    }
}

fn not_found(what: &str, id: &str) -> AssistantError {
    AssistantError::Api {
        status: 404,
        code: None,
        message: format!("No {} found with id '{}'.", what, id),
    }
}

#[async_trait]
impl AssistantApi for FakeAssistant {
    async fn create_thread(&self) -> Result<Thread, AssistantError> {
        if let Some(delay) = self.thread_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if self
            .thread_limit
            .is_some_and(|limit| state.thread_ids.len() >= limit)
        {
            return Err(AssistantError::Api {
                status: 500,
                code: Some("server_error".to_string()),
                message: "Thread creation failed".to_string(),
            });
        }

        let id = state.id("thread");
        state.thread_ids.push(id.clone());
        state.messages.entry(id.clone()).or_default();
        Ok(Thread { id })
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<Message, AssistantError> {
        let mut state = self.state.lock().unwrap();
        if state.create_message_failures > 0 {
            state.create_message_failures -= 1;
            return Err(rate_limit_error());
        }
        Ok(state.add_message(thread_id, MessageRole::User, content, None, 0))
    }

    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<Message>, AssistantError> {
        let mut state = self.state.lock().unwrap();
        let Some(messages) = state.messages.get_mut(thread_id) else {
            return Ok(Vec::new());
        };

        let mut visible = Vec::new();
        for stored in messages.iter_mut().rev() {
            if stored.hidden_reads > 0 {
                stored.hidden_reads -= 1;
                continue;
            }
            visible.push(stored.message.clone());
        }
        visible.truncate(limit as usize);
        Ok(visible)
    }

    async fn retrieve_message(&self, thread_id: &str, message_id: &str) -> Result<Message, AssistantError> {
        let state = self.state.lock().unwrap();
        state
            .messages
            .get(thread_id)
            .and_then(|messages| messages.iter().find(|m| m.message.id == message_id))
            .map(|m| m.message.clone())
            .ok_or_else(|| not_found("message", message_id))
    }

    async fn create_run(&self, thread_id: &str) -> Result<Run, AssistantError> {
        let mut state = self.state.lock().unwrap();
        let plan = state
            .plans
            .pop_front()
            .unwrap_or_else(|| RunPlan::new([Poll::Completed]).reply("OK"));
        let id = state.add_run(thread_id, plan);
        Ok(Poll::Queued.to_run(&id, thread_id))
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AssistantError> {
        let mut state = self.state.lock().unwrap();
        state.status_reads += 1;
        if state.rate_limited_read == Some(state.status_reads) {
            return Err(rate_limit_error());
        }

        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| not_found("run", run_id))?;
        run.polls += 1;
        let poll = run.plan.advance();
        if poll.status().is_terminal() {
            state.publish(run_id);
        }
        Ok(poll.to_run(run_id, thread_id))
    }

    async fn list_runs(&self, thread_id: &str) -> Result<Vec<Run>, AssistantError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .run_ids
            .iter()
            .rev()
            .filter_map(|id| state.runs.get(id).map(|run| (id, run)))
            .filter(|(_, run)| run.thread_id == thread_id)
            .map(|(id, run)| run.plan.current().to_run(id, thread_id))
            .collect())
    }

    async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
        limit: u32,
    ) -> Result<Vec<RunStep>, AssistantError> {
        let mut state = self.state.lock().unwrap();
        let steps = state
            .runs
            .get(run_id)
            .map(|run| run.steps.clone())
            .ok_or_else(|| not_found("run", run_id))?;

        let mut visible = Vec::new();
        for step in steps.into_iter().take(limit as usize) {
            let hidden = match &step.step_details {
                StepDetails::MessageCreation { message_creation } => {
                    state.hidden(thread_id, &message_creation.message_id)
                }
                StepDetails::ToolCalls {} | StepDetails::Other => false,
            };
            if !hidden {
                visible.push(step);
            }
        }
        Ok(visible)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, AssistantError> {
        if self.failing_submissions {
            return Err(AssistantError::Api {
                status: 400,
                code: None,
                message: "Runs in status \"failed\" do not accept tool outputs.".to_string(),
            });
        }

        let mut state = self.state.lock().unwrap();
        state
            .submissions
            .push((run_id.to_string(), outputs.to_vec()));
        let run = state
            .runs
            .get(run_id)
            .ok_or_else(|| not_found("run", run_id))?;
        Ok(run.plan.current().to_run(run_id, thread_id))
    }

    async fn create_assistant(
        &self,
        definition: &AssistantDefinition,
    ) -> Result<AssistantInfo, AssistantError> {
        let mut state = self.state.lock().unwrap();
        state.created_assistants.push(definition.clone());
        Ok(AssistantInfo {
            id: format!("asst_{}", state.created_assistants.len()),
        })
    }
}

/// Canned provider results; records every capability it serves
#[derive(Default)]
pub struct FakeLookups {
    calls: Mutex<Vec<Capability>>,
    failure: Option<String>,
    weather_delay: Option<Duration>,
}

impl FakeLookups {
    /// Every lookup fails with a not-found error carrying `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn with_weather_delay(mut self, delay: Duration) -> Self {
        self.weather_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Capability> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, capability: Capability) -> Result<(), LookupError> {
        self.calls.lock().unwrap().push(capability);
        match &self.failure {
            Some(message) => Err(LookupError::NotFound {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TravelLookups for FakeLookups {
    async fn weather(&self, args: &WeatherArgs) -> Result<WeatherReport, LookupError> {
        let recorded = self.record(Capability::Weather(args.clone()));
        if let Some(delay) = self.weather_delay {
            tokio::time::sleep(delay).await;
        }
        recorded?;

        Ok(WeatherReport {
            city: args.city.clone(),
            temperature: 24.0,
            feels_like: 25.0,
            humidity: 60,
            description: "partly cloudy".to_string(),
        })
    }

    async fn flight_offers(&self, args: &FlightOfferArgs) -> Result<Vec<FlightOffer>, LookupError> {
        self.record(Capability::FlightOffers(args.clone()))?;
        Ok(Vec::new())
    }

    async fn hotels(&self, args: &HotelArgs) -> Result<Vec<HotelSummary>, LookupError> {
        self.record(Capability::Hotels(args.clone()))?;
        Ok(Vec::new())
    }

    async fn search_location(
        &self,
        args: &LocationSearchArgs,
    ) -> Result<PlaceCandidate, LookupError> {
        self.record(Capability::LocationSearch(args.clone()))?;
        Ok(PlaceCandidate {
            name: Some(args.query.clone()),
            address: None,
            place_id: Some("place_1".to_string()),
            lat: -1.2921,
            lng: 36.8219,
        })
    }

    async fn location_details(
        &self,
        args: &LocationDetailsArgs,
    ) -> Result<PlaceDetails, LookupError> {
        self.record(Capability::LocationDetails(args.clone()))?;
        Ok(PlaceDetails {
            name: Some("Nairobi National Park".to_string()),
            address: None,
            rating: Some(4.5),
            phone: None,
            website: None,
            opening_hours: None,
            photo_reference: None,
            lat: -1.3733,
            lng: 36.8580,
        })
    }

    async fn place_photo(&self, args: &PlacePhotoArgs) -> Result<PlacePhoto, LookupError> {
        self.record(Capability::PlacePhoto(args.clone()))?;
        Ok(PlacePhoto {
            photo_url: format!("https://maps.example/photo/{}", args.photo_reference),
            photo_reference: args.photo_reference.clone(),
            max_width: args.max_width,
            warning: None,
        })
    }

    fn street_view_url(&self, args: &StreetViewArgs) -> String {
        self.calls
            .lock()
            .unwrap()
            .push(Capability::StreetView(args.clone()));
        format!(
            "https://maps.example/streetview?size={}x{}&location={},{}",
            args.width, args.height, args.lat, args.lng
        )
    }

    async fn nearby_places(&self, args: &NearbySearchArgs) -> Result<Vec<NearbyPlace>, LookupError> {
        self.record(Capability::NearbySearch(args.clone()))?;
        Ok(Vec::new())
    }
}

/// User -> thread mapping kept in memory
#[derive(Default)]
pub struct MemoryThreadStore {
    threads: Mutex<HashMap<String, String>>,
    rotations: Mutex<Vec<(String, Option<String>, String, RotationReason)>>,
}

impl MemoryThreadStore {
    pub fn insert(&self, user_id: &str, thread_id: &str) {
        self.threads
            .lock()
            .unwrap()
            .insert(user_id.to_string(), thread_id.to_string());
    }

    pub fn thread_for(&self, user_id: &str) -> Option<String> {
        self.threads.lock().unwrap().get(user_id).cloned()
    }

    pub fn rotations(&self) -> Vec<(String, Option<String>, String, RotationReason)> {
        self.rotations.lock().unwrap().clone()
    }
}

impl ThreadStore for MemoryThreadStore {
    fn get(&self, user_id: &str) -> ServiceResult<Option<String>> {
        Ok(self.thread_for(user_id))
    }

    fn put(&self, user_id: &str, thread_id: &str) -> ServiceResult<()> {
        self.insert(user_id, thread_id);
        Ok(())
    }

    fn record_rotation(
        &self,
        user_id: &str,
        previous_thread_id: Option<&str>,
        new_thread_id: &str,
        reason: RotationReason,
    ) -> ServiceResult<()> {
        self.rotations.lock().unwrap().push((
            user_id.to_string(),
            previous_thread_id.map(str::to_string),
            new_thread_id.to_string(),
            reason,
        ));
        Ok(())
    }
}

pub fn build_service(
    assistant: Arc<FakeAssistant>,
    lookups: Arc<FakeLookups>,
) -> TravelAssistantService {
    build_service_with_store(assistant, lookups, Arc::new(MemoryThreadStore::default()))
}

pub fn build_service_with_store(
    assistant: Arc<FakeAssistant>,
    lookups: Arc<FakeLookups>,
    store: Arc<MemoryThreadStore>,
) -> TravelAssistantService {
    TravelAssistantService::new(AppConfig::default(), store, assistant, lookups)
}
