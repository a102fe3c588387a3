//! Tool-call dispatch: capability lookup, execution and output batching.

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::assistant::{Run, ToolCall, ToolOutput};
use crate::error::{LookupError, ServiceError, ServiceResult};
use crate::lookups::TravelLookups;
use crate::tools::Capability;

use super::TravelAssistantService;

impl TravelAssistantService {
    /// Execute every pending tool call of a run and submit the outputs as
    /// one batch. Returns the run as reported after submission.
    pub(crate) async fn dispatch_tool_calls(&self, thread_id: &str, run: &Run) -> ServiceResult<Run> {
        let calls = run.pending_tool_calls();
        if calls.is_empty() {
            return Err(ServiceError::Internal {
                message: format!("Run {} requires action but has no tool calls", run.id),
            });
        }

        let outputs = execute_tool_calls(self.lookups.as_ref(), calls).await;
        debug!(run_id = %run.id, count = outputs.len(), "Submitting tool outputs");

        Ok(self
            .assistant
            .submit_tool_outputs(thread_id, &run.id, &outputs)
            .await?)
    }
}

/// One output per call, in call order
pub(crate) async fn execute_tool_calls(
    lookups: &dyn TravelLookups,
    calls: &[ToolCall],
) -> Vec<ToolOutput> {
    join_all(calls.iter().map(|call| execute_tool_call(lookups, call))).await
}

async fn execute_tool_call(lookups: &dyn TravelLookups, call: &ToolCall) -> ToolOutput {
    let result = match Capability::parse(&call.function.name, &call.function.arguments) {
        Ok(capability) => {
            debug!(
                tool_call_id = %call.id,
                tool_name = %capability.tool_name(),
                "Executing tool call"
            );
            invoke(lookups, &capability).await
        }
        Err(e) => {
            warn!(tool_call_id = %call.id, tool_name = %call.function.name, error = %e, "Rejected tool call");
            error_payload(e)
        }
    };

    ToolOutput {
        tool_call_id: call.id.clone(),
        output: encode(&result),
    }
}

async fn invoke(lookups: &dyn TravelLookups, capability: &Capability) -> Value {
    match capability {
        Capability::Weather(args) => payload(lookups.weather(args).await),
        Capability::FlightOffers(args) => payload(lookups.flight_offers(args).await),
        Capability::Hotels(args) => payload(lookups.hotels(args).await),
        Capability::LocationSearch(args) => payload(lookups.search_location(args).await),
        Capability::LocationDetails(args) => payload(lookups.location_details(args).await),
        Capability::PlacePhoto(args) => payload(lookups.place_photo(args).await),
        Capability::StreetView(args) => Value::String(lookups.street_view_url(args)),
        Capability::NearbySearch(args) => payload(lookups.nearby_places(args).await),
    }
}

fn payload<T: Serialize>(result: Result<T, LookupError>) -> Value {
    match result {
        Ok(value) => serde_json::to_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "Tool result is not serializable");
            error_payload(format!("Tool returned invalid result: {}", e))
        }),
        Err(e) => {
            warn!(error = %e, "Lookup failed");
            error_payload(e)
        }
    }
}

fn error_payload(message: impl std::fmt::Display) -> Value {
    serde_json::json!({ "error": message.to_string() })
}

fn encode(value: &Value) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| r#"{"error":"Tool result could not be encoded"}"#.to_string())
}
