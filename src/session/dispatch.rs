//! Executes the functions the model may call and turns every outcome,
//! including failures, into a well-formed response.

use crate::session::history::{AppendOptions, History, Role};
use crate::types::tools::{FunctionCall, FunctionDeclaration, FunctionResponse, GoogleSearch, Tool};
use serde_json::{json, Map, Value};

pub const GET_CURRENT_WEATHER: &str = "get_current_weather";
pub const SCHEDULE_MEETING: &str = "schedule_meeting";
pub const DRAW_CHART: &str = "draw_chart";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("Function {0} not found.")]
    NotFound(String),
    #[error("Invalid arguments for {0}: {1}")]
    InvalidArguments(String, String),
    #[error("Invalid chart: {0}")]
    InvalidChart(String),
}

/// A bar chart the model asked to draw. Only `bar` is supported.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    chart_type: String,
    data: Vec<f64>,
    labels: Vec<String>,
    title: String,
}

impl ChartSpec {
    pub fn bar(title: &str, labels: &[&str], data: &[f64]) -> Self {
        Self {
            chart_type: "bar".to_string(),
            data: data.to_vec(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            title: title.to_string(),
        }
    }

    pub fn chart_type(&self) -> &str {
        &self.chart_type
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.chart_type != "bar" {
            return Err(DispatchError::InvalidChart(format!("unsupported chart type {:?}", self.chart_type)));
        }
        if self.data.is_empty() || self.labels.is_empty() {
            return Err(DispatchError::InvalidChart("data and labels must not be empty".to_string()));
        }
        if self.data.len() != self.labels.len() {
            return Err(DispatchError::InvalidChart(format!(
                "{} data points but {} labels",
                self.data.len(),
                self.labels.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, serde::Deserialize)]
struct WeatherArgs {
    location: String,
}

#[derive(Debug, serde::Deserialize)]
struct MeetingArgs {
    title: String,
    participants: Vec<String>,
    time: String,
}

/// A function call with its arguments checked against the declared schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    GetCurrentWeather { location: String },
    ScheduleMeeting { title: String, participants: Vec<String>, time: String },
    DrawChart(ChartSpec),
    Unknown { name: String },
}

impl ToolInvocation {
    pub fn parse(call: &FunctionCall) -> Result<Self, DispatchError> {
        match call.name() {
            GET_CURRENT_WEATHER => {
                let args: WeatherArgs = parse_args(call.name(), call.args())?;
                Ok(ToolInvocation::GetCurrentWeather { location: args.location })
            }
            SCHEDULE_MEETING => {
                let args: MeetingArgs = parse_args(call.name(), call.args())?;
                Ok(ToolInvocation::ScheduleMeeting {
                    title: args.title,
                    participants: args.participants,
                    time: args.time,
                })
            }
            DRAW_CHART => Ok(ToolInvocation::DrawChart(parse_args(call.name(), call.args())?)),
            other => Ok(ToolInvocation::Unknown { name: other.to_string() }),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(name: &str, args: &Map<String, Value>) -> Result<T, DispatchError> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| DispatchError::InvalidArguments(name.to_string(), e.to_string()))
}

#[derive(Debug, Default)]
pub struct FunctionDispatcher {
    dispatched: u64,
    failed: u64,
}

impl FunctionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Runs `call` and returns its response. Never fails: errors become an
    /// `{"error": ...}` response.
    pub fn dispatch(&mut self, call: &FunctionCall, history: &mut History) -> FunctionResponse {
        self.dispatched += 1;
        let arguments = Value::Object(call.args().clone());
        history.append(
            Role::Tool,
            &format!("Calling tool: {} with arguments {}", call.name(), arguments),
            AppendOptions::new(),
        );

        let result = ToolInvocation::parse(call).and_then(|invocation| execute(invocation, history));
        let response = match result {
            Ok(value) => value,
            Err(e) => {
                self.failed += 1;
                tracing::warn!("function call {} failed: {}", call.name(), e);
                json!({ "error": e.to_string() })
            }
        };
        FunctionResponse::new(call.name(), response).with_id(call.id())
    }
}

fn execute(invocation: ToolInvocation, history: &mut History) -> Result<Value, DispatchError> {
    match invocation {
        ToolInvocation::GetCurrentWeather { location } => Ok(json!({
            "weather": format!("The weather in {} is sunny and 75°F.", location)
        })),
        ToolInvocation::ScheduleMeeting { title, participants, time } => Ok(json!({
            "status": format!("Meeting \"{}\" scheduled for {} with {}.", title, time, participants.join(", "))
        })),
        ToolInvocation::DrawChart(chart) => {
            chart.validate()?;
            history.append(Role::Tool, "Chart generated.", AppendOptions::new().with_chart(chart));
            Ok(json!({ "status": "Chart has been drawn successfully." }))
        }
        ToolInvocation::Unknown { name } => Err(DispatchError::NotFound(name)),
    }
}

pub fn declarations() -> Vec<FunctionDeclaration> {
    vec![
        FunctionDeclaration::new(
            GET_CURRENT_WEATHER,
            "Get the current weather in a given location",
            json!({
                "type": "OBJECT",
                "properties": {
                    "location": {
                        "type": "STRING",
                        "description": "The city and state, e.g. San Francisco, CA"
                    }
                },
                "required": ["location"]
            }),
        ),
        FunctionDeclaration::new(
            SCHEDULE_MEETING,
            "Schedules a meeting with the given title, participants, and time.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "title": {"type": "STRING", "description": "The title of the meeting."},
                    "participants": {
                        "type": "ARRAY",
                        "items": {"type": "STRING"},
                        "description": "A list of email addresses of the participants."
                    },
                    "time": {"type": "STRING", "description": "The date and time of the meeting in ISO 8601 format."}
                },
                "required": ["title", "participants", "time"]
            }),
        ),
        FunctionDeclaration::new(
            DRAW_CHART,
            "Draws a chart inside the chat, given the data and labels. Only supports \"bar\" chart type for now.",
            json!({
                "type": "OBJECT",
                "properties": {
                    "type": {"type": "STRING", "description": "The type of chart, currently only \"bar\" is supported."},
                    "data": {"type": "ARRAY", "items": {"type": "NUMBER"}, "description": "The numerical data for the chart."},
                    "labels": {"type": "ARRAY", "items": {"type": "STRING"}, "description": "The labels for the data points."},
                    "title": {"type": "STRING", "description": "The title of the chart."}
                },
                "required": ["type", "data", "labels", "title"]
            }),
        ),
    ]
}

/// Tools attached to the setup message when tools are enabled.
pub fn tools() -> Vec<Tool> {
    vec![Tool::GoogleSearch(GoogleSearch::default()), Tool::FunctionDeclarations(declarations())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Value) -> FunctionCall {
        match args {
            Value::Object(map) => FunctionCall::new(name, map),
            _ => FunctionCall::new(name, Map::new()),
        }
    }

    #[test]
    fn test_weather() {
        let mut history = History::new();
        let mut dispatcher = FunctionDispatcher::new();
        let response = dispatcher.dispatch(
            &call(GET_CURRENT_WEATHER, json!({"location": "Boston, MA"})).with_id("c-1"),
            &mut history,
        );
        assert_eq!(response.id(), Some("c-1"));
        assert_eq!(response.name(), GET_CURRENT_WEATHER);
        assert_eq!(response.response(), &json!({"weather": "The weather in Boston, MA is sunny and 75°F."}));
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.entries()[0].content(),
            r#"Calling tool: get_current_weather with arguments {"location":"Boston, MA"}"#
        );
    }

    #[test]
    fn test_schedule_meeting() {
        let mut history = History::new();
        let response = FunctionDispatcher::new().dispatch(
            &call(
                SCHEDULE_MEETING,
                json!({"title": "Sync", "participants": ["a@x.io", "b@x.io"], "time": "2024-05-01T10:00"}),
            ),
            &mut history,
        );
        assert_eq!(response.id(), None);
        assert_eq!(
            response.response()["status"],
            "Meeting \"Sync\" scheduled for 2024-05-01T10:00 with a@x.io, b@x.io."
        );
    }

    #[test]
    fn test_arguments_keep_model_order() {
        let call: FunctionCall = serde_json::from_str(
            r#"{"name":"schedule_meeting","args":{"title":"Sync","participants":["a@x.io"],"time":"10:00"}}"#,
        )
        .unwrap();
        let mut history = History::new();
        FunctionDispatcher::new().dispatch(&call, &mut history);
        assert_eq!(
            history.entries()[0].content(),
            r#"Calling tool: schedule_meeting with arguments {"title":"Sync","participants":["a@x.io"],"time":"10:00"}"#
        );
    }

    #[test]
    fn test_draw_chart_appends_chart_entry() {
        let mut history = History::new();
        let response = FunctionDispatcher::new().dispatch(
            &call(DRAW_CHART, json!({"type": "bar", "data": [1, 2.5], "labels": ["a", "b"], "title": "T"})),
            &mut history,
        );
        assert_eq!(response.response(), &json!({"status": "Chart has been drawn successfully."}));
        assert_eq!(history.len(), 2);
        let entry = &history.entries()[1];
        assert_eq!(entry.role(), Role::Tool);
        assert_eq!(entry.content(), "Chart generated.");
        assert_eq!(entry.chart(), Some(&ChartSpec::bar("T", &["a", "b"], &[1.0, 2.5])));
    }

    #[test]
    fn test_invalid_chart_is_an_error_response() {
        let mut history = History::new();
        let mut dispatcher = FunctionDispatcher::new();
        let response = dispatcher.dispatch(
            &call(DRAW_CHART, json!({"type": "pie", "data": [1], "labels": ["a"], "title": "T"})),
            &mut history,
        );
        assert!(response.error().unwrap().starts_with("Invalid chart"));
        assert_eq!(history.len(), 1);
        assert_eq!(dispatcher.failed(), 1);

        let mismatched = ChartSpec::bar("T", &["a"], &[1.0, 2.0]);
        assert!(matches!(mismatched.validate(), Err(DispatchError::InvalidChart(_))));
    }

    #[test]
    fn test_unknown_function() {
        let mut history = History::new();
        let response = FunctionDispatcher::new().dispatch(&call("frobnicate", json!({})).with_id("9"), &mut history);
        assert_eq!(response.id(), Some("9"));
        assert_eq!(response.response(), &json!({"error": "Function frobnicate not found."}));
        assert_eq!(history.entries()[0].content(), "Calling tool: frobnicate with arguments {}");
    }

    #[test]
    fn test_missing_arguments() {
        let invocation = ToolInvocation::parse(&call(SCHEDULE_MEETING, json!({"title": "x"})));
        assert!(matches!(invocation, Err(DispatchError::InvalidArguments(name, _)) if name == SCHEDULE_MEETING));
    }

    #[test]
    fn test_tools() {
        let tools = tools();
        assert_eq!(tools.len(), 2);
        let declarations = declarations();
        let names: Vec<&str> = declarations.iter().map(|d| d.name()).collect();
        assert_eq!(names, [GET_CURRENT_WEATHER, SCHEDULE_MEETING, DRAW_CHART]);
    }
}
