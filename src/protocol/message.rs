use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::events::{EventKind, TrajectoryEntry};

/// Id prefix the bridge uses for its own outbound messages.
pub const BRIDGE_ID_PREFIX: &str = "scalewob";
/// Id prefix the launcher uses for commands it issues; the response filter
/// keys on it to tell the launcher's own evaluate flow apart from commands
/// issued by external automation clients.
pub const LAUNCHER_COMMAND_PREFIX: &str = "command";

/// Wire envelope exchanged between the launcher and the embedded
/// environment. `user-interaction` is the legacy shape older environments
/// still emit; it carries no envelope id or timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "scalewob-event")]
    Event {
        id: String,
        timestamp: i64,
        payload: EventPayload,
    },
    #[serde(rename = "scalewob-command")]
    Command { id: String, payload: CommandPayload },
    #[serde(rename = "scalewob-response")]
    Response {
        id: String,
        timestamp: i64,
        payload: ResponsePayload,
    },
    #[serde(rename = "user-interaction")]
    UserInteraction {
        #[serde(rename = "eventType")]
        event_type: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        details: Option<Value>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(rename = "eventType")]
    pub event_type: EventKind,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandPayload {
    pub command: String,
    #[serde(default)]
    pub params: Value,
    /// The launcher sends the trajectory as a sibling of `params`; external
    /// SDK clients embed it inside `params` instead. Command parsing accepts
    /// both.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trajectory: Option<Vec<TrajectoryEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Epoch milliseconds at call time.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Unique message id: `<prefix>_<epoch-ms>_<uuid fragment>`.
pub fn message_id(prefix: &str) -> String {
    let unique = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, now_ms(), &unique[..8])
}
