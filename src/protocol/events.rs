use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed vocabulary of event types the bridge emits upstream. `ready` and
/// `user-action` only appear in messages from older embedded content; the
/// launcher folds them into `init`/`action` console entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Init,
    Ready,
    Click,
    Keypress,
    Scroll,
    Focus,
    Blur,
    Submit,
    Touch,
    Touchstart,
    Navigation,
    DomChange,
    UserAction,
    #[serde(other)]
    Unknown,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Init => "init",
            EventKind::Ready => "ready",
            EventKind::Click => "click",
            EventKind::Keypress => "keypress",
            EventKind::Scroll => "scroll",
            EventKind::Focus => "focus",
            EventKind::Blur => "blur",
            EventKind::Submit => "submit",
            EventKind::Touch => "touch",
            EventKind::Touchstart => "touchstart",
            EventKind::Navigation => "navigation",
            EventKind::DomChange => "dom-change",
            EventKind::UserAction => "user-action",
            EventKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded action during an active evaluation session. The collected
/// list ships to the environment's evaluation function verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickDetails {
    pub tag_name: String,
    pub id: String,
    pub class_name: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub timestamp: i64,
    pub input_type: String,
    pub input_name: String,
    pub input_value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeypressDetails {
    pub key: String,
    pub code: String,
    pub ctrl_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    pub meta_key: bool,
    pub timestamp: i64,
    pub target: KeypressTarget,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeypressTarget {
    pub tag_name: String,
    pub id: String,
    pub class_name: String,
    pub input_type: String,
    pub is_input: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusDetails {
    pub tag_name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub id: String,
    pub class_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDetails {
    pub action: String,
    pub method: String,
    pub id: String,
    pub class_name: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchDetails {
    pub x: f64,
    pub y: f64,
    pub touch_count: u32,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationDetails {
    pub from: String,
    pub to: String,
    pub path: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomChangeDetails {
    pub added_nodes: usize,
    pub target: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitDetails {
    pub timestamp: i64,
    pub environment: String,
    pub title: String,
}
