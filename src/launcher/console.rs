use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::{message_id, EventKind};

/// Console entry categories. Event kinds map onto these; `action`, `info`,
/// `error` and `success` are minted by the launcher itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsoleKind {
    Action,
    Info,
    Error,
    Success,
    Init,
    Click,
    Keypress,
    Scroll,
    Focus,
    Blur,
    Submit,
    Touch,
    Navigation,
    DomChange,
    Unknown,
}

/// Wire event type → console category. Legacy `ready` folds into `init`,
/// `user-action` into `action`, `touchstart` into `touch`.
pub fn console_kind_for(kind: EventKind) -> ConsoleKind {
    match kind {
        EventKind::Init | EventKind::Ready => ConsoleKind::Init,
        EventKind::UserAction => ConsoleKind::Action,
        EventKind::Click => ConsoleKind::Click,
        EventKind::Keypress => ConsoleKind::Keypress,
        EventKind::Scroll => ConsoleKind::Scroll,
        EventKind::Focus => ConsoleKind::Focus,
        EventKind::Blur => ConsoleKind::Blur,
        EventKind::Submit => ConsoleKind::Submit,
        EventKind::Touch | EventKind::Touchstart => ConsoleKind::Touch,
        EventKind::Navigation => ConsoleKind::Navigation,
        EventKind::DomChange => ConsoleKind::DomChange,
        EventKind::Unknown => ConsoleKind::Unknown,
    }
}

/// Human-readable console line for an event. An explicit `message` field in
/// the event data always wins; the templates cover older bridges that omit
/// it.
pub fn derive_message(kind: EventKind, data: &Value) -> String {
    if let Some(message) = data.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    match kind {
        EventKind::Ready => format!(
            "ScaleWoB Bridge ready: {}",
            data.get("environment").and_then(Value::as_str).unwrap_or("")
        ),
        EventKind::Init => "ScaleWoB Event Tracker initialized successfully".to_string(),
        EventKind::UserAction => {
            let action = data.get("action").and_then(Value::as_str).unwrap_or("unknown");
            let target = data
                .get("target")
                .and_then(|t| t.get("tagName"))
                .and_then(Value::as_str)
                .unwrap_or("element");
            format!("User action: {action} on {target}")
        }
        EventKind::Navigation => format!(
            "Navigation: {}",
            data.get("path").and_then(Value::as_str).unwrap_or("")
        ),
        EventKind::DomChange => format!(
            "DOM changed: {} ({} items)",
            data.get("type").and_then(Value::as_str).unwrap_or(""),
            data.get("count").and_then(Value::as_i64).unwrap_or(0)
        ),
        other => format!("Event: {other}"),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsoleEntry {
    pub id: String,
    /// RFC 3339 creation time; entries are never mutated after creation.
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: ConsoleKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Bounded rolling window of console entries plus per-kind display
/// preferences and the expanded/collapsed flags for the detail view. The
/// expanded set lives apart from the entries so they stay immutable.
pub struct EventConsole {
    entries: VecDeque<ConsoleEntry>,
    capacity: usize,
    preferences: HashMap<ConsoleKind, bool>,
    expanded: HashSet<String>,
}

impl EventConsole {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            preferences: default_preferences(),
            expanded: HashSet::new(),
        }
    }

    /// Whether entries of this kind are currently shown.
    pub fn is_enabled(&self, kind: ConsoleKind) -> bool {
        self.preferences.get(&kind).copied().unwrap_or(false)
    }

    pub fn toggle_preference(&mut self, kind: ConsoleKind) {
        let enabled = self.is_enabled(kind);
        self.preferences.insert(kind, !enabled);
    }

    /// Appends an entry, evicting the oldest past capacity. Returns the id.
    pub fn push(&mut self, kind: ConsoleKind, message: impl Into<String>, details: Option<Value>) -> String {
        let entry = ConsoleEntry {
            id: message_id("entry"),
            timestamp: chrono::Utc::now().to_rfc3339(),
            kind,
            message: message.into(),
            details,
        };
        let id = entry.id.clone();
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        id
    }

    pub fn toggle_expanded(&mut self, entry_id: &str) {
        if !self.expanded.remove(entry_id) {
            self.expanded.insert(entry_id.to_string());
        }
    }

    pub fn is_expanded(&self, entry_id: &str) -> bool {
        self.expanded.contains(entry_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.expanded.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConsoleEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Noisy kinds (focus/blur, navigation, DOM churn, plain info) start hidden.
fn default_preferences() -> HashMap<ConsoleKind, bool> {
    HashMap::from([
        (ConsoleKind::Info, false),
        (ConsoleKind::Error, true),
        (ConsoleKind::Success, true),
        (ConsoleKind::Action, true),
        (ConsoleKind::Init, true),
        (ConsoleKind::Click, true),
        (ConsoleKind::Keypress, true),
        (ConsoleKind::Scroll, true),
        (ConsoleKind::Focus, false),
        (ConsoleKind::Blur, false),
        (ConsoleKind::Submit, true),
        (ConsoleKind::Touch, true),
        (ConsoleKind::Navigation, false),
        (ConsoleKind::DomChange, false),
        (ConsoleKind::Unknown, false),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rolling_window_evicts_oldest() {
        let mut console = EventConsole::new(3);
        for n in 0..5 {
            console.push(ConsoleKind::Click, format!("entry {n}"), None);
        }
        assert_eq!(console.len(), 3);
        let messages: Vec<_> = console.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["entry 2", "entry 3", "entry 4"]);
    }

    #[test]
    fn default_preferences_hide_noise() {
        let console = EventConsole::new(100);
        assert!(console.is_enabled(ConsoleKind::Click));
        assert!(console.is_enabled(ConsoleKind::Error));
        assert!(!console.is_enabled(ConsoleKind::Info));
        assert!(!console.is_enabled(ConsoleKind::Focus));
        assert!(!console.is_enabled(ConsoleKind::Navigation));
        assert!(!console.is_enabled(ConsoleKind::DomChange));
    }

    #[test]
    fn toggling_preferences_flips_visibility() {
        let mut console = EventConsole::new(100);
        console.toggle_preference(ConsoleKind::Focus);
        assert!(console.is_enabled(ConsoleKind::Focus));
        console.toggle_preference(ConsoleKind::Focus);
        assert!(!console.is_enabled(ConsoleKind::Focus));
    }

    #[test]
    fn expansion_flags_live_outside_entries() {
        let mut console = EventConsole::new(100);
        let id = console.push(ConsoleKind::Success, "done", Some(json!({"score": 1.0})));
        assert!(!console.is_expanded(&id));
        console.toggle_expanded(&id);
        assert!(console.is_expanded(&id));
        console.toggle_expanded(&id);
        assert!(!console.is_expanded(&id));
    }

    #[test]
    fn event_kinds_fold_into_console_kinds() {
        assert_eq!(console_kind_for(EventKind::Ready), ConsoleKind::Init);
        assert_eq!(console_kind_for(EventKind::UserAction), ConsoleKind::Action);
        assert_eq!(console_kind_for(EventKind::Touchstart), ConsoleKind::Touch);
        assert_eq!(console_kind_for(EventKind::Unknown), ConsoleKind::Unknown);
    }

    #[test]
    fn explicit_message_field_wins() {
        let data = json!({"message": "Clicked on button", "path": "/x"});
        assert_eq!(
            derive_message(EventKind::Navigation, &data),
            "Clicked on button"
        );
    }

    #[test]
    fn templates_cover_messageless_events() {
        assert_eq!(
            derive_message(EventKind::Navigation, &json!({"path": "/cart"})),
            "Navigation: /cart"
        );
        assert_eq!(
            derive_message(EventKind::Ready, &json!({"environment": "http://e/"})),
            "ScaleWoB Bridge ready: http://e/"
        );
        assert_eq!(derive_message(EventKind::Scroll, &json!({})), "Event: scroll");
    }
}
