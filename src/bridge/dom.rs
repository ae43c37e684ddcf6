use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::ScaleWobResult;
use crate::protocol::TrajectoryEntry;

/// Opaque handle to an element inside the embedded document.
pub type NodeId = u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Snapshot of an element returned from hit-testing; serialized into command
/// results so callers can see what was acted on.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    #[serde(skip)]
    pub node: NodeId,
    pub tag_name: String,
    pub id: String,
    pub class_name: String,
    pub text: String,
    pub value: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub placeholder: String,
    pub href: String,
    pub src: String,
    pub position: Rect,
    pub visible: bool,
    /// data-testid, data-cy, aria-label, role, title — when present.
    pub attributes: BTreeMap<String, String>,
}

impl ElementInfo {
    pub fn is_text_input(&self) -> bool {
        matches!(self.tag_name.to_ascii_uppercase().as_str(), "INPUT" | "TEXTAREA")
    }

    /// `tag#id` shorthand used in scroll/mutation details.
    pub fn short_label(&self) -> String {
        if self.id.is_empty() {
            self.tag_name.to_ascii_lowercase()
        } else {
            format!("{}#{}", self.tag_name.to_ascii_lowercase(), self.id)
        }
    }
}

/// Synthetic interaction dispatched into the embedded document on behalf of
/// a remote command.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntheticEvent {
    MouseDown { x: f64, y: f64 },
    MouseMove { x: f64, y: f64 },
    MouseUp { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    KeyDown { key: String },
    KeyUp { key: String },
    /// Appends one character to the target's value and fires `input`.
    InputChar { ch: char },
    Change,
    Focus,
    Wheel { x: f64, y: f64, delta_x: f64, delta_y: f64 },
}

/// Raw observed activity inside the embedded document, before normalization
/// into the outbound event vocabulary.
#[derive(Debug, Clone)]
pub enum DomEvent {
    Click {
        target: ElementInfo,
        x: f64,
        y: f64,
    },
    KeyDown {
        key: String,
        code: String,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        target: ElementInfo,
    },
    DocumentScroll {
        position: f64,
        window_height: f64,
        document_height: f64,
    },
    Wheel {
        delta_x: f64,
        delta_y: f64,
        delta_mode: u32,
        target: ElementInfo,
    },
    FocusIn {
        target: ElementInfo,
    },
    FocusOut {
        target: ElementInfo,
    },
    Submit {
        target: ElementInfo,
        action: String,
        method: String,
    },
    TouchStart {
        x: f64,
        y: f64,
        touch_count: u32,
    },
    UrlChanged {
        from: String,
        to: String,
        path: String,
    },
    Mutation {
        added_nodes: usize,
        target: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentState {
    pub url: String,
    pub title: String,
    pub ready_state: String,
    pub viewport: Dimensions,
    pub document: Dimensions,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Capability interface over the embedded document. The bridge agent only
/// touches the DOM through this seam, so the protocol and simulation logic
/// run against an in-memory double in tests.
pub trait DomSurface: Send + Sync {
    /// Subscription to observed user/DOM activity. Each call returns an
    /// independent receiver; dropping it is the teardown.
    fn subscribe(&self) -> mpsc::Receiver<DomEvent>;

    /// Topmost element at the given viewport coordinates.
    fn element_at(&self, x: f64, y: f64) -> Option<ElementInfo>;

    /// Currently focused element, if any.
    fn focused(&self) -> Option<ElementInfo>;

    fn dispatch(&self, node: NodeId, event: SyntheticEvent) -> ScaleWobResult<()>;

    /// Document-level dispatch (drag mousemoves target the document).
    fn dispatch_document(&self, event: SyntheticEvent) -> ScaleWobResult<()>;

    /// Nearest scrollable ancestor of the element at `(x, y)`; `None` means
    /// the document itself scrolls.
    fn scrollable_ancestor_at(&self, x: f64, y: f64) -> Option<NodeId>;

    fn scroll_by(&self, target: Option<NodeId>, delta_x: f64, delta_y: f64);

    fn current_url(&self) -> String;

    fn title(&self) -> String;

    fn state(&self) -> EnvironmentState;

    fn history_back(&self);

    /// Delegates to the environment's `evaluateTask` hook; `None` when the
    /// environment does not expose one.
    fn evaluate_task(
        &self,
        params: &Value,
        trajectory: &[TrajectoryEntry],
    ) -> Option<ScaleWobResult<Value>>;

    fn execute_script(&self, script: &str) -> ScaleWobResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_info_serializes_with_wire_field_names() {
        let info = ElementInfo {
            tag_name: "INPUT".into(),
            input_type: "text".into(),
            visible: true,
            ..Default::default()
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["tagName"], "INPUT");
        assert_eq!(value["type"], "text");
        assert!(value.get("node").is_none());
    }

    #[test]
    fn text_input_detection() {
        let mut info = ElementInfo {
            tag_name: "textarea".into(),
            ..Default::default()
        };
        assert!(info.is_text_input());
        info.tag_name = "DIV".into();
        assert!(!info.is_text_input());
    }

    #[test]
    fn short_label_includes_id_when_present() {
        let mut info = ElementInfo {
            tag_name: "DIV".into(),
            ..Default::default()
        };
        assert_eq!(info.short_label(), "div");
        info.id = "feed".into();
        assert_eq!(info.short_label(), "div#feed");
    }
}
