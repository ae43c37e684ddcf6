use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::mpsc;

use scalewob::bridge::dom::{
    Dimensions, DomEvent, DomSurface, ElementInfo, EnvironmentState, NodeId, SyntheticEvent,
};
use scalewob::errors::ScaleWobResult;
use scalewob::launcher::FrameHost;
use scalewob::protocol::TrajectoryEntry;

type EvaluateHook = Box<dyn Fn(&Value, &[TrajectoryEntry]) -> ScaleWobResult<Value> + Send + Sync>;

/// In-memory stand-in for the embedded document. Tests script user activity
/// by emitting raw DOM events and inspect what synthetic events the bridge
/// dispatched back.
#[derive(Default)]
pub struct FakeDom {
    subscribers: Mutex<Vec<mpsc::Sender<DomEvent>>>,
    pub elements: Mutex<Vec<ElementInfo>>,
    pub focused: Mutex<Option<ElementInfo>>,
    pub dispatched: Mutex<Vec<(NodeId, SyntheticEvent)>>,
    evaluate_hook: Mutex<Option<EvaluateHook>>,
    pub evaluate_calls: Mutex<Vec<(Value, Vec<TrajectoryEntry>)>>,
    pub url: Mutex<String>,
}

impl FakeDom {
    pub fn new() -> Self {
        let dom = Self::default();
        *dom.url.lock().unwrap() = "http://env.local/index.html".to_string();
        dom
    }

    pub fn with_evaluate_hook<F>(self, hook: F) -> Self
    where
        F: Fn(&Value, &[TrajectoryEntry]) -> ScaleWobResult<Value> + Send + Sync + 'static,
    {
        *self.evaluate_hook.lock().unwrap() = Some(Box::new(hook));
        self
    }

    pub fn add_element(&self, element: ElementInfo) {
        self.elements.lock().unwrap().push(element);
    }

    /// Simulated genuine user activity, delivered to every subscriber.
    pub fn emit(&self, event: DomEvent) {
        for tx in self.subscribers.lock().unwrap().iter() {
            let _ = tx.try_send(event.clone());
        }
    }
}

impl DomSurface for FakeDom {
    fn subscribe(&self) -> mpsc::Receiver<DomEvent> {
        let (tx, rx) = mpsc::channel(64);
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    fn element_at(&self, x: f64, y: f64) -> Option<ElementInfo> {
        self.elements
            .lock()
            .unwrap()
            .iter()
            .find(|el| {
                let r = el.position;
                x >= r.x as f64
                    && x < (r.x + r.width) as f64
                    && y >= r.y as f64
                    && y < (r.y + r.height) as f64
            })
            .cloned()
    }

    fn focused(&self) -> Option<ElementInfo> {
        self.focused.lock().unwrap().clone()
    }

    fn dispatch(&self, node: NodeId, event: SyntheticEvent) -> ScaleWobResult<()> {
        self.dispatched.lock().unwrap().push((node, event));
        Ok(())
    }

    fn dispatch_document(&self, event: SyntheticEvent) -> ScaleWobResult<()> {
        self.dispatched.lock().unwrap().push((0, event));
        Ok(())
    }

    fn scrollable_ancestor_at(&self, _x: f64, _y: f64) -> Option<NodeId> {
        None
    }

    fn scroll_by(&self, _target: Option<NodeId>, _dx: f64, _dy: f64) {}

    fn current_url(&self) -> String {
        self.url.lock().unwrap().clone()
    }

    fn title(&self) -> String {
        "fake environment".to_string()
    }

    fn state(&self) -> EnvironmentState {
        EnvironmentState {
            url: self.current_url(),
            title: self.title(),
            ready_state: "complete".into(),
            viewport: Dimensions {
                width: 390.0,
                height: 844.0,
            },
            document: Dimensions {
                width: 390.0,
                height: 2000.0,
            },
            timestamp: 0,
        }
    }

    fn history_back(&self) {}

    fn evaluate_task(
        &self,
        params: &Value,
        trajectory: &[TrajectoryEntry],
    ) -> Option<ScaleWobResult<Value>> {
        let hook = self.evaluate_hook.lock().unwrap();
        hook.as_ref().map(|hook| {
            self.evaluate_calls
                .lock()
                .unwrap()
                .push((params.clone(), trajectory.to_vec()));
            hook(params, trajectory)
        })
    }

    fn execute_script(&self, _script: &str) -> ScaleWobResult<Value> {
        Ok(Value::Null)
    }
}

/// Frame host double recording every source change.
#[derive(Default)]
pub struct RecordingFrame {
    pub sources: Mutex<Vec<Option<String>>>,
}

impl FrameHost for RecordingFrame {
    fn set_source(&self, source: Option<String>) {
        self.sources.lock().unwrap().push(source);
    }
}
