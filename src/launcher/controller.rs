use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::catalog::{environment_url, EnvironmentDescriptor};
use crate::config::LauncherConfig;
use crate::errors::{ScaleWobError, ScaleWobResult};
use crate::launcher::console::{console_kind_for, derive_message, ConsoleKind, EventConsole};
use crate::launcher::trajectory::{is_actionable, TrajectoryRecorder};
use crate::launcher::viewport::ViewportScaler;
use crate::protocol::{
    message_id, now_ms, CommandPayload, EventKind, Message, ResponsePayload,
    LAUNCHER_COMMAND_PREFIX,
};

/// Delay before the frame source is cleared when restarting an evaluation,
/// giving the loading overlay time to appear.
const RELOAD_CLEAR_DELAY_MS: u64 = 100;
/// Gap between clearing and restoring the frame source; the blank interval
/// is what forces the embedded document to fully reinitialize.
const RELOAD_RESTORE_DELAY_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentStatus {
    Loading,
    Online,
    Offline,
}

/// Surface the controller uses to manipulate the embedded frame. Setting the
/// source to `None` blanks the frame; restoring it reloads the document.
pub trait FrameHost: Send + Sync {
    fn set_source(&self, source: Option<String>);
}

/// UI-originated inputs to the controller's run loop.
#[derive(Debug)]
pub enum LauncherAction {
    TogglePlayMode,
    StartEvaluation,
    FinishEvaluation,
    SetParameter(String, Value),
    FrameLoaded,
    FrameError,
    Resize { width: f64, height: f64 },
    ToggleEventPreference(ConsoleKind),
    ToggleEntryExpansion(String),
    Shutdown,
}

/// Host-side orchestrator for one embedded environment: owns the
/// Play/Evaluate state machine, the event console, the trajectory buffer,
/// and the evaluate command round trip. It never touches the embedded
/// document directly; everything crosses via messages.
pub struct LauncherController {
    config: LauncherConfig,
    descriptor: EnvironmentDescriptor,
    frame: Arc<dyn FrameHost>,
    outbound: mpsc::Sender<Message>,
    console: EventConsole,
    trajectory: TrajectoryRecorder,
    scaler: ViewportScaler,
    status: EnvironmentStatus,
    is_play_mode: bool,
    is_evaluating: bool,
    is_evaluation_started: bool,
    /// One-shot flag: the reload triggered by starting an evaluation should
    /// not produce a fresh "environment loaded" entry.
    suppress_load_message: bool,
    parameters: Map<String, Value>,
    evaluate_deadline: Option<Instant>,
}

impl LauncherController {
    pub fn new(
        config: LauncherConfig,
        descriptor: EnvironmentDescriptor,
        frame: Arc<dyn FrameHost>,
        outbound: mpsc::Sender<Message>,
    ) -> Self {
        let scaler = ViewportScaler::new(config.logical_width, config.logical_height);
        let console = EventConsole::new(config.max_console_entries);
        Self {
            config,
            descriptor,
            frame,
            outbound,
            console,
            trajectory: TrajectoryRecorder::new(),
            scaler,
            status: EnvironmentStatus::Loading,
            is_play_mode: true,
            is_evaluating: false,
            is_evaluation_started: false,
            suppress_load_message: false,
            parameters: Map::new(),
            evaluate_deadline: None,
        }
    }

    /// Drives the controller until a `Shutdown` action arrives or both input
    /// channels close: UI actions, messages from the environment, and the
    /// evaluate fallback deadline.
    pub async fn run(
        &mut self,
        mut actions: mpsc::Receiver<LauncherAction>,
        mut inbound: mpsc::Receiver<Message>,
    ) -> ScaleWobResult<()> {
        tracing::info!(environment = %self.descriptor.id, "launcher controller starting");
        let mut actions_open = true;
        let mut inbound_open = true;

        while actions_open || inbound_open {
            let deadline = self.evaluate_deadline;
            tokio::select! {
                action = actions.recv(), if actions_open => match action {
                    Some(LauncherAction::Shutdown) => break,
                    Some(action) => self.apply(action).await?,
                    None => actions_open = false,
                },
                message = inbound.recv(), if inbound_open => match message {
                    Some(message) => self.handle_message(message),
                    None => inbound_open = false,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    self.expire_evaluation();
                }
            }
        }

        tracing::info!(environment = %self.descriptor.id, "launcher controller stopped");
        Ok(())
    }

    pub async fn apply(&mut self, action: LauncherAction) -> ScaleWobResult<()> {
        match action {
            LauncherAction::TogglePlayMode => self.toggle_play_mode(),
            LauncherAction::StartEvaluation => self.start_evaluation().await,
            LauncherAction::FinishEvaluation => self.finish_evaluation().await?,
            LauncherAction::SetParameter(name, value) => {
                self.parameters.insert(name, value);
            }
            LauncherAction::FrameLoaded => self.on_frame_loaded(),
            LauncherAction::FrameError => self.on_frame_error(),
            LauncherAction::Resize { width, height } => {
                self.scaler.resize(width, height);
            }
            LauncherAction::ToggleEventPreference(kind) => self.console.toggle_preference(kind),
            LauncherAction::ToggleEntryExpansion(id) => self.console.toggle_expanded(&id),
            // Only meaningful to the run loop.
            LauncherAction::Shutdown => {}
        }
        Ok(())
    }

    /// Flipping to Play abandons any evaluation in progress; the embedded
    /// side is not told, its eventual response simply finds no awaiter.
    pub fn toggle_play_mode(&mut self) {
        self.is_play_mode = !self.is_play_mode;
        self.is_evaluation_started = false;
        self.is_evaluating = false;
        self.evaluate_deadline = None;

        if self.is_play_mode {
            self.parameters.clear();
            self.suppress_load_message = false;
            self.console.push(
                ConsoleKind::Info,
                "Switched to Play Mode - Free interaction enabled",
                None,
            );
        } else {
            self.console.push(
                ConsoleKind::Info,
                "Switched to Evaluate Mode - Use Start/Finish buttons",
                None,
            );
        }
        tracing::debug!(play_mode = self.is_play_mode, "mode toggled");
    }

    /// Begins an evaluation session: fresh console and trajectory, then a
    /// forced reload of the environment so it starts from a clean state.
    /// Only reachable from Evaluate mode, and not while a session is already
    /// running with no response outstanding.
    pub async fn start_evaluation(&mut self) {
        if self.status != EnvironmentStatus::Online {
            tracing::debug!(status = ?self.status, "start ignored while environment is not online");
            return;
        }
        if self.is_play_mode || (self.is_evaluation_started && !self.is_evaluating) {
            tracing::debug!(
                play_mode = self.is_play_mode,
                started = self.is_evaluation_started,
                "start ignored in current mode state"
            );
            return;
        }

        self.is_evaluation_started = true;
        self.is_evaluating = false;
        self.console.clear();
        self.trajectory.clear();
        self.console.push(
            ConsoleKind::Action,
            "Starting evaluation - refreshing environment",
            None,
        );
        self.status = EnvironmentStatus::Loading;
        self.suppress_load_message = true;

        tokio::time::sleep(Duration::from_millis(RELOAD_CLEAR_DELAY_MS)).await;
        self.frame.set_source(None);
        tokio::time::sleep(Duration::from_millis(RELOAD_RESTORE_DELAY_MS)).await;
        self.frame.set_source(Some(self.environment_source()));
        tracing::info!(environment = %self.descriptor.id, "evaluation session started");
    }

    /// Ships the evaluate command with the collected parameters and the
    /// recorded trajectory, then arms the fallback deadline.
    pub async fn finish_evaluation(&mut self) -> ScaleWobResult<()> {
        if self.status != EnvironmentStatus::Online || !self.is_evaluation_started {
            return Ok(());
        }
        // A second click while the response is outstanding does nothing.
        if self.is_evaluating {
            return Ok(());
        }

        let missing: Vec<&str> = self
            .descriptor
            .params
            .keys()
            .filter(|name| !self.parameters.contains_key(*name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            self.console.push(
                ConsoleKind::Error,
                format!("Missing required parameters: {}", missing.join(", ")),
                Some(json!({
                    "missingParams": missing,
                    "requiredParams": self.descriptor.params,
                })),
            );
            return Ok(());
        }

        self.is_evaluating = true;

        let id = message_id(LAUNCHER_COMMAND_PREFIX);
        let command = Message::Command {
            id: id.clone(),
            payload: CommandPayload {
                command: "evaluate".into(),
                params: Value::Object(self.parameters.clone()),
                trajectory: Some(self.trajectory.snapshot()),
            },
        };
        self.outbound
            .send(command)
            .await
            .map_err(|_| ScaleWobError::Channel("environment port closed".into()))?;
        tracing::info!(id = %id, steps = self.trajectory.len(), "evaluate command sent");

        self.console.push(
            ConsoleKind::Action,
            "Evaluation command sent - recording finished",
            Some(json!({
                "parametersProvided": !self.parameters.is_empty(),
                "parameterCount": self.parameters.len(),
                "parameters": if self.parameters.is_empty() {
                    Value::Null
                } else {
                    Value::Object(self.parameters.clone())
                },
            })),
        );

        self.evaluate_deadline =
            Some(Instant::now() + Duration::from_millis(self.config.evaluate_timeout_ms));
        Ok(())
    }

    /// Fallback when no evaluate response arrives in time: quietly return to
    /// idle so a new session can start.
    fn expire_evaluation(&mut self) {
        tracing::warn!("evaluate response deadline passed, resetting evaluation state");
        self.is_evaluating = false;
        self.is_evaluation_started = false;
        self.evaluate_deadline = None;
    }

    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Event { payload, .. } => {
                self.handle_event(payload.event_type, payload.data);
            }
            Message::UserInteraction {
                event_type,
                message,
                details,
            } => self.handle_legacy_interaction(&event_type, message, details),
            Message::Response { id, payload, .. } => self.handle_response(&id, payload),
            Message::Command { .. } => {}
        }
    }

    fn handle_event(&mut self, kind: EventKind, data: Value) {
        let mapped = console_kind_for(kind);
        if self.console.is_enabled(mapped) {
            let message = derive_message(kind, &data);
            self.console.push(mapped, message, Some(data.clone()));
        }

        // Actionable events feed the trajectory while a session is live and
        // no evaluate response is outstanding, independent of display
        // preferences.
        if self.is_evaluation_started && !self.is_evaluating && is_actionable(kind) {
            self.trajectory.record(kind, data, now_ms());
        }
    }

    fn handle_legacy_interaction(
        &mut self,
        event_type: &str,
        message: String,
        details: Option<Value>,
    ) {
        let kind: ConsoleKind = serde_json::from_value(Value::String(event_type.to_string()))
            .unwrap_or(ConsoleKind::Unknown);
        if self.console.is_enabled(kind) {
            let message = if message.is_empty() {
                "Unknown action".to_string()
            } else {
                message
            };
            self.console.push(kind, message, details);
        }
    }

    /// Responses to commands the launcher did not issue (external automation
    /// clients share the channel) must pass through untouched.
    fn handle_response(&mut self, id: &str, payload: ResponsePayload) {
        let own_prefix = format!("{LAUNCHER_COMMAND_PREFIX}_");
        let is_evaluate_response = (id.starts_with(&own_prefix) && self.is_evaluation_started)
            || looks_like_evaluation_result(payload.result.as_ref());
        if !is_evaluate_response {
            tracing::debug!(id = %id, "ignoring response meant for another consumer");
            return;
        }

        if payload.success {
            let passed = payload
                .result
                .as_ref()
                .and_then(|result| result.get("success"))
                .and_then(Value::as_bool)
                .unwrap_or(true);
            if passed {
                self.console
                    .push(ConsoleKind::Success, "Test passed", payload.result);
            } else {
                self.console
                    .push(ConsoleKind::Error, "Test failed", payload.result);
            }
        } else {
            self.console.push(
                ConsoleKind::Error,
                "Evaluation command failed",
                Some(json!({"error": payload.error, "result": payload.result})),
            );
        }

        self.is_evaluating = false;
        self.is_evaluation_started = false;
        self.evaluate_deadline = None;
    }

    pub fn on_frame_loaded(&mut self) {
        self.status = EnvironmentStatus::Online;

        if !self.suppress_load_message && self.console.is_enabled(ConsoleKind::Success) {
            self.console.push(
                ConsoleKind::Success,
                "Mobile environment loaded successfully from CDN",
                None,
            );
        }
        if self.suppress_load_message {
            self.suppress_load_message = false;
        }
        if self.console.is_enabled(ConsoleKind::Info) {
            // Test environments announce the bridge handshake instead of the
            // generic CDN entry.
            if self.descriptor.id.contains("test") {
                self.console.push(
                    ConsoleKind::Info,
                    "Bridge-enabled environment loaded - Waiting for ScaleWoB Bridge initialization...",
                    Some(json!({
                        "bridgeExpected": true,
                        "environmentType": "test",
                        "source": "test-cdn",
                    })),
                );
            } else {
                self.console.push(
                    ConsoleKind::Info,
                    "CDN environment loaded - Full event tracking enabled via ScaleWoB Bridge",
                    Some(json!({"source": "cdn"})),
                );
            }
        }
    }

    pub fn on_frame_error(&mut self) {
        self.status = EnvironmentStatus::Offline;
        if self.console.is_enabled(ConsoleKind::Error) {
            self.console
                .push(ConsoleKind::Error, "Failed to load environment from CDN", None);
        }
    }

    pub fn environment_source(&self) -> String {
        environment_url(&self.config.cdn_base, &self.descriptor.id)
    }

    /// Pointer events reach the embedded document only when it is online and
    /// the user is either playing freely or inside an active session.
    pub fn pointer_interaction_enabled(&self) -> bool {
        self.status == EnvironmentStatus::Online
            && (self.is_play_mode || self.is_evaluation_started)
    }

    pub fn status(&self) -> EnvironmentStatus {
        self.status
    }

    pub fn is_play_mode(&self) -> bool {
        self.is_play_mode
    }

    pub fn is_evaluating(&self) -> bool {
        self.is_evaluating
    }

    pub fn is_evaluation_started(&self) -> bool {
        self.is_evaluation_started
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    pub fn console(&self) -> &EventConsole {
        &self.console
    }

    pub fn trajectory(&self) -> &TrajectoryRecorder {
        &self.trajectory
    }

    pub fn scale(&self) -> f64 {
        self.scaler.scale()
    }
}

/// Structural sniff for evaluation outcomes, for responses whose id does not
/// mark them as the launcher's own. Fragile by nature, so it lives in one
/// place.
fn looks_like_evaluation_result(result: Option<&Value>) -> bool {
    result
        .and_then(Value::as_object)
        .map(|map| {
            map.contains_key("score")
                || map.contains_key("correctness")
                || map.contains_key("evaluation")
                || map.contains_key("success")
        })
        .unwrap_or(false)
}
