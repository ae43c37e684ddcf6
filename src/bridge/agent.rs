use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::bridge::dom::{DomEvent, DomSurface};
use crate::bridge::simulate::{Clock, Simulator};
use crate::bridge::tracking::{EventTracker, OutboundEvent};
use crate::channel::MessagePort;
use crate::config::BridgeConfig;
use crate::errors::{ScaleWobError, ScaleWobResult};
use crate::protocol::events::InitDetails;
use crate::protocol::{
    message_id, Command, CommandPayload, EventKind, EventPayload, Message, ResponsePayload,
    BRIDGE_ID_PREFIX,
};

/// Startup settle delay before the init event announces readiness.
const INIT_DELAY_MS: u64 = 100;

/// In-environment agent: observes DOM activity through the injected surface,
/// reports it upstream as typed events, and executes commands arriving on the
/// port. One agent per embedded document; dropping it releases the
/// subscription and the port.
pub struct BridgeAgent {
    config: BridgeConfig,
    dom: Arc<dyn DomSurface>,
    port: MessagePort,
    tracker: EventTracker,
    simulator: Simulator,
    clock: Clock,
}

impl BridgeAgent {
    pub fn new(config: BridgeConfig, dom: Arc<dyn DomSurface>, port: MessagePort) -> Self {
        let clock = Clock::new();
        Self {
            tracker: EventTracker::new(config.scroll_debounce_ms),
            simulator: Simulator::new(dom.clone(), clock.clone()),
            config,
            dom,
            port,
            clock,
        }
    }

    /// Drives the agent until the host side closes its port. Announces
    /// readiness after a short settle delay, then multiplexes inbound
    /// commands, observed DOM activity, and scroll flush deadlines.
    pub async fn run(mut self) -> ScaleWobResult<()> {
        tracing::info!(auto_track = self.config.auto_track, "bridge agent starting");

        let mut dom_rx = self.dom.subscribe();
        let mut dom_open = true;

        tokio::time::sleep(Duration::from_millis(INIT_DELAY_MS)).await;
        let init = InitDetails {
            timestamp: self.clock.now_ms(),
            environment: self.dom.current_url(),
            title: self.dom.title(),
        };
        self.send_event(
            EventKind::Init,
            "ScaleWoB Event Tracker initialized successfully".into(),
            serde_json::to_value(init)?,
        )
        .await?;
        tracing::debug!("bridge agent ready");

        loop {
            let flush_at = self.tracker.scroll_deadline_ms();
            tokio::select! {
                inbound = self.port.recv() => match inbound {
                    Some(message) => self.handle_message(message).await?,
                    None => break,
                },
                observed = dom_rx.recv(), if dom_open => match observed {
                    Some(event) => self.handle_dom_event(event).await?,
                    None => dom_open = false,
                },
                _ = tokio::time::sleep_until(self.clock.instant_at(flush_at.unwrap_or(0))),
                    if flush_at.is_some() =>
                {
                    if let Some(event) = self.tracker.flush_scroll(self.clock.now_ms()) {
                        self.emit(event).await?;
                    }
                }
            }
        }

        tracing::info!("bridge agent stopped");
        Ok(())
    }

    async fn handle_dom_event(&mut self, event: DomEvent) -> ScaleWobResult<()> {
        // With tracking off, only navigation is still reported.
        if !self.config.auto_track && !matches!(event, DomEvent::UrlChanged { .. }) {
            return Ok(());
        }
        if let Some(outbound) = self.tracker.ingest(event, self.clock.now_ms()) {
            self.emit(outbound).await?;
        }
        Ok(())
    }

    async fn handle_message(&mut self, message: Message) -> ScaleWobResult<()> {
        match message {
            Message::Command { id, payload } => self.handle_command(id, payload).await,
            other => {
                tracing::debug!(message = ?other, "ignoring non-command message");
                Ok(())
            }
        }
    }

    async fn handle_command(&mut self, id: String, payload: CommandPayload) -> ScaleWobResult<()> {
        if self.config.debug {
            tracing::debug!(id = %id, command = %payload.command, "received command");
        }

        let outcome = match Command::parse(&payload) {
            Ok(command) => self.execute(command).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(result) => self.send_response(id, true, Some(result), None).await,
            Err(err) => {
                tracing::warn!(id = %id, error = %err, "command failed");
                self.send_response(id, false, None, Some(err.to_string()))
                    .await
            }
        }
    }

    async fn execute(&self, command: Command) -> ScaleWobResult<Value> {
        match command {
            Command::Click { x, y, delay_ms } => self.simulator.click(x, y, delay_ms).await,
            Command::LongPress { x, y, duration_ms } => {
                self.simulator.long_press(x, y, duration_ms).await
            }
            Command::Type {
                text,
                typing_delay_ms,
            } => self.simulator.type_text(&text, typing_delay_ms).await,
            Command::Scroll {
                x,
                y,
                direction,
                distance,
            } => self.simulator.scroll(x, y, &direction, distance).await,
            Command::Drag {
                x,
                y,
                direction,
                distance,
            } => self.simulator.drag(x, y, &direction, distance).await,
            Command::Back => self.simulator.back().await,
            Command::GetState => self.simulator.environment_state(),
            Command::Evaluate { params, trajectory } => {
                match self.dom.evaluate_task(&params, &trajectory) {
                    Some(result) => result,
                    None => Err(ScaleWobError::Command(
                        "Environment does not have evaluateTask method available".into(),
                    )),
                }
            }
            Command::ExecuteScript { script } => match self.dom.execute_script(&script) {
                Ok(result) => Ok(json!({
                    "success": true,
                    "result": result,
                    "timestamp": self.clock.now_ms(),
                })),
                Err(err) => Err(ScaleWobError::Command(format!(
                    "Script execution failed: {err}"
                ))),
            },
        }
    }

    async fn emit(&self, event: OutboundEvent) -> ScaleWobResult<()> {
        self.send_event(event.kind, event.message, event.data).await
    }

    /// The human-readable message rides inside the data object, where hosts
    /// and legacy consumers alike expect to find it.
    async fn send_event(
        &self,
        kind: EventKind,
        message: String,
        mut data: Value,
    ) -> ScaleWobResult<()> {
        if let Some(map) = data.as_object_mut() {
            map.insert("message".into(), Value::String(message));
        }
        self.port
            .post(Message::Event {
                id: message_id(BRIDGE_ID_PREFIX),
                timestamp: self.clock.now_ms(),
                payload: EventPayload {
                    event_type: kind,
                    data,
                },
            })
            .await
    }

    async fn send_response(
        &self,
        id: String,
        success: bool,
        result: Option<Value>,
        error: Option<String>,
    ) -> ScaleWobResult<()> {
        self.port
            .post(Message::Response {
                id,
                timestamp: self.clock.now_ms(),
                payload: ResponsePayload {
                    success,
                    result,
                    error,
                },
            })
            .await
    }
}
