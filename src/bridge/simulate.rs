use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::Instant;

use crate::bridge::dom::{DomSurface, SyntheticEvent};
use crate::errors::{ScaleWobError, ScaleWobResult};
use crate::protocol::commands::ScrollDirection;
use crate::protocol::now_ms;

/// Milliseconds between drag mousemove steps.
const DRAG_STEP_DELAY_MS: u64 = 10;
const DRAG_STEPS: u32 = 10;
/// Wheel dispatch is delayed so a simulated scroll never lands in the same
/// instant it was requested, keeping session durations non-zero.
const SCROLL_DISPATCH_DELAY_MS: u64 = 50;
/// History navigation needs a beat to settle before the new URL is read.
const BACK_SETTLE_MS: u64 = 500;

/// Millisecond clock anchored to wall time at construction but driven by the
/// tokio timer, so paused-clock tests advance it deterministically.
#[derive(Debug, Clone)]
pub struct Clock {
    wall_anchor_ms: i64,
    started: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            wall_anchor_ms: now_ms(),
            started: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.wall_anchor_ms + self.started.elapsed().as_millis() as i64
    }

    /// Timer instant corresponding to a clock reading, for `sleep_until`.
    pub fn instant_at(&self, at_ms: i64) -> Instant {
        let offset = (at_ms - self.wall_anchor_ms).max(0) as u64;
        self.started + Duration::from_millis(offset)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes synthetic interactions against the embedded document. Multi-step
/// gestures pace themselves with timer sleeps rather than blocking, matching
/// how real input arrives.
pub struct Simulator {
    dom: Arc<dyn DomSurface>,
    clock: Clock,
}

impl Simulator {
    pub fn new(dom: Arc<dyn DomSurface>, clock: Clock) -> Self {
        Self { dom, clock }
    }

    pub async fn click(&self, x: f64, y: f64, delay_ms: u64) -> ScaleWobResult<Value> {
        let element = self.element_at(x, y)?;
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        self.dom.dispatch(element.node, SyntheticEvent::Click { x, y })?;
        self.dom.dispatch(element.node, SyntheticEvent::Focus)?;
        Ok(json!({
            "x": x,
            "y": y,
            "element": element,
            "timestamp": self.clock.now_ms(),
        }))
    }

    pub async fn long_press(&self, x: f64, y: f64, duration_ms: u64) -> ScaleWobResult<Value> {
        let element = self.element_at(x, y)?;
        self.dom
            .dispatch(element.node, SyntheticEvent::MouseDown { x, y })?;
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        self.dom
            .dispatch(element.node, SyntheticEvent::MouseUp { x, y })?;
        Ok(json!({
            "x": x,
            "y": y,
            "duration": duration_ms,
            "element": element,
            "timestamp": self.clock.now_ms(),
        }))
    }

    /// Types into the focused element one character at a time, firing the
    /// keydown/input/keyup cycle per character and a single change at the end.
    pub async fn type_text(&self, text: &str, typing_delay_ms: u64) -> ScaleWobResult<Value> {
        let element = self
            .dom
            .focused()
            .filter(|el| el.is_text_input())
            .ok_or_else(|| {
                ScaleWobError::Command("No input element is currently focused".into())
            })?;

        for ch in text.chars() {
            self.dom.dispatch(
                element.node,
                SyntheticEvent::KeyDown {
                    key: ch.to_string(),
                },
            )?;
            self.dom
                .dispatch(element.node, SyntheticEvent::InputChar { ch })?;
            self.dom.dispatch(
                element.node,
                SyntheticEvent::KeyUp {
                    key: ch.to_string(),
                },
            )?;
            tokio::time::sleep(Duration::from_millis(typing_delay_ms)).await;
        }
        self.dom.dispatch(element.node, SyntheticEvent::Change)?;

        Ok(json!({
            "text": text,
            "element": element,
            "timestamp": self.clock.now_ms(),
        }))
    }

    /// Scrolls the nearest scrollable container under `(x, y)` — the document
    /// when none — by dispatching a wheel event and applying the offset.
    pub async fn scroll(
        &self,
        x: f64,
        y: f64,
        direction: &str,
        distance: f64,
    ) -> ScaleWobResult<Value> {
        let parsed = ScrollDirection::parse(direction).ok_or_else(|| {
            ScaleWobError::Command(format!("Invalid scroll direction: {direction}"))
        })?;
        let (delta_x, delta_y) = parsed.deltas(distance);
        let target = self.dom.scrollable_ancestor_at(x, y);

        tokio::time::sleep(Duration::from_millis(SCROLL_DISPATCH_DELAY_MS)).await;
        let wheel = SyntheticEvent::Wheel {
            x,
            y,
            delta_x,
            delta_y,
        };
        match target {
            Some(node) => self.dom.dispatch(node, wheel)?,
            None => self.dom.dispatch_document(wheel)?,
        }
        self.dom.scroll_by(target, delta_x, delta_y);

        Ok(json!({
            "x": x,
            "y": y,
            "direction": direction,
            "distance": distance,
            "deltaX": delta_x,
            "deltaY": delta_y,
            "timestamp": self.clock.now_ms(),
        }))
    }

    /// Drags from `(x, y)` in a direction: mousedown, ten paced mousemoves
    /// across the document, mouseup on whatever sits at the endpoint.
    pub async fn drag(
        &self,
        x: f64,
        y: f64,
        direction: &str,
        distance: f64,
    ) -> ScaleWobResult<Value> {
        let parsed = ScrollDirection::parse(direction)
            .ok_or_else(|| ScaleWobError::Command(format!("Invalid drag direction: {direction}")))?;
        let (dx, dy) = parsed.deltas(distance);
        let (end_x, end_y) = (x + dx, y + dy);

        let element = self.element_at(x, y)?;
        self.dom
            .dispatch(element.node, SyntheticEvent::MouseDown { x, y })?;

        let step_x = (end_x - x) / f64::from(DRAG_STEPS);
        let step_y = (end_y - y) / f64::from(DRAG_STEPS);
        for step in 0..DRAG_STEPS {
            self.dom.dispatch_document(SyntheticEvent::MouseMove {
                x: x + step_x * f64::from(step),
                y: y + step_y * f64::from(step),
            })?;
            tokio::time::sleep(Duration::from_millis(DRAG_STEP_DELAY_MS)).await;
        }

        if let Some(end_element) = self.dom.element_at(end_x, end_y) {
            self.dom
                .dispatch(end_element.node, SyntheticEvent::MouseUp { x: end_x, y: end_y })?;
        }

        Ok(json!({
            "startX": x,
            "startY": y,
            "endX": end_x,
            "endY": end_y,
            "direction": direction,
            "distance": distance,
            "element": element,
            "timestamp": self.clock.now_ms(),
        }))
    }

    pub async fn back(&self) -> ScaleWobResult<Value> {
        let from = self.dom.current_url();
        self.dom.history_back();
        tokio::time::sleep(Duration::from_millis(BACK_SETTLE_MS)).await;
        Ok(json!({
            "from": from,
            "to": self.dom.current_url(),
            "timestamp": self.clock.now_ms(),
        }))
    }

    pub fn environment_state(&self) -> ScaleWobResult<Value> {
        serde_json::to_value(self.dom.state()).map_err(Into::into)
    }

    fn element_at(&self, x: f64, y: f64) -> ScaleWobResult<crate::bridge::dom::ElementInfo> {
        self.dom.element_at(x, y).ok_or_else(|| {
            ScaleWobError::Command(format!("No element found at coordinates ({x}, {y})"))
        })
    }
}
