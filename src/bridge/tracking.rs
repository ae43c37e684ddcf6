use serde_json::{json, Value};

use crate::bridge::dom::DomEvent;
use crate::protocol::events::{
    ClickDetails, DomChangeDetails, FocusDetails, KeypressDetails, KeypressTarget,
    NavigationDetails, SubmitDetails, TouchDetails,
};
use crate::protocol::EventKind;

/// A normalized outbound event, ready to be wrapped in a wire envelope.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub kind: EventKind,
    pub message: String,
    pub data: Value,
}

/// Accumulated scroll activity resets if quiet for longer than this.
const SCROLL_SESSION_GAP_MS: i64 = 1000;

/// Merges the high-frequency wheel/scroll stream into one event per burst.
/// Deltas accumulate across the burst; the flushed event reports the
/// dominant axis as its direction. Timestamps come from the caller so the
/// logic is clock-agnostic.
#[derive(Debug)]
pub struct ScrollCoalescer {
    idle_window_ms: i64,
    acc_x: f64,
    acc_y: f64,
    delta_mode: u32,
    had_wheel: bool,
    last_activity_ms: Option<i64>,
    session_start_ms: i64,
    pending: Option<OutboundEvent>,
}

impl ScrollCoalescer {
    pub fn new(idle_window_ms: u64) -> Self {
        Self {
            idle_window_ms: idle_window_ms as i64,
            acc_x: 0.0,
            acc_y: 0.0,
            delta_mode: 0,
            had_wheel: false,
            last_activity_ms: None,
            session_start_ms: 0,
            pending: None,
        }
    }

    pub fn push_wheel(
        &mut self,
        delta_x: f64,
        delta_y: f64,
        delta_mode: u32,
        target: String,
        now_ms: i64,
    ) {
        self.begin_activity(now_ms);
        self.acc_x += delta_x;
        self.acc_y += delta_y;
        self.delta_mode = delta_mode;
        self.had_wheel = true;
        self.pending = Some(OutboundEvent {
            kind: EventKind::Scroll,
            message: format!("Wheel event detected (deltaY: {delta_y})"),
            data: json!({
                "deltaY": delta_y,
                "deltaX": delta_x,
                "deltaMode": delta_mode,
                "target": target,
                "timestamp": now_ms,
                "isDocumentScroll": false,
                "eventType": "wheel",
            }),
        });
    }

    pub fn push_document_scroll(
        &mut self,
        position: f64,
        window_height: f64,
        document_height: f64,
        now_ms: i64,
    ) {
        self.begin_activity(now_ms);
        self.pending = Some(OutboundEvent {
            kind: EventKind::Scroll,
            message: format!("Document scrolled to {position}px"),
            data: json!({
                "target": "document",
                "scrollPosition": position,
                "windowHeight": window_height,
                "documentHeight": document_height,
                "timestamp": now_ms,
                "isDocumentScroll": true,
                "eventType": "document-scroll",
            }),
        });
    }

    /// Instant (in caller-clock ms) at which the pending burst should flush.
    pub fn deadline_ms(&self) -> Option<i64> {
        self.pending
            .as_ref()
            .and_then(|_| self.last_activity_ms)
            .map(|last| last + self.idle_window_ms)
    }

    /// Emits the merged event for the current burst, if one is pending.
    pub fn flush(&mut self, now_ms: i64) -> Option<OutboundEvent> {
        let mut event = self.pending.take()?;

        if self.had_wheel && (self.acc_x.abs() > 0.0 || self.acc_y.abs() > 0.0) {
            let was_wheel = event.data.get("eventType").and_then(Value::as_str) == Some("wheel");
            if let Some(map) = event.data.as_object_mut() {
                map.insert("deltaY".into(), json!(self.acc_y));
                map.insert("deltaX".into(), json!(self.acc_x));
                map.insert("deltaMode".into(), json!(self.delta_mode));
                map.insert("hadWheelInput".into(), json!(true));
                map.insert(
                    "scrollSessionDuration".into(),
                    json!(now_ms - self.session_start_ms),
                );
            }
            if was_wheel {
                event.message = format!("Scrolled {}", self.direction());
            }
        }

        self.acc_x = 0.0;
        self.acc_y = 0.0;
        self.had_wheel = false;
        self.last_activity_ms = None;
        Some(event)
    }

    /// Dominant axis wins; vertical on a tie.
    fn direction(&self) -> &'static str {
        if self.acc_x.abs() > self.acc_y.abs() {
            if self.acc_x > 0.0 {
                "right"
            } else {
                "left"
            }
        } else if self.acc_y > 0.0 {
            "down"
        } else {
            "up"
        }
    }

    fn begin_activity(&mut self, now_ms: i64) {
        if now_ms - self.session_start_ms > SCROLL_SESSION_GAP_MS {
            self.acc_x = 0.0;
            self.acc_y = 0.0;
            self.had_wheel = false;
            self.session_start_ms = now_ms;
        }
        self.last_activity_ms = Some(now_ms);
    }
}

/// Normalizes raw DOM activity into the outbound event vocabulary. Scroll
/// and wheel signals route through the coalescer; everything else maps
/// one-to-one.
pub struct EventTracker {
    scroll: ScrollCoalescer,
}

impl EventTracker {
    pub fn new(scroll_debounce_ms: u64) -> Self {
        Self {
            scroll: ScrollCoalescer::new(scroll_debounce_ms),
        }
    }

    /// Returns an event to emit immediately, or `None` when the activity was
    /// absorbed by the scroll coalescer (or filtered out).
    pub fn ingest(&mut self, event: DomEvent, now_ms: i64) -> Option<OutboundEvent> {
        match event {
            DomEvent::Click { target, x, y } => Some(OutboundEvent {
                kind: EventKind::Click,
                message: format!("Clicked on {}", target.tag_name.to_ascii_lowercase()),
                data: details_value(ClickDetails {
                    tag_name: target.tag_name.clone(),
                    id: target.id.clone(),
                    class_name: target.class_name.clone(),
                    text: truncate(&target.text, 50),
                    x,
                    y,
                    timestamp: now_ms,
                    input_type: target.input_type.clone(),
                    input_name: target.name.clone(),
                    input_value: truncate(&target.value, 30),
                }),
            }),
            DomEvent::KeyDown {
                key,
                code,
                ctrl,
                shift,
                alt,
                meta,
                target,
            } => Some(OutboundEvent {
                kind: EventKind::Keypress,
                message: format!("Pressed key: {key}"),
                data: details_value(KeypressDetails {
                    key,
                    code,
                    ctrl_key: ctrl,
                    shift_key: shift,
                    alt_key: alt,
                    meta_key: meta,
                    timestamp: now_ms,
                    target: KeypressTarget {
                        tag_name: target.tag_name.clone(),
                        id: target.id.clone(),
                        class_name: target.class_name.clone(),
                        input_type: target.input_type.clone(),
                        is_input: matches!(
                            target.tag_name.to_ascii_uppercase().as_str(),
                            "INPUT" | "TEXTAREA" | "SELECT"
                        ),
                    },
                }),
            }),
            DomEvent::DocumentScroll {
                position,
                window_height,
                document_height,
            } => {
                self.scroll
                    .push_document_scroll(position, window_height, document_height, now_ms);
                None
            }
            DomEvent::Wheel {
                delta_x,
                delta_y,
                delta_mode,
                target,
            } => {
                // Wheel noise with no movement carries nothing.
                if delta_x.abs() > 0.0 || delta_y.abs() > 0.0 {
                    self.scroll
                        .push_wheel(delta_x, delta_y, delta_mode, target.short_label(), now_ms);
                }
                None
            }
            DomEvent::FocusIn { target } => Some(OutboundEvent {
                kind: EventKind::Focus,
                message: format!("Focused on {}", target.tag_name.to_ascii_lowercase()),
                data: details_value(FocusDetails {
                    tag_name: target.tag_name.clone(),
                    input_type: target.input_type.clone(),
                    id: target.id.clone(),
                    class_name: target.class_name.clone(),
                    placeholder: Some(target.placeholder.clone()),
                    timestamp: now_ms,
                }),
            }),
            DomEvent::FocusOut { target } => Some(OutboundEvent {
                kind: EventKind::Blur,
                message: format!("Blurred from {}", target.tag_name.to_ascii_lowercase()),
                data: details_value(FocusDetails {
                    tag_name: target.tag_name.clone(),
                    input_type: target.input_type.clone(),
                    id: target.id.clone(),
                    class_name: target.class_name.clone(),
                    placeholder: None,
                    timestamp: now_ms,
                }),
            }),
            DomEvent::Submit {
                target,
                action,
                method,
            } => Some(OutboundEvent {
                kind: EventKind::Submit,
                message: "Form submitted".into(),
                data: details_value(SubmitDetails {
                    action,
                    method,
                    id: target.id.clone(),
                    class_name: target.class_name.clone(),
                    timestamp: now_ms,
                }),
            }),
            DomEvent::TouchStart { x, y, touch_count } => Some(OutboundEvent {
                kind: EventKind::Touch,
                message: format!("Touch at ({x}, {y})"),
                data: details_value(TouchDetails {
                    x,
                    y,
                    touch_count,
                    timestamp: now_ms,
                }),
            }),
            DomEvent::UrlChanged { from, to, path } => Some(OutboundEvent {
                kind: EventKind::Navigation,
                message: format!("Navigated to {path}"),
                data: details_value(NavigationDetails {
                    from,
                    to,
                    path,
                    timestamp: now_ms,
                }),
            }),
            DomEvent::Mutation {
                added_nodes,
                target,
            } => {
                // Only childList mutations that added nodes are reported.
                if added_nodes == 0 {
                    return None;
                }
                Some(OutboundEvent {
                    kind: EventKind::DomChange,
                    message: "DOM content updated".into(),
                    data: details_value(DomChangeDetails {
                        added_nodes,
                        target,
                        timestamp: now_ms,
                    }),
                })
            }
        }
    }

    pub fn scroll_deadline_ms(&self) -> Option<i64> {
        self.scroll.deadline_ms()
    }

    pub fn flush_scroll(&mut self, now_ms: i64) -> Option<OutboundEvent> {
        self.scroll.flush(now_ms)
    }
}

fn details_value<T: serde::Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| json!({}))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::dom::ElementInfo;

    fn wheel(delta_x: f64, delta_y: f64) -> DomEvent {
        DomEvent::Wheel {
            delta_x,
            delta_y,
            delta_mode: 0,
            target: ElementInfo {
                tag_name: "DIV".into(),
                id: "feed".into(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn wheel_burst_coalesces_into_one_event_with_summed_deltas() {
        let mut tracker = EventTracker::new(300);
        assert!(tracker.ingest(wheel(0.0, 40.0), 1000).is_none());
        assert!(tracker.ingest(wheel(0.0, 35.0), 1100).is_none());
        assert!(tracker.ingest(wheel(5.0, 25.0), 1200).is_none());

        assert_eq!(tracker.scroll_deadline_ms(), Some(1500));

        let event = tracker.flush_scroll(1500).unwrap();
        assert_eq!(event.kind, EventKind::Scroll);
        assert_eq!(event.data["deltaY"], 100.0);
        assert_eq!(event.data["deltaX"], 5.0);
        assert_eq!(event.data["hadWheelInput"], true);
        assert_eq!(event.message, "Scrolled down");

        // Nothing left pending.
        assert!(tracker.flush_scroll(1800).is_none());
        assert!(tracker.scroll_deadline_ms().is_none());
    }

    #[test]
    fn dominant_axis_decides_direction() {
        let mut tracker = EventTracker::new(300);
        tracker.ingest(wheel(-80.0, 20.0), 1000);
        let event = tracker.flush_scroll(1300).unwrap();
        assert_eq!(event.message, "Scrolled left");
    }

    #[test]
    fn quiet_gap_resets_scroll_session() {
        let mut tracker = EventTracker::new(300);
        tracker.ingest(wheel(0.0, 500.0), 1000);
        tracker.flush_scroll(1300);

        // Well past the 1s session gap: earlier deltas must not leak in.
        tracker.ingest(wheel(0.0, -10.0), 5000);
        let event = tracker.flush_scroll(5300).unwrap();
        assert_eq!(event.data["deltaY"], -10.0);
        assert_eq!(event.message, "Scrolled up");
    }

    #[test]
    fn zero_delta_wheel_is_ignored() {
        let mut tracker = EventTracker::new(300);
        assert!(tracker.ingest(wheel(0.0, 0.0), 1000).is_none());
        assert!(tracker.scroll_deadline_ms().is_none());
    }

    #[test]
    fn document_scroll_without_wheel_keeps_scroll_message() {
        let mut tracker = EventTracker::new(300);
        tracker.ingest(
            DomEvent::DocumentScroll {
                position: 240.0,
                window_height: 844.0,
                document_height: 2000.0,
            },
            1000,
        );
        let event = tracker.flush_scroll(1300).unwrap();
        assert_eq!(event.message, "Document scrolled to 240px");
        assert_eq!(event.data["isDocumentScroll"], true);
        assert!(event.data.get("hadWheelInput").is_none());
    }

    #[test]
    fn click_maps_with_truncated_text() {
        let mut tracker = EventTracker::new(300);
        let target = ElementInfo {
            tag_name: "BUTTON".into(),
            text: "x".repeat(80),
            ..Default::default()
        };
        let event = tracker
            .ingest(DomEvent::Click { target, x: 5.0, y: 6.0 }, 1000)
            .unwrap();
        assert_eq!(event.kind, EventKind::Click);
        assert_eq!(event.message, "Clicked on button");
        assert_eq!(event.data["text"].as_str().unwrap().len(), 50);
    }

    #[test]
    fn empty_mutation_is_dropped() {
        let mut tracker = EventTracker::new(300);
        assert!(tracker
            .ingest(
                DomEvent::Mutation {
                    added_nodes: 0,
                    target: "DIV".into()
                },
                1000
            )
            .is_none());
    }
}
