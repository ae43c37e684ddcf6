use serde_json::Value;

use crate::errors::{ScaleWobError, ScaleWobResult};
use crate::protocol::events::TrajectoryEntry;
use crate::protocol::message::CommandPayload;

pub const DEFAULT_CLICK_DELAY_MS: u64 = 0;
pub const DEFAULT_LONG_PRESS_MS: u64 = 1000;
pub const DEFAULT_TYPING_DELAY_MS: u64 = 50;
pub const DEFAULT_SCROLL_DISTANCE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "up" => Some(ScrollDirection::Up),
            "down" => Some(ScrollDirection::Down),
            "left" => Some(ScrollDirection::Left),
            "right" => Some(ScrollDirection::Right),
            _ => None,
        }
    }

    /// Wheel/scroll deltas for moving `distance` in this direction.
    pub fn deltas(self, distance: f64) -> (f64, f64) {
        match self {
            ScrollDirection::Up => (0.0, -distance),
            ScrollDirection::Down => (0.0, distance),
            ScrollDirection::Left => (-distance, 0.0),
            ScrollDirection::Right => (distance, 0.0),
        }
    }
}

/// Typed command set the bridge accepts from the parent. Direction strings
/// stay raw here; they are validated at execution so an invalid direction
/// surfaces as a command failure, not a protocol error.
#[derive(Debug, Clone)]
pub enum Command {
    Click { x: f64, y: f64, delay_ms: u64 },
    LongPress { x: f64, y: f64, duration_ms: u64 },
    Type { text: String, typing_delay_ms: u64 },
    Scroll { x: f64, y: f64, direction: String, distance: f64 },
    Drag { x: f64, y: f64, direction: String, distance: f64 },
    Back,
    GetState,
    Evaluate { params: Value, trajectory: Vec<TrajectoryEntry> },
    ExecuteScript { script: String },
}

impl Command {
    pub fn parse(payload: &CommandPayload) -> ScaleWobResult<Self> {
        let params = &payload.params;
        match payload.command.as_str() {
            "click" => Ok(Command::Click {
                x: num(params, "x"),
                y: num(params, "y"),
                delay_ms: opt_u64(params, &["options", "delay"]).unwrap_or(DEFAULT_CLICK_DELAY_MS),
            }),
            "long_press" => Ok(Command::LongPress {
                x: num(params, "x"),
                y: num(params, "y"),
                duration_ms: opt_u64(params, &["options", "duration"])
                    .unwrap_or(DEFAULT_LONG_PRESS_MS),
            }),
            "type" => Ok(Command::Type {
                text: text(params, "text"),
                typing_delay_ms: opt_u64(params, &["options", "typingDelay"])
                    .unwrap_or(DEFAULT_TYPING_DELAY_MS),
            }),
            "scroll" => Ok(Command::Scroll {
                x: num(params, "x"),
                y: num(params, "y"),
                direction: text(params, "direction"),
                distance: opt_num(params, &["options", "distance"])
                    .unwrap_or(DEFAULT_SCROLL_DISTANCE),
            }),
            "drag" => Ok(Command::Drag {
                x: num(params, "x"),
                y: num(params, "y"),
                direction: text(params, "direction"),
                distance: opt_num(params, &["options", "distance"])
                    .unwrap_or(DEFAULT_SCROLL_DISTANCE),
            }),
            "back" => Ok(Command::Back),
            "get-state" => Ok(Command::GetState),
            "evaluate" => Ok(Self::parse_evaluate(payload)),
            "execute-script" => Ok(Command::ExecuteScript {
                script: text(params, "script"),
            }),
            other => Err(ScaleWobError::Command(format!("Unknown command: {other}"))),
        }
    }

    /// The trajectory rides either as a payload sibling of `params` (the
    /// launcher) or as a `trajectory` key inside `params` (external SDKs);
    /// either way it is split out of the evaluation parameters.
    fn parse_evaluate(payload: &CommandPayload) -> Self {
        let mut params = payload.params.clone();
        let trajectory = if let Some(entries) = payload.trajectory.clone() {
            if let Some(map) = params.as_object_mut() {
                map.remove("trajectory");
            }
            entries
        } else if let Some(raw) = params
            .as_object_mut()
            .and_then(|map| map.remove("trajectory"))
        {
            serde_json::from_value(raw).unwrap_or_default()
        } else {
            Vec::new()
        };
        if params.is_null() {
            params = Value::Object(serde_json::Map::new());
        }
        Command::Evaluate { params, trajectory }
    }
}

fn num(params: &Value, key: &str) -> f64 {
    params.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn text(params: &Value, key: &str) -> String {
    params
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_num(params: &Value, path: &[&str]) -> Option<f64> {
    let mut cursor = params;
    for key in path {
        cursor = cursor.get(key)?;
    }
    cursor.as_f64()
}

fn opt_u64(params: &Value, path: &[&str]) -> Option<u64> {
    opt_num(params, path).map(|n| n.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(command: &str, params: Value) -> CommandPayload {
        CommandPayload {
            command: command.into(),
            params,
            trajectory: None,
        }
    }

    #[test]
    fn click_defaults_delay() {
        match Command::parse(&payload("click", json!({"x": 12, "y": 30}))).unwrap() {
            Command::Click { x, y, delay_ms } => {
                assert_eq!((x, y), (12.0, 30.0));
                assert_eq!(delay_ms, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn type_reads_typing_delay_option() {
        let parsed = Command::parse(&payload(
            "type",
            json!({"text": "abc", "options": {"typingDelay": 10}}),
        ))
        .unwrap();
        match parsed {
            Command::Type {
                text,
                typing_delay_ms,
            } => {
                assert_eq!(text, "abc");
                assert_eq!(typing_delay_ms, 10);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_a_failure() {
        let err = Command::parse(&payload("navigate", json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: navigate");
    }

    #[test]
    fn evaluate_splits_sibling_trajectory() {
        let mut p = payload("evaluate", json!({"count": 5}));
        p.trajectory = Some(vec![TrajectoryEntry {
            timestamp: 1,
            kind: crate::protocol::EventKind::Click,
            data: json!({}),
        }]);
        match Command::parse(&p).unwrap() {
            Command::Evaluate { params, trajectory } => {
                assert_eq!(params, json!({"count": 5}));
                assert_eq!(trajectory.len(), 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn evaluate_splits_embedded_trajectory() {
        let p = payload(
            "evaluate",
            json!({"count": 5, "trajectory": [{"timestamp": 1, "type": "scroll", "data": {}}]}),
        );
        match Command::parse(&p).unwrap() {
            Command::Evaluate { params, trajectory } => {
                assert_eq!(params, json!({"count": 5}));
                assert_eq!(trajectory.len(), 1);
                assert_eq!(trajectory[0].kind, crate::protocol::EventKind::Scroll);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn scroll_direction_parse_is_case_insensitive() {
        assert_eq!(ScrollDirection::parse("DOWN"), Some(ScrollDirection::Down));
        assert_eq!(ScrollDirection::parse("sideways"), None);
        assert_eq!(ScrollDirection::Up.deltas(100.0), (0.0, -100.0));
        assert_eq!(ScrollDirection::Right.deltas(50.0), (50.0, 0.0));
    }
}
