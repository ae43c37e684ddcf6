use serde_json::Value;

use crate::protocol::{EventKind, TrajectoryEntry};

/// Event types that count as user actions for evaluation purposes.
pub fn is_actionable(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Click
            | EventKind::Keypress
            | EventKind::Scroll
            | EventKind::Touch
            | EventKind::Navigation
    )
}

/// Ordered buffer of actionable events captured during an evaluation
/// session. Cleared when a session starts; shipped wholesale with the
/// evaluate command.
#[derive(Debug, Default)]
pub struct TrajectoryRecorder {
    entries: Vec<TrajectoryEntry>,
}

impl TrajectoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the event if its type is actionable; returns whether it was.
    pub fn record(&mut self, kind: EventKind, data: Value, timestamp: i64) -> bool {
        if !is_actionable(kind) {
            return false;
        }
        self.entries.push(TrajectoryEntry {
            timestamp,
            kind,
            data,
        });
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[TrajectoryEntry] {
        &self.entries
    }

    pub fn snapshot(&self) -> Vec<TrajectoryEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_actionable_kinds_are_recorded() {
        let mut recorder = TrajectoryRecorder::new();
        assert!(recorder.record(EventKind::Click, json!({"x": 1}), 10));
        assert!(recorder.record(EventKind::Scroll, json!({"deltaY": 100}), 20));
        assert!(!recorder.record(EventKind::Focus, json!({}), 30));
        assert!(!recorder.record(EventKind::Blur, json!({}), 40));
        assert!(!recorder.record(EventKind::DomChange, json!({}), 50));

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.entries()[0].kind, EventKind::Click);
        assert_eq!(recorder.entries()[1].kind, EventKind::Scroll);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut recorder = TrajectoryRecorder::new();
        recorder.record(EventKind::Keypress, json!({"key": "a"}), 1);
        recorder.clear();
        assert!(recorder.is_empty());
    }
}
