use tokio::sync::mpsc;

use crate::errors::{ScaleWobError, ScaleWobResult};
use crate::protocol::Message;

/// One end of the host/environment messaging channel — the stand-in for the
/// browser's postMessage boundary. Delivery preserves per-sender order;
/// there is no shared state between the two ends.
pub struct MessagePort {
    tx: mpsc::Sender<Message>,
    rx: mpsc::Receiver<Message>,
}

impl MessagePort {
    /// Cross-wired pair: whatever one end posts, the other receives.
    pub fn pair(capacity: usize) -> (MessagePort, MessagePort) {
        let (a_tx, a_rx) = mpsc::channel(capacity);
        let (b_tx, b_rx) = mpsc::channel(capacity);
        (
            MessagePort { tx: a_tx, rx: b_rx },
            MessagePort { tx: b_tx, rx: a_rx },
        )
    }

    pub async fn post(&self, message: Message) -> ScaleWobResult<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| ScaleWobError::Channel("peer port closed".into()))
    }

    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Extra sender handle for components that post without owning the port.
    pub fn sender(&self) -> mpsc::Sender<Message> {
        self.tx.clone()
    }

    pub fn split(self) -> (mpsc::Sender<Message>, mpsc::Receiver<Message>) {
        (self.tx, self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CommandPayload, EventKind, EventPayload};

    fn event(id: &str) -> Message {
        Message::Event {
            id: id.into(),
            timestamp: 0,
            payload: EventPayload {
                event_type: EventKind::Click,
                data: serde_json::json!({}),
            },
        }
    }

    #[tokio::test]
    async fn pair_is_cross_wired_and_ordered() {
        let (host, mut env) = MessagePort::pair(8);
        host.post(Message::Command {
            id: "command_1_a".into(),
            payload: CommandPayload {
                command: "get-state".into(),
                params: serde_json::json!({}),
                trajectory: None,
            },
        })
        .await
        .unwrap();

        env.post(event("scalewob_1_a")).await.unwrap();
        env.post(event("scalewob_1_b")).await.unwrap();

        match env.recv().await.unwrap() {
            Message::Command { id, .. } => assert_eq!(id, "command_1_a"),
            other => panic!("unexpected message: {other:?}"),
        }

        let (_tx, mut rx) = host.split();
        match rx.recv().await.unwrap() {
            Message::Event { id, .. } => assert_eq!(id, "scalewob_1_a"),
            other => panic!("unexpected message: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            Message::Event { id, .. } => assert_eq!(id, "scalewob_1_b"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_to_closed_peer_errors() {
        let (host, env) = MessagePort::pair(1);
        drop(env);
        let err = host.post(event("scalewob_1_c")).await.unwrap_err();
        assert!(matches!(err, ScaleWobError::Channel(_)));
    }
}
