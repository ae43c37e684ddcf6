pub mod commands;
pub mod events;
pub mod message;

pub use commands::{Command, ScrollDirection};
pub use events::{EventKind, TrajectoryEntry};
pub use message::{
    message_id, now_ms, CommandPayload, EventPayload, Message, ResponsePayload,
    BRIDGE_ID_PREFIX, LAUNCHER_COMMAND_PREFIX,
};
