pub mod agent;
pub mod dom;
pub mod simulate;
pub mod tracking;

pub use agent::BridgeAgent;
pub use dom::{DomEvent, DomSurface, ElementInfo, EnvironmentState, NodeId, Rect, SyntheticEvent};
