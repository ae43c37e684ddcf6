pub mod console;
pub mod controller;
pub mod trajectory;
pub mod viewport;

pub use console::{console_kind_for, derive_message, ConsoleEntry, ConsoleKind, EventConsole};
pub use controller::{EnvironmentStatus, FrameHost, LauncherAction, LauncherController};
pub use trajectory::{is_actionable, TrajectoryRecorder};
pub use viewport::{fit_scale, ViewportScaler};
