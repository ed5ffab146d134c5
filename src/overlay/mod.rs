pub mod classifier;
pub mod close_button;
pub mod compositor;
pub mod context;
pub mod controller;
pub mod geometry;
pub mod hook;
pub mod identity;
pub mod interaction;
pub mod visibility;
pub mod window;

pub use context::{ContextTracker, ForegroundProbe, ProbedWindow};
pub use controller::{ControllerEvent, OverlayController};
pub use geometry::{MonitorLayout, Point, Rect, Size};
pub use interaction::{InteractionMode, InteractionState};
pub use visibility::HiddenInstanceSet;

#[cfg(windows)]
pub use context::capture_probe;
#[cfg(windows)]
pub use hook::ForegroundHook;
#[cfg(windows)]
pub use window::{pump_messages, CloseButtonWindow, OverlayWindow};
