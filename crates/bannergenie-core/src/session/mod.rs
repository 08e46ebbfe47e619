//! Per-user design sessions.

pub mod design;
pub mod events;

pub use design::{DesignSession, SessionState, StageResult};
pub use events::{DesignEvent, EventBus};
